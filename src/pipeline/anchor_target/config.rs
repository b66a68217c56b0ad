use std::path::Path;

use anyhow::Context;
use ndarray::Array2;
use serde::Deserialize;

use crate::error::{AnchorTargetError, Result};
use crate::processing::bbox_regression::OutsideWeighting;
use crate::processing::bbox_transform::TargetNormalization;
use crate::processing::generate_anchors::generate_anchors;
use crate::processing::labels::LabelPolicy;
use crate::processing::sampler::BatchPolicy;

/// Settings of the RPN anchor target assignment.
///
/// Defaults are the usual Faster R-CNN RPN training values. When `anchors` is
/// empty the base anchors are generated from `base_size`, `ratios` and `scales`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnchorTargetConfig {
    pub base_size: u32,
    pub feat_stride: u32,
    pub anchors: Vec<[f32; 4]>,
    pub ratios: Vec<f32>,
    pub scales: Vec<f32>,
    pub allowed_border: f32,
    pub negative_overlap: f32,
    pub positive_overlap: f32,
    pub clobber_positives: bool,
    pub fg_fraction: f32,
    pub batch_size: usize,
    pub positive_weight: f32,
    pub eps: f32,
    pub normalize_targets: bool,
    pub bbox_means: [f32; 4],
    pub bbox_stds: [f32; 4],
}

impl Default for AnchorTargetConfig {
    fn default() -> Self {
        AnchorTargetConfig {
            base_size: 16,
            feat_stride: 16,
            anchors: vec![],
            ratios: vec![0.5, 1.0, 2.0],
            scales: vec![8.0, 16.0, 32.0],
            allowed_border: 0.0,
            negative_overlap: 0.3,
            positive_overlap: 0.7,
            clobber_positives: false,
            fg_fraction: 0.5,
            batch_size: 256,
            positive_weight: -1.0,
            eps: 1e-14,
            normalize_targets: false,
            bbox_means: [0.0; 4],
            bbox_stds: [1.0; 4],
        }
    }
}

impl AnchorTargetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("failed to parse anchor target config")
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read anchor target config {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    /// Base anchors as an `A x 4` array, in definition order.
    pub fn base_anchors(&self) -> Array2<f32> {
        if self.anchors.is_empty() {
            return generate_anchors(self.base_size, &self.ratios, &self.scales);
        }
        Array2::from_shape_fn((self.anchors.len(), 4), |(k, c)| self.anchors[k][c])
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(AnchorTargetError::Config(msg))
        }

        if self.feat_stride == 0 {
            return invalid("feat_stride must be positive".to_string());
        }

        let base_anchors = self.base_anchors();
        if base_anchors.nrows() == 0 {
            return invalid("no base anchors configured".to_string());
        }
        for (k, anchor) in base_anchors.outer_iter().enumerate() {
            let degenerate = anchor[2] <= anchor[0] || anchor[3] <= anchor[1];
            if anchor.iter().any(|v| !v.is_finite()) || degenerate {
                return invalid(format!("base anchor {} {:?} has no area", k, anchor.to_vec()));
            }
        }

        for (name, value) in [
            ("negative_overlap", self.negative_overlap),
            ("positive_overlap", self.positive_overlap),
            ("fg_fraction", self.fg_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{} must be within [0, 1], got {}", name, value));
            }
        }

        if !self.allowed_border.is_finite() || self.allowed_border < 0.0 {
            return invalid(format!(
                "allowed_border must be non-negative, got {}",
                self.allowed_border
            ));
        }

        let weight = self.positive_weight;
        if weight.is_nan() || (weight >= 0.0 && !(weight > 0.0 && weight < 1.0)) {
            return invalid(format!("illegal rpn_positive_weight {}", weight));
        }

        if self.eps.is_nan() || self.eps < 0.0 {
            return invalid(format!("eps must be non-negative, got {}", self.eps));
        }

        if self.normalize_targets && self.bbox_stds.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            return invalid(format!("bbox_stds {:?} cannot normalize targets", self.bbox_stds));
        }

        Ok(())
    }

    pub fn label_policy(&self) -> LabelPolicy {
        LabelPolicy {
            negative_overlap: self.negative_overlap,
            positive_overlap: self.positive_overlap,
            clobber_positives: self.clobber_positives,
            eps: self.eps,
        }
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            fg_fraction: self.fg_fraction,
            batch_size: self.batch_size,
        }
    }

    pub fn outside_weighting(&self) -> OutsideWeighting {
        OutsideWeighting::from_positive_weight(self.positive_weight)
    }

    pub fn target_normalization(&self) -> Option<TargetNormalization> {
        self.normalize_targets.then_some(TargetNormalization {
            means: self.bbox_means,
            stds: self.bbox_stds,
        })
    }
}
