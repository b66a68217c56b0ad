use ndarray::Array2;
use tracing::{debug, debug_span};

use crate::error::{AnchorTargetError, Result};
use crate::pipeline::anchor_target::config::AnchorTargetConfig;
use crate::pipeline::anchor_target::output::{output_shapes, AnchorTargetOutput};
use crate::processing::bbox_regression::compute_weights;
use crate::processing::bbox_transform::compute_targets;
use crate::processing::labels::{assign_labels, count_labels, Label};
use crate::processing::sampler::{subsample_labels, IndexSampler};
use crate::rcnn::anchors::{anchors, inside_anchors, ImageInfo};
use crate::rcnn::bbox::overlaps;

/// Assigns RPN classification labels and box regression targets to anchors.
///
/// The base anchors and thresholds are fixed at construction; `forward` is a pure
/// function of one image's score map shape, ground truth and image size, plus the
/// sampler it is handed. A layer can be shared read-only between threads as long
/// as every thread brings its own sampler.
#[derive(Debug, Clone)]
pub struct AnchorTargetLayer {
    config: AnchorTargetConfig,
    base_anchors: Array2<f32>,
}

impl AnchorTargetLayer {
    pub fn new(config: AnchorTargetConfig) -> Result<Self> {
        config.validate()?;
        let base_anchors = config.base_anchors();

        debug!(
            num_anchors = base_anchors.nrows(),
            feat_stride = config.feat_stride,
            "anchor target layer set up"
        );

        Ok(AnchorTargetLayer { config, base_anchors })
    }

    pub fn config(&self) -> &AnchorTargetConfig {
        &self.config
    }

    pub fn base_anchors(&self) -> &Array2<f32> {
        &self.base_anchors
    }

    pub fn num_anchors(&self) -> usize {
        self.base_anchors.nrows()
    }

    /// `(labels, bbox)` blob shapes produced for an `height x width` score map.
    pub fn output_shapes(
        &self,
        height: usize,
        width: usize,
    ) -> ((usize, usize, usize, usize), (usize, usize, usize, usize)) {
        output_shapes(self.num_anchors(), height, width)
    }

    /// Computes the training blobs for one image.
    ///
    /// * `score_dim` - `(num, channels, height, width)` of the RPN score map, `num` must be 1.
    /// * `gt_boxes` - `M x 5` rows of `(x1, y1, x2, y2, label)`.
    /// * `im_info` - size of the network input image.
    /// * `sampler` - random source for label subsampling.
    pub fn forward<S: IndexSampler + ?Sized>(
        &self,
        score_dim: (usize, usize, usize, usize),
        gt_boxes: &Array2<f32>,
        im_info: ImageInfo,
        sampler: &mut S,
    ) -> Result<AnchorTargetOutput> {
        let (num, _, height, width) = score_dim;
        if num != 1 {
            return Err(AnchorTargetError::BatchSize(num));
        }
        check_im_info(im_info)?;
        check_gt_boxes(gt_boxes)?;

        let num_gt = gt_boxes.nrows();
        let _span = debug_span!("anchor_target", height, width, num_gt).entered();

        let stride = self.config.feat_stride as f32;
        let all_anchors = anchors(height, width, stride, &self.base_anchors);
        let inside = inside_anchors(&all_anchors, im_info, self.config.allowed_border);

        let overlaps = overlaps(inside.boxes.view(), gt_boxes.view());
        let mut labels = assign_labels(&overlaps, &self.config.label_policy());
        debug!(
            num_inside = inside.len(),
            num_fg = count_labels(&labels, Label::Positive),
            num_bg = count_labels(&labels, Label::Negative),
            "assigned anchor labels"
        );

        subsample_labels(&mut labels, &self.config.batch_policy(), sampler);

        let normalization = self.config.target_normalization();
        let bbox_targets = compute_targets(
            inside.boxes.view(),
            gt_boxes.view(),
            &overlaps,
            &labels,
            normalization.as_ref(),
        );
        let weights = compute_weights(&labels, &self.config.outside_weighting())?;

        let mut output = AnchorTargetOutput::new(self.num_anchors(), height, width);
        output.scatter(
            &inside.inds_inside,
            &labels,
            &bbox_targets,
            &weights.inside,
            &weights.outside,
        );

        debug!(
            num_fg = output.num_positive,
            num_bg = output.num_negative,
            "sampled anchor labels"
        );

        Ok(output)
    }
}

fn check_im_info(im_info: ImageInfo) -> Result<()> {
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if valid(im_info.height) && valid(im_info.width) {
        Ok(())
    } else {
        Err(AnchorTargetError::MalformedImageInfo {
            height: im_info.height,
            width: im_info.width,
        })
    }
}

fn check_gt_boxes(gt_boxes: &Array2<f32>) -> Result<()> {
    if gt_boxes.ncols() != 5 {
        return Err(AnchorTargetError::MalformedGroundTruth {
            row: 0,
            reason: format!(
                "expected (x1, y1, x2, y2, label) rows, got {} columns",
                gt_boxes.ncols()
            ),
        });
    }

    for (row, gt) in gt_boxes.outer_iter().enumerate() {
        let reason = if gt.iter().take(4).any(|v| !v.is_finite()) {
            "non-finite coordinate"
        } else if gt[2] < gt[0] || gt[3] < gt[1] {
            "inverted corners"
        } else {
            continue;
        };
        return Err(AnchorTargetError::MalformedGroundTruth {
            row,
            reason: reason.to_string(),
        });
    }

    Ok(())
}
