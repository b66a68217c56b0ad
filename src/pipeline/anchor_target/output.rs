use ndarray::{Array2, Array4};

use crate::processing::labels::{count_labels, Label};
use crate::rcnn::anchors::anchor_position;

/// The four dense RPN training blobs.
///
/// `labels` is `1 x 1 x (A * H) x W` with anchor `k` of row `h` stored at row
/// `k * H + h`. The other three are `1 x (A * 4) x H x W` with coordinate `c` of
/// anchor `k` in channel `k * 4 + c`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorTargetOutput {
    pub labels: Array4<f32>,
    pub bbox_targets: Array4<f32>,
    pub bbox_inside_weights: Array4<f32>,
    pub bbox_outside_weights: Array4<f32>,
    pub num_inside: usize,
    pub num_positive: usize,
    pub num_negative: usize,
}

/// Output shapes as `(labels, bbox)` for an `A`-anchor, `H x W` grid.
pub fn output_shapes(
    num_anchors: usize,
    height: usize,
    width: usize,
) -> ((usize, usize, usize, usize), (usize, usize, usize, usize)) {
    ((1, 1, num_anchors * height, width), (1, num_anchors * 4, height, width))
}

impl AnchorTargetOutput {
    /// Grids holding the defaults: every label ignored, every target and weight zero.
    pub fn new(num_anchors: usize, height: usize, width: usize) -> Self {
        let (label_shape, bbox_shape) = output_shapes(num_anchors, height, width);
        AnchorTargetOutput {
            labels: Array4::from_elem(label_shape, Label::Ignore.as_f32()),
            bbox_targets: Array4::zeros(bbox_shape),
            bbox_inside_weights: Array4::zeros(bbox_shape),
            bbox_outside_weights: Array4::zeros(bbox_shape),
            num_inside: 0,
            num_positive: 0,
            num_negative: 0,
        }
    }

    pub fn num_anchors(&self) -> usize {
        self.bbox_targets.dim().1 / 4
    }

    pub fn height(&self) -> usize {
        self.bbox_targets.dim().2
    }

    pub fn width(&self) -> usize {
        self.bbox_targets.dim().3
    }

    /// Restores every grid to its defaults so the buffers can serve another image.
    pub fn reset(&mut self) {
        self.labels.fill(Label::Ignore.as_f32());
        self.bbox_targets.fill(0.0);
        self.bbox_inside_weights.fill(0.0);
        self.bbox_outside_weights.fill(0.0);
        self.num_inside = 0;
        self.num_positive = 0;
        self.num_negative = 0;
    }

    /// Label of anchor `k` at cell `(h, w)`.
    pub fn label_at(&self, k: usize, h: usize, w: usize) -> f32 {
        self.labels[[0, 0, k * self.height() + h, w]]
    }

    /// Writes the per-inside-anchor results back onto the dense grids.
    ///
    /// `inds_inside` holds the synthetic anchor indices, row-aligned with the
    /// other inputs.
    pub fn scatter(
        &mut self,
        inds_inside: &[usize],
        labels: &[Label],
        bbox_targets: &Array2<f32>,
        inside_weights: &Array2<f32>,
        outside_weights: &Array2<f32>,
    ) {
        let (num_anchors, height, width) = (self.num_anchors(), self.height(), self.width());

        for (i, &idx) in inds_inside.iter().enumerate() {
            let (k, h, w) = anchor_position(idx, width, num_anchors);
            self.labels[[0, 0, k * height + h, w]] = labels[i].as_f32();
            for c in 0..4 {
                self.bbox_targets[[0, k * 4 + c, h, w]] = bbox_targets[[i, c]];
                self.bbox_inside_weights[[0, k * 4 + c, h, w]] = inside_weights[[i, c]];
                self.bbox_outside_weights[[0, k * 4 + c, h, w]] = outside_weights[[i, c]];
            }
        }

        self.num_inside = inds_inside.len();
        self.num_positive = count_labels(labels, Label::Positive);
        self.num_negative = count_labels(labels, Label::Negative);
    }
}
