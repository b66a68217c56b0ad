// Anchors are laid out (height, width, anchor) so that the flat row index of the
// reshaped grid is the synthetic anchor index `(h * width + w) * A + k`.

use ndarray::{s, Array2, Array4};
use tracing::trace;

/// Image extent the anchors are clipped against, in input pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageInfo {
    pub height: f32,
    pub width: f32,
}

impl ImageInfo {
    pub fn new(height: f32, width: f32) -> Self {
        ImageInfo { height, width }
    }
}

/// Anchors that survived the image-boundary filter, in generation order.
#[derive(Debug, Clone)]
pub struct InsideAnchors {
    /// `N x 4` boxes `(x1, y1, x2, y2)`.
    pub boxes: Array2<f32>,
    /// Synthetic index of every kept anchor, row-aligned with `boxes`.
    pub inds_inside: Vec<usize>,
}

impl InsideAnchors {
    pub fn len(&self) -> usize {
        self.inds_inside.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inds_inside.is_empty()
    }
}

pub fn anchors(
    height: usize,
    width: usize,
    stride: f32,
    base_anchors: &Array2<f32>,
) -> Array4<f32> {
    let a = base_anchors.nrows();
    let mut all_anchors = Array4::<f32>::zeros((height, width, a, 4));

    for ih in 0..height {
        let sh = ih as f32 * stride;
        for iw in 0..width {
            let sw = iw as f32 * stride;
            for k in 0..a {
                all_anchors[[ih, iw, k, 0]] = base_anchors[[k, 0]] + sw;
                all_anchors[[ih, iw, k, 1]] = base_anchors[[k, 1]] + sh;
                all_anchors[[ih, iw, k, 2]] = base_anchors[[k, 2]] + sw;
                all_anchors[[ih, iw, k, 3]] = base_anchors[[k, 3]] + sh;
            }
        }
    }

    all_anchors
}

/// Synthetic index of base anchor `k` placed at cell `(h, w)`.
pub fn anchor_index(k: usize, h: usize, w: usize, width: usize, num_anchors: usize) -> usize {
    (h * width + w) * num_anchors + k
}

/// Inverse of [`anchor_index`], returns `(k, h, w)`.
pub fn anchor_position(idx: usize, width: usize, num_anchors: usize) -> (usize, usize, usize) {
    let cell = idx / num_anchors;
    (idx % num_anchors, cell / width, cell % width)
}

/// Keeps the anchors lying inside the image, extended by `border` on every side.
pub fn inside_anchors(all_anchors: &Array4<f32>, im_info: ImageInfo, border: f32) -> InsideAnchors {
    let (height, width, a, _) = all_anchors.dim();
    let bounds = [-border, -border, im_info.width + border, im_info.height + border];

    let mut inds_inside = Vec::new();
    for ih in 0..height {
        for iw in 0..width {
            for k in 0..a {
                let anchor = all_anchors.slice(s![ih, iw, k, ..]);
                if anchor[0] >= bounds[0]
                    && anchor[1] >= bounds[1]
                    && anchor[2] < bounds[2]
                    && anchor[3] < bounds[3]
                {
                    inds_inside.push(anchor_index(k, ih, iw, width, a));
                }
            }
        }
    }

    trace!(
        total = height * width * a,
        inside = inds_inside.len(),
        "filtered anchors against image bounds"
    );

    let boxes = Array2::from_shape_fn((inds_inside.len(), 4), |(i, c)| {
        let (k, ih, iw) = anchor_position(inds_inside[i], width, a);
        all_anchors[[ih, iw, k, c]]
    });

    InsideAnchors { boxes, inds_inside }
}
