use ndarray::{s, stack, Array2, ArrayView2, Axis};

use crate::processing::labels::Label;
use crate::rcnn::bbox::Overlaps;

/// Per-coordinate normalization applied to encoded targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetNormalization {
    pub means: [f32; 4],
    pub stds: [f32; 4],
}

/// Encodes `gt_rois` relative to `ex_rois` as `(dx, dy, dw, dh)` centre/size offsets.
///
/// Both inputs are row-aligned; only the first four columns are read. Widths and
/// heights are `x2 - x1` and `y2 - y1`, the callers guarantee they are positive.
pub fn nonlinear_transform(ex_rois: ArrayView2<f32>, gt_rois: ArrayView2<f32>) -> Array2<f32> {
    assert_eq!(ex_rois.nrows(), gt_rois.nrows(), "inconsistent rois number");

    let ex_widths = &ex_rois.slice(s![.., 2]) - &ex_rois.slice(s![.., 0]);
    let ex_heights = &ex_rois.slice(s![.., 3]) - &ex_rois.slice(s![.., 1]);
    let ex_ctr_x = &ex_rois.slice(s![.., 0]) + &(0.5 * &ex_widths);
    let ex_ctr_y = &ex_rois.slice(s![.., 1]) + &(0.5 * &ex_heights);

    let gt_widths = &gt_rois.slice(s![.., 2]) - &gt_rois.slice(s![.., 0]);
    let gt_heights = &gt_rois.slice(s![.., 3]) - &gt_rois.slice(s![.., 1]);
    let gt_ctr_x = &gt_rois.slice(s![.., 0]) + &(0.5 * &gt_widths);
    let gt_ctr_y = &gt_rois.slice(s![.., 1]) + &(0.5 * &gt_heights);

    let targets_dx = (&gt_ctr_x - &ex_ctr_x) / &ex_widths;
    let targets_dy = (&gt_ctr_y - &ex_ctr_y) / &ex_heights;
    let targets_dw = (&gt_widths / &ex_widths).mapv(f32::ln);
    let targets_dh = (&gt_heights / &ex_heights).mapv(f32::ln);

    stack![Axis(1), targets_dx, targets_dy, targets_dw, targets_dh]
}

/// Regression targets for every inside anchor.
///
/// Rows stay zero unless the anchor is positive and overlaps its matched ground truth.
pub fn compute_targets(
    anchors: ArrayView2<f32>,
    gt_boxes: ArrayView2<f32>,
    overlaps: &Overlaps,
    labels: &[Label],
    normalization: Option<&TargetNormalization>,
) -> Array2<f32> {
    let mut targets = Array2::<f32>::zeros((anchors.nrows(), 4));

    let (fg_inds, gt_inds): (Vec<usize>, Vec<usize>) = labels
        .iter()
        .zip(overlaps.argmax_overlaps.iter())
        .enumerate()
        .filter_map(|(i, (&label, &gt))| match (label, gt) {
            // a zero-IoU argmax is not a match
            (Label::Positive, Some(gt)) if overlaps.max_overlaps[i] > 0.0 => Some((i, gt)),
            _ => None,
        })
        .unzip();

    if fg_inds.is_empty() {
        return targets;
    }

    let ex_rois = anchors.select(Axis(0), &fg_inds);
    let gt_rois = gt_boxes.select(Axis(0), &gt_inds);
    let mut fg_targets = nonlinear_transform(ex_rois.view(), gt_rois.view());

    if let Some(norm) = normalization {
        for mut row in fg_targets.axis_iter_mut(Axis(0)) {
            for c in 0..4 {
                row[c] = (row[c] - norm.means[c]) / norm.stds[c];
            }
        }
    }

    for (row, &i) in fg_inds.iter().enumerate() {
        targets.row_mut(i).assign(&fg_targets.row(row));
    }

    targets
}
