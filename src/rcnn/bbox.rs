use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Pairwise IoU plus the per-row and per-column maxima the label assigner needs.
#[derive(Debug, Clone)]
pub struct Overlaps {
    /// `N x M` IoU between every inside anchor and every ground truth box.
    pub ious: Array2<f32>,
    /// Best IoU of each anchor over all ground truth boxes, 0 when there are none.
    pub max_overlaps: Array1<f32>,
    /// Ground truth index reaching `max_overlaps`, lowest index on ties.
    pub argmax_overlaps: Vec<Option<usize>>,
    /// Best IoU of each ground truth box over all anchors.
    pub gt_max_overlaps: Array1<f32>,
}

fn area(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let w = x2 - x1;
    let h = y2 - y1;
    if w <= 0.0 || h <= 0.0 {
        0.0
    } else {
        w * h
    }
}

/// IoU of every box in `boxes` against every box in `query_boxes`.
///
/// Only the first four columns of either input are read, so ground truth rows
/// carrying a trailing class label can be passed as-is. Boxes with zero or
/// negative extent have no area and overlap nothing.
pub fn bbox_overlaps(boxes: ArrayView2<f32>, query_boxes: ArrayView2<f32>) -> Array2<f32> {
    let n_ = boxes.nrows();
    let k_ = query_boxes.nrows();
    let mut overlaps = Array2::<f32>::zeros((n_, k_));

    for k in 0..k_ {
        let (qx1, qy1, qx2, qy2) = (
            query_boxes[[k, 0]],
            query_boxes[[k, 1]],
            query_boxes[[k, 2]],
            query_boxes[[k, 3]],
        );
        let query_area = area(qx1, qy1, qx2, qy2);
        if query_area == 0.0 {
            continue;
        }

        for n in 0..n_ {
            let (bx1, by1, bx2, by2) =
                (boxes[[n, 0]], boxes[[n, 1]], boxes[[n, 2]], boxes[[n, 3]]);
            let box_area = area(bx1, by1, bx2, by2);
            if box_area == 0.0 {
                continue;
            }

            let iw = f32::min(bx2, qx2) - f32::max(bx1, qx1);
            if iw > 0.0 {
                let ih = f32::min(by2, qy2) - f32::max(by1, qy1);
                if ih > 0.0 {
                    let inter = iw * ih;
                    overlaps[[n, k]] = inter / (box_area + query_area - inter);
                }
            }
        }
    }

    overlaps
}

pub fn overlaps(anchors: ArrayView2<f32>, gt_boxes: ArrayView2<f32>) -> Overlaps {
    let ious = bbox_overlaps(anchors, gt_boxes);

    let mut max_overlaps = Array1::<f32>::zeros(ious.nrows());
    let mut argmax_overlaps = vec![None; ious.nrows()];
    for (i, row) in ious.axis_iter(Axis(0)).enumerate() {
        for (j, &iou) in row.iter().enumerate() {
            if argmax_overlaps[i].is_none() || iou > max_overlaps[i] {
                max_overlaps[i] = iou;
                argmax_overlaps[i] = Some(j);
            }
        }
    }

    let gt_max_overlaps = ious.fold_axis(Axis(0), 0.0f32, |&acc, &iou| acc.max(iou));

    Overlaps {
        ious,
        max_overlaps,
        argmax_overlaps,
        gt_max_overlaps,
    }
}
