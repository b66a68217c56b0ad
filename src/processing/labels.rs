use crate::rcnn::bbox::Overlaps;

/// Training label of one anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Label {
    Positive,
    Negative,
    #[default]
    Ignore,
}

impl Label {
    /// Value written into the `rpn_labels` grid.
    pub fn as_f32(self) -> f32 {
        match self {
            Label::Positive => 1.0,
            Label::Negative => 0.0,
            Label::Ignore => -1.0,
        }
    }
}

/// Thresholds driving the label assignment.
#[derive(Debug, Clone, Copy)]
pub struct LabelPolicy {
    pub negative_overlap: f32,
    pub positive_overlap: f32,
    pub clobber_positives: bool,
    pub eps: f32,
}

pub fn count_labels(labels: &[Label], label: Label) -> usize {
    labels.iter().filter(|&&l| l == label).count()
}

fn mark_negatives(labels: &mut [Label], overlaps: &Overlaps, negative_overlap: f32) {
    for (label, &max_overlap) in labels.iter_mut().zip(overlaps.max_overlaps.iter()) {
        if max_overlap < negative_overlap {
            *label = Label::Negative;
        }
    }
}

/// Labels every inside anchor from its overlaps with the ground truth.
///
/// Rules are applied in order: background below `negative_overlap` (first unless
/// clobbering), the best anchors of every ground truth box, anything at or above
/// `positive_overlap`, then background again when `clobber_positives` is set.
pub fn assign_labels(overlaps: &Overlaps, policy: &LabelPolicy) -> Vec<Label> {
    let mut labels = vec![Label::Ignore; overlaps.max_overlaps.len()];

    if !policy.clobber_positives {
        mark_negatives(&mut labels, overlaps, policy.negative_overlap);
    }

    // fg label: for each gt, anchors with highest overlap
    for (j, &gt_max) in overlaps.gt_max_overlaps.iter().enumerate() {
        // a gt box nothing overlaps has no best anchor
        if gt_max <= 0.0 {
            continue;
        }
        for (i, label) in labels.iter_mut().enumerate() {
            if (gt_max - overlaps.ious[[i, j]]).abs() <= policy.eps {
                *label = Label::Positive;
            }
        }
    }

    // fg label: above thresh IOU
    for (label, &max_overlap) in labels.iter_mut().zip(overlaps.max_overlaps.iter()) {
        if max_overlap >= policy.positive_overlap {
            *label = Label::Positive;
        }
    }

    if policy.clobber_positives {
        mark_negatives(&mut labels, overlaps, policy.negative_overlap);
    }

    labels
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2};
    use crate::processing::labels::{assign_labels, count_labels, Label, LabelPolicy};
    use crate::rcnn::bbox::overlaps;

    fn policy(clobber_positives: bool) -> LabelPolicy {
        LabelPolicy {
            negative_overlap: 0.3,
            positive_overlap: 0.7,
            clobber_positives,
            eps: 1e-14,
        }
    }

    #[test]
    fn test_assign_labels() {
        let anchors = array![
            [0.0, 0.0, 10.0, 10.0],   // exact match
            [0.0, 0.0, 10.0, 20.0],   // iou 0.5
            [0.0, 0.0, 10.0, 40.0],   // iou 0.25
            [50.0, 50.0, 60.0, 60.0]  // nothing
        ];
        let gt_boxes = array![[0.0, 0.0, 10.0, 10.0, 1.0]];

        let labels = assign_labels(&overlaps(anchors.view(), gt_boxes.view()), &policy(false));

        assert_eq!(labels, vec![Label::Positive, Label::Ignore, Label::Negative, Label::Negative]);
    }

    #[test]
    fn test_best_match_below_positive_threshold() {
        let anchors = array![
            [0.0, 0.0, 10.0, 20.0],   // iou 0.5
            [0.0, 0.0, 10.0, 40.0]    // iou 0.25
        ];
        let gt_boxes = array![[0.0, 0.0, 10.0, 10.0, 1.0]];

        let labels = assign_labels(&overlaps(anchors.view(), gt_boxes.view()), &policy(false));

        assert_eq!(labels, vec![Label::Positive, Label::Negative]);
    }

    #[test]
    fn test_best_match_ties_are_all_positive() {
        let anchors = array![
            [0.0, 0.0, 10.0, 20.0],
            [0.0, -10.0, 10.0, 10.0],
            [0.0, 0.0, 10.0, 40.0]
        ];
        let gt_boxes = array![[0.0, 0.0, 10.0, 10.0, 1.0]];

        let labels = assign_labels(&overlaps(anchors.view(), gt_boxes.view()), &policy(false));

        assert_eq!(count_labels(&labels, Label::Positive), 2);
        assert_eq!(labels[2], Label::Negative);
    }

    #[test]
    fn test_clobber_positives() {
        // the best anchor for the gt box only reaches iou 0.25
        let anchors = array![[0.0, 0.0, 10.0, 40.0], [50.0, 50.0, 60.0, 60.0]];
        let gt_boxes = array![[0.0, 0.0, 10.0, 10.0, 1.0]];
        let o = overlaps(anchors.view(), gt_boxes.view());

        let kept = assign_labels(&o, &policy(false));
        let clobbered = assign_labels(&o, &policy(true));

        assert_eq!(kept, vec![Label::Positive, Label::Negative]);
        assert_eq!(clobbered, vec![Label::Negative, Label::Negative]);
    }

    #[test]
    fn test_no_ground_truth() {
        let anchors = array![[0.0, 0.0, 10.0, 10.0], [5.0, 5.0, 20.0, 20.0]];
        let gt_boxes = Array2::<f32>::zeros((0, 5));
        let o = overlaps(anchors.view(), gt_boxes.view());

        assert_eq!(assign_labels(&o, &policy(false)), vec![Label::Negative; 2]);
        assert_eq!(assign_labels(&o, &policy(true)), vec![Label::Negative; 2]);
    }

    #[test]
    fn test_unreachable_ground_truth_marks_nothing() {
        let anchors = array![[0.0, 0.0, 10.0, 10.0]];
        let gt_boxes = array![[100.0, 100.0, 110.0, 110.0, 1.0]];
        let o = overlaps(anchors.view(), gt_boxes.view());

        assert_eq!(assign_labels(&o, &policy(false)), vec![Label::Negative]);
    }

    #[test]
    fn test_label_values() {
        assert_eq!(Label::Positive.as_f32(), 1.0);
        assert_eq!(Label::Negative.as_f32(), 0.0);
        assert_eq!(Label::Ignore.as_f32(), -1.0);
        assert_eq!(Label::default(), Label::Ignore);
    }
}
