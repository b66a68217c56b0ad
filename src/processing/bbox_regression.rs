use ndarray::Array2;
use tracing::trace;

use crate::error::{AnchorTargetError, Result};
use crate::processing::labels::{count_labels, Label};

/// How the outside weights are normalized across the sampled batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutsideWeighting {
    /// Every non-ignored example gets `1 / num_examples`.
    Uniform,
    /// Positives share `positive_weight`, negatives share `1 - positive_weight`.
    Positive(f32),
}

impl OutsideWeighting {
    /// Negative `rpn_positive_weight` values select uniform weighting.
    pub fn from_positive_weight(positive_weight: f32) -> Self {
        if positive_weight < 0.0 {
            OutsideWeighting::Uniform
        } else {
            OutsideWeighting::Positive(positive_weight)
        }
    }

    /// Returns the `(positive, negative)` per-anchor weights for these labels.
    pub fn weights(&self, labels: &[Label]) -> Result<(f32, f32)> {
        match *self {
            OutsideWeighting::Uniform => {
                let num_examples = labels.len() - count_labels(labels, Label::Ignore);
                if num_examples == 0 {
                    // nothing will be weighted
                    return Ok((0.0, 0.0));
                }
                let w = 1.0 / num_examples as f32;
                Ok((w, w))
            }
            OutsideWeighting::Positive(positive_weight) => {
                let num_fg = count_labels(labels, Label::Positive);
                if num_fg == 0 {
                    return Err(AnchorTargetError::EmptyWeightCategory(Label::Positive));
                }
                let num_bg = count_labels(labels, Label::Negative);
                if num_bg == 0 {
                    return Err(AnchorTargetError::EmptyWeightCategory(Label::Negative));
                }
                Ok((positive_weight / num_fg as f32, (1.0 - positive_weight) / num_bg as f32))
            }
        }
    }
}

/// Inside and outside regression weights, `N x 4` each.
#[derive(Debug, Clone)]
pub struct RegressionWeights {
    pub inside: Array2<f32>,
    pub outside: Array2<f32>,
}

pub fn compute_weights(
    labels: &[Label],
    weighting: &OutsideWeighting,
) -> Result<RegressionWeights> {
    let (positive_weight, negative_weight) = weighting.weights(labels)?;
    trace!(positive_weight, negative_weight, "outside weights");

    let n = labels.len();
    let mut inside = Array2::<f32>::zeros((n, 4));
    let mut outside = Array2::<f32>::zeros((n, 4));

    for (i, label) in labels.iter().enumerate() {
        match label {
            Label::Positive => {
                inside.row_mut(i).fill(1.0);
                outside.row_mut(i).fill(positive_weight);
            }
            Label::Negative => outside.row_mut(i).fill(negative_weight),
            Label::Ignore => {}
        }
    }

    Ok(RegressionWeights { inside, outside })
}

#[cfg(test)]
mod tests {
    use ndarray::Axis;
    use crate::error::AnchorTargetError;
    use crate::processing::bbox_regression::{compute_weights, OutsideWeighting};
    use crate::processing::labels::Label;

    #[test]
    fn test_uniform_weights_sum_to_one() {
        let labels = [
            Label::Positive,
            Label::Negative,
            Label::Ignore,
            Label::Negative,
            Label::Positive,
        ];
        let weighting = OutsideWeighting::from_positive_weight(-1.0);

        let weights = compute_weights(&labels, &weighting).unwrap();

        for sum in weights.outside.sum_axis(Axis(0)).iter() {
            assert!((sum - 1.0).abs() < 1e-6);
        }
        assert_eq!(weights.outside.row(2).to_vec(), vec![0.0; 4]);
        assert_eq!(weights.inside.row(0).to_vec(), vec![1.0; 4]);
        assert_eq!(weights.inside.row(1).to_vec(), vec![0.0; 4]);
        assert_eq!(weights.inside.row(2).to_vec(), vec![0.0; 4]);
    }

    #[test]
    fn test_manual_weights() {
        let labels = [
            Label::Positive,
            Label::Negative,
            Label::Negative,
            Label::Negative,
            Label::Ignore,
        ];

        let weights = compute_weights(&labels, &OutsideWeighting::Positive(0.25)).unwrap();

        assert!((weights.outside[[0, 0]] - 0.25).abs() < 1e-6);
        assert!((weights.outside[[1, 3]] - 0.25).abs() < 1e-6);
        assert_eq!(weights.outside[[4, 0]], 0.0);
    }

    #[test]
    fn test_manual_weights_need_both_categories() {
        let only_negatives = [Label::Negative, Label::Ignore];
        let only_positives = [Label::Positive];

        assert_eq!(
            compute_weights(&only_negatives, &OutsideWeighting::Positive(0.5)).unwrap_err(),
            AnchorTargetError::EmptyWeightCategory(Label::Positive)
        );
        assert_eq!(
            compute_weights(&only_positives, &OutsideWeighting::Positive(0.5)).unwrap_err(),
            AnchorTargetError::EmptyWeightCategory(Label::Negative)
        );
    }

    #[test]
    fn test_uniform_weights_without_examples() {
        let labels = [Label::Ignore, Label::Ignore];

        let weights = compute_weights(&labels, &OutsideWeighting::Uniform).unwrap();

        assert_eq!(weights.outside.sum(), 0.0);
        assert_eq!(weights.inside.sum(), 0.0);
    }
}
