use ndarray_rand::rand::Rng;
use tracing::trace;

use crate::processing::labels::{count_labels, Label};

/// Source of uniform random indices used to subsample labels.
pub trait IndexSampler {
    /// Uniformly draws an index in `0..upper`; `upper` is never zero.
    fn uniform_index(&mut self, upper: usize) -> usize;
}

impl<R: Rng + ?Sized> IndexSampler for R {
    fn uniform_index(&mut self, upper: usize) -> usize {
        self.gen_range(0..upper)
    }
}

/// Batch composition the sampler enforces.
#[derive(Debug, Clone, Copy)]
pub struct BatchPolicy {
    pub fg_fraction: f32,
    pub batch_size: usize,
}

impl BatchPolicy {
    pub fn max_positives(&self) -> usize {
        (self.fg_fraction * self.batch_size as f32).floor() as usize
    }
}

/// Turns a uniformly chosen subset of `label` into `Ignore` so at most `keep` remain.
///
/// The excess is drawn without replacement with a partial Fisher-Yates shuffle over
/// the candidate positions.
pub fn disable_excess<S: IndexSampler + ?Sized>(
    labels: &mut [Label],
    label: Label,
    keep: usize,
    sampler: &mut S,
) -> usize {
    let mut candidates: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == label)
        .map(|(i, _)| i)
        .collect();

    if candidates.len() <= keep {
        return 0;
    }

    let excess = candidates.len() - keep;
    for i in 0..excess {
        let j = i + sampler.uniform_index(candidates.len() - i);
        candidates.swap(i, j);
        labels[candidates[i]] = Label::Ignore;
    }

    excess
}

/// Subsamples positives down to `fg_fraction * batch_size`, then negatives down to
/// whatever is left of the batch.
pub fn subsample_labels<S: IndexSampler + ?Sized>(
    labels: &mut [Label],
    policy: &BatchPolicy,
    sampler: &mut S,
) {
    let num_fg = policy.max_positives();
    let fg_disabled = disable_excess(labels, Label::Positive, num_fg, sampler);

    let num_bg = policy.batch_size.saturating_sub(count_labels(labels, Label::Positive));
    let bg_disabled = disable_excess(labels, Label::Negative, num_bg, sampler);

    trace!(num_fg, num_bg, fg_disabled, bg_disabled, "subsampled anchor labels");
}
