use thiserror::Error;

use crate::processing::labels::Label;

pub type Result<T> = std::result::Result<T, AnchorTargetError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnchorTargetError {
    #[error("invalid anchor target config: {0}")]
    Config(String),

    #[error("only single item batches are supported, got a batch of {0}")]
    BatchSize(usize),

    #[error("malformed ground truth box at row {row}: {reason}")]
    MalformedGroundTruth { row: usize, reason: String },

    #[error("malformed image info: height {height}, width {width}")]
    MalformedImageInfo { height: f32, width: f32 },

    #[error("manual rpn_positive_weight needs at least one {0:?} anchor to normalize against")]
    EmptyWeightCategory(Label),
}
