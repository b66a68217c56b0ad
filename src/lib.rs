pub mod error;
pub mod pipeline;
pub mod processing;
pub mod rcnn;
pub mod utils;

pub use error::{AnchorTargetError, Result};
pub use pipeline::anchor_target::config::AnchorTargetConfig;
pub use pipeline::anchor_target::output::AnchorTargetOutput;
pub use pipeline::module::anchor_target::AnchorTargetLayer;
pub use processing::labels::Label;
pub use processing::sampler::IndexSampler;
pub use rcnn::anchors::ImageInfo;
pub use utils::utils::write_npy_outputs;
