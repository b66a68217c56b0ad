pub mod bbox_regression;
pub mod bbox_transform;
pub mod generate_anchors;
pub mod labels;
pub mod sampler;
