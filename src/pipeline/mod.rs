pub mod anchor_target;
pub mod module;
