pub mod anchor_target;
