pub mod clip;
pub mod clip_store;
