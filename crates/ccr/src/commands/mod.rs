//! Output stages of the pipeline

pub mod export;
pub mod render;
