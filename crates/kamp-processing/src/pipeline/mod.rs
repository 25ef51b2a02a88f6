//! Pipeline module.
//!
//! This module provides the main cleansing pipeline and its builder.

mod builder;

pub use builder::{CLEANSING_SEQUENCE, Pipeline, PipelineBuilder};
