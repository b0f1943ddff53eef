//! Image preprocessing module for OCR enhancement
//!
//! An ordered list of named steps, built from a preset or parsed from the
//! command line, run over each image before it reaches the engine.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, Preset, PreprocessingResult, StepTiming};
pub use steps::Step;
