//! Text extraction from images and PDFs through an external OCR engine, with
//! bounding-box overlays and a configurable preprocessing pipeline.

pub mod annotate;
pub mod cli;
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod input;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod preprocessing;

pub use config::Config;
pub use engine::{EngineOptions, OcrEngine};
pub use error::OcrError;
pub use ocr::{Document, Extraction};
