//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags and
//! only the selected one is constructed.

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::OcrError;
use clap::ValueEnum;
use std::fmt;

/// Selectable OCR backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EngineKind {
    /// Tesseract (the `tesseract` binary must be on PATH)
    #[default]
    Tesseract,
    /// ocrs, pure Rust, English only
    Ocrs,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Ocrs => "ocrs",
        }
    }

    /// Whether this engine was compiled in
    pub fn is_available(&self) -> bool {
        match self {
            Self::Tesseract => cfg!(feature = "engine-tesseract"),
            Self::Ocrs => cfg!(feature = "engine-ocrs"),
        }
    }

    /// Construct the engine
    pub fn build(&self, config: &Config) -> Result<Box<dyn OcrEngine>, OcrError> {
        tracing::info!("Initializing {} engine...", self);

        match self {
            #[cfg(feature = "engine-tesseract")]
            Self::Tesseract => Ok(Box::new(tesseract::TesseractEngine::new(config)?)),
            #[cfg(feature = "engine-ocrs")]
            Self::Ocrs => Ok(Box::new(ocrs::OcrsEngine::new(config)?)),
            #[allow(unreachable_patterns)]
            other => {
                let _ = config;
                Err(OcrError::Initialization(format!(
                    "The {} engine is not available in this build. Available engines: {}",
                    other,
                    available().join(", ")
                )))
            }
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// List all compiled-in engine names
pub fn available() -> Vec<&'static str> {
    EngineKind::value_variants()
        .iter()
        .filter(|kind| kind.is_available())
        .map(|kind| kind.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_is_tesseract() {
        assert_eq!(EngineKind::default(), EngineKind::Tesseract);
        assert_eq!(EngineKind::Tesseract.to_string(), "tesseract");
    }

    #[test]
    fn test_available_matches_features() {
        let engines = available();
        assert_eq!(
            engines.contains(&"tesseract"),
            cfg!(feature = "engine-tesseract")
        );
        assert_eq!(engines.contains(&"ocrs"), cfg!(feature = "engine-ocrs"));
    }

    #[test]
    fn test_engine_kind_parses_from_cli_value() {
        assert_eq!(EngineKind::from_str("ocrs", true).unwrap(), EngineKind::Ocrs);
        assert!(EngineKind::from_str("paddle", true).is_err());
    }
}
