//! Command line arguments

use crate::annotate::{self, AnnotationKind, BoxLevel, BoxStyle, DEFAULT_MIN_CONFIDENCE};
use crate::config::DEFAULT_TESSERACT_CONFIG;
use crate::engines::EngineKind;
use crate::error::OcrError;
use crate::output::OutputFormat;
use crate::pdf::DEFAULT_DPI;
use crate::preprocessing::{Pipeline, Preset};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ocr-extract")]
#[command(about = "Extract text from images and PDFs, and draw boxes around what OCR finds")]
#[command(version)]
pub struct Cli {
    /// OCR engine to use
    #[arg(
        long,
        global = true,
        env = "OCR_ENGINE",
        value_enum,
        default_value_t = EngineKind::default()
    )]
    pub engine: EngineKind,

    /// Language(s) for OCR, e.g. "eng" or "eng+deu"
    #[arg(short, long, global = true, env = "OCR_LANGUAGE", default_value = "eng")]
    pub lang: String,

    /// Tesseract config string
    #[arg(
        short,
        long,
        global = true,
        env = "OCR_CONFIG",
        default_value = DEFAULT_TESSERACT_CONFIG,
        allow_hyphen_values = true
    )]
    pub config: String,

    /// Path to tessdata directory
    #[arg(long, global = true, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<PathBuf>,

    /// Download missing traineddata files into the cache directory
    #[arg(long, global = true, env = "OCR_DOWNLOAD_TESSDATA")]
    pub download_tessdata: bool,

    /// Resolution PDF pages are rendered at
    #[arg(long, global = true, env = "OCR_PDF_DPI", default_value_t = DEFAULT_DPI)]
    pub pdf_dpi: f32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract text from an image or PDF
    Text(TextArgs),
    /// Draw boxes around characters, words or pattern matches
    Boxes(BoxesArgs),
    /// Detect page orientation and script
    Osd(OsdArgs),
    /// List the available preprocessing steps and presets
    Preprocesses,
    /// List the languages the engine can recognize
    Languages,
}

#[derive(Args, Debug)]
pub struct TextArgs {
    /// Image or PDF to read
    pub file: PathBuf,

    /// Write the text to a file instead of stdout
    #[arg(long)]
    pub save: bool,

    /// Format of the saved file
    #[arg(long, value_enum, default_value_t = OutputFormat::default())]
    pub format: OutputFormat,

    /// Directory the saved file goes into
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Saved file name without extension (img_output or pdf_output by default)
    #[arg(long)]
    pub output_name: Option<String>,

    /// Comma-separated preprocessing steps, e.g. "grayscale,threshold"
    #[arg(long, conflicts_with = "preset")]
    pub preprocess: Option<String>,

    /// Preprocessing preset
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Use the embedded text of born-digital PDFs instead of OCR
    #[arg(long)]
    pub pdf_text_layer: bool,

    /// Print the result as JSON
    #[arg(long, conflicts_with = "save")]
    pub json: bool,
}

impl TextArgs {
    pub fn pipeline(&self) -> Result<Pipeline, OcrError> {
        match (&self.preprocess, self.preset) {
            (Some(list), _) => Pipeline::parse(list),
            (None, Some(preset)) => Ok(Pipeline::from_preset(preset)),
            (None, None) => Ok(Pipeline::default()),
        }
    }
}

#[derive(Args, Debug)]
pub struct BoxesArgs {
    /// Image or PDF to annotate
    pub file: PathBuf,

    /// What to box: chars, words or pattern
    #[arg(long, default_value = "words")]
    pub level: BoxLevel,

    /// Regex a word must match from its first character (with --level pattern)
    #[arg(long)]
    pub pattern: Option<String>,

    /// Minimum word confidence; only words above it are boxed
    #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
    pub confidence: f32,

    /// Box color as r,g,b
    #[arg(long, default_value = "0,255,0")]
    pub color: String,

    /// Box line thickness in pixels
    #[arg(long, default_value_t = 2)]
    pub thickness: u32,

    /// Where to write the annotated image
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print a summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl BoxesArgs {
    pub fn annotation(&self) -> Result<AnnotationKind, OcrError> {
        match self.level {
            BoxLevel::Chars => Ok(AnnotationKind::Characters),
            BoxLevel::Words => Ok(AnnotationKind::words(self.confidence)),
            BoxLevel::Pattern => {
                let pattern = self.pattern.as_deref().ok_or_else(|| {
                    OcrError::InvalidRequest("--level pattern requires --pattern".to_string())
                })?;
                AnnotationKind::pattern(pattern, self.confidence)
            }
        }
    }

    pub fn style(&self) -> Result<BoxStyle, OcrError> {
        BoxStyle::new(annotate::parse_color(&self.color)?, self.thickness)
    }
}

#[derive(Args, Debug)]
pub struct OsdArgs {
    /// Image or PDF to inspect
    pub file: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::Step;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ocr-extract", "text", "scan.png"]).unwrap();
        assert_eq!(cli.lang, "eng");
        assert_eq!(cli.config, "--oem 3 --psm 6");
        assert_eq!(cli.pdf_dpi, 200.0);

        let Command::Text(args) = cli.command else {
            panic!("expected text command");
        };
        assert_eq!(args.format, OutputFormat::Txt);
        assert!(args.pipeline().unwrap().is_empty());
    }

    #[test]
    fn test_config_value_may_start_with_hyphen() {
        let cli =
            Cli::try_parse_from(["ocr-extract", "-c", "--psm 11", "osd", "scan.png"]).unwrap();
        assert_eq!(cli.config, "--psm 11");
    }

    #[test]
    fn test_preprocess_list_and_preset() {
        let cli = Cli::try_parse_from([
            "ocr-extract",
            "text",
            "scan.png",
            "--preprocess",
            "grayscale,threshold",
        ])
        .unwrap();
        let Command::Text(args) = cli.command else {
            panic!("expected text command");
        };
        assert_eq!(args.pipeline().unwrap().steps(), &[Step::Grayscale, Step::Threshold]);

        let conflict = Cli::try_parse_from([
            "ocr-extract",
            "text",
            "scan.png",
            "--preprocess",
            "grayscale",
            "--preset",
            "minimal",
        ]);
        assert!(conflict.is_err());
    }

    #[test]
    fn test_pattern_level_needs_pattern() {
        let cli = Cli::try_parse_from(["ocr-extract", "boxes", "scan.png", "--level", "pattern"])
            .unwrap();
        let Command::Boxes(args) = cli.command else {
            panic!("expected boxes command");
        };
        assert!(matches!(args.annotation(), Err(OcrError::InvalidRequest(_))));
        assert_eq!(args.style().unwrap(), BoxStyle::default());
    }

    #[test]
    fn test_json_conflicts_with_save() {
        let result =
            Cli::try_parse_from(["ocr-extract", "text", "scan.png", "--save", "--json"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );

        let cli = Cli::try_parse_from(["ocr-extract", "text", "scan.png", "--json"]).unwrap();
        let Command::Text(args) = cli.command else {
            panic!("expected text command");
        };
        assert!(args.json && !args.save);
    }
}
