use crate::cli::Cli;
use crate::engines::EngineKind;
use crate::error::OcrError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Config string used when none is given on the command line
pub const DEFAULT_TESSERACT_CONFIG: &str = "--oem 3 --psm 6";

/// Parsed form of a tesseract command line config such as `--oem 3 --psm 6`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TesseractConfig {
    pub oem: Option<u8>,
    pub psm: Option<u8>,
    pub dpi: Option<u32>,
    pub language: Option<String>,
    pub variables: BTreeMap<String, String>,
}

impl TesseractConfig {
    pub fn parse(input: &str) -> Result<Self, OcrError> {
        let mut config = Self::default();
        let mut tokens = input.split_whitespace();

        while let Some(token) = tokens.next() {
            match token {
                "--oem" => {
                    let oem = parse_number::<u8>("--oem", tokens.next())?;
                    if oem > 3 {
                        return Err(OcrError::InvalidConfig(format!(
                            "--oem must be between 0 and 3, got {}",
                            oem
                        )));
                    }
                    config.oem = Some(oem);
                }
                "--psm" => {
                    let psm = parse_number::<u8>("--psm", tokens.next())?;
                    if psm > 13 {
                        return Err(OcrError::InvalidConfig(format!(
                            "--psm must be between 0 and 13, got {}",
                            psm
                        )));
                    }
                    config.psm = Some(psm);
                }
                "--dpi" => {
                    config.dpi = Some(parse_number::<u32>("--dpi", tokens.next())?);
                }
                "-l" => {
                    let lang = tokens.next().ok_or_else(|| {
                        OcrError::InvalidConfig("-l expects a language".to_string())
                    })?;
                    config.language = Some(lang.to_string());
                }
                "-c" => {
                    let pair = tokens.next().ok_or_else(|| {
                        OcrError::InvalidConfig("-c expects name=value".to_string())
                    })?;
                    let (name, value) = pair
                        .split_once('=')
                        .filter(|(name, _)| !name.is_empty())
                        .ok_or_else(|| {
                            OcrError::InvalidConfig(format!(
                                "-c expects name=value, got '{}'",
                                pair
                            ))
                        })?;
                    config.variables.insert(name.to_string(), value.to_string());
                }
                other => {
                    return Err(OcrError::InvalidConfig(format!(
                        "unrecognized option '{}'",
                        other
                    )));
                }
            }
        }

        Ok(config)
    }
}

fn parse_number<T: FromStr>(flag: &str, value: Option<&str>) -> Result<T, OcrError> {
    let value =
        value.ok_or_else(|| OcrError::InvalidConfig(format!("{} expects a number", flag)))?;
    value
        .parse()
        .map_err(|_| OcrError::InvalidConfig(format!("{} expects a number, got '{}'", flag, value)))
}

impl FromStr for TesseractConfig {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TesseractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(oem) = self.oem {
            parts.push(format!("--oem {}", oem));
        }
        if let Some(psm) = self.psm {
            parts.push(format!("--psm {}", psm));
        }
        if let Some(dpi) = self.dpi {
            parts.push(format!("--dpi {}", dpi));
        }
        if let Some(lang) = &self.language {
            parts.push(format!("-l {}", lang));
        }
        for (name, value) in &self.variables {
            parts.push(format!("-c {}={}", name, value));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Runtime configuration shared by every subcommand
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineKind,
    pub language: String,
    pub tesseract: TesseractConfig,
    pub tessdata_path: Option<PathBuf>,
    pub download_tessdata: bool,
    pub pdf_dpi: f32,
}

impl Config {
    /// Language passed to the engine; `-l` inside the config string wins
    pub fn effective_language(&self) -> &str {
        self.tesseract.language.as_deref().unwrap_or(&self.language)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            language: "eng".to_string(),
            tesseract: TesseractConfig {
                oem: Some(3),
                psm: Some(6),
                ..TesseractConfig::default()
            },
            tessdata_path: None,
            download_tessdata: false,
            pdf_dpi: crate::pdf::DEFAULT_DPI,
        }
    }
}

impl TryFrom<&Cli> for Config {
    type Error = OcrError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        if !(cli.pdf_dpi.is_finite() && cli.pdf_dpi > 0.0) {
            return Err(OcrError::InvalidRequest(format!(
                "--pdf-dpi must be positive, got {}",
                cli.pdf_dpi
            )));
        }

        Ok(Self {
            engine: cli.engine,
            language: cli.lang.clone(),
            tesseract: TesseractConfig::parse(&cli.config)?,
            tessdata_path: cli.tessdata_path.clone(),
            download_tessdata: cli.download_tessdata,
            pdf_dpi: cli.pdf_dpi,
        })
    }
}
