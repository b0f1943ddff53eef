//! Bounding-box overlays for characters, words and pattern matches

use crate::engine::{BoundingBox, CharBox, Word};
use crate::error::OcrError;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Words at or below this confidence are not boxed unless told otherwise
pub const DEFAULT_MIN_CONFIDENCE: f32 = 60.0;

const DEFAULT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const DEFAULT_THICKNESS: u32 = 2;

/// How boxes are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxStyle {
    pub color: Rgb<u8>,
    pub thickness: u32,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            thickness: DEFAULT_THICKNESS,
        }
    }
}

impl BoxStyle {
    pub fn new(color: Rgb<u8>, thickness: u32) -> Result<Self, OcrError> {
        if thickness == 0 {
            return Err(OcrError::InvalidRequest(
                "box thickness must be at least 1".to_string(),
            ));
        }
        Ok(Self { color, thickness })
    }
}

/// Parse `r,g,b` into a color
pub fn parse_color(s: &str) -> Result<Rgb<u8>, OcrError> {
    let channels = s
        .split(',')
        .map(|c| c.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| {
            OcrError::InvalidRequest(format!("color must be r,g,b with values 0-255, got '{}'", s))
        })?;

    match channels.as_slice() {
        [r, g, b] => Ok(Rgb([*r, *g, *b])),
        _ => Err(OcrError::InvalidRequest(format!(
            "color must have exactly three channels, got '{}'",
            s
        ))),
    }
}

/// What to put boxes around
#[derive(Debug, Clone)]
pub enum AnnotationKind {
    Characters,
    Words { min_confidence: f32 },
    Pattern { regex: Regex, min_confidence: f32 },
}

impl AnnotationKind {
    pub fn words(min_confidence: f32) -> Self {
        Self::Words { min_confidence }
    }

    /// Compile a pattern matched against the start of each word
    pub fn pattern(pattern: &str, min_confidence: f32) -> Result<Self, OcrError> {
        Ok(Self::Pattern {
            regex: Regex::new(pattern)?,
            min_confidence,
        })
    }

    /// Short label used in file names and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Characters => "character",
            Self::Words { .. } => "word",
            Self::Pattern { .. } => "pattern",
        }
    }

    pub fn needs_words(&self) -> bool {
        !matches!(self, Self::Characters)
    }

    /// Boxes for the words this annotation keeps
    pub fn select_words(&self, words: &[Word]) -> Vec<BoundingBox> {
        match self {
            Self::Characters => Vec::new(),
            Self::Words { min_confidence } => words
                .iter()
                .filter(|w| is_confident(w, *min_confidence))
                .map(|w| w.bbox)
                .collect(),
            Self::Pattern {
                regex,
                min_confidence,
            } => words
                .iter()
                .filter(|w| is_confident(w, *min_confidence))
                .filter(|w| matches_at_start(regex, &w.text))
                .map(|w| w.bbox)
                .collect(),
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Level names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxLevel {
    Chars,
    #[default]
    Words,
    Pattern,
}

impl FromStr for BoxLevel {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chars" | "char" | "characters" => Ok(Self::Chars),
            "words" | "word" => Ok(Self::Words),
            "pattern" => Ok(Self::Pattern),
            other => Err(OcrError::InvalidRequest(format!(
                "unknown box level '{}', expected chars, words or pattern",
                other
            ))),
        }
    }
}

/// Confidence is cut to a whole number first, so 60.9 does not pass 60
fn is_confident(word: &Word, min_confidence: f32) -> bool {
    word.confidence.trunc() > min_confidence
}

/// A match must begin at the first character; it may end anywhere.
/// Leftmost-first search finds a start-anchored match whenever one exists.
fn matches_at_start(regex: &Regex, text: &str) -> bool {
    regex.find(text).is_some_and(|m| m.start() == 0)
}

pub fn char_bboxes(chars: &[CharBox]) -> Vec<BoundingBox> {
    chars.iter().map(|c| c.bbox).collect()
}

/// Draw hollow rectangles, `thickness` pixels wide, growing inwards
pub fn draw_boxes(image: &DynamicImage, boxes: &[BoundingBox], style: &BoxStyle) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for bbox in boxes {
        for inset in 0..style.thickness {
            let width = bbox.width.saturating_sub(2 * inset);
            let height = bbox.height.saturating_sub(2 * inset);
            if width == 0 || height == 0 {
                break;
            }
            let rect = Rect::at(bbox.left + inset as i32, bbox.top + inset as i32)
                .of_size(width, height);
            draw_hollow_rect_mut(&mut canvas, rect, style.color);
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, confidence: f32, left: i32) -> Word {
        Word {
            text: text.to_string(),
            confidence,
            bbox: BoundingBox::new(left, 0, 10, 10),
        }
    }

    #[test]
    fn test_word_selection_is_strictly_above_confidence() {
        let words = vec![
            word("a", 60.0, 0),
            word("b", 60.93, 20),
            word("c", 61.0, 40),
            word("d", 95.0, 60),
            word("e", -1.0, 80),
        ];
        let boxes = AnnotationKind::words(60.0).select_words(&words);
        assert_eq!(boxes.iter().map(|b| b.left).collect::<Vec<_>>(), vec![40, 60]);
    }

    #[test]
    fn test_pattern_selection_truncates_confidence() {
        let words = vec![word("2024-01-05", 60.5, 0), word("2024-01-06", 61.2, 20)];
        let kind = AnnotationKind::pattern(r"\d{4}", 60.0).unwrap();
        let boxes = kind.select_words(&words);
        assert_eq!(boxes.iter().map(|b| b.left).collect::<Vec<_>>(), vec![20]);
    }

    #[test]
    fn test_pattern_matches_at_start_only() {
        let words = vec![
            word("2024-01-05", 90.0, 0),
            word("on2024-01-05", 90.0, 20),
            word("2024-13", 30.0, 40),
            word("2024-02-11,", 90.0, 60),
        ];
        let kind = AnnotationKind::pattern(r"\d{4}-\d{2}-\d{2}", 60.0).unwrap();
        let boxes = kind.select_words(&words);
        assert_eq!(boxes.iter().map(|b| b.left).collect::<Vec<_>>(), vec![0, 60]);
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = AnnotationKind::pattern("(unclosed", 60.0).unwrap_err();
        assert!(matches!(err, OcrError::InvalidPattern(_)));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("255, 0,10").unwrap(), Rgb([255, 0, 10]));
        assert!(parse_color("1,2").is_err());
        assert!(parse_color("1,2,300").is_err());
        assert!(parse_color("red").is_err());
    }

    #[test]
    fn test_box_level_parsing() {
        assert_eq!("chars".parse::<BoxLevel>().unwrap(), BoxLevel::Chars);
        assert_eq!("Word".parse::<BoxLevel>().unwrap(), BoxLevel::Words);
        assert!("lines".parse::<BoxLevel>().is_err());
    }

    #[test]
    fn test_zero_thickness_is_rejected() {
        assert!(BoxStyle::new(DEFAULT_COLOR, 0).is_err());
    }

    #[test]
    fn test_draw_boxes_outlines_inwards() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb([255, 255, 255])));
        let style = BoxStyle::new(Rgb([255, 0, 0]), 2).unwrap();
        let canvas = draw_boxes(&image, &[BoundingBox::new(2, 2, 10, 8)], &style);

        let red = Rgb([255, 0, 0]);
        let white = Rgb([255, 255, 255]);
        assert_eq!(*canvas.get_pixel(2, 2), red);
        assert_eq!(*canvas.get_pixel(3, 3), red);
        assert_eq!(*canvas.get_pixel(11, 9), red);
        assert_eq!(*canvas.get_pixel(6, 6), white);
        assert_eq!(*canvas.get_pixel(12, 2), white);
        assert_eq!(*canvas.get_pixel(1, 1), white);
    }

    #[test]
    fn test_draw_boxes_clips_at_image_edge() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let canvas = draw_boxes(
            &image,
            &[BoundingBox::new(-5, 5, 30, 30)],
            &BoxStyle::default(),
        );
        assert_eq!(canvas.dimensions(), (10, 10));
        assert_eq!(*canvas.get_pixel(0, 5), DEFAULT_COLOR);
    }
}
