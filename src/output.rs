//! Writing results to disk

use crate::error::OcrError;
use crate::ocr::{AnnotatedPage, Extraction, PAGE_SEPARATOR};
use clap::ValueEnum;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use unicode_general_category::{get_general_category, GeneralCategory};

/// File formats text can be saved as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Txt,
    Docx,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Docx => "docx",
        }
    }
}

/// Where and how to save an extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub format: OutputFormat,
    pub directory: PathBuf,
    /// File name without extension
    pub file_name: String,
}

impl SaveOptions {
    pub fn new(format: OutputFormat, file_name: impl Into<String>) -> Self {
        Self {
            format,
            directory: PathBuf::from("."),
            file_name: file_name.into(),
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Full path of the output file. A missing directory falls back to the
    /// current one.
    pub fn target_path(&self) -> PathBuf {
        let directory = if self.directory.is_dir() {
            self.directory.as_path()
        } else {
            tracing::warn!(
                "Output directory {} does not exist, saving in the current directory",
                self.directory.display()
            );
            Path::new(".")
        };

        directory.join(format!("{}.{}", self.file_name, self.format.extension()))
    }
}

/// Save an extraction and return the path written
pub fn save(extraction: &Extraction, options: &SaveOptions) -> Result<PathBuf, OcrError> {
    let path = options.target_path();

    match options.format {
        OutputFormat::Txt => write_txt(extraction, &path)?,
        OutputFormat::Docx => write_docx(extraction, &path)?,
    }

    tracing::info!("Saved {} page(s) to {}", extraction.pages.len(), path.display());
    Ok(path)
}

fn write_txt(extraction: &Extraction, path: &Path) -> Result<(), OcrError> {
    let mut writer = BufWriter::new(File::create(path)?);

    for (index, page) in extraction.pages.iter().enumerate() {
        if index > 0 {
            write!(writer, "{}", PAGE_SEPARATOR)?;
        }
        writeln!(writer, "{}", page.text)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_docx(extraction: &Extraction, path: &Path) -> Result<(), OcrError> {
    let multi_page = extraction.is_multi_page();
    let mut docx = Docx::new();

    for page in &extraction.pages {
        for line in page.text.lines() {
            let text = remove_control_characters(line);
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)));
        }
        if multi_page {
            docx = docx
                .add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
        }
    }

    let file = File::create(path)?;
    docx.build()
        .pack(file)
        .map_err(|e| OcrError::Processing(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(())
}

/// Drop characters in the Unicode "Other" categories: controls, format
/// characters, surrogates, private use and unassigned code points. Word
/// rejects most of them inside a run.
pub fn remove_control_characters(s: &str) -> String {
    s.chars().filter(|c| !is_other(*c)).collect()
}

fn is_other(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
    )
}

/// Path for the annotated image of one page.
///
/// With no explicit output the image lands next to the working directory as
/// `<stem>_<label>_boxes.png`. Multi-page documents get `_p<N>` before the
/// extension, also when an explicit output path is given.
pub fn annotation_path(
    source: &Path,
    label: &str,
    explicit: Option<&Path>,
    page: usize,
    multi_page: bool,
) -> PathBuf {
    let base = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            PathBuf::from(format!("{}_{}_boxes.png", stem, label))
        }
    };

    if !multi_page {
        return base;
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    base.with_file_name(format!("{}_p{}.{}", stem, page, extension))
}

/// Write annotated pages and return the paths, in page order
pub fn save_annotated(
    pages: &[AnnotatedPage],
    source: &Path,
    label: &str,
    explicit: Option<&Path>,
) -> Result<Vec<PathBuf>, OcrError> {
    let multi_page = pages.len() > 1;

    pages
        .iter()
        .map(|page| {
            let path = annotation_path(source, label, explicit, page.page, multi_page);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            page.image.save(&path).map_err(|e| {
                OcrError::Processing(format!("Failed to save {}: {}", path.display(), e))
            })?;
            tracing::info!(
                "Saved page {} with {} box(es) to {}",
                page.page,
                page.boxes,
                path.display()
            );
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::PageText;
    use image::{Rgb, RgbImage};
    use std::io::Read;

    fn extraction(pages: &[&str]) -> Extraction {
        Extraction {
            source: PathBuf::from("book.pdf"),
            kind: "pdf".to_string(),
            pages: pages
                .iter()
                .enumerate()
                .map(|(i, text)| PageText {
                    number: i + 1,
                    text: text.to_string(),
                })
                .collect(),
            processing_time_ms: 0,
        }
    }

    #[test]
    fn test_save_txt_separates_pages() {
        let dir = tempfile::tempdir().unwrap();
        let options = SaveOptions::new(OutputFormat::Txt, "pdf_output").with_directory(dir.path());

        let path = save(&extraction(&["first page", "second page"]), &options).unwrap();

        assert_eq!(path, dir.path().join("pdf_output.txt"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "first page\n\u{c}second page\n"
        );
    }

    fn document_xml(path: &Path) -> String {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    fn paragraph_count(xml: &str) -> usize {
        xml.matches("<w:p ").count() + xml.matches("<w:p>").count()
    }

    #[test]
    fn test_save_docx_one_paragraph_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let options = SaveOptions::new(OutputFormat::Docx, "img_output").with_directory(dir.path());

        let path = save(&extraction(&["Line one\nLine\u{200B} two\u{7}"]), &options).unwrap();

        assert_eq!(path, dir.path().join("img_output.docx"));
        let xml = document_xml(&path);
        assert_eq!(paragraph_count(&xml), 2);
        assert_eq!(xml.matches("w:type=\"page\"").count(), 0);
        assert!(xml.contains("Line one"));
        assert!(xml.contains("Line two"));
        assert!(!xml.contains('\u{200B}'));
        assert!(!xml.contains('\u{7}'));
    }

    #[test]
    fn test_save_docx_breaks_after_each_page() {
        let dir = tempfile::tempdir().unwrap();
        let options = SaveOptions::new(OutputFormat::Docx, "pdf_output").with_directory(dir.path());

        let path = save(&extraction(&["a\nb", "c"]), &options).unwrap();

        let xml = document_xml(&path);
        // Three text lines plus one break paragraph per page
        assert_eq!(paragraph_count(&xml), 5);
        assert_eq!(xml.matches("w:type=\"page\"").count(), 2);
    }

    #[test]
    fn test_missing_directory_falls_back_to_current() {
        let options = SaveOptions::new(OutputFormat::Txt, "out")
            .with_directory("/definitely/not/a/directory");
        assert_eq!(options.target_path(), Path::new(".").join("out.txt"));
    }

    #[test]
    fn test_remove_control_characters() {
        assert_eq!(
            remove_control_characters("a\u{0}b\tc\u{FEFF}d\u{AD}e\u{E000}f é"),
            "abcdef é"
        );
    }

    #[test]
    fn test_remove_format_and_unassigned_characters() {
        for c in ['\u{0890}', '\u{0891}', '\u{0378}', '\u{FFFE}', '\u{FFFF}'] {
            assert_eq!(remove_control_characters(&format!("a{}b", c)), "ab", "{:?}", c);
        }
        assert_eq!(remove_control_characters("Straße 12"), "Straße 12");
    }

    #[test]
    fn test_annotation_path_defaults() {
        let source = Path::new("/scans/receipt.jpg");
        assert_eq!(
            annotation_path(source, "word", None, 1, false),
            PathBuf::from("receipt_word_boxes.png")
        );
        assert_eq!(
            annotation_path(source, "pattern", None, 3, true),
            PathBuf::from("receipt_pattern_boxes_p3.png")
        );
        assert_eq!(
            annotation_path(source, "word", Some(Path::new("out/boxes.jpg")), 2, true),
            PathBuf::from("out/boxes_p2.jpg")
        );
    }

    #[test]
    fn test_save_annotated_writes_each_page() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("boxes.png");
        let pages: Vec<_> = (1..=2)
            .map(|page| AnnotatedPage {
                page,
                boxes: 0,
                image: RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])),
            })
            .collect();

        let paths = save_annotated(&pages, Path::new("book.pdf"), "word", Some(&explicit)).unwrap();

        assert_eq!(
            paths,
            vec![dir.path().join("boxes_p1.png"), dir.path().join("boxes_p2.png")]
        );
        assert!(paths.iter().all(|p| p.is_file()));
    }
}
