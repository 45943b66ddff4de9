use std::io::{Cursor, Read};

use common::{error::AppError, utils::collection_name::file_extension};
use quick_xml::{events::Event, Reader};

pub const DOCX_EXTENSION: &str = ".docx";

/// Fails with `UnsupportedFileType` unless the file is a Word document.
pub fn ensure_supported(file_name: &str) -> Result<(), AppError> {
    let extension = file_extension(file_name);
    if extension == DOCX_EXTENSION {
        Ok(())
    } else {
        Err(AppError::UnsupportedFileType(extension))
    }
}

/// Extracts the plain text of an uploaded document, dispatching on its extension.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    ensure_supported(file_name)?;
    let xml = read_document_xml(bytes)?;
    let paragraphs = parse_paragraphs(&xml)?;

    Ok(paragraphs.join("\n\n"))
}

fn read_document_xml(bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AppError::Processing(format!("Failed to open docx archive: {e}")))?;

    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::Processing(format!("Cannot find word/document.xml: {e}")))?;

    let mut xml = String::new();
    document.read_to_string(&mut xml)?;

    Ok(xml)
}

/// Paragraphs can nest (text boxes hold their own `w:p`), so open paragraphs form a stack.
/// A nested paragraph is emitted when it closes; the enclosing one keeps its text.
fn parse_paragraphs(xml: &str) -> Result<Vec<String>, AppError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:p" => open.push(String::new()),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if let Some(current) = open.last_mut() {
                    match e.name().as_ref() {
                        b"w:tab" => current.push('\t'),
                        b"w:br" | b"w:cr" => current.push('\n'),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(finished) = open.pop() {
                        let paragraph = finished.trim();
                        if !paragraph.is_empty() {
                            paragraphs.push(paragraph.to_string());
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| AppError::Processing(format!("Invalid docx text: {e}")))?;
                if let Some(current) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AppError::Processing(format!(
                    "Malformed document.xml at position {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Builds a minimal docx archive with one `w:p` per paragraph.
    pub(crate) fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .expect("start file");
            writer.write_all(xml.as_bytes()).expect("write xml");
            writer.finish().expect("finish zip");
        }
        cursor.into_inner()
    }

    #[test]
    fn test_extracts_paragraphs_in_order() {
        let bytes = docx_bytes(&["Cells are the unit of life.", "Mitosis &amp; meiosis"]);

        let text = extract_text("biology.docx", &bytes).expect("extract");

        assert_eq!(text, "Cells are the unit of life.\n\nMitosis & meiosis");
    }

    #[test]
    fn test_runs_are_concatenated_within_a_paragraph() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>World</w:t></w:r></w:p><w:p></w:p></w:body></w:document>"#;

        let paragraphs = parse_paragraphs(xml).expect("parse");

        assert_eq!(paragraphs, vec!["Hello World".to_string()]);
    }

    #[test]
    fn test_text_box_paragraph_keeps_enclosing_text() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>Before box.</w:t></w:r><w:r><w:txbxContent><w:p><w:r><w:t>Inside box.</w:t></w:r></w:p></w:txbxContent></w:r><w:r><w:t xml:space="preserve"> After box.</w:t></w:r></w:p><w:p><w:r><w:t>Next</w:t></w:r></w:p></w:body></w:document>"#;

        let paragraphs = parse_paragraphs(xml).expect("parse");

        assert_eq!(
            paragraphs,
            vec![
                "Inside box.".to_string(),
                "Before box. After box.".to_string(),
                "Next".to_string(),
            ]
        );
    }

    #[test]
    fn test_rejects_unsupported_extensions() {
        for name in ["notes.pdf", "notes.DOCX", "notes"] {
            let err = extract_text(name, b"irrelevant").expect_err("should reject");
            assert!(matches!(err, AppError::UnsupportedFileType(_)), "{name}");
        }

        let err = ensure_supported("slides.pptx").expect_err("should reject");
        assert_eq!(err.to_string(), "Unsupported file type: .pptx");
        assert!(ensure_supported("Lecture notes.docx").is_ok());
    }

    #[test]
    fn test_corrupt_archive_is_a_processing_error() {
        let err = extract_text("broken.docx", b"not a zip").expect_err("should fail");
        assert!(matches!(err, AppError::Processing(_)));
    }
}
