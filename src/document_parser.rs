//! Document Parser (C4): turns an uploaded resume file into plain text,
//! behind a single `extract_text` entry point keyed on file extension.

use crate::error::{MatchError, MatchResult};
use std::path::Path;

pub fn extract_text_from_pdf(bytes: &[u8]) -> MatchResult<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| MatchError::Io(format!("failed to parse PDF: {}", e)))
}

pub fn extract_text_from_docx(bytes: &[u8]) -> MatchResult<String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| MatchError::Io(format!("failed to parse DOCX: {}", e)))?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(paragraph) => {
                for pchild in &paragraph.children {
                    if let docx_rs::ParagraphChild::Run(run) = pchild {
                        for rchild in &run.children {
                            match rchild {
                                docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                                docx_rs::RunChild::Tab(_) => text.push('\t'),
                                docx_rs::RunChild::Break(_) => text.push('\n'),
                                _ => {}
                            }
                        }
                    }
                }
                text.push('\n');
            }
            docx_rs::DocumentChild::Table(_) => text.push_str("\n[table]\n"),
            _ => {}
        }
    }
    Ok(text.trim().to_string())
}

pub fn extract_text_from_txt(bytes: &[u8]) -> MatchResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| MatchError::Io(format!("file is not valid UTF-8 text: {}", e)))
}

/// Dispatch on the file's extension. Any extension other than pdf/docx/doc/txt
/// fails with `MatchError::UnsupportedFormat` rather than guessing.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> MatchResult<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| MatchError::UnsupportedFormat(format!("{} has no extension", file_name)))?;

    match extension.as_str() {
        "pdf" => extract_text_from_pdf(bytes),
        "docx" | "doc" => extract_text_from_docx(bytes),
        "txt" => extract_text_from_txt(bytes),
        other => Err(MatchError::UnsupportedFormat(other.to_string())),
    }
}
