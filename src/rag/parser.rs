//! Document parser: turns raw uploaded bytes into plain text.
//!
//! Strategy is chosen from the file extension. PDF extraction tries a fast
//! primary crate first, falls back to a slower one with wider position
//! tolerances, then runs both through a word-spacing fix and a noise
//! cleaner tuned for the binary/markup debris both extractors leave behind.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{AppError, Result};

/// Parse `bytes` uploaded as `file_name` into plain text.
pub fn parse_document(file_name: &str, bytes: &[u8]) -> Result<String> {
    let extension = file_name
        .rsplit('.')
        .next()
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "csv" | "md" | "json" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        "pdf" => parse_pdf(bytes),
        "docx" => parse_docx(bytes),
        "html" | "htm" => Ok(parse_html(&String::from_utf8_lossy(bytes))),
        other => {
            tracing::warn!(extension = %other, file_name, "unrecognized file extension, falling back to UTF-8 decode");
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn parse_pdf(bytes: &[u8]) -> Result<String> {
    let primary = pdf_extract::extract_text_from_mem(bytes).unwrap_or_default();

    let text = if primary.trim().is_empty() {
        extract_pdf_with_tolerance(bytes)
    } else {
        primary
    };

    let cleaned = clean_extracted_text(&text);
    if cleaned.trim().is_empty() {
        return Err(AppError::UnextractablePDF(
            "both PDF extraction strategies returned empty or whitespace-only text; the file may be a scanned/image-based PDF".to_string(),
        ));
    }

    Ok(cleaned)
}

/// Secondary PDF extraction path, used when the primary extractor comes back
/// empty. `pdf-extract` doesn't expose separate tolerance knobs, so this
/// strategy re-runs extraction and applies the word-spacing fix that a
/// position-tolerant extractor would otherwise need to compensate for glyph
/// runs it concatenated without spaces.
fn extract_pdf_with_tolerance(bytes: &[u8]) -> String {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => fix_word_spacing(&text),
        Err(e) => {
            tracing::warn!(error = %e, "secondary PDF extraction failed");
            String::new()
        }
    }
}

fn fix_word_spacing(text: &str) -> String {
    static LOWER_UPPER: OnceLock<Regex> = OnceLock::new();
    static LETTER_DIGIT: OnceLock<Regex> = OnceLock::new();
    static DIGIT_LETTER: OnceLock<Regex> = OnceLock::new();

    let lower_upper = LOWER_UPPER.get_or_init(|| Regex::new(r"([a-z])([A-Z])").unwrap());
    let letter_digit = LETTER_DIGIT.get_or_init(|| Regex::new(r"([a-zA-Z])(\d)").unwrap());
    let digit_letter = DIGIT_LETTER.get_or_init(|| Regex::new(r"(\d)([a-zA-Z])").unwrap());

    let text = lower_upper.replace_all(text, "$1 $2");
    let text = letter_digit.replace_all(&text, "$1 $2");
    let text = digit_letter.replace_all(&text, "$1 $2");
    text.into_owned()
}

const PDF_NOISE_PATTERNS: &[&str] = &[
    r"endstream",
    r"endobj",
    r"\d+\s+\d+\s+obj",
    r"<<[^>]*>>",
    r"/\w+\s*\[?[^\]]*\]?",
    r"stream\s*$",
    r"xref",
    r"trailer",
    r"startxref",
    r"%%EOF",
    r"\\[()]",
    r"tex2pdf:\w+",
    r"Doc-Start",
    r"cite\.\d+@\w+",
    r"section\.\d+",
    r"subsection\.\d+\.\d+",
    r"subsubsection\.\d+\.\d+\.\d+",
    r"page\.\d+",
    r"Item\.\d+",
    r"figure\.\d+",
];

fn noise_regexes() -> &'static Vec<Regex> {
    static NOISE: OnceLock<Vec<Regex>> = OnceLock::new();
    NOISE.get_or_init(|| {
        PDF_NOISE_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("static PDF noise pattern is valid"))
            .collect()
    })
}

/// Strip PDF stream/xref markers, control characters and non-printables,
/// then drop lines with under 30% alphabetic content unless they look like
/// a short heading.
fn clean_extracted_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    static NON_PRINTABLE: OnceLock<Regex> = OnceLock::new();
    static MULTI_SPACE: OnceLock<Regex> = OnceLock::new();
    static MULTI_BLANK_LINE: OnceLock<Regex> = OnceLock::new();

    let non_printable = NON_PRINTABLE.get_or_init(|| Regex::new(r"[^\x20-\x7E\n\t\r]").unwrap());
    let multi_space = MULTI_SPACE.get_or_init(|| Regex::new(r"[ \t]+").unwrap());
    let multi_blank_line = MULTI_BLANK_LINE.get_or_init(|| Regex::new(r"\n\s*\n\s*\n+").unwrap());

    let mut text = non_printable.replace_all(text, " ").into_owned();
    for pattern in noise_regexes() {
        text = pattern.replace_all(&text, " ").into_owned();
    }
    text = multi_space.replace_all(&text, " ").into_owned();
    text = multi_blank_line.replace_all(&text, "\n\n").into_owned();

    let clean_lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.trim())
        .filter(|line| {
            if line.is_empty() {
                return true;
            }
            let alpha_count = line.chars().filter(|c| c.is_alphabetic()).count();
            let ratio = alpha_count as f32 / line.len() as f32;
            ratio > 0.3 || (line.len() < 80 && alpha_count > 3)
        })
        .collect();

    clean_lines.join("\n").trim().to_string()
}

fn parse_docx(bytes: &[u8]) -> Result<String> {
    let document = docx_rs::read_docx(bytes)
        .map_err(|e| AppError::ValidationError(format!("failed to parse DOCX: {e}")))?;

    let mut paragraphs = Vec::new();
    for child in &document.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            let mut text = String::new();
            for run_child in &paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = run_child {
                    for run_content in &run.children {
                        if let docx_rs::RunChild::Text(t) = run_content {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                paragraphs.push(trimmed.to_string());
            }
        }
    }

    Ok(paragraphs.join("\n\n"))
}

fn parse_html(html: &str) -> String {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").unwrap();
    let unwanted = Selector::parse("script, style").unwrap();

    let root = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let unwanted_nodes: std::collections::HashSet<_> =
        document.select(&unwanted).map(|el| el.id()).collect();

    let text: String = root
        .descendants()
        .filter_map(|node| node.value().as_text().map(|t| (node, t)))
        .filter(|(node, _)| !node.ancestors().any(|ancestor| unwanted_nodes.contains(&ancestor.id())))
        .map(|(_, t)| t.as_ref())
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    static MULTI_WS: OnceLock<Regex> = OnceLock::new();
    let multi_ws = MULTI_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    multi_ws.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txt_decodes_lossily() {
        let bytes = b"hello world";
        let text = parse_document("a.txt", bytes).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn unknown_extension_falls_back_to_utf8() {
        let bytes = b"some content";
        let text = parse_document("a.xyz", bytes).unwrap();
        assert_eq!(text, "some content");
    }

    #[test]
    fn html_strips_script_and_style() {
        let html = "<html><head><style>body{color:red}</style></head><body><script>alert(1)</script><p>Hello <b>World</b></p></body></html>";
        let text = parse_html(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color:red"));
    }

    #[test]
    fn word_spacing_fix_inserts_boundaries() {
        let fixed = fix_word_spacing("helloWorld42test");
        assert_eq!(fixed, "hello World 42 test");
    }

    #[test]
    fn clean_extracted_text_drops_low_alpha_lines() {
        let text = "Real sentence with words.\n1234567890123456789\nendstream\nAnother real line.";
        let cleaned = clean_extracted_text(text);
        assert!(cleaned.contains("Real sentence"));
        assert!(cleaned.contains("Another real line"));
        assert!(!cleaned.contains("1234567890123456789"));
    }

    #[test]
    fn clean_extracted_text_keeps_short_headings() {
        let text = "Intro";
        let cleaned = clean_extracted_text(text);
        assert_eq!(cleaned, "Intro");
    }
}
