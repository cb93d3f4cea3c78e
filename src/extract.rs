//! Document text extraction and chunking.
//!
//! Turns an uploaded blob into sanitized, fixed-size text chunks ready for
//! embedding. PDF decoding goes through `pdf-extract`; plain text and
//! markdown are read directly.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::ApiError;

/// Upper bound on a single chunk, in characters.
pub const CHUNK_LEN: usize = 8192;

/// Texts shorter than this skip the garbage heuristics entirely.
const MIN_CHECKED_LEN: usize = 400;
const MIN_SPACE_RATIO: f64 = 0.01;
const MAX_TOKEN_LEN: usize = 100;

const COMMON_WORDS: &[&str] = &[
    "the", "a", "an", "to", "of", "and", "in", "is", "it", "for", "on", "with",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
    Markdown,
}

impl FileKind {
    pub fn from_name(name: &str) -> Result<Self, ApiError> {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "txt" => Ok(FileKind::Text),
            "md" => Ok(FileKind::Markdown),
            _ => Err(ApiError::UnsupportedFileType(format!(
                "Unsupported file type for {name}"
            ))),
        }
    }
}

/// Extracts `filename`'s text and splits it into ordered chunks of at most
/// [`CHUNK_LEN`] characters. Chunk boundaries may fall mid-word; concatenating
/// the chunks reproduces the sanitized text exactly.
pub async fn extract(filename: &str, bytes: Vec<u8>) -> Result<Vec<String>, ApiError> {
    let kind = FileKind::from_name(filename)?;

    let raw = match kind {
        FileKind::Pdf => decode_pdf(filename, bytes).await?,
        FileKind::Text | FileKind::Markdown => String::from_utf8_lossy(&bytes).to_string(),
    };

    let text = sanitize(&raw);
    check_quality(filename, &text)?;
    Ok(split_chunks(&text, CHUNK_LEN))
}

async fn decode_pdf(filename: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
    let name = filename.to_string();
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|err| {
            ApiError::ExtractionQuality(format!("Could not extract text from {name}: {err}"))
        })
    })
    .await
    .map_err(ApiError::internal)?
}

/// Strips null bytes and non-printable control characters, then collapses
/// every whitespace run to a single space.
pub fn sanitize(raw: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    let printable: String = raw
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .filter(|c| *c != '\u{FFFD}')
        .collect();

    whitespace.replace_all(&printable, " ").trim().to_string()
}

/// Heuristic check for failed extraction (encrypted, scanned or corrupt
/// sources). Empty output always fails; longer texts additionally fail on a
/// near-zero space ratio, on the absence of every common short word, or on a
/// single token running past [`MAX_TOKEN_LEN`] characters.
fn check_quality(filename: &str, text: &str) -> Result<(), ApiError> {
    if text.is_empty() {
        return Err(ApiError::ExtractionQuality(format!(
            "No readable text extracted from {filename}"
        )));
    }

    let total = text.chars().count();
    if total < MIN_CHECKED_LEN {
        return Ok(());
    }

    let spaces = text.chars().filter(|c| *c == ' ').count();
    if (spaces as f64) / (total as f64) < MIN_SPACE_RATIO {
        return Err(ApiError::ExtractionQuality(format!(
            "Extracted text from {filename} has almost no spaces"
        )));
    }

    let lowered = format!(" {} ", text.to_lowercase());
    let has_common_word = COMMON_WORDS
        .iter()
        .any(|word| lowered.contains(&format!(" {word} ")));
    if !has_common_word {
        return Err(ApiError::ExtractionQuality(format!(
            "Extracted text from {filename} contains no common words"
        )));
    }

    if text
        .split_whitespace()
        .any(|token| token.chars().count() > MAX_TOKEN_LEN)
    {
        return Err(ApiError::ExtractionQuality(format!(
            "Extracted text from {filename} contains unbroken garbage tokens"
        )));
    }

    Ok(())
}

/// Fixed-size, order-preserving split on character count.
pub fn split_chunks(text: &str, max_len: usize) -> Vec<String> {
    if text.is_empty() || max_len == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_len)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_becomes_one_normalized_chunk() {
        let chunks = extract("notes.txt", b"the  cat\n\tsat".to_vec()).await.unwrap();
        assert_eq!(chunks, vec!["the cat sat".to_string()]);
    }

    #[tokio::test]
    async fn unknown_extension_is_rejected() {
        let err = extract("photo.png", vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedFileType(_)));
    }

    #[tokio::test]
    async fn empty_file_fails_quality_check() {
        let err = extract("empty.txt", Vec::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::ExtractionQuality(_)));
    }

    #[test]
    fn chunks_concatenate_back_to_the_sanitized_text() {
        let text = sanitize(&"the quick brown fox jumps over the lazy dog ".repeat(400));
        let chunks = split_chunks(&text, CHUNK_LEN);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_LEN));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn sanitize_strips_nulls_and_collapses_whitespace() {
        assert_eq!(sanitize("a\0b\r\n  c\t\td"), "ab c d");
        assert_eq!(sanitize("   "), "");
    }

    #[test]
    fn spaceless_garbage_is_flagged() {
        let garbage = "x".repeat(1000);
        let err = check_quality("scan.pdf", &garbage).unwrap_err();
        assert!(matches!(err, ApiError::ExtractionQuality(_)));
    }

    #[test]
    fn text_without_common_words_is_flagged() {
        let garbage = "zzq wvx kjh ".repeat(100);
        let err = check_quality("scan.pdf", garbage.trim()).unwrap_err();
        assert!(matches!(err, ApiError::ExtractionQuality(_)));
    }

    #[test]
    fn overlong_token_is_flagged() {
        let token = "b".repeat(150);
        let text = format!("the word of the day is {token} ").repeat(20);
        let err = check_quality("scan.pdf", text.trim()).unwrap_err();
        assert!(matches!(err, ApiError::ExtractionQuality(_)));
    }

    #[test]
    fn short_clean_text_passes() {
        assert!(check_quality("notes.txt", "the cat sat").is_ok());
    }
}
