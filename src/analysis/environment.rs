use crate::error::{Error, Result};

/// Tokens the transcripts use as pause and overlap marks, not words.
const NON_WORDS: &[&str] = &["/", "…"];

/// Words immediately before and after the search phrase in one excerpt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordWindow {
    pub leading: Vec<String>,
    pub following: Vec<String>,
}

/// Cut `width` words on either side of the first occurrence of `phrase`.
///
/// Leading words are the ones closest to the phrase, still in reading
/// order. Fails with `NotFound` when the phrase is not in the text.
pub fn extract(text: &str, phrase: &str, width: usize) -> Result<WordWindow> {
    if phrase.is_empty() {
        return Err(Error::InvalidArgument(
            "cannot build a word window around an empty phrase".to_string(),
        ));
    }
    let (before, after) = text
        .split_once(phrase)
        .ok_or_else(|| Error::not_found("Phrase", phrase))?;

    let leading = words(before);
    let skip = leading.len().saturating_sub(width);
    let leading = leading.into_iter().skip(skip).collect();
    let following = words(after).into_iter().take(width).collect();

    Ok(WordWindow { leading, following })
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|w| !NON_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

// ── Tests ──
