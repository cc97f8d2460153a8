//! Text preparation for synthesis — chunking long documents and deriving
//! fallback titles.
//!
//! The remote synthesis endpoint accepts only a few thousand characters per
//! call. Long documents are split into chunks at sentence or word
//! boundaries; the PCM results are concatenated afterwards, so a cut that
//! lands mid-word would be audible.

/// Maximum character length per synthesis request.
pub const MAX_CHUNK_CHARS: usize = 4_000;

/// Maximum length of a derived fallback title.
const TITLE_MAX_CHARS: usize = 48;

/// Split text into chunks of at most [`MAX_CHUNK_CHARS`] characters,
/// preferring to cut just after the last sentence end or space before the
/// limit so words survive intact.
#[must_use]
pub fn chunk_text(text: &str) -> Vec<String> {
    chunk_with_limit(text, MAX_CHUNK_CHARS)
}

pub(crate) fn chunk_with_limit(text: &str, max_chars: usize) -> Vec<String> {
    let mut rest = text.trim();
    let mut chunks = Vec::new();

    while !rest.is_empty() {
        let limit = match rest.char_indices().nth(max_chars) {
            Some((byte_index, _)) => byte_index,
            None => {
                chunks.push(rest.to_string());
                break;
            }
        };

        // Cut after the last '.' or ' ' inside the window; both are ASCII,
        // so `index + 1` is always a character boundary.
        let window = &rest[..limit];
        let cut = window.rfind(['.', ' ']).map_or(limit, |i| i + 1);

        let chunk = window[..cut].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    chunks
}

/// Derive a short display title from the opening of a text.
///
/// Takes the first line up to the first sentence end, then caps the result
/// at a word boundary. Used when remote title inference fails or when a
/// plain-text submission arrives untitled.
#[must_use]
pub fn derive_title(text: &str) -> String {
    let first_line = text.trim().lines().next().unwrap_or_default();
    let sentence = first_line
        .split_once(['.', '!', '?'])
        .map_or(first_line, |(head, _)| head)
        .trim();

    if sentence.is_empty() {
        return "Untitled".to_string();
    }
    if sentence.chars().count() <= TITLE_MAX_CHARS {
        return sentence.to_string();
    }

    let mut title = String::new();
    for word in sentence.split_whitespace() {
        if !title.is_empty() && title.chars().count() + word.chars().count() + 1 > TITLE_MAX_CHARS {
            break;
        }
        if !title.is_empty() {
            title.push(' ');
        }
        title.push_str(word);
    }
    if title.is_empty() {
        // A single word longer than the cap.
        title = sentence.chars().take(TITLE_MAX_CHARS).collect();
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("Hello world.");
        assert_eq!(chunks, vec!["Hello world.".to_string()]);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(chunk_text("").is_empty());
        assert!(chunk_text("   \n ").is_empty());
    }

    #[test]
    fn long_text_splits_at_sentence_boundaries() {
        let text = "One sentence here. Another sentence there. And a third one.";
        let chunks = chunk_with_limit(text, 25);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0], "One sentence here.");
        // Nothing is lost across the cuts.
        let rejoined = chunks.join(" ");
        assert!(rejoined.contains("Another sentence there."));
        assert!(rejoined.ends_with("And a third one."));
    }

    #[test]
    fn words_are_never_cut_in_half() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        for chunk in chunk_with_limit(text, 10) {
            for word in chunk.split_whitespace() {
                assert!(text.split_whitespace().any(|w| w == word), "broken word: {word}");
            }
        }
    }

    #[test]
    fn unbroken_text_is_cut_at_the_hard_limit() {
        let text = "x".repeat(25);
        let chunks = chunk_with_limit(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn multibyte_text_is_chunked_on_character_boundaries() {
        let text = "código análisis síntesis ".repeat(20);
        for chunk in chunk_with_limit(&text, 30) {
            assert!(chunk.chars().count() <= 30);
        }
    }

    #[test]
    fn derived_title_is_the_first_sentence() {
        assert_eq!(derive_title("Call me Ishmael. Some years ago."), "Call me Ishmael");
        assert_eq!(derive_title(""), "Untitled");
    }

    #[test]
    fn derived_title_is_capped_at_a_word_boundary() {
        let text = "a very long opening line that keeps going well past the cap without any sentence end";
        let title = derive_title(text);
        assert!(title.chars().count() <= 48);
        assert!(text.starts_with(&title));
    }
}
