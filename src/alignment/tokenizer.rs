/*!
 * Whitespace-preserving word segmentation.
 *
 * Every word keeps the whitespace that follows it, so joining the words gives back
 * the input byte for byte. Whitespace at the very start of the text has no word to
 * attach to and becomes a token of its own.
 *
 * Only space, tab, CR and LF separate words. A no-break space (as in French
 * `Sénat :`) keeps its neighbours together.
 */

/// Word separator characters
pub fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

/// A word of a paragraph together with its byte span in that paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Word text including its trailing whitespace
    pub text: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character (trailing whitespace included)
    pub end: usize,
}

impl Word {
    /// The word without surrounding whitespace
    pub fn content(&self) -> &str {
        self.text.trim_matches(is_separator)
    }

    /// Whether the token is only whitespace
    pub fn is_blank(&self) -> bool {
        self.content().is_empty()
    }
}

/// Split text into words, attaching trailing whitespace to the preceding word
pub fn tokenize(text: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut start = 0;
    let mut in_trailing_space = false;

    for (idx, ch) in text.char_indices() {
        if is_separator(ch) {
            in_trailing_space = true;
        } else if in_trailing_space {
            // A new word begins: close the previous token with its whitespace
            if idx > start {
                words.push(make_word(text, start, idx));
            }
            start = idx;
            in_trailing_space = false;
        }
    }

    if start < text.len() {
        words.push(make_word(text, start, text.len()));
    }

    words
}

fn make_word(text: &str, start: usize, end: usize) -> Word {
    Word {
        text: text[start..end].to_string(),
        start,
        end,
    }
}
