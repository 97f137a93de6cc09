//! Quote-aware scanning of a raw command line.
//!
//! One state machine drives both the marker search used by the parser and
//! the word splitting used for each stage, so the two always agree on what
//! is quoted. A `"` opens a quoted span only where a word may start (after
//! whitespace, after a marker, or at the start of the text); inside a word
//! it is an ordinary character. Quoted spans have no escapes and end at the
//! next `"`, which also ends the word.

use crate::errors::SyntaxError;

/// Characters that split a line into pipeline stages and redirections.
pub const MARKERS: [char; 3] = ['|', '<', '>'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Between,
    Word,
    Quoted,
}

/// Walk `text`, calling `visit(byte_offset, ch, quoted)` for every character
/// other than the quote characters themselves. Returns `true` when the text
/// ends inside an open quote.
fn scan(text: &str, mut visit: impl FnMut(usize, char, bool)) -> bool {
    let mut state = State::Between;

    for (i, c) in text.char_indices() {
        state = match (state, c) {
            (State::Quoted, '"') => State::Between,
            (State::Quoted, _) => {
                visit(i, c, true);
                State::Quoted
            }
            (State::Between, '"') => State::Quoted,
            (_, c) if c.is_whitespace() => State::Between,
            (_, c) if MARKERS.contains(&c) => {
                visit(i, c, false);
                State::Between
            }
            (_, c) => {
                visit(i, c, false);
                State::Word
            }
        };
    }

    state == State::Quoted
}

/// Byte offsets of every unquoted occurrence of `marker`.
pub fn unquoted_positions(text: &str, marker: char) -> Vec<usize> {
    let mut found = Vec::new();
    scan(text, |i, c, quoted| {
        if !quoted && c == marker {
            found.push(i);
        }
    });
    found
}

/// Whether `text` leaves a double quote open at its end.
pub fn has_open_quote(text: &str) -> bool {
    scan(text, |_, _, _| {})
}

/// Split on every unquoted `separator`, keeping the pieces untrimmed.
pub fn split_unquoted(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for i in unquoted_positions(text, separator) {
        pieces.push(&text[start..i]);
        start = i + separator.len_utf8();
    }
    pieces.push(&text[start..]);
    pieces
}

/// Words of `text`, plus the byte offset just past the first word (or the
/// text length when there is none). An unterminated quote runs to the end
/// of the text; callers that care check [`has_open_quote`] first.
///
/// With `split_at_markers` an unquoted marker ends the current word and
/// forms a word of its own; without it, markers are word characters.
fn words(text: &str, split_at_markers: bool) -> (Vec<String>, usize) {
    let mut words = Vec::new();
    let mut current: Option<String> = None;
    let mut first_end = None;
    let mut state = State::Between;

    let mut finish = |current: &mut Option<String>, end: usize, words: &mut Vec<String>| {
        if let Some(word) = current.take() {
            words.push(word);
            first_end.get_or_insert(end);
        }
    };

    for (i, c) in text.char_indices() {
        state = match (state, c) {
            (State::Quoted, '"') => {
                finish(&mut current, i + 1, &mut words);
                State::Between
            }
            (State::Quoted, _) => {
                current.get_or_insert_with(String::new).push(c);
                State::Quoted
            }
            (State::Between, '"') => {
                // Right after a marker inside a word, the quoted span joins it.
                current.get_or_insert_with(String::new);
                State::Quoted
            }
            (_, c) if c.is_whitespace() => {
                finish(&mut current, i, &mut words);
                State::Between
            }
            (_, c) if MARKERS.contains(&c) => {
                if split_at_markers {
                    finish(&mut current, i, &mut words);
                    current = Some(c.to_string());
                    finish(&mut current, i + c.len_utf8(), &mut words);
                } else {
                    current.get_or_insert_with(String::new).push(c);
                }
                State::Between
            }
            (_, c) => {
                current.get_or_insert_with(String::new).push(c);
                State::Word
            }
        };
    }
    finish(&mut current, text.len(), &mut words);

    (words, first_end.unwrap_or(text.len()))
}

/// Words of a redirection's tail, where a marker also ends the target.
/// Returns the byte offset just past the first word too.
pub(crate) fn target_words(text: &str) -> (Vec<String>, usize) {
    words(text, true)
}

/// Argument words of one stage, ignoring any open quote.
pub(crate) fn stage_words(text: &str) -> Vec<String> {
    words(text, false).0
}

/// Split `text` into argument tokens.
///
/// A token is a maximal run of non-whitespace characters, or the contents
/// of a double-quoted span with the quotes removed. Markers left in the
/// text (a second `>`, say) are ordinary characters here.
pub fn tokenize(text: &str) -> Result<Vec<String>, SyntaxError> {
    if has_open_quote(text) {
        return Err(SyntaxError::UnterminatedQuote);
    }
    Ok(stage_words(text))
}
