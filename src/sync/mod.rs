//! Propagate corrected text into OCR token streams.
//!
//! The synchronizer never rewrites positional or confidence data. Every
//! difference between the current text of a paragraph's blocks and its
//! corrected text is recorded in place as an `EditStart{original}` / `EditEnd`
//! pair around the replacement text, so the original OCR content can always be
//! reconstructed from the same tokens.

mod diff;

pub use diff::{diff, OpTag, Opcode};

use std::ops::Range;

use crate::error::{Error, Result};
use crate::model::{current_text, MarkKind, Token};

/// Corrected paragraph text plus the inline markers it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphContent {
    /// Paragraph text
    pub text: String,

    /// Inline markers, as character ranges of `text`
    pub marks: Vec<InlineMark>,
}

impl ParagraphContent {
    /// Create content without markers.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Add a marker over a character range.
    pub fn with_mark(mut self, kind: MarkKind, range: Range<usize>) -> Self {
        self.marks.push(InlineMark { kind, range });
        self
    }
}

/// A canonical inline marker over a character range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMark {
    pub kind: MarkKind,
    pub range: Range<usize>,
}

/// Summary of the changes applied by one synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of edit pairs inserted
    pub edits: usize,

    /// Characters of corrected text added
    pub chars_inserted: usize,

    /// Characters of OCR text replaced or removed
    pub chars_deleted: usize,

    /// Number of inline markers placed
    pub marks: usize,
}

impl SyncReport {
    /// Check if nothing changed.
    pub fn is_noop(&self) -> bool {
        self.edits == 0 && self.marks == 0
    }
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Position of one character of the concatenated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CharPos {
    block: usize,
    token: usize,
    offset: usize,
}

/// Concatenated current text of `blocks` and the position of every character.
fn char_index(blocks: &[Vec<Token>]) -> (Vec<char>, Vec<CharPos>) {
    let mut chars = Vec::new();
    let mut index = Vec::new();
    for (block, tokens) in blocks.iter().enumerate() {
        for (token, t) in tokens.iter().enumerate() {
            if let Token::Text(text) = t {
                for (offset, c) in text.chars().enumerate() {
                    chars.push(c);
                    index.push(CharPos {
                        block,
                        token,
                        offset,
                    });
                }
            }
        }
    }
    (chars, index)
}

/// Replace the text token at `at` with `before`, `middle` and `after`, where
/// `before`/`after` are the token's characters outside `cut`.
fn splice_text(tokens: &mut Vec<Token>, at: usize, cut: Range<usize>, middle: Vec<Token>) {
    let Some(Token::Text(text)) = tokens.get(at) else {
        return;
    };
    let chars: Vec<char> = text.chars().collect();
    let before: String = chars[..cut.start].iter().collect();
    let after: String = chars[cut.end..].iter().collect();

    let mut replacement = Vec::with_capacity(middle.len() + 2);
    if !before.is_empty() {
        replacement.push(Token::Text(before));
    }
    replacement.extend(middle);
    if !after.is_empty() {
        replacement.push(Token::Text(after));
    }
    tokens.splice(at..at + 1, replacement);
}

fn edit_tokens(original: String, replacement: Option<String>) -> Vec<Token> {
    let mut tokens = vec![Token::EditStart { original }];
    if let Some(text) = replacement.filter(|t| !t.is_empty()) {
        tokens.push(Token::Text(text));
    }
    tokens.push(Token::EditEnd);
    tokens
}

/// Bring the current text of `blocks` in line with `new_text`.
///
/// The blocks are treated as one paragraph, in order. Fails with
/// [`Error::UnsupportedEdit`] when the word count differs, leaving the blocks
/// untouched.
pub fn sync(blocks: &mut [Vec<Token>], new_text: &str) -> Result<SyncReport> {
    let (old, index) = char_index(blocks);
    let new: Vec<char> = new_text.chars().collect();
    let mut report = SyncReport::default();

    if old == new {
        return Ok(report);
    }

    let old_text: String = old.iter().collect();
    let (old_words, new_words) = (word_count(&old_text), word_count(new_text));
    if old_words != new_words {
        return Err(Error::UnsupportedEdit(format!(
            "word count changes from {} to {}",
            old_words, new_words
        )));
    }
    if old.is_empty() && blocks.is_empty() {
        // Formatting whitespace around an illustration
        if new_text.trim().is_empty() {
            return Ok(report);
        }
        return Err(Error::UnsupportedEdit(
            "no block to hold the corrected text".to_string(),
        ));
    }

    let ops = diff(&old, &new);
    for op in ops.iter().rev().filter(|op| op.tag != OpTag::Equal) {
        let replacement: String = new[op.new.clone()].iter().collect();
        report.chars_inserted += op.new.len();
        report.chars_deleted += op.old.len();

        if op.old.is_empty() {
            insert_text(blocks, &index, op.old.start, replacement);
            report.edits += 1;
            continue;
        }

        let fragments = fragments(&index, op.old.clone());
        report.edits += fragments.len();
        for (i, (block, token, cut)) in fragments.into_iter().enumerate().rev() {
            let tokens = &mut blocks[block];
            let original = match &tokens[token] {
                Token::Text(text) => text.chars().skip(cut.start).take(cut.len()).collect(),
                _ => String::new(),
            };
            let text = if i == 0 { Some(replacement.clone()) } else { None };
            splice_text(tokens, token, cut, edit_tokens(original, text));
        }
    }

    log::debug!(
        "Synchronized paragraph: {} edits, +{} -{} chars",
        report.edits,
        report.chars_inserted,
        report.chars_deleted
    );

    Ok(report)
}

/// Split a character range into per-token fragments, in text order.
fn fragments(index: &[CharPos], range: Range<usize>) -> Vec<(usize, usize, Range<usize>)> {
    let mut out: Vec<(usize, usize, Range<usize>)> = Vec::new();
    for pos in &index[range] {
        match out.last_mut() {
            Some((block, token, cut)) if *block == pos.block && *token == pos.token => {
                cut.end = pos.offset + 1;
            }
            _ => out.push((pos.block, pos.token, pos.offset..pos.offset + 1)),
        }
    }
    out
}

/// Insert an empty-original edit before the character at `at`, or after the
/// last character when `at` is the text length.
fn insert_text(blocks: &mut [Vec<Token>], index: &[CharPos], at: usize, text: String) {
    let tokens = edit_tokens(String::new(), Some(text));
    match index.get(at) {
        Some(pos) => insert_at(&mut blocks[pos.block], pos.token, pos.offset, tokens),
        None => match index.last() {
            Some(pos) => insert_at(&mut blocks[pos.block], pos.token, pos.offset + 1, tokens),
            None => {
                if let Some(last) = blocks.last_mut() {
                    last.extend(tokens);
                }
            }
        },
    }
}

fn insert_at(tokens: &mut Vec<Token>, token: usize, offset: usize, inserted: Vec<Token>) {
    let len = tokens[token].as_text().map_or(0, |t| t.chars().count());
    if offset == 0 {
        tokens.splice(token..token, inserted);
    } else if offset >= len {
        tokens.splice(token + 1..token + 1, inserted);
    } else {
        let mut middle = inserted;
        let (before, after) = match &tokens[token] {
            Token::Text(text) => {
                let chars: Vec<char> = text.chars().collect();
                (
                    chars[..offset].iter().collect::<String>(),
                    chars[offset..].iter().collect::<String>(),
                )
            }
            _ => return,
        };
        middle.insert(0, Token::Text(before));
        middle.push(Token::Text(after));
        tokens.splice(token..token + 1, middle);
    }
}

/// Append a single space separator to every non-final block whose text does
/// not already end in whitespace or a hyphen. Returns the number of
/// separators added.
pub fn join_blocks(blocks: &mut [Vec<Token>]) -> usize {
    let Some(last) = blocks.len().checked_sub(1) else {
        return 0;
    };
    let mut added = 0;
    for tokens in &mut blocks[..last] {
        let ends_joined = current_text(tokens)
            .chars()
            .last()
            .is_some_and(|c| c.is_whitespace() || c == '-');
        if !ends_joined {
            tokens.push(Token::text(" "));
            added += 1;
        }
    }
    added
}

/// Synchronize text and inline markers.
///
/// Blocks without markers receive every marker of `content`. Blocks that
/// already carry markers must carry the same number; they are then re-placed
/// at the new offsets. A change in the number of markers is an
/// [`Error::UnsupportedEdit`].
pub fn sync_content(blocks: &mut [Vec<Token>], content: &ParagraphContent) -> Result<SyncReport> {
    let existing = count_marks(blocks);
    if existing > 0 && existing != content.marks.len() {
        return Err(Error::UnsupportedEdit(format!(
            "inline marker count changes from {} to {}",
            existing,
            content.marks.len()
        )));
    }

    let text_len = content.text.chars().count();
    let out_of_range = content
        .marks
        .iter()
        .find(|m| m.range.end > text_len || m.range.start > m.range.end);
    if let Some(mark) = out_of_range {
        return Err(Error::Malformed(format!(
            "{} marker {:?} lies outside paragraph text of {} characters",
            mark.kind.tag(),
            mark.range,
            text_len
        )));
    }

    let mut report = sync(blocks, &content.text)?;

    if existing > 0 {
        for tokens in blocks.iter_mut() {
            tokens.retain(|t| !matches!(t, Token::MarkStart(_) | Token::MarkEnd));
        }
    }
    for mark in &content.marks {
        place_mark(blocks, mark)?;
        report.marks += 1;
    }

    Ok(report)
}

/// Number of logical markers: a marker split across adjacent fragments with
/// no text between them counts once.
pub fn count_marks(blocks: &[Vec<Token>]) -> usize {
    let mut count = 0;
    let mut open: Vec<MarkKind> = Vec::new();
    let mut just_closed: Option<MarkKind> = None;

    for token in blocks.iter().flatten() {
        match token {
            Token::MarkStart(kind) => {
                if just_closed != Some(*kind) {
                    count += 1;
                }
                open.push(*kind);
                just_closed = None;
            }
            Token::MarkEnd => just_closed = open.pop(),
            Token::Text(text) if !text.is_empty() => just_closed = None,
            _ => {}
        }
    }
    count
}

fn place_mark(blocks: &mut [Vec<Token>], mark: &InlineMark) -> Result<()> {
    let (chars, index) = char_index(blocks);
    let pair = |kind| vec![Token::MarkStart(kind), Token::MarkEnd];

    if mark.range.is_empty() {
        match index.get(mark.range.start) {
            Some(pos) => insert_at(&mut blocks[pos.block], pos.token, pos.offset, pair(mark.kind)),
            None => match index.last() {
                Some(pos) => {
                    insert_at(&mut blocks[pos.block], pos.token, pos.offset + 1, pair(mark.kind))
                }
                None => match blocks.last_mut() {
                    Some(last) => last.extend(pair(mark.kind)),
                    None => {
                        return Err(Error::UnsupportedEdit(
                            "no block to hold an inline marker".to_string(),
                        ))
                    }
                },
            },
        }
        return Ok(());
    }

    if mark.range.end > chars.len() {
        return Err(Error::UnsupportedEdit(format!(
            "{} marker {:?} lies outside the block text",
            mark.kind.tag(),
            mark.range
        )));
    }

    // Token boundary after the last character, then before the first one
    let last = index[mark.range.end - 1];
    let mut end = split_after(&mut blocks[last.block], last.token, last.offset);
    let first = index[mark.range.start];
    let start = split_before(&mut blocks[first.block], first.token, first.offset);
    if first.block == last.block && first.offset > 0 {
        end += 1;
    }
    let (start_block, end_block) = (first.block, last.block);

    if start_block == end_block {
        let tokens = &mut blocks[start_block];
        if let Some((i, j)) = balanced_span(tokens, start, end) {
            tokens.insert(j, Token::MarkEnd);
            tokens.insert(i, Token::MarkStart(mark.kind));
            return Ok(());
        }
        wrap_text(tokens, start, end, mark.kind);
        return Ok(());
    }

    // Crossing blocks: one pair per text fragment
    for block in (start_block..=end_block).rev() {
        let tokens = &mut blocks[block];
        let from = if block == start_block { start } else { 0 };
        let to = if block == end_block { end } else { tokens.len() };
        wrap_text(tokens, from, to, mark.kind);
    }
    Ok(())
}

/// Ensure a token boundary right after character `offset` of token `token`
/// and return the insertion index of that boundary.
fn split_after(tokens: &mut Vec<Token>, token: usize, offset: usize) -> usize {
    let len = tokens[token].as_text().map_or(0, |t| t.chars().count());
    if offset + 1 < len {
        split_token(tokens, token, offset + 1);
    }
    token + 1
}

/// Ensure a token boundary right before character `offset` of token `token`.
fn split_before(tokens: &mut Vec<Token>, token: usize, offset: usize) -> usize {
    if offset > 0 {
        split_token(tokens, token, offset);
        return token + 1;
    }
    token
}

fn split_token(tokens: &mut Vec<Token>, token: usize, at: usize) {
    if let Token::Text(text) = &tokens[token] {
        let chars: Vec<char> = text.chars().collect();
        let head: String = chars[..at].iter().collect();
        let tail: String = chars[at..].iter().collect();
        tokens.splice(token..token + 1, [Token::Text(head), Token::Text(tail)]);
    }
}

/// Find the narrowest `(i, j)` around `start..end` such that `tokens[i..j]` is
/// balanced, widening only over opening tokens before and closing tokens after.
fn balanced_span(tokens: &[Token], start: usize, end: usize) -> Option<(usize, usize)> {
    let mut starts = vec![start];
    let mut i = start;
    while i > 0 && tokens[i - 1].opens().is_some() {
        i -= 1;
        starts.push(i);
    }
    let mut ends = vec![end];
    let mut j = end;
    while j < tokens.len() && tokens[j].closes().is_some() {
        j += 1;
        ends.push(j);
    }

    let mut best: Option<(usize, usize, usize)> = None;
    for (a, &i) in starts.iter().enumerate() {
        for (b, &j) in ends.iter().enumerate() {
            if is_balanced(&tokens[i..j]) && best.map_or(true, |(w, _, _)| a + b < w) {
                best = Some((a + b, i, j));
            }
        }
    }
    best.map(|(_, i, j)| (i, j))
}

fn is_balanced(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    for token in tokens {
        if token.opens().is_some() {
            depth += 1;
        } else if token.closes().is_some() {
            if depth == 0 {
                return false;
            }
            depth -= 1;
        }
    }
    depth == 0
}

/// Wrap every text token in `tokens[from..to]` in its own marker pair.
fn wrap_text(tokens: &mut Vec<Token>, from: usize, to: usize, kind: MarkKind) {
    for i in (from..to.min(tokens.len())).rev() {
        if tokens[i].is_text() {
            tokens.insert(i + 1, Token::MarkEnd);
            tokens.insert(i, Token::MarkStart(kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{validate_tokens, FontId};

    #[test]
    fn test_sync_noop_on_equal_text() {
        let mut blocks = vec![vec![Token::text("the court")]];
        let before = blocks.clone();
        let report = sync(&mut blocks, "the court").unwrap();
        assert!(report.is_noop());
        assert_eq!(blocks, before);
    }

    #[test]
    fn test_sync_whitespace_without_blocks() {
        let mut blocks: Vec<Vec<Token>> = Vec::new();
        let report = sync(&mut blocks, "\n  \n").unwrap();
        assert!(report.is_noop());
        assert!(blocks.is_empty());

        let content = ParagraphContent {
            text: "\n  \n".to_string(),
            marks: Vec::new(),
        };
        assert!(sync_content(&mut blocks, &content).unwrap().is_noop());
    }

    #[test]
    fn test_sync_rejects_word_count_change() {
        let mut blocks = vec![vec![Token::text("the court")]];
        let err = sync(&mut blocks, "the high court").unwrap_err();
        assert!(matches!(err, Error::UnsupportedEdit(_)));
        assert_eq!(blocks, vec![vec![Token::text("the court")]]);
    }

    #[test]
    fn test_sync_wraps_hyphen_across_blocks() {
        let mut blocks = vec![
            vec![Token::FontStart(FontId(1)), Token::text("abc-"), Token::text("def")],
            vec![Token::text("ghi"), Token::text("jkl"), Token::FontEnd],
        ];
        let report = sync(&mut blocks, "abcdefghijkl").unwrap();

        assert_eq!(report.edits, 1);
        assert_eq!(report.chars_deleted, 1);
        assert_eq!(
            blocks[0],
            vec![
                Token::FontStart(FontId(1)),
                Token::text("abc"),
                Token::edit("-"),
                Token::EditEnd,
                Token::text("def"),
            ]
        );
        assert_eq!(
            blocks[1],
            vec![Token::text("ghi"), Token::text("jkl"), Token::FontEnd]
        );
    }

    #[test]
    fn test_sync_replacement_keeps_original() {
        let mut blocks = vec![vec![Token::text("Tbe court")]];
        sync(&mut blocks, "The court").unwrap();

        assert_eq!(
            blocks[0],
            vec![
                Token::text("T"),
                Token::edit("b"),
                Token::text("h"),
                Token::EditEnd,
                Token::text("e court"),
            ]
        );
        assert_eq!(current_text(&blocks[0]), "The court");
    }

    #[test]
    fn test_sync_insertion_at_end() {
        let mut blocks = vec![vec![Token::text("court")]];
        sync(&mut blocks, "court.").unwrap();
        assert_eq!(
            blocks[0],
            vec![
                Token::text("court"),
                Token::edit(""),
                Token::text("."),
                Token::EditEnd
            ]
        );
    }

    #[test]
    fn test_sync_replacement_across_tokens() {
        let mut blocks = vec![vec![Token::text("ab"), Token::text("cd")]];
        let report = sync(&mut blocks, "aXYd").unwrap();
        assert_eq!(report.edits, 2);
        assert_eq!(current_text(&blocks[0]), "aXYd");
        validate_tokens(&blocks[0]).unwrap();
    }

    #[test]
    fn test_join_blocks() {
        let mut blocks = vec![
            vec![Token::text("end of line")],
            vec![Token::text("hyphen-")],
            vec![Token::text("last")],
        ];
        assert_eq!(join_blocks(&mut blocks), 1);
        assert_eq!(current_text(&blocks[0]), "end of line ");
        assert_eq!(current_text(&blocks[1]), "hyphen-");
        assert_eq!(current_text(&blocks[2]), "last");

        // Idempotent
        assert_eq!(join_blocks(&mut blocks), 0);
    }

    #[test]
    fn test_sync_content_places_mark_in_word() {
        let rect = Default::default();
        let mut blocks = vec![vec![
            Token::OcrStart(crate::model::OcrSpan::new(rect, 1.0)),
            Token::text("court"),
            Token::OcrEnd,
            Token::text(" "),
            Token::OcrStart(crate::model::OcrSpan::new(rect, 1.0)),
            Token::text("1"),
            Token::OcrEnd,
        ]];
        let content = ParagraphContent::new("court 1").with_mark(MarkKind::FootnoteMark, 6..7);
        let report = sync_content(&mut blocks, &content).unwrap();

        assert_eq!(report.marks, 1);
        assert_eq!(blocks[0][5], Token::MarkStart(MarkKind::FootnoteMark));
        assert_eq!(blocks[0][6], Token::text("1"));
        assert_eq!(blocks[0][7], Token::MarkEnd);
        validate_tokens(&blocks[0]).unwrap();
        assert_eq!(count_marks(&blocks), 1);
    }

    #[test]
    fn test_sync_content_mark_across_words_hoists() {
        let rect = Default::default();
        let mut blocks = vec![vec![
            Token::OcrStart(crate::model::OcrSpan::new(rect, 1.0)),
            Token::text("[1"),
            Token::OcrEnd,
            Token::text(" "),
            Token::OcrStart(crate::model::OcrSpan::new(rect, 1.0)),
            Token::text("2]"),
            Token::OcrEnd,
        ]];
        let content = ParagraphContent::new("[1 2]").with_mark(MarkKind::BracketNum, 0..5);
        sync_content(&mut blocks, &content).unwrap();

        assert_eq!(blocks[0][0], Token::MarkStart(MarkKind::BracketNum));
        assert_eq!(blocks[0].last(), Some(&Token::MarkEnd));
        validate_tokens(&blocks[0]).unwrap();
    }

    #[test]
    fn test_sync_content_replaces_existing_marks() {
        let mut blocks = vec![vec![
            Token::text("a "),
            Token::MarkStart(MarkKind::FootnoteMark),
            Token::text("1"),
            Token::MarkEnd,
        ]];
        let content = ParagraphContent::new("a 1").with_mark(MarkKind::FootnoteMark, 0..1);
        sync_content(&mut blocks, &content).unwrap();
        assert_eq!(blocks[0][0], Token::MarkStart(MarkKind::FootnoteMark));
        assert_eq!(count_marks(&blocks), 1);

        let two = ParagraphContent::new("a 1")
            .with_mark(MarkKind::FootnoteMark, 0..1)
            .with_mark(MarkKind::FootnoteMark, 2..3);
        assert!(matches!(
            sync_content(&mut blocks, &two),
            Err(Error::UnsupportedEdit(_))
        ));
    }

    #[test]
    fn test_sync_content_mark_across_blocks() {
        let mut blocks = vec![vec![Token::text("ab ")], vec![Token::text("cd")]];
        let content = ParagraphContent::new("ab cd").with_mark(MarkKind::BracketNum, 1..4);
        sync_content(&mut blocks, &content).unwrap();

        validate_tokens(&blocks[0]).unwrap();
        validate_tokens(&blocks[1]).unwrap();
        assert_eq!(count_marks(&blocks), 1);
        assert_eq!(current_text(&blocks[0]), "ab ");
    }
}
