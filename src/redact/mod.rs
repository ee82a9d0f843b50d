//! Redaction marking and sealed storage of redacted text.

mod seal;

pub use seal::{open, seal, seal_page, unseal_page, RedactionKey};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::model::{validate_tokens, Page, Token};

/// Part of a page to redact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedactionTarget {
    /// A whole block
    Block(String),
    /// A character range `start..end` of a block's current text
    Span {
        block_id: String,
        start: usize,
        end: usize,
    },
}

/// One piece of redacted text and the token it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedFragment {
    /// Block id
    pub block_id: String,
    /// Index of the token in the block's stream
    pub token: usize,
    /// Text of a `Text` token, or the original of an `EditStart`
    pub text: String,
}

/// The redacted text of a page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedText {
    pub fragments: Vec<RedactedFragment>,
}

impl RedactedText {
    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Check if there is no redacted text.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments of one block.
    pub fn block<'a>(&'a self, block_id: &'a str) -> impl Iterator<Item = &'a RedactedFragment> {
        self.fragments.iter().filter(move |f| f.block_id == block_id)
    }
}

/// Mark blocks or character spans of a page as redacted.
///
/// Span redaction wraps every covered text fragment in its own
/// `RedactStart`/`RedactEnd` pair. A span touching a correction covers the
/// whole edit, original text included.
pub fn mark_redacted(page: &mut Page, targets: &[RedactionTarget]) -> Result<()> {
    let page_id = page.id.clone();
    for target in targets {
        match target {
            RedactionTarget::Block(id) => {
                let block = page.block_mut(id).ok_or_else(|| missing_block(id, &page_id))?;
                block.redacted = true;
            }
            RedactionTarget::Span {
                block_id,
                start,
                end,
            } => {
                let block = page
                    .block_mut(block_id)
                    .ok_or_else(|| missing_block(block_id, &page_id))?;
                let tokens = block.tokens.as_mut().ok_or_else(|| {
                    Error::Malformed(format!("illustration {} has no text to redact", block_id))
                })?;
                let len = tokens
                    .iter()
                    .filter_map(Token::as_text)
                    .map(|t| t.chars().count())
                    .sum::<usize>();
                if start >= end || *end > len {
                    return Err(Error::Malformed(format!(
                        "redaction range {}..{} outside block {} ({} chars)",
                        start, end, block_id, len
                    )));
                }
                let redacted = wrap_span(tokens, *start, *end);
                validate_tokens(&redacted)?;
                *tokens = redacted;
            }
        }
    }
    Ok(())
}

fn missing_block(id: &str, page_id: &str) -> Error {
    Error::MissingReference(format!("block {} on page {}", id, page_id))
}

/// Char range of the replacement text of every top-level edit, with the
/// index of its `EditStart`.
fn edit_ranges(tokens: &[Token]) -> Vec<(usize, usize, usize)> {
    let mut out = Vec::new();
    let mut pos = 0;
    let mut depth = 0usize;
    let mut open = (0, 0);
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::EditStart { .. } => {
                if depth == 0 {
                    open = (i, pos);
                }
                depth += 1;
            }
            Token::EditEnd => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    out.push((open.0, open.1, pos));
                }
            }
            Token::Text(text) => pos += text.chars().count(),
            _ => {}
        }
    }
    out
}

fn wrap_span(tokens: &[Token], start: usize, end: usize) -> Vec<Token> {
    // Edits whose replacement overlaps the range; a deletion counts when it
    // sits strictly inside the range.
    let wrapped: HashSet<usize> = edit_ranges(tokens)
        .into_iter()
        .filter(|&(_, from, to)| {
            if from == to {
                from > start && from < end
            } else {
                from < end && to > start
            }
        })
        .map(|(open, _, _)| open)
        .collect();

    let mut out = Vec::with_capacity(tokens.len() + 4);
    let mut pos = 0;
    let mut depth = 0usize;
    let mut in_wrapped_edit = false;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::EditStart { .. } => {
                if depth == 0 {
                    in_wrapped_edit = wrapped.contains(&i);
                    if in_wrapped_edit {
                        out.push(Token::RedactStart);
                    }
                }
                depth += 1;
                out.push(token.clone());
            }
            Token::EditEnd => {
                depth = depth.saturating_sub(1);
                out.push(token.clone());
                if depth == 0 && in_wrapped_edit {
                    out.push(Token::RedactEnd);
                    in_wrapped_edit = false;
                }
            }
            Token::Text(text) => {
                let len = text.chars().count();
                let (from, to) = (start.max(pos), end.min(pos + len));
                if depth > 0 || from >= to {
                    out.push(token.clone());
                } else {
                    let chars: Vec<char> = text.chars().collect();
                    let before: String = chars[..from - pos].iter().collect();
                    let covered: String = chars[from - pos..to - pos].iter().collect();
                    let after: String = chars[to - pos..].iter().collect();
                    if !before.is_empty() {
                        out.push(Token::Text(before));
                    }
                    out.push(Token::RedactStart);
                    out.push(Token::Text(covered));
                    out.push(Token::RedactEnd);
                    if !after.is_empty() {
                        out.push(Token::Text(after));
                    }
                }
                pos += len;
            }
            _ => out.push(token.clone()),
        }
    }
    out
}

/// Collect the text of every redacted block and span of a page.
///
/// Covers `Text` tokens and edit originals; illustrations carry no text.
pub fn redacted_text(page: &Page) -> RedactedText {
    let mut fragments = Vec::new();
    for block in &page.blocks {
        let mut depth = 0usize;
        for (i, token) in block.tokens().iter().enumerate() {
            let text = match token {
                Token::RedactStart => {
                    depth += 1;
                    continue;
                }
                Token::RedactEnd => {
                    depth = depth.saturating_sub(1);
                    continue;
                }
                Token::Text(text) => text,
                Token::EditStart { original } => original,
                _ => continue,
            };
            if (block.redacted || depth > 0) && !text.is_empty() {
                fragments.push(RedactedFragment {
                    block_id: block.id.clone(),
                    token: i,
                    text: text.clone(),
                });
            }
        }
    }
    RedactedText { fragments }
}
