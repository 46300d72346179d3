//! Task splitting collaborator.
//!
//! The tracker only meters AI-split requests; producing the pieces is an
//! external, stateless `text -> [text]` function behind [`TaskSplitter`].

/// Breaks a task description into smaller steps.
pub trait TaskSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits on line breaks and sentence punctuation, dropping list markers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SentenceSplitter;

impl TaskSplitter for SentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut parts = Vec::new();
        for line in text.lines() {
            let mut rest = strip_list_marker(line);
            while let Some(pos) = find_sentence_boundary(rest) {
                push_part(&mut parts, &rest[..pos]);
                rest = &rest[pos + 1..];
            }
            push_part(&mut parts, rest);
        }
        parts
    }
}

/// Byte index of a `.`, `!`, `?` or `;` followed by whitespace or the end.
fn find_sentence_boundary(text: &str) -> Option<usize> {
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?' | ';') {
            let rest = &text[i + c.len_utf8()..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return Some(i);
            }
        }
    }
    None
}

/// Remove a leading `-`, `*`, `•`, `1.` or `1)` marker.
fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    let unbulleted = trimmed.trim_start_matches(['-', '*', '\u{2022}']);
    if unbulleted.len() != trimmed.len() {
        return unbulleted.trim_start();
    }

    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let after = &trimmed[digits..];
        if let Some(rest) = after.strip_prefix(['.', ')'])
            && rest.starts_with(char::is_whitespace)
        {
            return rest.trim_start();
        }
    }
    trimmed
}

fn push_part(parts: &mut Vec<String>, raw: &str) {
    let part = raw.trim();
    if !part.is_empty() {
        parts.push(part.to_owned());
    }
}
