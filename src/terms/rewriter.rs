//! Translation attachment: replace every occurrence of a dictionary term with
//! a template combining the translation and the source text as written.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::index::SearchIndex;
use super::matcher::find_matches;
use super::store::DictionaryStore;
use super::TermMatch;
use crate::error::EngineError;

pub const DEFAULT_TEMPLATE: &str = "{translation} {original}";

/// Template choices offered to users, with an example rendering.
pub const TEMPLATE_PRESETS: [(&str, &str); 4] = [
    ("{translation} {original}", "火球术 fire ball"),
    ("{original}({translation})", "fire ball(火球术)"),
    ("{original} ({translation})", "fire ball (火球术)"),
    ("{translation}({original})", "火球术(fire ball)"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown slot {{{name}}} at byte {position}; expected {{translation}} or {{original}}")]
    UnknownSlot { name: String, position: usize },
    #[error("unclosed '{{' at byte {position}")]
    Unclosed { position: usize },
    #[error("single '}}' at byte {position}; write '}}}}' for a literal brace")]
    StrayClose { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Translation,
    Original,
}

/// Parsed replacement template with `{translation}` and `{original}` slots.
/// `{{` and `}}` stand for literal braces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::StrayClose { position: pos }),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, ch)) => name.push(ch),
                            None => return Err(TemplateError::Unclosed { position: pos }),
                        }
                    }
                    let slot = match name.as_str() {
                        "translation" => Segment::Translation,
                        "original" => Segment::Original,
                        _ => return Err(TemplateError::UnknownSlot { name, position: pos }),
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(slot);
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn expand(&self, original: &str, translation: &str) -> String {
        let mut out = String::new();
        self.expand_into(&mut out, original, translation);
        out
    }

    fn expand_into(&self, out: &mut String, original: &str, translation: &str) {
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Translation => out.push_str(translation),
                Segment::Original => out.push_str(original),
            }
        }
    }
}

impl Default for Template {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            segments: vec![
                Segment::Translation,
                Segment::Literal(" ".to_string()),
                Segment::Original,
            ],
        }
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Template {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Template> for String {
    fn from(t: Template) -> Self {
        t.source
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Result of one rewrite: the new text and the occurrences that were replaced.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub text: String,
    pub matches: Vec<TermMatch>,
}

/// Replace every occurrence in `text`. Either all matches are applied or an
/// error is returned; there is no partially rewritten output.
pub fn rewrite(
    index: &SearchIndex,
    store: &DictionaryStore,
    text: &str,
    template: &Template,
) -> Result<Rewrite, EngineError> {
    if text.is_empty() || !index.has_pattern() {
        return Ok(Rewrite {
            text: text.to_string(),
            matches: Vec::new(),
        });
    }
    let matches = find_matches(index, store, text)?;
    let text = splice(text, &matches, template);
    Ok(Rewrite { text, matches })
}

/// Apply substitutions last match first, so the offsets of matches not yet
/// applied stay valid, then assemble the pieces into a fresh buffer.
fn splice(text: &str, matches: &[TermMatch], template: &Template) -> String {
    let mut pieces: Vec<String> = Vec::with_capacity(matches.len() * 2 + 1);
    let mut tail = text.len();
    for m in matches.iter().rev() {
        pieces.push(text[m.end..tail].to_string());
        pieces.push(template.expand(&m.matched_text, &m.translation));
        tail = m.start;
    }
    pieces.push(text[..tail].to_string());

    let mut out = String::with_capacity(pieces.iter().map(String::len).sum());
    for piece in pieces.iter().rev() {
        out.push_str(piece);
    }
    out
}
