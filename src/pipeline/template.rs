use crate::error::StageError;

use super::context::PipelineContext;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// Prompt text with `{slot}` placeholders.
///
/// `{{` and `}}` produce literal braces. Whitespace inside the braces is
/// ignored, so `{ topic }` and `{topic}` name the same slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(source: impl Into<String>) -> Result<Self, StageError> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        name.push(inner);
                    }
                    if !closed {
                        return Err(StageError::template(format!(
                            "unclosed '{{' at byte {offset}"
                        )));
                    }

                    let name = name.trim();
                    if !is_valid_slot_name(name) {
                        return Err(StageError::template(format!(
                            "invalid slot name '{name}' at byte {offset}"
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(name.to_string()));
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(StageError::template(format!(
                        "unmatched '}}' at byte {offset}"
                    )));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { source, segments })
    }

    /// Slot names in order of first appearance.
    pub fn slots(&self) -> Vec<&str> {
        let mut slots: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Slot(name) = segment {
                if !slots.contains(&name.as_str()) {
                    slots.push(name.as_str());
                }
            }
        }
        slots
    }

    pub fn render(&self, context: &PipelineContext) -> Result<String, StageError> {
        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Slot(name) => {
                    let value = context.get(name).ok_or_else(|| {
                        StageError::template(format!("slot '{name}' is not defined"))
                    })?;
                    rendered.push_str(value);
                }
            }
        }
        Ok(rendered)
    }
}

pub(crate) fn is_valid_slot_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}
