// src/drafting/template.rs
//! Prompt templates with named `{slot}` placeholders.
//!
//! Slots are discovered when the template is built. Rendering goes through a
//! `TemplateFill` builder and fails if a declared slot is left empty or an
//! undeclared slot is set, so wording changes cannot silently drop data.
//! `{{` and `}}` produce literal braces.

use std::collections::BTreeMap;

use crate::error::{ScoutError, ScoutResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Slot(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    pieces: Vec<Piece>,
    slots: Vec<String>,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, body: &str) -> ScoutResult<Self> {
        let name = name.into();
        let err = |msg: String| ScoutError::Template(format!("template `{name}`: {msg}"));

        let mut pieces = Vec::new();
        let mut slots: Vec<String> = Vec::new();
        let mut text = String::new();
        let mut chars = body.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut slot = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) if c.is_ascii_alphanumeric() || c == '_' => slot.push(c),
                            Some(c) => {
                                return Err(err(format!("invalid character `{c}` in slot name")))
                            }
                            None => return Err(err("unclosed `{`".into())),
                        }
                    }
                    if slot.is_empty() {
                        return Err(err("empty slot `{}`".into()));
                    }
                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    if !slots.contains(&slot) {
                        slots.push(slot.clone());
                    }
                    pieces.push(Piece::Slot(slot));
                }
                '}' => return Err(err("unmatched `}`".into())),
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }

        Ok(Self {
            name,
            pieces,
            slots,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared slots in first-appearance order.
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn fill(&self) -> TemplateFill<'_> {
        TemplateFill {
            template: self,
            values: BTreeMap::new(),
            unknown: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct TemplateFill<'t> {
    template: &'t PromptTemplate,
    values: BTreeMap<String, String>,
    unknown: Vec<String>,
}

impl<'t> TemplateFill<'t> {
    pub fn set(mut self, slot: &str, value: impl Into<String>) -> Self {
        if self.template.slots.iter().any(|s| s == slot) {
            self.values.insert(slot.to_string(), value.into());
        } else {
            self.unknown.push(slot.to_string());
        }
        self
    }

    /// Validate, then substitute.
    pub fn render(self) -> ScoutResult<String> {
        let t = self.template;
        if !self.unknown.is_empty() {
            return Err(ScoutError::Template(format!(
                "template `{}`: unknown slot(s) {}",
                t.name,
                self.unknown.join(", ")
            )));
        }
        let missing: Vec<&str> = t
            .slots
            .iter()
            .filter(|s| self.values.get(*s).map_or(true, |v| v.trim().is_empty()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ScoutError::Template(format!(
                "template `{}`: missing slot(s) {}",
                t.name,
                missing.join(", ")
            )));
        }

        let mut out = String::new();
        for piece in &t.pieces {
            match piece {
                Piece::Text(s) => out.push_str(s),
                Piece::Slot(name) => out.push_str(&self.values[name]),
            }
        }
        Ok(out)
    }
}
