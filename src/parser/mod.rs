//! Cooklang parser
//!
//! The input is processed line by line:
//! ```txt
//! recipe     = frontmatter? line*
//! frontmatter= "---" yaml "---"
//! line       = blank | metadata | section | note | step
//!
//! metadata   = ">>" meta_key ":" meta_value   (without ":" it is a step)
//! section    = "=" + section_name "=" *
//! note       = ">" text         (after a blank line or another note line)
//! step       = (component | ANY)*
//!
//! component  = c_kind modifiers? c_body note?
//! c_kind     = "@" | "#" | "~"
//! c_body     = c_long | Word
//! c_long     = c_l_name "{" quantity? "}"
//! modifiers  = ("@" | "&" | "+" | "-" | "?")+
//! ```
//! Consecutive step lines form a single step. Blank lines, sections and
//! metadata end it.
//!
//! [`PullParser`] yields [`Event`]s, use [`crate::analysis::parse_events`] to
//! build a [`Recipe`](crate::model::Recipe) from them.

mod comments;
mod frontmatter;
mod model;
mod quantity;
mod step;

use std::collections::VecDeque;

use thiserror::Error;

use crate::{located::Located, quantity::QuantityAddError};

pub use model::{Cookware, Ingredient, IngredientItem, Modifier, Modifiers, Timer};
pub use quantity::{parse_quantity, ParsedQuantity};

/// Events generated by [`PullParser`]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// YAML text of the leading frontmatter and the line where it starts
    Frontmatter(Located<String>),
    /// `>> key: value` line
    Metadata {
        key: String,
        value: String,
        line: usize,
    },
    Section {
        name: Option<String>,
    },
    StartStep,
    EndStep,
    /// A full note, its lines joined with a space
    Note(String),
    Text(String),
    Ingredient(Located<IngredientItem>),
    Cookware(Located<Cookware>),
    Timer(Located<Timer>),

    Error(ParserError),
}

/// Line based pull parser
///
/// Comments are removed before any line is processed.
#[derive(Debug)]
pub struct PullParser {
    lines: std::vec::IntoIter<(usize, String)>,
    queue: VecDeque<Event>,
    prev_blank: bool,
    in_step: bool,
    note: Option<String>,
    only_metadata: bool,
    finished: bool,
}

impl PullParser {
    pub fn new(input: &str) -> Self {
        let mut queue = VecDeque::new();
        let (body, offset) = match frontmatter::parse_frontmatter(input) {
            Some(split) => {
                queue.push_back(Event::Frontmatter(Located::new(
                    split.yaml_text.to_string(),
                    split.yaml_line,
                )));
                (split.cooklang_text, split.cooklang_line_offset)
            }
            None => (input, 0),
        };

        let lines = comments::strip_comments(body)
            .lines()
            .enumerate()
            .map(|(i, l)| (offset + i + 1, l.to_string()))
            .collect::<Vec<_>>();

        Self {
            lines: lines.into_iter(),
            queue,
            prev_blank: true,
            in_step: false,
            note: None,
            only_metadata: false,
            finished: false,
        }
    }

    /// Only yield frontmatter and metadata events, skipping everything else
    pub fn into_meta_iter(mut self) -> impl Iterator<Item = Event> {
        self.only_metadata = true;
        self.filter(|ev| matches!(ev, Event::Frontmatter(_) | Event::Metadata { .. }))
    }

    fn flush_note(&mut self) {
        if let Some(note) = self.note.take() {
            if !note.is_empty() {
                self.queue.push_back(Event::Note(note));
            }
        }
    }

    fn flush(&mut self) {
        self.flush_note();
        if self.in_step {
            self.queue.push_back(Event::EndStep);
            self.in_step = false;
        }
    }

    fn process_line(&mut self, line: usize, text: &str) {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            self.flush();
            self.prev_blank = true;
            return;
        }

        if let Some((key, value)) = trimmed
            .strip_prefix(">>")
            .and_then(|entry| entry.split_once(':'))
        {
            self.flush();
            self.queue.push_back(Event::Metadata {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
                line,
            });
            self.prev_blank = true;
            return;
        }

        if self.only_metadata {
            self.prev_blank = false;
            return;
        }

        if trimmed.starts_with('=') {
            self.flush();
            let name = trimmed.trim_matches('=').trim();
            self.queue.push_back(Event::Section {
                name: (!name.is_empty()).then(|| name.to_string()),
            });
            self.prev_blank = true;
            return;
        }

        // `>>` without a key is step text
        if let Some(text) = trimmed.strip_prefix('>').filter(|t| !t.starts_with('>')) {
            if self.prev_blank || self.note.is_some() {
                let text = text.trim();
                match &mut self.note {
                    Some(note) if !text.is_empty() => {
                        if !note.is_empty() {
                            note.push(' ');
                        }
                        note.push_str(text);
                    }
                    Some(_) => {}
                    None => self.note = Some(text.to_string()),
                }
                self.prev_blank = false;
                return;
            }
        }

        self.flush_note();
        if self.in_step {
            self.queue.push_back(Event::Text(" ".to_string()));
        } else {
            self.queue.push_back(Event::StartStep);
            self.in_step = true;
        }
        step::parse_step_line(trimmed, line, &mut self.queue);
        self.prev_blank = false;
    }
}

impl Iterator for PullParser {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ev) = self.queue.pop_front() {
                return Some(ev);
            }
            if self.finished {
                return None;
            }
            match self.lines.next() {
                Some((line, text)) => self.process_line(line, &text),
                None => {
                    self.flush();
                    self.finished = true;
                }
            }
        }
    }
}

/// Errors generated while parsing a recipe
///
/// All of them carry the 1-based line where they happened.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParserError {
    #[error("Timer missing unit (line {line})")]
    TimerMissingUnit { line: usize },

    #[error("Referenced {kind} \"{name}\" not found (line {line})")]
    ReferenceNotFound {
        kind: &'static str,
        name: String,
        line: usize,
    },

    #[error("Referenced {kind} \"{name}\" cannot change its modifiers (line {line})")]
    ReferencedItemCannotBeRedefined {
        kind: &'static str,
        name: String,
        line: usize,
    },

    #[error("Duplicate modifier: '{modifier}' (line {line})")]
    DuplicateModifier { modifier: char, line: usize },

    #[error("A reference cannot be forced to be new (line {line})")]
    ConflictingModifiers { line: usize },

    #[error("Division by zero (line {line})")]
    DivisionByZero { line: usize },

    #[error("A cookware item cannot have a unit (line {line})")]
    CookwareUnit { line: usize },

    #[error("Invalid frontmatter (line {line}): {message}")]
    InvalidFrontmatter { message: String, line: usize },

    #[error("Error adding quantities (line {line}): {source}")]
    Quantity {
        source: QuantityAddError,
        line: usize,
    },
}

impl ParserError {
    /// Line where the error happened
    pub fn line(&self) -> usize {
        match self {
            ParserError::TimerMissingUnit { line }
            | ParserError::ReferenceNotFound { line, .. }
            | ParserError::ReferencedItemCannotBeRedefined { line, .. }
            | ParserError::DuplicateModifier { line, .. }
            | ParserError::ConflictingModifiers { line }
            | ParserError::DivisionByZero { line }
            | ParserError::CookwareUnit { line }
            | ParserError::InvalidFrontmatter { line, .. }
            | ParserError::Quantity { line, .. } => *line,
        }
    }
}
