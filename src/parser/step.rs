use std::collections::VecDeque;

use finl_unicode::categories::CharacterCategories;

use crate::{located::Located, quantity::Value};

use super::{
    model::*,
    quantity::{parse_quantity, parse_value, split_value_unit},
    Event, ParserError,
};

const INGREDIENT_MODIFIERS: &[char] = &['?', '-', '&', '@', '+'];
const COOKWARE_MODIFIERS: &[char] = &['?', '-', '&', '+'];
const RECIPE_EXTENSION: &str = ".cook";

/// Scans one trimmed line of a step and pushes its events
///
/// Anything that is not a valid component is kept as text. Errors stop the
/// scan of the line.
pub(crate) fn parse_step_line(text: &str, line: usize, out: &mut VecDeque<Event>) {
    let mut s = LineScanner::new(text, line);
    let mut text_start = 0;

    while let Some(c) = s.peek() {
        let start = s.pos;
        let component = match c {
            '@' => s
                .ingredient()
                .map(|i| i.map(|i| Event::Ingredient(Located::new(i, line)))),
            '#' => s
                .cookware()
                .map(|c| c.map(|c| Event::Cookware(Located::new(c, line)))),
            '~' => s
                .timer()
                .map(|t| t.map(|t| Event::Timer(Located::new(t, line)))),
            _ => {
                s.bump();
                continue;
            }
        };

        match component {
            Ok(Some(ev)) => {
                if start > text_start {
                    out.push_back(Event::Text(text[text_start..start].to_string()));
                }
                out.push_back(ev);
                text_start = s.pos;
            }
            Ok(None) => {
                s.pos = start;
                s.bump();
            }
            Err(e) => {
                out.push_back(Event::Error(e));
                return;
            }
        }
    }

    if text_start < text.len() {
        out.push_back(Event::Text(text[text_start..].to_string()));
    }
}

struct Body<'a> {
    name: &'a str,
    quantity: Option<&'a str>,
}

struct LineScanner<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> LineScanner<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self { text, pos: 0, line }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn prev(&self) -> Option<char> {
        self.text[..self.pos].chars().next_back()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, f: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c| !f(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Runs `f` and goes back to the starting position if it fails
    fn with_recover<F, O>(&mut self, f: F) -> Option<O>
    where
        F: FnOnce(&mut Self) -> Option<O>,
    {
        let old = self.pos;
        let r = f(self);
        if r.is_none() {
            self.pos = old;
        }
        r
    }

    fn ingredient(&mut self) -> Result<Option<IngredientItem>, ParserError> {
        self.bump();
        let group = self.with_recover(|s| {
            s.eat('|').then_some(())?;
            let key = s.eat_while(|c| c != '|').trim();
            if key.is_empty() {
                return None;
            }
            s.eat('|').then(|| key.to_string())
        });

        let Some(first) = self.ingredient_option()? else {
            return Ok(None);
        };
        let mut alternatives = vec![first];

        while matches!(self.prev(), Some('}' | ')')) && self.peek() == Some('|') {
            let save = self.pos;
            self.bump();
            self.eat('@');
            match self.ingredient_option()? {
                Some(alt) => alternatives.push(alt),
                None => {
                    self.pos = save;
                    break;
                }
            }
        }

        Ok(Some(IngredientItem {
            group,
            alternatives,
        }))
    }

    fn ingredient_option(&mut self) -> Result<Option<Ingredient>, ParserError> {
        let start = self.pos;
        let raw_modifiers = self.eat_while(|c| INGREDIENT_MODIFIERS.contains(&c));
        let is_path = self.rest().starts_with("./");
        let is_recipe = is_path || raw_modifiers.contains('@');

        let Some(body) = self.body(is_recipe) else {
            self.pos = start;
            return Ok(None);
        };
        if body.name.is_empty() {
            self.pos = start;
            return Ok(None);
        }

        let preparation = self.with_recover(|s| {
            s.eat('(').then_some(())?;
            let text = s.eat_while(|c| c != ')');
            s.eat(')').then(|| text.trim().to_string())
        });

        let mut modifiers = self.modifiers(raw_modifiers)?;
        let (name, recipe_path) = if is_recipe {
            modifiers |= Modifiers::RECIPE;
            let (name, path) = recipe_path(body.name);
            (name, Some(path))
        } else {
            (body.name.to_string(), None)
        };

        let (quantity, scalable) = match body.quantity {
            Some(raw) => match parse_quantity(raw, self.line)? {
                Some(parsed) => (Some(parsed.quantity), parsed.scalable),
                None => (None, true),
            },
            None => (None, true),
        };

        Ok(Some(Ingredient {
            modifiers,
            name,
            recipe_path,
            quantity,
            scalable,
            preparation: preparation.filter(|p| !p.is_empty()),
        }))
    }

    fn cookware(&mut self) -> Result<Option<Cookware>, ParserError> {
        self.bump();
        let raw_modifiers = self.eat_while(|c| COOKWARE_MODIFIERS.contains(&c));
        let Some(body) = self.body(false) else {
            return Ok(None);
        };
        if body.name.is_empty() {
            return Ok(None);
        }
        let modifiers = self.modifiers(raw_modifiers)?;

        let quantity = match body.quantity.map(|q| q.trim().trim_start_matches('=').trim()) {
            Some(raw) if raw.contains('%') => {
                return Err(ParserError::CookwareUnit { line: self.line })
            }
            Some(raw) if !raw.is_empty() => Some(parse_value(raw, self.line)?),
            _ => None,
        };

        Ok(Some(Cookware {
            modifiers,
            name: body.name.to_string(),
            quantity,
        }))
    }

    fn timer(&mut self) -> Result<Option<Timer>, ParserError> {
        self.bump();
        let Some(Body {
            name,
            quantity: Some(raw),
        }) = self.with_recover(|s| s.braced_body(false))
        else {
            return Ok(None);
        };

        let raw = raw.trim().trim_start_matches('=');
        let first = raw.split('|').next().unwrap_or_default().trim();
        let (duration, unit) = match split_value_unit(first, self.line)? {
            (Value::Text(t), _) if t.is_empty() => {
                return Err(ParserError::TimerMissingUnit { line: self.line })
            }
            (duration, Some(unit)) if !unit.is_empty() => (duration, unit),
            _ => return Err(ParserError::TimerMissingUnit { line: self.line }),
        };

        Ok(Some(Timer {
            name: (!name.is_empty()).then(|| name.to_string()),
            duration,
            unit,
        }))
    }

    /// `name{quantity}` or a single word
    fn body(&mut self, path_chars: bool) -> Option<Body<'a>> {
        if let Some(body) = self.with_recover(|s| s.braced_body(path_chars)) {
            return Some(body);
        }

        let mut name = self.eat_while(|c| is_word_char(c) || (path_chars && is_path_char(c)));
        while let Some(stripped) = name.strip_suffix('.') {
            self.pos -= 1;
            name = stripped;
        }
        (!name.is_empty()).then_some(Body {
            name,
            quantity: None,
        })
    }

    /// Words separated by whitespace and followed by a `{quantity}` block
    fn braced_body(&mut self, path_chars: bool) -> Option<Body<'a>> {
        let name = self.eat_while(|c| {
            is_word_char(c)
                || c.is_whitespace()
                || is_joiner(c)
                || (path_chars && is_path_char(c))
        });
        if name.starts_with(char::is_whitespace) || !joiners_inside_words(name) {
            return None;
        }
        self.eat('{').then_some(())?;
        let quantity = self.eat_while(|c| c != '}' && c != '{');
        self.eat('}').then_some(Body {
            name: name.trim_end(),
            quantity: Some(quantity),
        })
    }

    fn modifiers(&self, raw: &str) -> Result<Modifiers, ParserError> {
        let mut flags = Modifiers::empty();
        for c in raw.chars() {
            let Ok(modifier) = Modifier::try_from(c) else {
                continue;
            };
            if flags.contains(modifier.flag()) {
                return Err(ParserError::DuplicateModifier {
                    modifier: c,
                    line: self.line,
                });
            }
            flags |= modifier.flag();
        }
        if flags.contains(Modifiers::REF | Modifiers::NEW) {
            return Err(ParserError::ConflictingModifiers { line: self.line });
        }
        Ok(flags)
    }
}

/// `./dir/name` and `name` to the stem and `dir/name.cook`
fn recipe_path(raw: &str) -> (String, String) {
    let path = raw.trim();
    let path = path.strip_prefix("./").unwrap_or(path);
    let path = path.strip_suffix(RECIPE_EXTENSION).unwrap_or(path);
    let stem = path.rsplit('/').next().unwrap_or(path);
    (stem.to_string(), format!("{path}{RECIPE_EXTENSION}"))
}

fn is_path_char(c: char) -> bool {
    matches!(c, '/' | '.' | '-' | '_')
}

/// Punctuation allowed between two letters of a name, like `all-purpose`
fn is_joiner(c: char) -> bool {
    matches!(c, '-' | '\'' | '’')
}

fn joiners_inside_words(name: &str) -> bool {
    let chars = name.chars().collect::<Vec<_>>();
    chars.iter().enumerate().all(|(i, &c)| {
        !is_joiner(c)
            || (i > 0
                && chars.get(i + 1).is_some_and(|&n| is_word_char(n))
                && is_word_char(chars[i - 1]))
    })
}

fn is_word_char(c: char) -> bool {
    match c {
        c if c.is_alphabetic() => true,
        c if c.is_whitespace() => false,
        '@' | '#' | '~' | '?' | '+' | '&' | '|' | '=' | '%' | '{' | '}' | '(' | ')' | '<' | '>'
        | '^' | '$' | '`' => false,
        c if c.is_separator_space() || c.is_punctuation() => false,
        _ => true,
    }
}
