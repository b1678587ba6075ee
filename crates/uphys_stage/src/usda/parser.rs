//! USDA (ASCII) file parser.
//!
//! Lines are grouped into statements (a statement continues while any
//! `(` or `[` is open) and read top-down. The supported subset is what a
//! physics scene needs:
//!
//! - `def` / `over` / `class` prims with any type name, nested
//! - prim metadata: `apiSchemas` with `prepend` / `append` / `delete`
//! - typed attributes, scalar and array (`float`, `double3`, `quatf`,
//!   `matrix4d`, `token[]`, `point3f[]`, ...)
//! - `rel name = </Path>` and `rel name = [</A>, </B>]`
//! - `xformOp:*` composed in `xformOpOrder`, including `!resetXformStack!`
//!   and `!invert!`
//! - layer metadata `upAxis` and `metersPerUnit`
//!
//! Time samples, connections, variant sets and dictionaries are skipped.
//! One-line bodies (`def Sphere "S" { double radius = 2 }`) hold at most one
//! property.

use std::collections::VecDeque;

use log::debug;
use thiserror::Error;

use super::types::{compose_xform_ops, LayerSpec, PrimSpec, Specifier, XformOp};
use super::values::{convert_value, parse_raw_value, Cursor, RawValue};

/// Errors that can occur during USDA parsing.
#[derive(Error, Debug)]
pub enum UsdaError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error("Unclosed block starting at line {0}")]
    UnclosedBlock(usize),
}

/// Result type for parsing operations.
pub type UsdaResult<T> = Result<T, UsdaError>;

const QUALIFIERS: &[&str] = &[
    "custom", "uniform", "varying", "prepend", "append", "add", "delete", "reorder",
];

const LIST_OPS: &[&str] = &["prepend", "append", "add", "delete", "reorder"];

/// Quote and bracket tracking across the lines of one statement.
#[derive(Default)]
struct Nesting {
    depth: i32,
    quote: Option<char>,
}

impl Nesting {
    fn feed(&mut self, text: &str) {
        for c in text.chars() {
            match (self.quote, c) {
                (Some(q), c) if c == q => self.quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'' | '@') => self.quote = Some(c),
                (None, '(' | '[') => self.depth += 1,
                (None, ')' | ']') => self.depth -= 1,
                _ => {}
            }
        }
    }

    fn is_open(&self) -> bool {
        self.depth > 0 || self.quote.is_some()
    }
}

fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'' | '@') => quote = Some(c),
            (None, '#') => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Index of the `)` matching the `(` at byte 0.
fn matching_paren(text: &str) -> Option<usize> {
    let mut nesting = Nesting::default();
    for (i, c) in text.char_indices() {
        nesting.feed(&text[i..i + c.len_utf8()]);
        if nesting.depth == 0 && nesting.quote.is_none() {
            return Some(i);
        }
    }
    None
}

/// Split `lhs = rhs` at the first `=` outside brackets and quotes.
fn split_assignment(statement: &str) -> (&str, Option<&str>) {
    let mut nesting = Nesting::default();
    for (i, c) in statement.char_indices() {
        if c == '=' && nesting.depth == 0 && nesting.quote.is_none() {
            return (statement[..i].trim(), Some(statement[i + 1..].trim()));
        }
        nesting.feed(&statement[i..i + c.len_utf8()]);
    }
    (statement.trim(), None)
}

fn is_prim_header(statement: &str) -> bool {
    ["def ", "over ", "class "]
        .iter()
        .any(|kw| statement.starts_with(kw))
        || ["def", "over", "class"].contains(&statement)
}

fn count_braces(text: &str) -> i32 {
    let mut quote = None;
    let mut depth = 0;
    for c in text.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'' | '@') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// One `key = value` entry from a metadata block.
struct MetadataEntry {
    list_op: Option<String>,
    key: String,
    value: Option<RawValue>,
}

/// USDA file parser.
pub struct UsdaParser {
    lines: VecDeque<(usize, String)>,
    current_line: usize,
}

impl UsdaParser {
    /// Create a new parser from file contents.
    pub fn new(content: &str) -> Self {
        let lines: VecDeque<_> = content
            .lines()
            .enumerate()
            .map(|(i, s)| (i + 1, strip_comment(s).trim().to_string()))
            .filter(|(_, s)| !s.is_empty())
            .collect();

        Self {
            lines,
            current_line: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> UsdaError {
        UsdaError::Parse {
            line: self.current_line,
            message: message.into(),
        }
    }

    /// Parse the whole layer.
    pub fn parse(&mut self) -> UsdaResult<LayerSpec> {
        let mut layer = LayerSpec::default();

        if self.lines.front().is_some_and(|(_, l)| l.starts_with('(')) {
            let statement = self.next_statement()?.ok_or(UsdaError::UnexpectedEof)?;
            self.parse_layer_metadata(&statement, &mut layer)?;
        }

        while let Some(statement) = self.next_statement()? {
            if !is_prim_header(&statement) {
                return Err(self.error(format!(
                    "Expected a prim definition, found '{}'",
                    statement
                )));
            }
            layer.prims.push(self.parse_prim(&statement)?);
        }

        Ok(layer)
    }

    /// Pop the next statement, joining continuation lines.
    fn next_statement(&mut self) -> UsdaResult<Option<String>> {
        let Some((line_num, mut statement)) = self.lines.pop_front() else {
            return Ok(None);
        };
        self.current_line = line_num;

        let mut nesting = Nesting::default();
        nesting.feed(&statement);
        while nesting.is_open() {
            match self.lines.pop_front() {
                Some((_, next)) => {
                    nesting.feed(&next);
                    statement.push('\n');
                    statement.push_str(&next);
                }
                None => return Err(UsdaError::UnclosedBlock(line_num)),
            }
        }

        Ok(Some(statement))
    }

    fn parse_layer_metadata(&mut self, statement: &str, layer: &mut LayerSpec) -> UsdaResult<()> {
        let end = matching_paren(statement).ok_or_else(|| self.error("Unclosed layer metadata"))?;
        for entry in self.parse_metadata(&statement[1..end])? {
            match (entry.key.as_str(), entry.value) {
                ("upAxis", Some(RawValue::Text(axis))) => layer.up_axis = Some(axis),
                ("metersPerUnit", Some(RawValue::Number(mpu))) => layer.meters_per_unit = Some(mpu),
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_metadata(&self, text: &str) -> UsdaResult<Vec<MetadataEntry>> {
        let mut entries = Vec::new();
        let mut cursor = Cursor::new(text);

        while !cursor.at_end() {
            // Leading documentation string
            if cursor.rest().starts_with('"') {
                cursor.value().map_err(|m| self.error(m))?;
                continue;
            }

            let Some(mut key) = cursor.word() else {
                return Err(self.error(format!("Invalid metadata: {}", cursor.rest())));
            };
            let mut list_op = None;
            if LIST_OPS.contains(&key) {
                list_op = Some(key.to_string());
                key = cursor
                    .word()
                    .ok_or_else(|| self.error("Expected a metadata key after list op"))?;
            }
            if !cursor.eat('=') {
                return Err(self.error(format!("Expected '=' after metadata key '{}'", key)));
            }

            cursor.skip_ws();
            let value = if cursor.rest().starts_with('{') {
                cursor.skip_braced().map_err(|m| self.error(m))?;
                None
            } else {
                let value = cursor.value().map_err(|m| self.error(m))?;
                // Reference targets trail the asset path: @file@</Prim>
                cursor.skip_ws();
                while cursor.rest().starts_with('<') {
                    cursor.value().map_err(|m| self.error(m))?;
                    cursor.skip_ws();
                }
                Some(value)
            };

            entries.push(MetadataEntry {
                list_op,
                key: key.to_string(),
                value,
            });
        }

        Ok(entries)
    }

    /// Parse a prim header and its body.
    fn parse_prim(&mut self, header: &str) -> UsdaResult<PrimSpec> {
        let start_line = self.current_line;
        let (keyword, rest) = header.split_once(char::is_whitespace).unwrap_or((header, ""));
        let specifier = match keyword {
            "def" => Specifier::Def,
            "over" => Specifier::Over,
            _ => Specifier::Class,
        };

        let rest = rest.trim_start();
        let (type_name, rest) = if rest.starts_with('"') {
            (None, rest)
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '"')
                .unwrap_or(rest.len());
            (Some(rest[..end].to_string()), rest[end..].trim_start())
        };

        let name_end = rest
            .strip_prefix('"')
            .and_then(|r| r.find('"'))
            .ok_or_else(|| self.error(format!("Expected a quoted prim name: {}", header)))?;
        let name = rest[1..=name_end].to_string();
        let mut remainder = rest[name_end + 2..].trim().to_string();

        let mut prim = PrimSpec::new(name, specifier, type_name);
        let mut has_metadata = false;

        loop {
            if remainder.starts_with('(') && !has_metadata {
                let end = matching_paren(&remainder)
                    .ok_or_else(|| self.error("Unclosed prim metadata"))?;
                let metadata = self.parse_metadata(&remainder[1..end])?;
                apply_prim_metadata(&mut prim, metadata);
                has_metadata = true;
                remainder = remainder[end + 1..].trim().to_string();
            } else if let Some(body) = remainder.strip_prefix('{') {
                let body = body.trim();
                if let Some(inner) = body.strip_suffix('}') {
                    self.lines.push_front((start_line, "}".to_string()));
                    let inner = inner.trim();
                    if !inner.is_empty() {
                        self.lines.push_front((start_line, inner.to_string()));
                    }
                } else if !body.is_empty() {
                    self.lines.push_front((start_line, body.to_string()));
                }
                break;
            } else if remainder.is_empty() {
                remainder = self
                    .next_statement()?
                    .ok_or(UsdaError::UnclosedBlock(start_line))?;
            } else {
                return Err(self.error(format!("Expected '{{' after prim header, found '{}'", remainder)));
            }
        }

        self.parse_body(&mut prim, start_line)?;
        Ok(prim)
    }

    fn parse_body(&mut self, prim: &mut PrimSpec, start_line: usize) -> UsdaResult<()> {
        loop {
            let statement = self
                .next_statement()?
                .ok_or(UsdaError::UnclosedBlock(start_line))?;

            if statement == "}" {
                break;
            }
            if is_prim_header(&statement) {
                let child = self.parse_prim(&statement)?;
                prim.children.push(child);
                continue;
            }
            if statement.ends_with('{') {
                self.skip_block()?;
                continue;
            }
            self.parse_property(prim, &statement)?;
        }

        self.compose_transform(prim)
    }

    /// Skip a `{ ... }` block whose opening brace was already consumed.
    fn skip_block(&mut self) -> UsdaResult<()> {
        let start_line = self.current_line;
        let mut depth = 1;
        while depth > 0 {
            let statement = self
                .next_statement()?
                .ok_or(UsdaError::UnclosedBlock(start_line))?;
            depth += count_braces(&statement);
        }
        Ok(())
    }

    fn parse_property(&mut self, prim: &mut PrimSpec, statement: &str) -> UsdaResult<()> {
        let (lhs, rhs) = split_assignment(statement);
        let words: Vec<&str> = lhs
            .split_whitespace()
            .skip_while(|w| QUALIFIERS.contains(w))
            .collect();

        if words.first() == Some(&"rel") {
            let name = words
                .get(1)
                .ok_or_else(|| self.error("Relationship without a name"))?;
            let targets = match rhs {
                Some(text) => self.parse_targets(text)?,
                None => Vec::new(),
            };
            prim.relationships.push((name.to_string(), targets));
            return Ok(());
        }

        let (Some(type_name), Some(name)) = (words.first(), words.get(1)) else {
            debug!("Skipping statement at line {}: {}", self.current_line, statement);
            return Ok(());
        };
        if name.contains('.') {
            // .connect, .timeSamples, .spline
            return Ok(());
        }
        let Some(text) = rhs else {
            return Ok(());
        };

        let raw = parse_raw_value(text).map_err(|m| self.error(m))?;
        match convert_value(type_name, &raw).map_err(|m| self.error(format!("{}: {}", name, m)))? {
            Some(value) => prim.attributes.push((name.to_string(), value)),
            None => debug!("Dropping attribute {} of type {}", name, type_name),
        }
        Ok(())
    }

    fn parse_targets(&self, text: &str) -> UsdaResult<Vec<String>> {
        let raw = parse_raw_value(text).map_err(|m| self.error(m))?;
        match raw {
            RawValue::Path(path) => Ok(vec![path]),
            RawValue::List(items) => items
                .into_iter()
                .map(|item| match item {
                    RawValue::Path(path) => Ok(path),
                    other => Err(self.error(format!("Expected a target path, found {:?}", other))),
                })
                .collect(),
            RawValue::Ident(word) if word == "None" => Ok(Vec::new()),
            other => Err(self.error(format!("Expected relationship targets, found {:?}", other))),
        }
    }

    fn compose_transform(&self, prim: &mut PrimSpec) -> UsdaResult<()> {
        let order: Vec<String> = match prim.attribute("xformOpOrder") {
            Some(value) => value
                .as_token_array()
                .map(<[String]>::to_vec)
                .ok_or_else(|| self.error("xformOpOrder must be a token array"))?,
            // No explicit order: authored order
            None => prim
                .attributes
                .iter()
                .filter(|(n, _)| n.starts_with("xformOp:"))
                .map(|(n, _)| n.clone())
                .collect(),
        };

        let mut ops = Vec::new();
        for entry in &order {
            if entry == "!resetXformStack!" {
                prim.reset_xform_stack = true;
                ops.clear();
                continue;
            }
            let (invert, op_name) = match entry.strip_prefix("!invert!") {
                Some(name) => (true, name),
                None => (false, entry.as_str()),
            };
            let value = prim
                .attribute(op_name)
                .ok_or_else(|| self.error(format!("xformOpOrder names missing op {}", op_name)))?;
            let op = XformOp::from_attribute(op_name, value)
                .ok_or_else(|| self.error(format!("Unsupported xformOp {}", op_name)))?;
            ops.push(if invert { XformOp::Inverse(Box::new(op)) } else { op });
        }

        prim.transform = compose_xform_ops(&ops);
        Ok(())
    }
}

fn apply_prim_metadata(prim: &mut PrimSpec, entries: Vec<MetadataEntry>) {
    for entry in entries {
        if entry.key != "apiSchemas" {
            continue;
        }
        let Some(RawValue::List(items)) = entry.value else {
            continue;
        };
        let names = items.into_iter().filter_map(|item| match item {
            RawValue::Text(name) => Some(name),
            _ => None,
        });
        match entry.list_op.as_deref() {
            Some("delete") => {
                let removed: Vec<String> = names.collect();
                prim.api_schemas.retain(|s| !removed.contains(s));
            }
            Some("prepend") => {
                let mut merged: Vec<String> = names.collect();
                for existing in prim.api_schemas.drain(..) {
                    if !merged.contains(&existing) {
                        merged.push(existing);
                    }
                }
                prim.api_schemas = merged;
            }
            _ => {
                for name in names {
                    if !prim.api_schemas.contains(&name) {
                        prim.api_schemas.push(name);
                    }
                }
            }
        }
    }
}

/// Parse USDA text into a layer.
pub fn parse_usda(content: &str) -> UsdaResult<LayerSpec> {
    let mut parser = UsdaParser::new(content);
    parser.parse()
}
