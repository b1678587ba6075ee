//! Attribute value text.
//!
//! Values are lexed into a small untyped tree first ([`RawValue`]) and then
//! converted using the declared attribute type.

use uphys_math::{DMat4, DQuat, DVec3};

use crate::value::Value;

/// Untyped value tree as written in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Path(String),
    Ident(String),
    /// `( ... )`
    Tuple(Vec<RawValue>),
    /// `[ ... ]`
    List(Vec<RawValue>),
}

/// Character cursor shared by the value and metadata readers.
pub(crate) struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace() || c == ',' || c == ';') {
            self.bump();
        }
    }

    pub(crate) fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.peek().is_none()
    }

    pub(crate) fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Identifier-like word: letters, digits, `_`, `:` and `.`.
    pub(crate) fn word(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '.'))
        {
            self.bump();
        }
        (self.pos > start).then(|| &self.text[start..self.pos])
    }

    /// Skip a `{ ... }` dictionary value.
    pub(crate) fn skip_braced(&mut self) -> Result<(), String> {
        if !self.eat('{') {
            return Err("Expected '{'".to_string());
        }
        let mut depth = 1;
        while depth > 0 {
            match self.bump() {
                Some('{') => depth += 1,
                Some('}') => depth -= 1,
                Some(q @ ('"' | '\'')) => {
                    self.string(q)?;
                }
                Some(_) => {}
                None => return Err("Unterminated dictionary".to_string()),
            }
        }
        Ok(())
    }

    fn delimited(&mut self, close: char) -> Result<String, String> {
        let start = self.pos;
        while let Some(c) = self.bump() {
            if c == close {
                return Ok(self.text[start..self.pos - close.len_utf8()].to_string());
            }
        }
        Err(format!("Unterminated value, expected '{}'", close))
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        let triple: String = std::iter::repeat(quote).take(3).collect();
        if self.rest().starts_with(&triple[1..]) {
            // Opening quote already consumed; this is a triple-quoted string.
            self.pos += 2 * quote.len_utf8();
            return match self.rest().find(&triple) {
                Some(end) => {
                    let s = self.rest()[..end].to_string();
                    self.pos += end + triple.len();
                    Ok(s)
                }
                None => Err("Unterminated string".to_string()),
            };
        }

        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    if let Some(escaped) = self.bump() {
                        out.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    }
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err("Unterminated string".to_string())
    }

    fn sequence(&mut self, close: char) -> Result<Vec<RawValue>, String> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            if self.peek().is_none() {
                return Err(format!("Unterminated value, expected '{}'", close));
            }
            items.push(self.value()?);
        }
    }

    /// Read one value.
    pub(crate) fn value(&mut self) -> Result<RawValue, String> {
        self.skip_ws();
        let Some(c) = self.peek() else {
            return Err("Missing value".to_string());
        };
        match c {
            '(' => {
                self.bump();
                Ok(RawValue::Tuple(self.sequence(')')?))
            }
            '[' => {
                self.bump();
                Ok(RawValue::List(self.sequence(']')?))
            }
            '"' | '\'' => {
                self.bump();
                Ok(RawValue::Text(self.string(c)?))
            }
            '@' => {
                self.bump();
                Ok(RawValue::Text(self.delimited('@')?))
            }
            '<' => {
                self.bump();
                Ok(RawValue::Path(self.delimited('>')?))
            }
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            _ => match self.word() {
                Some(word) => Ok(RawValue::Ident(word.to_string())),
                None => Err(format!("Unexpected character '{}'", c)),
            },
        }
    }

    fn number(&mut self) -> Result<RawValue, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.'))
        {
            self.bump();
        }
        let text = &self.text[start..self.pos];
        text.parse::<f64>()
            .map(RawValue::Number)
            .map_err(|_| format!("Invalid number format: {}", text))
    }
}

/// Lex a complete value. Trailing text (property metadata) is ignored.
pub fn parse_raw_value(text: &str) -> Result<RawValue, String> {
    Cursor::new(text).value()
}

const VEC3_TYPES: &[&str] = &[
    "float3", "double3", "half3", "int3", "point3f", "point3d", "point3h", "vector3f",
    "vector3d", "vector3h", "normal3f", "normal3d", "normal3h", "color3f", "color3d",
    "color3h", "texCoord3f", "texCoord3d", "texCoord3h",
];

fn number(raw: &RawValue) -> Result<f64, String> {
    match raw {
        RawValue::Number(n) => Ok(*n),
        RawValue::Ident(word) => word
            .parse::<f64>()
            .map_err(|_| format!("Invalid number format: {}", word)),
        other => Err(format!("Expected a number, found {:?}", other)),
    }
}

fn tuple(raw: &RawValue, len: usize) -> Result<Vec<f64>, String> {
    match raw {
        RawValue::Tuple(items) if items.len() == len => items.iter().map(number).collect(),
        other => Err(format!("Expected a {}-tuple, found {:?}", len, other)),
    }
}

fn text(raw: &RawValue) -> Result<String, String> {
    match raw {
        RawValue::Text(s) | RawValue::Ident(s) => Ok(s.clone()),
        other => Err(format!("Expected a string, found {:?}", other)),
    }
}

fn scalar(base: &str, raw: &RawValue) -> Result<Option<Value>, String> {
    let value = match base {
        "bool" => match raw {
            RawValue::Ident(w) if w == "true" => Value::Bool(true),
            RawValue::Ident(w) if w == "false" => Value::Bool(false),
            other => Value::Bool(number(other)? != 0.0),
        },
        "int" | "int64" | "uint" | "uint64" | "uchar" => Value::Int(number(raw)? as i64),
        "float" | "double" | "half" | "timecode" => Value::Float(number(raw)?),
        "token" => Value::Token(text(raw)?),
        "string" | "asset" => Value::String(text(raw)?),
        "quatf" | "quatd" | "quath" => {
            let q = tuple(raw, 4)?;
            Value::Quat(DQuat::from_xyzw(q[1], q[2], q[3], q[0]))
        }
        "matrix4d" => {
            let RawValue::Tuple(rows) = raw else {
                return Err(format!("Expected a matrix, found {:?}", raw));
            };
            if rows.len() != 4 {
                return Err("Expected 4 matrix rows".to_string());
            }
            let mut cols = [[0.0; 4]; 4];
            for (row, out) in rows.iter().zip(cols.iter_mut()) {
                let values = tuple(row, 4)?;
                out.copy_from_slice(&values);
            }
            // Row-vector rows are column-vector columns.
            Value::Matrix(DMat4::from_cols_array_2d(&cols))
        }
        t if VEC3_TYPES.contains(&t) => {
            let v = tuple(raw, 3)?;
            Value::Vec3(DVec3::new(v[0], v[1], v[2]))
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn array(base: &str, raw: &RawValue) -> Result<Option<Value>, String> {
    let RawValue::List(items) = raw else {
        return Err(format!("Expected an array, found {:?}", raw));
    };
    let value = match base {
        "int" | "int64" | "uint" | "uint64" | "uchar" => Value::IntArray(
            items
                .iter()
                .map(|i| number(i).map(|n| n as i64))
                .collect::<Result<_, _>>()?,
        ),
        "float" | "double" | "half" => {
            Value::FloatArray(items.iter().map(number).collect::<Result<_, _>>()?)
        }
        "token" | "string" | "asset" => {
            Value::TokenArray(items.iter().map(text).collect::<Result<_, _>>()?)
        }
        t if VEC3_TYPES.contains(&t) => Value::Vec3Array(
            items
                .iter()
                .map(|i| tuple(i, 3).map(|v| DVec3::new(v[0], v[1], v[2])))
                .collect::<Result<_, _>>()?,
        ),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Convert a lexed value using its declared type name. `Ok(None)` means the
/// type is not represented (or the value is `None`) and the attribute is
/// dropped.
pub fn convert_value(type_name: &str, raw: &RawValue) -> Result<Option<Value>, String> {
    if matches!(raw, RawValue::Ident(w) if w == "None") {
        return Ok(None);
    }
    match type_name.strip_suffix("[]") {
        Some(base) => array(base, raw),
        None => scalar(type_name, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(type_name: &str, text: &str) -> Option<Value> {
        convert_value(type_name, &parse_raw_value(text).unwrap()).unwrap()
    }

    #[test]
    fn test_lex_nested() {
        let raw = parse_raw_value("[(1, 2, 3), (4, 5, 6)]").unwrap();
        let RawValue::List(items) = raw else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            RawValue::Tuple(vec![
                RawValue::Number(1.0),
                RawValue::Number(2.0),
                RawValue::Number(3.0)
            ])
        );
    }

    #[test]
    fn test_lex_strings_and_paths() {
        assert_eq!(parse_raw_value("\"Y\"").unwrap(), RawValue::Text("Y".into()));
        assert_eq!(
            parse_raw_value("</World/Body>").unwrap(),
            RawValue::Path("/World/Body".into())
        );
        assert_eq!(
            parse_raw_value("@./mesh.usda@").unwrap(),
            RawValue::Text("./mesh.usda".into())
        );
        assert_eq!(
            parse_raw_value("\"\"\"multi\nline\"\"\"").unwrap(),
            RawValue::Text("multi\nline".into())
        );
    }

    #[test]
    fn test_infinities() {
        assert_eq!(convert("float", "-inf"), Some(Value::Float(f64::NEG_INFINITY)));
        assert_eq!(convert("float", "inf"), Some(Value::Float(f64::INFINITY)));
    }

    #[test]
    fn test_scalars() {
        assert_eq!(convert("bool", "0"), Some(Value::Bool(false)));
        assert_eq!(convert("bool", "true"), Some(Value::Bool(true)));
        assert_eq!(convert("int", "7"), Some(Value::Int(7)));
        assert_eq!(convert("double", "1e-3"), Some(Value::Float(0.001)));
        assert_eq!(convert("token", "\"Z\""), Some(Value::Token("Z".into())));
        assert_eq!(
            convert("point3f", "(1, 2, 3)"),
            Some(Value::Vec3(DVec3::new(1.0, 2.0, 3.0)))
        );
    }

    #[test]
    fn test_quat_is_w_first() {
        let Some(Value::Quat(q)) = convert("quatf", "(0.5, 0.1, 0.2, 0.3)") else {
            panic!("expected quat");
        };
        assert_eq!(q.w, 0.5);
        assert_eq!(q.x, 0.1);
        assert_eq!(q.z, 0.3);
    }

    #[test]
    fn test_matrix_translation_row() {
        let Some(Value::Matrix(m)) = convert(
            "matrix4d",
            "( (1, 0, 0, 0), (0, 1, 0, 0), (0, 0, 1, 0), (4, 5, 6, 1) )",
        ) else {
            panic!("expected matrix");
        };
        assert_eq!(m.w_axis.truncate(), DVec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_arrays() {
        assert_eq!(
            convert("float[]", "[0.5, 1]"),
            Some(Value::FloatArray(vec![0.5, 1.0]))
        );
        assert_eq!(
            convert("token[]", "[\"xformOp:translate\"]"),
            Some(Value::TokenArray(vec!["xformOp:translate".into()]))
        );
        assert_eq!(convert("point3f[]", "[]"), Some(Value::Vec3Array(vec![])));
    }

    #[test]
    fn test_unsupported_and_none() {
        assert_eq!(convert("float2", "(1, 2)"), None);
        assert_eq!(convert("float", "None"), None);
        assert!(convert_value("float3", &parse_raw_value("(1, 2)").unwrap()).is_err());
    }
}
