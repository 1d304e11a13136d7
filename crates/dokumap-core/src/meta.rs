//! Decoder for the PHP `serialize()` format used by `.meta` files.
//!
//! Values are mapped onto [`serde_json::Value`]: arrays whose keys are
//! `0..n` in order become JSON arrays, every other array becomes an object
//! with stringified keys, and objects gain a `__class` entry. String lengths
//! in the format are byte counts.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest array or object nesting accepted.
const MAX_DEPTH: usize = 128;

/// Failure to decode a serialized blob, with the byte offset reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {offset}")]
pub struct MetaError {
    pub offset: usize,
    pub message: String,
}

/// Decode a complete serialized value. Trailing whitespace is allowed.
pub fn unserialize(input: &str) -> Result<Value, MetaError> {
    let mut parser = Parser {
        input,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    if !parser.rest().trim().is_empty() {
        return Err(parser.error("trailing data"));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> MetaError {
        MetaError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, token: char) -> Result<(), MetaError> {
        if self.rest().starts_with(token) {
            self.pos += token.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("expected '{token}'")))
        }
    }

    /// Read up to (not including) `end`, then skip it.
    fn until(&mut self, end: char) -> Result<&'a str, MetaError> {
        let rest = self.rest();
        let idx = rest
            .find(end)
            .ok_or_else(|| self.error(format!("missing '{end}'")))?;
        self.pos += idx + end.len_utf8();
        Ok(&rest[..idx])
    }

    fn length(&mut self) -> Result<usize, MetaError> {
        let start = self.pos;
        let digits = self.until(':')?;
        digits.parse().map_err(|_| MetaError {
            offset: start,
            message: format!("bad length '{digits}'"),
        })
    }

    fn value(&mut self) -> Result<Value, MetaError> {
        let start = self.pos;
        let tag = self
            .rest()
            .chars()
            .next()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += tag.len_utf8();

        match tag {
            'N' => {
                self.expect(';')?;
                Ok(Value::Null)
            }
            'b' => {
                self.expect(':')?;
                match self.until(';')? {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    other => Err(MetaError {
                        offset: start,
                        message: format!("bad boolean '{other}'"),
                    }),
                }
            }
            'i' => {
                self.expect(':')?;
                let raw = self.until(';')?;
                raw.parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| MetaError {
                        offset: start,
                        message: format!("bad integer '{raw}'"),
                    })
            }
            'd' => {
                self.expect(':')?;
                let raw = self.until(';')?;
                let float = match raw {
                    "INF" => f64::INFINITY,
                    "-INF" => f64::NEG_INFINITY,
                    "NAN" => f64::NAN,
                    _ => raw.parse::<f64>().map_err(|_| MetaError {
                        offset: start,
                        message: format!("bad float '{raw}'"),
                    })?,
                };
                Ok(Number::from_f64(float).map_or(Value::Null, Value::Number))
            }
            's' => {
                self.expect(':')?;
                Ok(Value::String(self.string_body()?))
            }
            'a' => {
                self.expect(':')?;
                let count = self.length()?;
                self.array_body(count)
            }
            'O' => {
                self.expect(':')?;
                let class = self.string_body_until(':')?;
                let count = self.length()?;
                let mut object = match self.array_body(count)? {
                    Value::Object(map) => map,
                    Value::Array(items) => items
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v))
                        .collect(),
                    _ => Map::new(),
                };
                object.insert("__class".to_string(), Value::String(class));
                Ok(Value::Object(object))
            }
            other => Err(MetaError {
                offset: start,
                message: format!("unknown type tag '{other}'"),
            }),
        }
    }

    /// `LEN:"bytes";`
    fn string_body(&mut self) -> Result<String, MetaError> {
        self.string_body_until(';')
    }

    /// `LEN:"bytes"` followed by `end`.
    fn string_body_until(&mut self, end: char) -> Result<String, MetaError> {
        let len = self.length()?;
        self.expect('"')?;
        let end_pos = self
            .pos
            .checked_add(len)
            .filter(|&end_pos| end_pos <= self.input.len())
            .ok_or_else(|| self.error(format!("string of {len} bytes overruns input")))?;
        let text = self
            .input
            .get(self.pos..end_pos)
            .ok_or_else(|| self.error("string length splits a character"))?;
        self.pos = end_pos;
        self.expect('"')?;
        self.expect(end)?;
        Ok(text.to_string())
    }

    /// `{key;value;...}` after the element count.
    fn array_body(&mut self, count: usize) -> Result<Value, MetaError> {
        if self.depth == MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        self.expect('{')?;
        self.depth += 1;
        // Every element takes at least one byte, so the input bounds the count.
        let mut entries = Vec::with_capacity(count.min(self.rest().len()));
        for _ in 0..count {
            let key = match self.value()? {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s,
                _ => return Err(self.error("array keys must be integers or strings")),
            };
            let value = self.value()?;
            entries.push((key, value));
        }
        self.expect('}')?;
        self.depth -= 1;

        let is_list = entries
            .iter()
            .enumerate()
            .all(|(i, (key, _))| *key == i.to_string());
        if is_list {
            Ok(Value::Array(entries.into_iter().map(|(_, v)| v).collect()))
        } else {
            Ok(Value::Object(entries.into_iter().collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(unserialize("N;").unwrap(), Value::Null);
        assert_eq!(unserialize("b:1;").unwrap(), json!(true));
        assert_eq!(unserialize("i:-42;").unwrap(), json!(-42));
        assert_eq!(unserialize("d:0.5;").unwrap(), json!(0.5));
        assert_eq!(unserialize("d:NAN;").unwrap(), Value::Null);
        assert_eq!(unserialize("s:5:\"hello\";").unwrap(), json!("hello"));
    }

    #[test]
    fn string_lengths_are_bytes() {
        assert_eq!(unserialize("s:5:\"été\";").unwrap(), json!("été"));
        assert!(unserialize("s:4:\"été\";").is_err());
    }

    #[test]
    fn strings_may_contain_delimiters() {
        assert_eq!(unserialize("s:5:\"a\";b}\";").unwrap(), json!("a\";b}"));
    }

    #[test]
    fn sequential_array_becomes_list() {
        let value = unserialize("a:2:{i:0;s:1:\"a\";i:1;s:1:\"b\";}").unwrap();
        assert_eq!(value, json!(["a", "b"]));
    }

    #[test]
    fn keyed_array_becomes_object() {
        let raw = "a:2:{s:7:\"current\";a:1:{s:5:\"title\";s:5:\"Start\";}s:10:\"persistent\";a:0:{}}";
        let value = unserialize(raw).unwrap();
        assert_eq!(value["current"]["title"], json!("Start"));
        assert_eq!(value["persistent"], json!([]));
    }

    #[test]
    fn object_records_class() {
        let value = unserialize("O:8:\"stdClass\":1:{s:1:\"a\";i:1;}").unwrap();
        assert_eq!(value["__class"], json!("stdClass"));
        assert_eq!(value["a"], json!(1));
    }

    #[test]
    fn reports_offset_of_failure() {
        let err = unserialize("a:1:{s:1:\"k\";x:1;}").unwrap_err();
        assert_eq!(err.offset, 13);
        assert!(unserialize("i:1;junk").is_err());
        assert!(unserialize("").is_err());
    }

    #[test]
    fn oversized_array_count_is_an_error() {
        let err = unserialize("a:4611686018427387903:{}").unwrap_err();
        assert_eq!(err.offset, 23);
        assert!(unserialize("a:18446744073709551615:{N;N;}").is_err());
        assert!(unserialize("a:99999999999999999999999:{}").is_err());
    }

    #[test]
    fn oversized_string_length_is_an_error() {
        let err = unserialize("s:18446744073709551615:\"x\";").unwrap_err();
        assert!(err.message.contains("overruns input"));
        assert!(unserialize("O:18446744073709551615:\"x\":0:{}").is_err());
    }

    #[test]
    fn string_length_inside_a_character_is_an_error() {
        // 'é' is two bytes; a length of 1 stops halfway through it.
        assert!(unserialize("s:1:\"é\";").is_err());
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let deep = "a:1:{i:0;".repeat(200_000);
        let err = unserialize(&deep).unwrap_err();
        assert!(err.message.contains("nesting"));

        let mut shallow = "a:1:{i:0;".repeat(MAX_DEPTH);
        shallow.push_str("N;");
        shallow.push_str(&"}".repeat(MAX_DEPTH));
        assert!(unserialize(&shallow).is_ok());
    }
}
