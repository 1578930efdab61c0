//! Order-preserving string encodings for key components.
//!
//! For two values of the same [`Type`], comparing their encodings byte by
//! byte gives the same answer as comparing the values. Encodings never
//! contain [`KEY_DELIMITER`], so they can be spliced into key paths.
//!
//! Integers are biased by `10^10` and printed as 11 zero-padded digits. The
//! leading digit is `0` for negative values and `1` otherwise.
//!
//! Text is escaped with a prefix-free code: `.` becomes `..`, `/` becomes
//! `.~`, and every other character stands for itself. The code is monotone
//! in the character it replaces, which keeps lexical order intact.

use std::fmt;

use thiserror::Error;

pub const KEY_DELIMITER: char = '/';

pub const INT_MAX_LEN: usize = 10;
pub const MAX_NUM: i64 = 9_999_999_999;
pub const INT_ENCODED_LEN: usize = INT_MAX_LEN + 1;

const INT_BIAS: i64 = MAX_NUM + 1;

const ESCAPE: char = '.';
const ESCAPED_ESCAPE: char = '.';
const ESCAPED_DELIMITER: char = '~';

pub type EncodeResult<T> = Result<T, EncodeError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("integer {0} is outside the encodable range")]
    IntegerOutOfRange(i64),

    #[error("expected {expected} value, found {found}")]
    TypeMismatch { expected: Type, found: Type },

    #[error("malformed {ty} encoding {input:?}")]
    Malformed { ty: Type, input: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Integer,
    Text,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => f.write_str("integer"),
            Type::Text => f.write_str("text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Integer(i64),
    Text(String),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Integer(_) => Type::Integer,
            Value::Text(_) => Type::Text,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl Type {
    pub fn encode(self, value: &Value) -> EncodeResult<String> {
        match (self, value) {
            (Type::Integer, Value::Integer(v)) => encode_integer(*v),
            (Type::Text, Value::Text(v)) => Ok(escape_text(v)),
            (expected, value) => Err(EncodeError::TypeMismatch {
                expected,
                found: value.ty(),
            }),
        }
    }

    pub fn decode(self, encoded: &str) -> EncodeResult<Value> {
        match self {
            Type::Integer => decode_integer(encoded).map(Value::Integer),
            Type::Text => unescape_text(encoded).map(Value::Text),
        }
    }

    fn malformed(self, input: &str) -> EncodeError {
        EncodeError::Malformed {
            ty: self,
            input: input.to_owned(),
        }
    }
}

fn encode_integer(v: i64) -> EncodeResult<String> {
    if !(-MAX_NUM..=MAX_NUM).contains(&v) {
        return Err(EncodeError::IntegerOutOfRange(v));
    }
    Ok(format!("{:0width$}", v + INT_BIAS, width = INT_ENCODED_LEN))
}

fn decode_integer(encoded: &str) -> EncodeResult<i64> {
    if encoded.len() != INT_ENCODED_LEN || !encoded.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Type::Integer.malformed(encoded));
    }
    let v = encoded
        .parse::<i64>()
        .map_err(|_| Type::Integer.malformed(encoded))?
        - INT_BIAS;
    if v < -MAX_NUM {
        return Err(Type::Integer.malformed(encoded));
    }
    Ok(v)
}

fn escape_text(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        match c {
            ESCAPE => {
                out.push(ESCAPE);
                out.push(ESCAPED_ESCAPE);
            }
            KEY_DELIMITER => {
                out.push(ESCAPE);
                out.push(ESCAPED_DELIMITER);
            }
            c => out.push(c),
        }
    }
    out
}

fn unescape_text(encoded: &str) -> EncodeResult<String> {
    let mut out = String::with_capacity(encoded.len());
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(ESCAPED_ESCAPE) => out.push(ESCAPE),
                Some(ESCAPED_DELIMITER) => out.push(KEY_DELIMITER),
                _ => return Err(Type::Text.malformed(encoded)),
            },
            KEY_DELIMITER => return Err(Type::Text.malformed(encoded)),
            c => out.push(c),
        }
    }
    Ok(out)
}
