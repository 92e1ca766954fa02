//! Datum Converters (spec.md §4.9): the concrete realization of the
//! `IDatumConverter<T>` / `IDatumConverterFactory` collaborator contract
//! from spec.md §6 — turning a wire [`Datum`] into the caller's value type.

use crate::proto::Datum;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

/// A datum failed to convert to the requested type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertError {
    expected: &'static str,
    found: String,
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a datum convertible to {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ConvertError {}

fn mismatch(expected: &'static str, datum: &Datum) -> ConvertError {
    ConvertError { expected, found: format!("{datum:?}") }
}

/// Converts a wire [`Datum`] into `Self`. Implemented for the primitive
/// shapes `Connection::run` and `Cursor::current` need; callers needing a
/// richer mapping (e.g. `serde`-derived structs) convert through [`Value`]
/// themselves.
pub trait FromDatum: Sized {
    fn from_datum(datum: &Datum) -> Result<Self, ConvertError>;
}

impl FromDatum for f64 {
    fn from_datum(datum: &Datum) -> Result<Self, ConvertError> {
        match datum {
            Datum::Num(n) => Ok(*n),
            other => Err(mismatch("R_NUM", other)),
        }
    }
}

impl FromDatum for bool {
    fn from_datum(datum: &Datum) -> Result<Self, ConvertError> {
        match datum {
            Datum::Bool(b) => Ok(*b),
            other => Err(mismatch("BOOL", other)),
        }
    }
}

impl FromDatum for String {
    fn from_datum(datum: &Datum) -> Result<Self, ConvertError> {
        match datum {
            Datum::Str(s) => Ok(s.clone()),
            other => Err(mismatch("R_STR", other)),
        }
    }
}

impl<T: FromDatum> FromDatum for Option<T> {
    fn from_datum(datum: &Datum) -> Result<Self, ConvertError> {
        match datum {
            Datum::Null => Ok(None),
            other => T::from_datum(other).map(Some),
        }
    }
}

impl<T: FromDatum> FromDatum for Vec<T> {
    fn from_datum(datum: &Datum) -> Result<Self, ConvertError> {
        match datum {
            Datum::Array(items) => items.iter().map(T::from_datum).collect(),
            other => Err(mismatch("R_ARRAY", other)),
        }
    }
}

impl<T: FromDatum> FromDatum for HashMap<String, T> {
    fn from_datum(datum: &Datum) -> Result<Self, ConvertError> {
        match datum {
            Datum::Object(map) => map
                .iter()
                .map(|(key, value)| T::from_datum(value).map(|converted| (key.clone(), converted)))
                .collect(),
            other => Err(mismatch("R_OBJECT", other)),
        }
    }
}

/// An untyped value mirroring [`Datum`]'s structure, for callers that want
/// to inspect a response shape without committing to a concrete type ahead
/// of time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl FromDatum for Value {
    fn from_datum(datum: &Datum) -> Result<Self, ConvertError> {
        Ok(match datum {
            Datum::Null => Value::Null,
            Datum::Bool(b) => Value::Bool(*b),
            Datum::Num(n) => Value::Num(*n),
            Datum::Str(s) => Value::Str(s.clone()),
            Datum::Array(items) => Value::Array(
                items.iter().map(Value::from_datum).collect::<Result<_, _>>()?,
            ),
            Datum::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Value::from_datum(v).map(|value| (k.clone(), value)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

/// Zero-sized dispatcher satisfying the `IDatumConverterFactory` contract:
/// it exists as a named type (rather than a free function) so a
/// `Connection`'s converter-factory attribute has a concrete type to hold,
/// per spec.md §9's "converter factory is mutable configuration" note. No
/// alternate factory ships; this is the only implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatumConverterFactory;

impl DatumConverterFactory {
    pub fn convert<T: FromDatum>(&self, datum: &Datum) -> Result<T, ConvertError> {
        T::from_datum(datum)
    }
}
