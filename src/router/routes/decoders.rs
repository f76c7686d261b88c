use std::{borrow::Cow, fmt, sync::Arc};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use super::Param;

/// Regex fragment a parameter must satisfy unless its decoder says otherwise:
/// one or more characters that are not a path separator.
pub const DEFAULT_MATCHER: &str = "[^/]+";

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    Integer(i64),
    /// Also the not-a-number sentinel produced by the numeric decoders.
    Float(f64),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Array(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Array(_) => "array",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns `true` for the not-a-number sentinel.
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float(f) if f.is_nan())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("array decoder failed to parse array")]
    NotAnArray,
    #[error("`{0}` is not a calendar date")]
    Date(String),
    #[error("`{0}` is not an ISO-8601 date-time")]
    DateTime(String),
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("no value given for parameter `{0}`")]
    MissingParameter(String),
    #[error("expected a value of kind {expected}, found {found}")]
    TypeMismatch {
        expected: Cow<'static, str>,
        found: &'static str,
    },
    #[error("failed to serialize array")]
    Serialize(#[from] serde_json::Error),
}

impl EncodeError {
    fn mismatch<D: Decoder + ?Sized>(decoder: &D, found: &Value) -> Self {
        EncodeError::TypeMismatch {
            expected: Cow::Owned(decoder.kind().into_owned()),
            found: found.kind(),
        }
    }
}

/// Converts a percent-decoded path segment into a [`Value`] and back.
///
/// Decoders hold no state and are shared between every pattern that uses
/// them, so implementations must be `Send + Sync`.
pub trait Decoder: fmt::Debug + Send + Sync {
    /// Name of the kind of value this decoder produces, e.g. `integer`.
    fn kind(&self) -> Cow<'_, str>;

    fn decode(&self, segment: &str) -> Result<Value, DecodeError>;

    fn encode(&self, value: &Value) -> Result<String, EncodeError>;

    /// Regex fragment the raw, still percent-encoded segment has to match.
    fn matcher(&self) -> &str {
        DEFAULT_MATCHER
    }
}

impl<D: Decoder + ?Sized> Decoder for Arc<D> {
    fn kind(&self) -> Cow<'_, str> {
        (**self).kind()
    }

    fn decode(&self, segment: &str) -> Result<Value, DecodeError> {
        (**self).decode(segment)
    }

    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        (**self).encode(value)
    }

    fn matcher(&self) -> &str {
        (**self).matcher()
    }
}

pub trait DecoderExt: Decoder + Sized + 'static {
    /// Binds this decoder to a parameter name.
    fn param(self, name: impl Into<String>) -> Param {
        Param::new(name, Arc::new(self))
    }
}

impl<D: Decoder + Sized + 'static> DecoderExt for D {}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringDecoder;

impl Decoder for StringDecoder {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Borrowed("string")
    }

    fn decode(&self, segment: &str) -> Result<Value, DecodeError> {
        Ok(Value::String(segment.to_owned()))
    }

    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(EncodeError::mismatch(self, other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanDecoder;

impl Decoder for BooleanDecoder {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Borrowed("boolean")
    }

    fn decode(&self, segment: &str) -> Result<Value, DecodeError> {
        Ok(Value::Bool(segment == "true"))
    }

    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        match value {
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(EncodeError::mismatch(self, other)),
        }
    }
}

/// Parses whole numbers. Input that is not a valid `i64` becomes the
/// not-a-number sentinel instead of an error, the same coercion
/// [`FloatDecoder`] applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerDecoder;

impl Decoder for IntegerDecoder {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Borrowed("integer")
    }

    fn decode(&self, segment: &str) -> Result<Value, DecodeError> {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            return Ok(Value::Integer(0));
        }

        Ok(trimmed
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or(Value::Float(f64::NAN)))
    }

    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        match value {
            Value::Integer(i) => Ok(i.to_string()),
            // Only floats that decode back: the NaN sentinel and whole numbers in range.
            Value::Float(f) if f.is_nan() || (f.fract() == 0.0 && f.abs() < i64::MAX as f64) => {
                Ok(format_float(*f))
            }
            other => Err(EncodeError::mismatch(self, other)),
        }
    }
}

/// Parses floating point numbers, unparseable input becomes `NaN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatDecoder;

impl Decoder for FloatDecoder {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Borrowed("float")
    }

    fn decode(&self, segment: &str) -> Result<Value, DecodeError> {
        let trimmed = segment.trim();
        let value = match trimmed {
            "" => 0.0,
            "Infinity" | "+Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            number => number.parse::<f64>().unwrap_or(f64::NAN),
        };

        Ok(Value::Float(value))
    }

    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        match value {
            Value::Float(f) => Ok(format_float(*f)),
            Value::Integer(i) => Ok(i.to_string()),
            other => Err(EncodeError::mismatch(self, other)),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value == f64::INFINITY {
        "Infinity".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        value.to_string()
    }
}

/// Calendar day precision, rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateDecoder;

const DATE_FORMAT: &str = "%Y-%m-%d";

impl Decoder for DateDecoder {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Borrowed("date")
    }

    fn decode(&self, segment: &str) -> Result<Value, DecodeError> {
        NaiveDate::parse_from_str(segment, DATE_FORMAT)
            .or_else(|_| {
                DateTime::parse_from_rfc3339(segment).map(|dt| dt.with_timezone(&Utc).date_naive())
            })
            .map(Value::Date)
            .map_err(|_| DecodeError::Date(segment.to_owned()))
    }

    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        match value {
            Value::Date(date) => Ok(date.format(DATE_FORMAT).to_string()),
            Value::DateTime(dt) => Ok(dt.date_naive().format(DATE_FORMAT).to_string()),
            other => Err(EncodeError::mismatch(self, other)),
        }
    }
}

/// A full ISO-8601 instant, normalized to UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeDecoder;

impl Decoder for DateTimeDecoder {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Borrowed("datetime")
    }

    fn decode(&self, segment: &str) -> Result<Value, DecodeError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(segment) {
            return Ok(Value::DateTime(dt.with_timezone(&Utc)));
        }

        NaiveDate::parse_from_str(segment, DATE_FORMAT)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| Value::DateTime(midnight.and_utc()))
            .ok_or_else(|| DecodeError::DateTime(segment.to_owned()))
    }

    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        match value {
            Value::DateTime(dt) => Ok(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            other => Err(EncodeError::mismatch(self, other)),
        }
    }
}

/// A JSON list whose elements are converted with another decoder.
///
/// `["1","2"]` decoded with an [`IntegerDecoder`] element yields
/// `[1, 2]`; encoding goes the other way and always produces a list of
/// JSON strings.
#[derive(Debug, Clone)]
pub struct ArrayDecoder {
    element: Arc<dyn Decoder>,
}

impl ArrayDecoder {
    pub fn new(element: impl Decoder + 'static) -> Self {
        Self {
            element: Arc::new(element),
        }
    }

    pub fn element(&self) -> &dyn Decoder {
        self.element.as_ref()
    }
}

impl Decoder for ArrayDecoder {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Owned(format!("array<{}>", self.element.kind()))
    }

    fn decode(&self, segment: &str) -> Result<Value, DecodeError> {
        let parsed: serde_json::Value =
            serde_json::from_str(segment).map_err(|_| DecodeError::NotAnArray)?;

        let serde_json::Value::Array(items) = parsed else {
            return Err(DecodeError::NotAnArray);
        };

        items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => self.element.decode(s),
                other => self.element.decode(&other.to_string()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        let Value::Array(items) = value else {
            return Err(EncodeError::mismatch(self, value));
        };

        let encoded = items
            .iter()
            .map(|item| self.element.encode(item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(serde_json::to_string(&encoded)?)
    }
}

pub fn string(name: impl Into<String>) -> Param {
    StringDecoder.param(name)
}

pub fn boolean(name: impl Into<String>) -> Param {
    BooleanDecoder.param(name)
}

pub fn integer(name: impl Into<String>) -> Param {
    IntegerDecoder.param(name)
}

pub fn float(name: impl Into<String>) -> Param {
    FloatDecoder.param(name)
}

pub fn date(name: impl Into<String>) -> Param {
    DateDecoder.param(name)
}

pub fn datetime(name: impl Into<String>) -> Param {
    DateTimeDecoder.param(name)
}

/// A parameter holding a JSON list of `element` values.
pub fn array(element: impl Decoder + 'static, name: impl Into<String>) -> Param {
    ArrayDecoder::new(element).param(name)
}
