use num_traits::ToPrimitive;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// The kinds of atomic values that can appear in a description.
///
/// Scale boundaries, constants and default values are parsed according to the kind
/// of the value they describe: internal (coded) values use the kind of the base data
/// type of the coded type, physical values use the kind of the physical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    UnsignedInteger,
    Float,
    String,
    Bytes,
    Boolean,
}

/// A single atomic value, either internal or physical
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Bool(bool),
}

/// The value of a parameter as supplied by the caller of an encode operation
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Atomic(Value),
    /// values for the parameters of a sub-structure
    Struct(ParameterValueDict),
    /// a table row selected by its short name, with the values of the row's structure
    TableRow { row: String, value: ParameterValueDict },
}

pub type ParameterValueDict = HashMap<String, ParameterValue>;

/// The base data types of coded and physical values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    AInt32,
    AUint32,
    AFloat32,
    AFloat64,
    AAsciiString,
    AUtf8String,
    AUnicode2String,
    ABytefield,
}

impl ValueKind {
    /// interpret `text` as a value of this kind
    ///
    /// Integers may be given in decimal or with a `0x` prefix, byte sequences are hex strings.
    pub fn parse_value(self, text: &str) -> Result<Value, String> {
        let trimmed = text.trim();
        match self {
            Self::Integer => parse_int(trimmed)
                .map(Value::Int)
                .ok_or_else(|| format!("\"{trimmed}\" is not an integer")),
            Self::UnsignedInteger => parse_uint(trimmed)
                .map(Value::UInt)
                .ok_or_else(|| format!("\"{trimmed}\" is not an unsigned integer")),
            Self::Float => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("\"{trimmed}\" is not a floating point number")),
            Self::String => Ok(Value::String(text.to_string())),
            Self::Bytes => {
                let digits: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
                hex::decode(&digits)
                    .map(Value::Bytes)
                    .map_err(|err| format!("\"{trimmed}\" is not a hex byte sequence: {err}"))
            }
            Self::Boolean => match trimmed {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("\"{trimmed}\" is not a boolean")),
            },
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::UnsignedInteger | Self::Float | Self::Boolean
        )
    }
}

fn parse_int(text: &str) -> Option<i64> {
    if let Some(hexdigits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hexdigits, 16).ok()
    } else if let Some(hexdigits) = text.strip_prefix("-0x") {
        i64::from_str_radix(hexdigits, 16).ok().map(|val| -val)
    } else {
        text.parse().ok()
    }
}

fn parse_uint(text: &str) -> Option<u64> {
    if let Some(hexdigits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hexdigits, 16).ok()
    } else {
        text.parse().ok()
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Integer,
            Self::UInt(_) => ValueKind::UnsignedInteger,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Bool(_) => ValueKind::Boolean,
        }
    }

    /// the neutral value of a kind
    ///
    /// Used as a placeholder when an encoding continues after a warning.
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Integer => Self::Int(0),
            ValueKind::UnsignedInteger => Self::UInt(0),
            ValueKind::Float => Self::Float(0.0),
            ValueKind::String => Self::String(String::new()),
            ValueKind::Bytes => Self::Bytes(Vec::new()),
            ValueKind::Boolean => Self::Bool(false),
        }
    }

    /// numerical interpretation of the value; `None` for strings and byte sequences
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(val) => val.to_f64(),
            Self::UInt(val) => val.to_f64(),
            Self::Float(val) => Some(*val),
            Self::Bool(val) => Some(if *val { 1.0 } else { 0.0 }),
            Self::String(_) | Self::Bytes(_) => None,
        }
    }

    /// create a value of the given kind from a floating point number.
    ///
    /// Integers are rounded to the nearest value; `None` if the number does not fit.
    pub fn from_f64(kind: ValueKind, number: f64) -> Option<Self> {
        if !number.is_finite() {
            return None;
        }
        match kind {
            ValueKind::Integer => num_traits::cast::<f64, i64>(number.round()).map(Self::Int),
            ValueKind::UnsignedInteger => {
                num_traits::cast::<f64, u64>(number.round()).map(Self::UInt)
            }
            ValueKind::Float => Some(Self::Float(number)),
            ValueKind::Boolean => Some(Self::Bool(number != 0.0)),
            ValueKind::String | ValueKind::Bytes => None,
        }
    }

    /// convert the value to another kind without changing its meaning
    ///
    /// Numbers convert between each other as long as the target can represent them,
    /// strings are only converted to byte sequences (UTF-8) and vice versa.
    pub fn to_kind(&self, kind: ValueKind) -> Option<Self> {
        if self.kind() == kind {
            return Some(self.clone());
        }
        match (self, kind) {
            (Self::Int(val), ValueKind::UnsignedInteger) => val.to_u64().map(Self::UInt),
            (Self::UInt(val), ValueKind::Integer) => val.to_i64().map(Self::Int),
            (Self::Int(_) | Self::UInt(_) | Self::Bool(_), ValueKind::Float) => {
                self.as_f64().map(Self::Float)
            }
            (Self::Float(val), ValueKind::Integer | ValueKind::UnsignedInteger) => {
                // only exact conversions, rounding belongs to the computation method
                if val.fract() == 0.0 {
                    Self::from_f64(kind, *val)
                } else {
                    None
                }
            }
            (Self::Int(_) | Self::UInt(_) | Self::Float(_), ValueKind::Boolean) => {
                self.as_f64().map(|val| Self::Bool(val != 0.0))
            }
            (Self::Bool(val), ValueKind::Integer) => Some(Self::Int(i64::from(*val))),
            (Self::Bool(val), ValueKind::UnsignedInteger) => Some(Self::UInt(u64::from(*val))),
            (Self::String(text), ValueKind::Bytes) => Some(Self::Bytes(text.as_bytes().to_vec())),
            (Self::Bytes(bytes), ValueKind::String) => {
                String::from_utf8(bytes.clone()).ok().map(Self::String)
            }
            _ => None,
        }
    }

    /// equality across numeric kinds: `Int(5)`, `UInt(5)` and `Float(5.0)` are the same value
    pub fn matches(&self, other: &Value) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::UInt(a), Self::UInt(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::UInt(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (Self::UInt(a), Self::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(val) => write!(f, "{val}"),
            Self::UInt(val) => write!(f, "{val}"),
            Self::Float(val) => write!(f, "{val}"),
            Self::String(text) => write!(f, "\"{text}\""),
            Self::Bytes(bytes) => write!(f, "0x{}", hex::encode_upper(bytes)),
            Self::Bool(val) => write!(f, "{val}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Value> for ParameterValue {
    fn from(value: Value) -> Self {
        Self::Atomic(value)
    }
}

impl From<u64> for ParameterValue {
    fn from(value: u64) -> Self {
        Self::Atomic(Value::UInt(value))
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Atomic(Value::Float(value))
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Atomic(Value::String(value.to_string()))
    }
}

impl DataType {
    pub fn kind(self) -> ValueKind {
        match self {
            Self::AInt32 => ValueKind::Integer,
            Self::AUint32 => ValueKind::UnsignedInteger,
            Self::AFloat32 | Self::AFloat64 => ValueKind::Float,
            Self::AAsciiString | Self::AUtf8String | Self::AUnicode2String => ValueKind::String,
            Self::ABytefield => ValueKind::Bytes,
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A_INT32" => Ok(Self::AInt32),
            "A_UINT32" => Ok(Self::AUint32),
            "A_FLOAT32" => Ok(Self::AFloat32),
            "A_FLOAT64" => Ok(Self::AFloat64),
            "A_ASCIISTRING" => Ok(Self::AAsciiString),
            "A_UTF8STRING" => Ok(Self::AUtf8String),
            "A_UNICODE2STRING" => Ok(Self::AUnicode2String),
            "A_BYTEFIELD" => Ok(Self::ABytefield),
            _ => Err(format!("unknown data type {s}")),
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AInt32 => "A_INT32",
            Self::AUint32 => "A_UINT32",
            Self::AFloat32 => "A_FLOAT32",
            Self::AFloat64 => "A_FLOAT64",
            Self::AAsciiString => "A_ASCIISTRING",
            Self::AUtf8String => "A_UTF8STRING",
            Self::AUnicode2String => "A_UNICODE2STRING",
            Self::ABytefield => "A_BYTEFIELD",
        })
    }
}
