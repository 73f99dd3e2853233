//! The tagged union produced by every decoding step.
//!
//! Parsing routines hand [`Decoded`] values to setter closures, which take
//! the payload back out with the `into_*` accessors. The accessors treat
//! null as a first-class outcome (`Ok(None)`) and a wrong variant as a
//! wiring mistake surfaced as a configuration error, never as a panic.

use std::any::Any;
use std::fmt;

use serde_json::Value;

use crate::error::Error;

/// Position of an element inside a decoded sequence.
///
/// JSON arrays yield [`ArrayKey::Index`]; associative objects decoded in
/// sequence position yield [`ArrayKey::Key`] and keep their insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    Index(usize),
    Key(String),
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Index(i) => write!(f, "{i}"),
            ArrayKey::Key(k) => f.write_str(k),
        }
    }
}

impl From<usize> for ArrayKey {
    fn from(i: usize) -> Self {
        ArrayKey::Index(i)
    }
}

impl From<&str> for ArrayKey {
    fn from(k: &str) -> Self {
        ArrayKey::Key(k.to_owned())
    }
}

/// A value produced by one decoding step.
pub enum Decoded {
    /// Explicit null in the document.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A parsed timestamp with its original offset preserved.
    DateTime(chrono::DateTime<chrono::FixedOffset>),
    /// The raw subtree, passed through without interpretation.
    Raw(Value),
    /// An ordered sequence of decoded elements.
    Array(Vec<(ArrayKey, Decoded)>),
    /// A fully decoded domain object.
    Object(Box<dyn Any>),
}

impl fmt::Debug for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoded::Null => f.write_str("Null"),
            Decoded::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Decoded::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Decoded::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Decoded::String(v) => f.debug_tuple("String").field(v).finish(),
            Decoded::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
            Decoded::Raw(v) => f.debug_tuple("Raw").field(v).finish(),
            Decoded::Array(v) => f
                .debug_tuple("Array")
                .field(&format_args!("<{} elements>", v.len()))
                .finish(),
            Decoded::Object(_) => f.write_str("Object(<dyn Any>)"),
        }
    }
}

fn take_error(want: &'static str, got: &'static str) -> Error {
    Error::config(format!("cannot take {want} out of a {got} value"))
}

impl Decoded {
    /// Short name of the carried variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Decoded::Null => "null",
            Decoded::Bool(_) => "boolean",
            Decoded::Int(_) => "integer",
            Decoded::Float(_) => "float",
            Decoded::String(_) => "string",
            Decoded::DateTime(_) => "datetime",
            Decoded::Raw(_) => "raw",
            Decoded::Array(_) => "array",
            Decoded::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Decoded::Null)
    }

    /// Take a boolean out; null becomes `None`.
    pub fn into_bool(self) -> Result<Option<bool>, Error> {
        match self {
            Decoded::Null => Ok(None),
            Decoded::Bool(v) => Ok(Some(v)),
            other => Err(take_error("boolean", other.kind())),
        }
    }

    /// Take an integer out; null becomes `None`.
    pub fn into_int(self) -> Result<Option<i64>, Error> {
        match self {
            Decoded::Null => Ok(None),
            Decoded::Int(v) => Ok(Some(v)),
            other => Err(take_error("integer", other.kind())),
        }
    }

    /// Take a float out; integers widen losslessly, null becomes `None`.
    pub fn into_float(self) -> Result<Option<f64>, Error> {
        match self {
            Decoded::Null => Ok(None),
            Decoded::Float(v) => Ok(Some(v)),
            Decoded::Int(v) => Ok(Some(v as f64)),
            other => Err(take_error("float", other.kind())),
        }
    }

    /// Take a string out; null becomes `None`.
    pub fn into_string(self) -> Result<Option<String>, Error> {
        match self {
            Decoded::Null => Ok(None),
            Decoded::String(v) => Ok(Some(v)),
            other => Err(take_error("string", other.kind())),
        }
    }

    /// Take a timestamp out; null becomes `None`.
    pub fn into_datetime(
        self,
    ) -> Result<Option<chrono::DateTime<chrono::FixedOffset>>, Error> {
        match self {
            Decoded::Null => Ok(None),
            Decoded::DateTime(v) => Ok(Some(v)),
            other => Err(take_error("datetime", other.kind())),
        }
    }

    /// Take the raw subtree out; null becomes `None`.
    pub fn into_raw(self) -> Result<Option<Value>, Error> {
        match self {
            Decoded::Null => Ok(None),
            Decoded::Raw(v) => Ok(Some(v)),
            other => Err(take_error("raw", other.kind())),
        }
    }

    /// Take a decoded sequence out with its keys; null becomes `None`.
    pub fn into_array(self) -> Result<Option<Vec<(ArrayKey, Decoded)>>, Error> {
        match self {
            Decoded::Null => Ok(None),
            Decoded::Array(v) => Ok(Some(v)),
            other => Err(take_error("array", other.kind())),
        }
    }

    /// Downcast a decoded object to its concrete type.
    ///
    /// Arguments:
    /// * `T` - the type the caller registered for this location.
    ///
    /// Returns: `Ok(None)` for null, the object for a matching downcast, and
    /// a configuration error when the registered type and the setter
    /// disagree.
    pub fn into_object<T: 'static>(self) -> Result<Option<Box<T>>, Error> {
        match self {
            Decoded::Null => Ok(None),
            Decoded::Object(boxed) => boxed.downcast::<T>().map(Some).map_err(|_| {
                Error::config(format!(
                    "decoded object is not a {}",
                    std::any::type_name::<T>()
                ))
            }),
            other => Err(take_error("object", other.kind())),
        }
    }

    /// Take a decoded object out untyped; null becomes `None`.
    ///
    /// For discriminated families the concrete type depends on the document,
    /// so a setter cannot commit to one [`Self::into_object`] target. This
    /// hands over the box as-is; `Box::downcast` keeps the value on failure,
    /// letting the caller try each member of the family in turn.
    pub fn into_any(self) -> Result<Option<Box<dyn Any>>, Error> {
        match self {
            Decoded::Null => Ok(None),
            Decoded::Object(boxed) => Ok(Some(boxed)),
            other => Err(take_error("object", other.kind())),
        }
    }

    /// Downcast every element of a decoded sequence, dropping the keys.
    pub fn into_objects<T: 'static>(self) -> Result<Option<Vec<T>>, Error> {
        match self.into_array()? {
            None => Ok(None),
            Some(elements) => {
                let mut out = Vec::with_capacity(elements.len());
                for (_, element) in elements {
                    match element.into_object::<T>()? {
                        Some(boxed) => out.push(*boxed),
                        None => continue, // null elements are skipped
                    }
                }
                Ok(Some(out))
            }
        }
    }
}
