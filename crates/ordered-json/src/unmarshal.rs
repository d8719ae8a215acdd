//! Decode direction of the type adaptation layer.
//!
//! Impls pull values out of a [`Decoder`]. A JSON `null` leaves
//! non-nullable targets untouched and clears `Option`s; values of the wrong
//! kind are skipped and recorded as type mismatches.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use base64::Engine;

use crate::decoder::{Decoder, Kind, Scalar};
use crate::error::{JsonError, Result};
use crate::marshal::short_type_name;
use crate::number::is_valid_number;
use crate::value::{ByteString, Number, Object, RawValue, Value};

/// Conversion of input JSON into a host value, in place.
pub trait Unmarshal {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()>;

    /// Decoding under the `string` field option. Scalars expect their
    /// literal inside a JSON string; other types ignore the option.
    fn unmarshal_quoted(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        self.unmarshal(d)
    }

    /// Decoding of a sequence of `Self` into `items`, replacing its content.
    fn unmarshal_vec(items: &mut Vec<Self>, d: &mut Decoder<'_>) -> Result<()>
    where
        Self: Sized + Default,
    {
        match d.peek_kind()? {
            Kind::Null => {
                d.skip()?;
                items.clear();
            }
            Kind::Array => {
                items.clear();
                d.array(|d, _| {
                    let mut item = Self::default();
                    item.unmarshal(d)?;
                    items.push(item);
                    Ok(())
                })?;
            }
            kind => {
                d.skip()?;
                d.type_mismatch(kind.name(), "array");
            }
        }
        Ok(())
    }
}

/// JSON hook: the type parses its own JSON text, including `null`.
pub trait UnmarshalJson {
    fn unmarshal_json(&mut self, raw: &[u8]) -> Result<()>;
}

/// Text hook: the type parses the content of a JSON string.
pub trait UnmarshalText {
    fn unmarshal_text(&mut self, text: &str) -> Result<()>;
}

/// Map keys that can be parsed back from member names.
pub trait FromMapKey: Sized {
    fn from_map_key(key: &str) -> Result<Self>;
}

/// Hands the exact span of the next value to the JSON hook.
pub fn unmarshal_json_hook<T: UnmarshalJson + ?Sized>(target: &mut T, d: &mut Decoder<'_>) -> Result<()> {
    let raw = d.skip()?;
    target.unmarshal_json(raw)
}

/// Hands the content of the next JSON string to the text hook.
pub fn unmarshal_text_hook<T: UnmarshalText + ?Sized>(target: &mut T, d: &mut Decoder<'_>) -> Result<()> {
    match d.scalar()? {
        Scalar::Null => Ok(()),
        Scalar::String(text) => target.unmarshal_text(&text),
        other => {
            d.type_mismatch(other.describe(), short_type_name::<T>());
            Ok(())
        }
    }
}

// ============================================================================
// Scalars
// ============================================================================

impl Unmarshal for bool {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        match d.scalar()? {
            Scalar::Null => {}
            Scalar::Bool(b) => *self = b,
            other => d.type_mismatch(other.describe(), "bool"),
        }
        Ok(())
    }

    fn unmarshal_quoted(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        if let Some(text) = d.quoted("bool")? {
            match text.as_str() {
                "true" => *self = true,
                "false" => *self = false,
                "null" => {}
                _ => d.invalid_quoted(&text, "bool"),
            }
        }
        Ok(())
    }
}

macro_rules! unmarshal_int {
    ($($t:ty),*) => {$(
        impl Unmarshal for $t {
            fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
                match d.scalar()? {
                    Scalar::Null => {}
                    Scalar::Number(text) => match d.parse_integer::<$t>(text) {
                        Some(v) => *self = v,
                        None => d.type_mismatch(format!("number {text}"), stringify!($t)),
                    },
                    other => d.type_mismatch(other.describe(), stringify!($t)),
                }
                Ok(())
            }

            fn unmarshal_quoted(&mut self, d: &mut Decoder<'_>) -> Result<()> {
                if let Some(text) = d.quoted(stringify!($t))? {
                    if !is_valid_number(&text) {
                        d.invalid_quoted(&text, stringify!($t));
                    } else {
                        match d.parse_integer::<$t>(&text) {
                            Some(v) => *self = v,
                            None => d.type_mismatch(format!("number {text}"), stringify!($t)),
                        }
                    }
                }
                Ok(())
            }
        }

        impl FromMapKey for $t {
            fn from_map_key(key: &str) -> Result<Self> {
                key.parse().map_err(|_| JsonError::UnmarshalType {
                    value: format!("number {key}"),
                    target: stringify!($t).to_string(),
                    offset: 0,
                    field: None,
                })
            }
        }
    )*};
}

unmarshal_int!(i8, i16, i32, i64, isize, u16, u32, u64, usize);

impl Unmarshal for u8 {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        match d.scalar()? {
            Scalar::Null => {}
            Scalar::Number(text) => match d.parse_integer::<u8>(text) {
                Some(v) => *self = v,
                None => d.type_mismatch(format!("number {text}"), "u8"),
            },
            other => d.type_mismatch(other.describe(), "u8"),
        }
        Ok(())
    }

    /// Byte sequences come as base64 strings, or as arrays of numbers.
    fn unmarshal_vec(items: &mut Vec<u8>, d: &mut Decoder<'_>) -> Result<()> {
        match d.peek_kind()? {
            Kind::String => {
                let text = d.read_string()?;
                *items = base64::engine::general_purpose::STANDARD.decode(text.as_bytes())?;
            }
            Kind::Null => {
                d.skip()?;
                items.clear();
            }
            Kind::Array => {
                items.clear();
                d.array(|d, _| {
                    let mut b = 0u8;
                    b.unmarshal(d)?;
                    items.push(b);
                    Ok(())
                })?;
            }
            kind => {
                d.skip()?;
                d.type_mismatch(kind.name(), "[u8]");
            }
        }
        Ok(())
    }
}

macro_rules! unmarshal_float {
    ($($t:ty),*) => {$(
        impl Unmarshal for $t {
            fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
                match d.scalar()? {
                    Scalar::Null => {}
                    Scalar::Number(text) => match text.parse::<$t>() {
                        Ok(v) if v.is_finite() => *self = v,
                        _ => d.type_mismatch(format!("number {text}"), stringify!($t)),
                    },
                    other => d.type_mismatch(other.describe(), stringify!($t)),
                }
                Ok(())
            }

            fn unmarshal_quoted(&mut self, d: &mut Decoder<'_>) -> Result<()> {
                if let Some(text) = d.quoted(stringify!($t))? {
                    if !is_valid_number(&text) {
                        d.invalid_quoted(&text, stringify!($t));
                    } else {
                        match text.parse::<$t>() {
                            Ok(v) if v.is_finite() => *self = v,
                            _ => d.type_mismatch(format!("number {text}"), stringify!($t)),
                        }
                    }
                }
                Ok(())
            }
        }
    )*};
}

unmarshal_float!(f32, f64);

impl Unmarshal for String {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        match d.scalar()? {
            Scalar::Null => {}
            Scalar::String(s) => *self = s.into_owned(),
            other => d.type_mismatch(other.describe(), "String"),
        }
        Ok(())
    }

    /// The string content must itself be a JSON string literal.
    fn unmarshal_quoted(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        if let Some(text) = d.quoted("String")? {
            match d.string_literal(&text) {
                Some(s) => *self = s,
                None if text == "null" => {}
                None => d.invalid_quoted(&text, "String"),
            }
        }
        Ok(())
    }
}

impl FromMapKey for String {
    fn from_map_key(key: &str) -> Result<Self> {
        Ok(key.to_string())
    }
}

// ============================================================================
// Pointers and wrappers
// ============================================================================

impl<T: Unmarshal + ?Sized> Unmarshal for Box<T> {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        (**self).unmarshal(d)
    }

    fn unmarshal_quoted(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        (**self).unmarshal_quoted(d)
    }
}

/// `null` clears the option; anything else decodes into the existing value
/// or a freshly allocated default.
impl<T: Unmarshal + Default> Unmarshal for Option<T> {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        if d.peek_kind()? == Kind::Null {
            d.skip()?;
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).unmarshal(d)
    }

    fn unmarshal_quoted(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        if d.peek_kind()? == Kind::Null {
            d.skip()?;
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).unmarshal_quoted(d)
    }
}

impl<T: Unmarshal + ?Sized> Unmarshal for std::cell::RefCell<T> {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        self.get_mut().unmarshal(d)
    }
}

// ============================================================================
// Sequences and mappings
// ============================================================================

impl<T: Unmarshal + Default> Unmarshal for Vec<T> {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        T::unmarshal_vec(self, d)
    }
}

/// Extra input elements are dropped; missing ones reset to the default.
impl<T: Unmarshal + Default, const N: usize> Unmarshal for [T; N] {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        match d.peek_kind()? {
            Kind::Null => {
                d.skip()?;
            }
            Kind::Array => {
                let mut count = 0;
                d.array(|d, i| {
                    count = i + 1;
                    match self.get_mut(i) {
                        Some(slot) => slot.unmarshal(d),
                        None => d.skip().map(drop),
                    }
                })?;
                for slot in self.iter_mut().skip(count) {
                    *slot = T::default();
                }
            }
            kind => {
                d.skip()?;
                d.type_mismatch(kind.name(), "array");
            }
        }
        Ok(())
    }
}

fn unmarshal_map<K, V, F>(d: &mut Decoder<'_>, mut insert: F) -> Result<bool>
where
    K: FromMapKey,
    V: Unmarshal + Default,
    F: FnMut(K, V),
{
    match d.peek_kind()? {
        Kind::Null => {
            d.skip()?;
            Ok(false)
        }
        Kind::Object => {
            d.object(|d, key| match K::from_map_key(key) {
                Ok(k) => {
                    let mut v = V::default();
                    v.unmarshal(d)?;
                    insert(k, v);
                    Ok(())
                }
                Err(err) => {
                    d.save_error(err);
                    d.skip().map(drop)
                }
            })?;
            Ok(true)
        }
        kind => {
            d.skip()?;
            d.type_mismatch(kind.name(), "map");
            Ok(true)
        }
    }
}

impl<K, V, S> Unmarshal for HashMap<K, V, S>
where
    K: FromMapKey + Eq + Hash,
    V: Unmarshal + Default,
    S: BuildHasher,
{
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        let mut entries = Vec::new();
        if !unmarshal_map(d, |k: K, v: V| entries.push((k, v)))? {
            self.clear();
        }
        self.extend(entries);
        Ok(())
    }
}

impl<K, V> Unmarshal for BTreeMap<K, V>
where
    K: FromMapKey + Ord,
    V: Unmarshal + Default,
{
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        let mut entries = Vec::new();
        if !unmarshal_map(d, |k: K, v: V| entries.push((k, v)))? {
            self.clear();
        }
        self.extend(entries);
        Ok(())
    }
}

// ============================================================================
// Value model types
// ============================================================================

impl Unmarshal for Value {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        *self = d.value()?;
        Ok(())
    }
}

/// Members are appended in input order, duplicates included.
impl Unmarshal for Object {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        match d.peek_kind()? {
            Kind::Null => {
                d.skip()?;
                self.clear();
            }
            Kind::Object => {
                self.clear();
                d.object(|d, key| {
                    let value = d.value()?;
                    self.push(key, value);
                    Ok(())
                })?;
            }
            kind => {
                d.skip()?;
                d.type_mismatch(kind.name(), "Object");
            }
        }
        Ok(())
    }
}

impl Unmarshal for Number {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        match d.scalar()? {
            Scalar::Null => {}
            Scalar::Number(text) => *self = Number::from(text),
            Scalar::String(text) if is_valid_number(&text) => {
                *self = Number::from(text.into_owned())
            }
            Scalar::String(text) => return Err(JsonError::InvalidNumber(text.into_owned())),
            other => d.type_mismatch(other.describe(), "Number"),
        }
        Ok(())
    }
}

impl Unmarshal for RawValue {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        *self = RawValue::new(d.skip()?);
        Ok(())
    }
}

impl Unmarshal for ByteString {
    fn unmarshal(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        match d.scalar()? {
            Scalar::Null => {}
            Scalar::String(s) => self.0 = s.into_owned().into_bytes(),
            other => d.type_mismatch(other.describe(), "ByteString"),
        }
        Ok(())
    }
}
