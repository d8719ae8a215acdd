//! Encode direction of the type adaptation layer.
//!
//! A host value becomes a [`Value`] through its [`Marshal`] impl. Types with
//! their own JSON or text representation implement [`MarshalJson`] or
//! [`MarshalText`] and route through [`marshal_json_hook`] /
//! [`marshal_text_hook`]; `#[derive(Marshal)]` with `#[json(hook = "...")]`
//! writes that glue. Everything else follows the structural rules below.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use base64::Engine;

use crate::error::{JsonError, Result};
use crate::escape::{write_string, write_string_bytes};
use crate::number::{format_float, FloatBits};
use crate::options::EncodeOptions;
use crate::scan::check_valid;
use crate::value::{ByteString, Number, Object, RawValue, Value};

/// Conversion of a host value into the ordered value model.
pub trait Marshal {
    fn marshal(&self, ctx: &mut Context) -> Result<Value>;

    /// Encoding under the `string` field option. Scalars wrap their JSON
    /// text in a string; other types ignore the option.
    fn marshal_quoted(&self, ctx: &mut Context) -> Result<Value> {
        self.marshal(ctx)
    }

    /// Whether the value counts as empty for the `omitempty` field option.
    fn is_empty_value(&self) -> bool {
        false
    }

    /// Encoding of an absent `Option<Self>`.
    fn marshal_absent(ctx: &mut Context) -> Result<Value>
    where
        Self: Sized,
    {
        let _ = ctx;
        Ok(Value::Null)
    }

    /// Encoding of a sequence of `Self`.
    fn marshal_slice(items: &[Self], ctx: &mut Context) -> Result<Value>
    where
        Self: Sized,
    {
        items
            .iter()
            .map(|item| item.marshal(ctx))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

/// JSON hook: the type writes its own JSON text.
pub trait MarshalJson {
    fn marshal_json(&self) -> Result<Vec<u8>>;

    /// Output for an absent `Option<Self>`; `None` encodes `null`.
    fn marshal_json_absent() -> Option<Result<Vec<u8>>>
    where
        Self: Sized,
    {
        None
    }
}

/// Text hook: the type renders itself as string content.
pub trait MarshalText {
    fn marshal_text(&self) -> Result<String>;
}

/// Map keys that can be rendered as member names.
pub trait MapKey {
    fn key_text(&self) -> Result<String>;
}

/// Result of adapting one host value, before it joins the value tree.
#[derive(Debug)]
pub enum Adaptation {
    /// Output of a JSON hook; must be valid JSON.
    Raw(Vec<u8>),
    /// Output of a text hook; becomes a JSON string.
    Text(String),
    Structural(Value),
}

/// Per-call encode state: output settings and the set of shared pointers
/// currently being walked.
#[derive(Debug)]
pub struct Context {
    escape_html: bool,
    active: HashSet<usize>,
}

impl Context {
    pub fn new(options: &EncodeOptions) -> Self {
        Context {
            escape_html: options.escape_html,
            active: HashSet::new(),
        }
    }

    pub fn escape_html(&self) -> bool {
        self.escape_html
    }

    /// Turns an adaptation result into a value, validating hook output.
    pub fn adapt(&mut self, adaptation: Adaptation, type_name: &str) -> Result<Value> {
        match adaptation {
            Adaptation::Raw(bytes) => {
                check_valid(&bytes).map_err(|e| JsonError::Hook {
                    method: "MarshalJSON",
                    type_name: type_name.to_string(),
                    source: Box::new(e),
                })?;
                Ok(Value::Raw(RawValue::new(bytes)))
            }
            Adaptation::Text(text) => Ok(Value::String(text)),
            Adaptation::Structural(value) => Ok(value),
        }
    }

    /// String value for bytes that may not be valid UTF-8.
    pub fn byte_string(&self, bytes: &[u8]) -> Value {
        match std::str::from_utf8(bytes) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => {
                let mut out = Vec::with_capacity(bytes.len() + 2);
                write_string_bytes(&mut out, bytes, self.escape_html);
                Value::Raw(RawValue::new(out))
            }
        }
    }

    /// Walks into a shared pointer, failing if it is already on the path.
    pub fn visit<F>(&mut self, addr: usize, type_name: &str, f: F) -> Result<Value>
    where
        F: FnOnce(&mut Context) -> Result<Value>,
    {
        if !self.active.insert(addr) {
            return Err(JsonError::UnsupportedValue(format!(
                "encountered a cycle via {type_name}"
            )));
        }
        let result = f(self);
        self.active.remove(&addr);
        result
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(&EncodeOptions::default())
    }
}

/// Adapts a value through its JSON hook.
pub fn marshal_json_hook<T: MarshalJson + ?Sized>(value: &T, ctx: &mut Context) -> Result<Value> {
    let type_name = short_type_name::<T>();
    let bytes = value.marshal_json().map_err(|e| hook_error("MarshalJSON", type_name, e))?;
    ctx.adapt(Adaptation::Raw(bytes), type_name)
}

/// Adapts an absent `Option<T>` through `T`'s JSON hook.
pub fn marshal_json_hook_absent<T: MarshalJson>(ctx: &mut Context) -> Result<Value> {
    let type_name = short_type_name::<T>();
    match T::marshal_json_absent() {
        None => Ok(Value::Null),
        Some(bytes) => {
            let bytes = bytes.map_err(|e| hook_error("MarshalJSON", type_name, e))?;
            ctx.adapt(Adaptation::Raw(bytes), type_name)
        }
    }
}

/// Adapts a value through its text hook.
pub fn marshal_text_hook<T: MarshalText + ?Sized>(value: &T, ctx: &mut Context) -> Result<Value> {
    let type_name = short_type_name::<T>();
    let text = value.marshal_text().map_err(|e| hook_error("MarshalText", type_name, e))?;
    ctx.adapt(Adaptation::Text(text), type_name)
}

fn hook_error(method: &'static str, type_name: &str, source: JsonError) -> JsonError {
    match source {
        hook @ JsonError::Hook { .. } => hook,
        source => JsonError::Hook {
            method,
            type_name: type_name.to_string(),
            source: Box::new(source),
        },
    }
}

/// Last path segment of a type name, e.g. `Point` for `my_crate::geo::Point`.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ============================================================================
// Scalars
// ============================================================================

impl Marshal for bool {
    fn marshal(&self, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::Bool(*self))
    }

    fn marshal_quoted(&self, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::String(self.to_string()))
    }

    fn is_empty_value(&self) -> bool {
        !*self
    }
}

macro_rules! marshal_int {
    ($($t:ty),*) => {$(
        impl Marshal for $t {
            fn marshal(&self, _ctx: &mut Context) -> Result<Value> {
                Ok(Value::Number(Number::from(*self)))
            }

            fn marshal_quoted(&self, _ctx: &mut Context) -> Result<Value> {
                Ok(Value::String(self.to_string()))
            }

            fn is_empty_value(&self) -> bool {
                *self == 0
            }
        }

        impl MapKey for $t {
            fn key_text(&self) -> Result<String> {
                Ok(self.to_string())
            }
        }
    )*};
}

marshal_int!(i8, i16, i32, i64, isize, u16, u32, u64, usize);

// `u8` also decides how byte sequences are encoded.
impl Marshal for u8 {
    fn marshal(&self, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::Number(Number::from(*self)))
    }

    fn marshal_quoted(&self, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::String(self.to_string()))
    }

    fn is_empty_value(&self) -> bool {
        *self == 0
    }

    fn marshal_slice(items: &[u8], _ctx: &mut Context) -> Result<Value> {
        Ok(Value::String(
            base64::engine::general_purpose::STANDARD.encode(items),
        ))
    }
}

impl MapKey for u8 {
    fn key_text(&self) -> Result<String> {
        Ok(self.to_string())
    }
}

macro_rules! marshal_float {
    ($t:ty, $bits:expr) => {
        impl Marshal for $t {
            fn marshal(&self, _ctx: &mut Context) -> Result<Value> {
                format_float(f64::from(*self), $bits).map(|text| Value::Number(Number::from(text)))
            }

            fn marshal_quoted(&self, _ctx: &mut Context) -> Result<Value> {
                format_float(f64::from(*self), $bits).map(Value::String)
            }

            fn is_empty_value(&self) -> bool {
                *self == 0.0
            }
        }
    };
}

marshal_float!(f32, FloatBits::F32);
marshal_float!(f64, FloatBits::F64);

impl Marshal for str {
    fn marshal(&self, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::String(self.to_string()))
    }

    /// The string is encoded once and the result encoded again as a string.
    fn marshal_quoted(&self, ctx: &mut Context) -> Result<Value> {
        let mut inner = Vec::with_capacity(self.len() + 2);
        write_string(&mut inner, self, ctx.escape_html());
        let mut outer = Vec::with_capacity(inner.len() + 8);
        write_string_bytes(&mut outer, &inner, false);
        Ok(Value::Raw(RawValue::new(outer)))
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Marshal for String {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        self.as_str().marshal(ctx)
    }

    fn marshal_quoted(&self, ctx: &mut Context) -> Result<Value> {
        self.as_str().marshal_quoted(ctx)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl MapKey for str {
    fn key_text(&self) -> Result<String> {
        Ok(self.to_string())
    }
}

impl MapKey for String {
    fn key_text(&self) -> Result<String> {
        Ok(self.clone())
    }
}

impl MapKey for bool {
    fn key_text(&self) -> Result<String> {
        Err(JsonError::UnsupportedValue("map key of type bool".into()))
    }
}

impl<K: MapKey + ?Sized> MapKey for &K {
    fn key_text(&self) -> Result<String> {
        (**self).key_text()
    }
}

// ============================================================================
// Pointers and wrappers
// ============================================================================

impl<T: Marshal + ?Sized> Marshal for &T {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        (**self).marshal(ctx)
    }

    fn marshal_quoted(&self, ctx: &mut Context) -> Result<Value> {
        (**self).marshal_quoted(ctx)
    }

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

impl<T: Marshal> Marshal for Box<T> {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        (**self).marshal(ctx)
    }

    fn marshal_quoted(&self, ctx: &mut Context) -> Result<Value> {
        (**self).marshal_quoted(ctx)
    }

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }

    fn marshal_absent(ctx: &mut Context) -> Result<Value> {
        T::marshal_absent(ctx)
    }
}

impl<T: Marshal> Marshal for Option<T> {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        match self {
            Some(v) => v.marshal(ctx),
            None => T::marshal_absent(ctx),
        }
    }

    fn marshal_quoted(&self, ctx: &mut Context) -> Result<Value> {
        match self {
            Some(v) => v.marshal_quoted(ctx),
            None => T::marshal_absent(ctx),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl<T: Marshal> Marshal for Rc<T> {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        let addr = Rc::as_ptr(self) as usize;
        ctx.visit(addr, short_type_name::<T>(), |ctx| (**self).marshal(ctx))
    }

    fn marshal_quoted(&self, ctx: &mut Context) -> Result<Value> {
        let addr = Rc::as_ptr(self) as usize;
        ctx.visit(addr, short_type_name::<T>(), |ctx| (**self).marshal_quoted(ctx))
    }

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }

    fn marshal_absent(ctx: &mut Context) -> Result<Value> {
        T::marshal_absent(ctx)
    }
}

impl<T: Marshal> Marshal for Arc<T> {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        let addr = Arc::as_ptr(self) as usize;
        ctx.visit(addr, short_type_name::<T>(), |ctx| (**self).marshal(ctx))
    }

    fn marshal_quoted(&self, ctx: &mut Context) -> Result<Value> {
        let addr = Arc::as_ptr(self) as usize;
        ctx.visit(addr, short_type_name::<T>(), |ctx| (**self).marshal_quoted(ctx))
    }

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }

    fn marshal_absent(ctx: &mut Context) -> Result<Value> {
        T::marshal_absent(ctx)
    }
}

impl<T: Marshal + ?Sized> Marshal for RefCell<T> {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        let inner = self.try_borrow().map_err(|_| {
            JsonError::UnsupportedValue(format!(
                "{} is mutably borrowed",
                short_type_name::<T>()
            ))
        })?;
        inner.marshal(ctx)
    }

    fn marshal_quoted(&self, ctx: &mut Context) -> Result<Value> {
        let inner = self.try_borrow().map_err(|_| {
            JsonError::UnsupportedValue(format!(
                "{} is mutably borrowed",
                short_type_name::<T>()
            ))
        })?;
        inner.marshal_quoted(ctx)
    }

    fn is_empty_value(&self) -> bool {
        self.try_borrow().map(|v| v.is_empty_value()).unwrap_or(false)
    }
}

// ============================================================================
// Sequences and mappings
// ============================================================================

impl<T: Marshal> Marshal for [T] {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        T::marshal_slice(self, ctx)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Marshal> Marshal for Vec<T> {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        T::marshal_slice(self, ctx)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

/// Fixed-size arrays stay arrays, even of bytes.
impl<T: Marshal, const N: usize> Marshal for [T; N] {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        self.iter()
            .map(|item| item.marshal(ctx))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn is_empty_value(&self) -> bool {
        N == 0
    }
}

/// Host mappings have no stable order; members are sorted by key text.
fn marshal_map<'a, K, V, I>(entries: I, len: usize, ctx: &mut Context) -> Result<Value>
where
    K: MapKey + 'a,
    V: Marshal + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    let mut keyed = Vec::with_capacity(len);
    for (k, v) in entries {
        keyed.push((k.key_text()?, v));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    let mut obj = Object::with_capacity(keyed.len());
    for (key, v) in keyed {
        let value = v.marshal(ctx)?;
        obj.push(key, value);
    }
    Ok(Value::Object(obj))
}

impl<K: MapKey, V: Marshal, S> Marshal for HashMap<K, V, S> {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        marshal_map(self.iter(), self.len(), ctx)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K: MapKey, V: Marshal> Marshal for BTreeMap<K, V> {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        marshal_map(self.iter(), self.len(), ctx)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

// ============================================================================
// Value model types
// ============================================================================

impl Marshal for Value {
    fn marshal(&self, _ctx: &mut Context) -> Result<Value> {
        Ok(self.clone())
    }

    fn is_empty_value(&self) -> bool {
        self.is_null()
    }
}

impl Marshal for Object {
    fn marshal(&self, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::Object(self.clone()))
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Marshal for Number {
    fn marshal(&self, _ctx: &mut Context) -> Result<Value> {
        self.encoded()?;
        Ok(Value::Number(self.clone()))
    }

    fn marshal_quoted(&self, _ctx: &mut Context) -> Result<Value> {
        self.encoded().map(|text| Value::String(text.to_string()))
    }

    fn is_empty_value(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Marshal for RawValue {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        if self.is_empty() {
            return Ok(Value::Null);
        }
        ctx.adapt(Adaptation::Raw(self.as_bytes().to_vec()), "RawValue")
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Marshal for ByteString {
    fn marshal(&self, ctx: &mut Context) -> Result<Value> {
        Ok(ctx.byte_string(self.as_bytes()))
    }

    fn is_empty_value(&self) -> bool {
        self.0.is_empty()
    }
}
