//! Ordered JSON value model.
//!
//! Objects are member sequences, not dictionaries: insertion order is kept
//! and duplicate keys are allowed. Equality is structural and order
//! sensitive for arrays and objects alike.

use std::fmt;

use crate::error::{JsonError, Result};
use crate::number::{format_float, is_valid_number, FloatBits};

/// A JSON document.
///
/// Cloning and dropping walk the tree with a heap stack, so documents nested
/// as deep as the decoder accepts are safe on small thread stacks.
#[derive(Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    /// Pre-encoded JSON emitted as is, such as the output of a JSON hook.
    Raw(RawValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Name of the JSON kind, as used in type mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Raw(_) => "raw",
        }
    }
}

/// A container being cloned: the source children still to visit and the
/// copies made so far.
enum CloneFrame<'a> {
    Array(std::slice::Iter<'a, Value>, Vec<Value>),
    Object(std::slice::Iter<'a, Member>, Vec<Member>, String),
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let mut stack: Vec<CloneFrame<'_>> = Vec::new();
        let mut next = self;
        loop {
            let mut done = match next {
                Value::Array(items) => {
                    stack.push(CloneFrame::Array(items.iter(), Vec::with_capacity(items.len())));
                    None
                }
                Value::Object(obj) => {
                    stack.push(CloneFrame::Object(
                        obj.members.iter(),
                        Vec::with_capacity(obj.len()),
                        String::new(),
                    ));
                    None
                }
                Value::Null => Some(Value::Null),
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Number(n) => Some(Value::Number(n.clone())),
                Value::String(s) => Some(Value::String(s.clone())),
                Value::Raw(raw) => Some(Value::Raw(raw.clone())),
            };
            // Attach finished copies to their parents until a container has
            // a child left to visit.
            loop {
                let Some(top) = stack.last_mut() else {
                    return done.unwrap_or_default();
                };
                let child = match top {
                    CloneFrame::Array(iter, items) => {
                        items.extend(done.take());
                        iter.next()
                    }
                    CloneFrame::Object(iter, members, key) => {
                        if let Some(value) = done.take() {
                            members.push(Member {
                                key: std::mem::take(key),
                                value,
                            });
                        }
                        iter.next().map(|member| {
                            key.clone_from(&member.key);
                            &member.value
                        })
                    }
                };
                if let Some(child) = child {
                    next = child;
                    break;
                }
                done = stack.pop().map(|frame| match frame {
                    CloneFrame::Array(_, items) => Value::Array(items),
                    CloneFrame::Object(_, members, _) => Value::Object(Object { members }),
                });
            }
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = match self {
            Value::Array(items) if !items.is_empty() => std::mem::take(items),
            Value::Object(obj) if !obj.is_empty() => {
                obj.members.drain(..).map(|m| m.value).collect()
            }
            _ => return,
        };
        // Children are emptied before they drop, so each drop below is
        // shallow.
        while let Some(mut value) = pending.pop() {
            match &mut value {
                Value::Array(items) => pending.append(items),
                Value::Object(obj) => pending.extend(obj.members.drain(..).map(|m| m.value)),
                _ => {}
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(Number::from(n))
            }
        }
    )*};
}

value_from_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// One key/value pair of an [`Object`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Member {
    pub key: String,
    pub value: Value,
}

impl Member {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Member {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An ordered sequence of members.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    members: Vec<Member>,
}

impl Object {
    pub fn new() -> Self {
        Object::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Object {
            members: Vec::with_capacity(capacity),
        }
    }

    /// Appends a member; an existing member with the same key is kept.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.members.push(Member::new(key, value));
    }

    pub fn push_member(&mut self, member: Member) {
        self.members.push(member);
    }

    /// Member at `index` in insertion order.
    pub fn get(&self, index: usize) -> Option<&Member> {
        self.members.get(index)
    }

    /// Value of the first member named `key`.
    pub fn find(&self, key: &str) -> Option<&Value> {
        self.members.iter().find(|m| m.key == key).map(|m| &m.value)
    }

    /// Values of every member named `key`, in order.
    pub fn find_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.members
            .iter()
            .filter(move |m| m.key == key)
            .map(|m| &m.value)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Member> {
        self.members.iter()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Member> {
        self.members
    }
}

impl From<Vec<Member>> for Object {
    fn from(members: Vec<Member>) -> Self {
        Object { members }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Object {
            members: iter.into_iter().map(|(k, v)| Member::new(k, v)).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Object {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.members
            .extend(iter.into_iter().map(|(k, v)| Member::new(k, v)));
    }
}

impl IntoIterator for Object {
    type Item = Member;
    type IntoIter = std::vec::IntoIter<Member>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = &'a Member;
    type IntoIter = std::slice::Iter<'a, Member>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

/// A JSON number kept as its decimal text.
///
/// The text is not checked on construction so that invalid numbers can be
/// represented and rejected at encode time; [`Number::parse`] checks eagerly.
/// An empty number encodes as `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Number(String);

impl Number {
    /// Builds a number from text that must match the JSON number grammar.
    pub fn parse(text: &str) -> Result<Self> {
        if is_valid_number(text) {
            Ok(Number(text.to_string()))
        } else {
            Err(JsonError::InvalidNumber(text.to_string()))
        }
    }

    pub fn from_f64(f: f64) -> Result<Self> {
        format_float(f, FloatBits::F64).map(Number)
    }

    pub fn from_f32(f: f32) -> Result<Self> {
        format_float(f64::from(f), FloatBits::F32).map(Number)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        is_valid_number(&self.0)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    pub fn as_f64(&self) -> Option<f64> {
        if !self.is_valid() {
            return None;
        }
        self.0.parse().ok().filter(|f: &f64| f.is_finite())
    }

    /// Text written to the output: the stored text, or `0` when empty.
    pub(crate) fn encoded(&self) -> Result<&str> {
        if self.0.is_empty() {
            return Ok("0");
        }
        if !self.is_valid() {
            return Err(JsonError::InvalidNumber(self.0.clone()));
        }
        Ok(&self.0)
    }
}

impl From<String> for Number {
    fn from(text: String) -> Self {
        Number(text)
    }
}

impl From<&str> for Number {
    fn from(text: &str) -> Self {
        Number(text.to_string())
    }
}

macro_rules! number_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Number {
            fn from(n: $t) -> Self {
                Number(n.to_string())
            }
        }
    )*};
}

number_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pre-encoded JSON text.
///
/// Encoding compacts and validates it; an empty raw value encodes as `null`.
/// Decoding into a `RawValue` copies the matched input span verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RawValue(Vec<u8>);

impl RawValue {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        RawValue(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.0).map_err(|e| JsonError::InvalidUtf8 {
            offset: e.valid_up_to(),
        })
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue(s.as_bytes().to_vec())
    }
}

/// A string held as raw bytes.
///
/// Bytes that are not valid UTF-8 are escaped one by one as `\u00XX` on
/// encode, so byte strings coming from foreign sources survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ByteString(pub Vec<u8>);

impl ByteString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.0).map_err(|e| JsonError::InvalidUtf8 {
            offset: e.valid_up_to(),
        })
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        ByteString(bytes.to_vec())
    }
}

impl From<&str> for ByteString {
    fn from(s: &str) -> Self {
        ByteString(s.as_bytes().to_vec())
    }
}
