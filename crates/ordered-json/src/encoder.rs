//! Value tree to bytes.
//!
//! Encoding runs in two steps: the host value is adapted into a [`Value`]
//! through its [`Marshal`] impl, then the tree is written out. Nothing is
//! returned if either step fails.
//!
//! # Example
//! ```
//! use ordered_json::{encode, Object};
//!
//! let mut obj = Object::new();
//! obj.push("b", 1);
//! obj.push("a", "<x>");
//! assert_eq!(
//!     encode(&obj).unwrap(),
//!     br#"{"b":1,"a":"\u003Cx\u003E"}"#.to_vec()
//! );
//! ```

use crate::decoder::decode_into;
use crate::error::{JsonError, Result};
use crate::escape::write_string;
use crate::format::{compact, indent};
use crate::marshal::{Context, Marshal};
use crate::options::EncodeOptions;
use crate::unmarshal::Unmarshal;
use crate::value::{Member, Value};

/// Encodes `value` compactly with HTML escaping.
pub fn encode<T: Marshal + ?Sized>(value: &T) -> Result<Vec<u8>> {
    encode_with(value, &EncodeOptions::default())
}

/// Encodes `value` with explicit options.
pub fn encode_with<T: Marshal + ?Sized>(value: &T, options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut ctx = Context::new(options);
    let tree = value.marshal(&mut ctx)?;
    let mut out = Vec::new();
    write_value(&mut out, &tree, options.escape_html)?;
    if options.is_indented() {
        let mut indented = Vec::with_capacity(out.len() * 2);
        indent(&mut indented, &out, &options.prefix, &options.indent)?;
        return Ok(indented);
    }
    Ok(out)
}

/// Encodes `value`, then breaks it into lines with `prefix` and one `indent`
/// per nesting level.
pub fn encode_indent<T: Marshal + ?Sized>(value: &T, prefix: &str, indent: &str) -> Result<Vec<u8>> {
    encode_with(value, &EncodeOptions::indented(prefix, indent))
}

/// Encodes `value` into a `String`.
///
/// Fails with [`JsonError::InvalidUtf8`] if raw hook output carried bytes
/// that are not UTF-8.
pub fn encode_to_string<T: Marshal + ?Sized>(value: &T) -> Result<String> {
    let bytes = encode(value)?;
    String::from_utf8(bytes).map_err(|e| JsonError::InvalidUtf8 {
        offset: e.utf8_error().valid_up_to(),
    })
}

/// Adapts a host value into the value model without rendering it.
pub fn to_value<T: Marshal + ?Sized>(value: &T) -> Result<Value> {
    value.marshal(&mut Context::default())
}

/// Builds a host value from a value tree.
pub fn from_value<T: Unmarshal + Default>(value: &Value) -> Result<T> {
    let bytes = encode(value)?;
    let mut target = T::default();
    decode_into(&bytes, &mut target)?;
    Ok(target)
}

/// A container being written and whether its first element is out.
enum WriteFrame<'a> {
    Array(std::slice::Iter<'a, Value>, bool),
    Object(std::slice::Iter<'a, Member>, bool),
}

/// Writes `value` compactly to `dst`.
///
/// Containers are walked with a heap stack rather than recursion.
pub fn write_value(dst: &mut Vec<u8>, value: &Value, escape_html: bool) -> Result<()> {
    let mut stack: Vec<WriteFrame<'_>> = Vec::new();
    let mut next = Some(value);
    loop {
        match next.take() {
            Some(Value::Null) => dst.extend_from_slice(b"null"),
            Some(Value::Bool(true)) => dst.extend_from_slice(b"true"),
            Some(Value::Bool(false)) => dst.extend_from_slice(b"false"),
            Some(Value::Number(n)) => dst.extend_from_slice(n.encoded()?.as_bytes()),
            Some(Value::String(s)) => write_string(dst, s, escape_html),
            Some(Value::Raw(raw)) if raw.is_empty() => dst.extend_from_slice(b"null"),
            Some(Value::Raw(raw)) => compact(dst, raw.as_bytes(), escape_html)?,
            Some(Value::Array(items)) => {
                dst.push(b'[');
                stack.push(WriteFrame::Array(items.iter(), false));
            }
            Some(Value::Object(obj)) => {
                dst.push(b'{');
                stack.push(WriteFrame::Object(obj.iter(), false));
            }
            None => {}
        }

        let Some(top) = stack.last_mut() else {
            return Ok(());
        };
        match top {
            WriteFrame::Array(items, started) => match items.next() {
                Some(item) => {
                    if *started {
                        dst.push(b',');
                    }
                    *started = true;
                    next = Some(item);
                }
                None => {
                    dst.push(b']');
                    stack.pop();
                }
            },
            WriteFrame::Object(members, started) => match members.next() {
                Some(member) => {
                    if *started {
                        dst.push(b',');
                    }
                    *started = true;
                    write_string(dst, &member.key, escape_html);
                    dst.push(b':');
                    next = Some(&member.value);
                }
                None => {
                    dst.push(b'}');
                    stack.pop();
                }
            },
        }
    }
}
