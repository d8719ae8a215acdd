//! Recursive-descent decoding.
//!
//! Input is validated in full by the scanner before a [`Decoder`] touches
//! the target, so the readers here only have to walk well-formed JSON. Type
//! mismatches do not stop decoding: the first one is kept and returned once
//! the whole value has been applied, leaving the target partially filled.

use std::borrow::Cow;

use crate::error::{JsonError, Result};
use crate::number::integral_text;
use crate::options::DecodeOptions;
use crate::scan::{check_valid_depth, skip_ws, unexpected_end};
use crate::unmarshal::Unmarshal;
use crate::value::{Number, Object, Value};

/// Parses `data` into the ordered value model.
///
/// ```
/// let value = ordered_json::decode(br#"{"b":1,"a":2,"b":3}"#).unwrap();
/// let obj = value.as_object().unwrap();
/// let keys: Vec<&str> = obj.iter().map(|m| m.key.as_str()).collect();
/// assert_eq!(keys, ["b", "a", "b"]);
/// ```
pub fn decode(data: &[u8]) -> Result<Value> {
    let mut value = Value::Null;
    decode_into(data, &mut value)?;
    Ok(value)
}

/// Decodes `data` into an existing target.
pub fn decode_into<T: Unmarshal + ?Sized>(data: &[u8], target: &mut T) -> Result<()> {
    decode_with(data, target, &DecodeOptions::default())
}

/// Decodes `data` into `target` with explicit options.
pub fn decode_with<T: Unmarshal + ?Sized>(
    data: &[u8],
    target: &mut T,
    options: &DecodeOptions,
) -> Result<()> {
    check_valid_depth(data, options.max_depth)?;
    let mut d = Decoder::new(data, options);
    target.unmarshal(&mut d)?;
    d.finish()
}

/// Kind of the next input value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

/// A scalar read from the input; containers are skipped and reported by
/// kind only.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Number(&'a str),
    String(Cow<'a, str>),
    Array,
    Object,
}

impl Scalar<'_> {
    /// How the value is named in type mismatch errors.
    pub fn describe(&self) -> String {
        match self {
            Scalar::Null => "null".into(),
            Scalar::Bool(_) => "bool".into(),
            Scalar::Number(_) => "number".into(),
            Scalar::String(_) => "string".into(),
            Scalar::Array => "array".into(),
            Scalar::Object => "object".into(),
        }
    }
}

/// A container whose closing bracket has not been read yet.
enum OpenContainer {
    Array(Vec<Value>),
    /// Members so far and the key of the member being read.
    Object(Object, String),
}

impl OpenContainer {
    fn close(self) -> Value {
        match self {
            OpenContainer::Array(items) => Value::Array(items),
            OpenContainer::Object(obj, _) => Value::Object(obj),
        }
    }
}

struct FieldFrame {
    record: &'static str,
    field: String,
}

/// Cursor over validated JSON input, handed to [`Unmarshal`] impls.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    options: DecodeOptions,
    saved: Option<JsonError>,
    fields: Vec<FieldFrame>,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(data: &'a [u8], options: &DecodeOptions) -> Self {
        Decoder {
            data,
            pos: 0,
            base: 0,
            options: options.clone(),
            saved: None,
            fields: Vec::new(),
        }
    }

    /// A decoder whose error offsets are shifted by `base`.
    pub(crate) fn with_base(data: &'a [u8], options: &DecodeOptions, base: usize) -> Self {
        Decoder {
            base,
            ..Decoder::new(data, options)
        }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Absolute offset of the cursor.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Checks for trailing input and returns the first saved error.
    pub(crate) fn finish(mut self) -> Result<()> {
        self.pos = skip_ws(self.data, self.pos);
        if self.pos < self.data.len() {
            return Err(self.syntax("invalid character after top-level value"));
        }
        match self.saved.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn syntax(&self, message: &str) -> JsonError {
        JsonError::syntax(self.offset(), message)
    }

    fn byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Kind of the next value, after whitespace.
    pub fn peek_kind(&mut self) -> Result<Kind> {
        self.pos = skip_ws(self.data, self.pos);
        match self.byte() {
            None => Err(unexpected_end(self.offset())),
            Some(b'n') => Ok(Kind::Null),
            Some(b't' | b'f') => Ok(Kind::Bool),
            Some(b'"') => Ok(Kind::String),
            Some(b'[') => Ok(Kind::Array),
            Some(b'{') => Ok(Kind::Object),
            Some(b'-' | b'0'..=b'9') => Ok(Kind::Number),
            Some(_) => Err(self.syntax("invalid character looking for beginning of value")),
        }
    }

    /// Skips the next value and returns its exact input span.
    pub fn skip(&mut self) -> Result<&'a [u8]> {
        let kind = self.peek_kind()?;
        let start = self.pos;
        match kind {
            Kind::Null => self.literal(b"null")?,
            Kind::Bool if self.byte() == Some(b't') => self.literal(b"true")?,
            Kind::Bool => self.literal(b"false")?,
            Kind::Number => {
                self.number()?;
            }
            Kind::String => self.skip_string()?,
            Kind::Array | Kind::Object => self.skip_container()?,
        }
        let data = self.data;
        Ok(&data[start..self.pos])
    }

    fn literal(&mut self, word: &[u8]) -> Result<()> {
        if self.data[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(())
        } else {
            Err(self.syntax("invalid literal"))
        }
    }

    fn number(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while matches!(
            self.byte(),
            Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
        ) {
            self.pos += 1;
        }
        let data = self.data;
        std::str::from_utf8(&data[start..self.pos])
            .map_err(|_| JsonError::syntax(self.base + start, "invalid number literal"))
    }

    fn skip_string(&mut self) -> Result<()> {
        self.pos += 1;
        loop {
            match self.byte() {
                None => return Err(unexpected_end(self.offset())),
                Some(b'\\') => self.pos += 2,
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn skip_container(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.byte() {
                None => return Err(unexpected_end(self.offset())),
                Some(b'"') => {
                    self.skip_string()?;
                    continue;
                }
                Some(b'[' | b'{') => depth += 1,
                Some(b']' | b'}') => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                Some(_) => {}
            }
            self.pos += 1;
        }
    }

    /// Reads a string value, unescaping it. Invalid UTF-8 and unpaired
    /// surrogate escapes become U+FFFD.
    pub fn read_string(&mut self) -> Result<Cow<'a, str>> {
        if self.peek_kind()? != Kind::String {
            return Err(self.syntax("expected string"));
        }
        let start = self.pos + 1;
        self.skip_string()?;
        let data = self.data;
        let body = &data[start..self.pos - 1];
        if !body.contains(&b'\\') {
            if let Ok(s) = std::str::from_utf8(body) {
                return Ok(Cow::Borrowed(s));
            }
        }
        unquote(body)
            .map(Cow::Owned)
            .ok_or_else(|| JsonError::syntax(self.base + start, "invalid string escape"))
    }

    /// Reads the next value as a scalar; containers are skipped.
    pub fn scalar(&mut self) -> Result<Scalar<'a>> {
        Ok(match self.peek_kind()? {
            Kind::Null => {
                self.literal(b"null")?;
                Scalar::Null
            }
            Kind::Bool => {
                let b = self.byte() == Some(b't');
                let word: &[u8] = if b { b"true" } else { b"false" };
                self.literal(word)?;
                Scalar::Bool(b)
            }
            Kind::Number => Scalar::Number(self.number()?),
            Kind::String => Scalar::String(self.read_string()?),
            Kind::Array => {
                self.skip_container()?;
                Scalar::Array
            }
            Kind::Object => {
                self.skip_container()?;
                Scalar::Object
            }
        })
    }

    /// Calls `f` once per array element with the element index. `f` must
    /// consume exactly one value.
    pub fn array<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, usize) -> Result<()>,
    {
        if self.peek_kind()? != Kind::Array {
            return Err(self.syntax("expected array"));
        }
        self.pos += 1;
        self.pos = skip_ws(self.data, self.pos);
        if self.byte() == Some(b']') {
            self.pos += 1;
            return Ok(());
        }
        let mut index = 0;
        loop {
            f(self, index)?;
            index += 1;
            self.pos = skip_ws(self.data, self.pos);
            match self.byte() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => return Err(self.syntax("invalid character after array element")),
            }
        }
    }

    /// Calls `f` once per object member with the unescaped key. `f` must
    /// consume exactly one value.
    pub fn object<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &str) -> Result<()>,
    {
        if self.peek_kind()? != Kind::Object {
            return Err(self.syntax("expected object"));
        }
        self.pos += 1;
        self.pos = skip_ws(self.data, self.pos);
        if self.byte() == Some(b'}') {
            self.pos += 1;
            return Ok(());
        }
        loop {
            let key = self.member_key()?;
            f(self, &key)?;
            self.pos = skip_ws(self.data, self.pos);
            match self.byte() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => return Err(self.syntax("invalid character after object key:value pair")),
            }
        }
    }

    /// Reads an object key and the colon after it.
    fn member_key(&mut self) -> Result<Cow<'a, str>> {
        let key = self.read_string()?;
        self.pos = skip_ws(self.data, self.pos);
        if self.byte() != Some(b':') {
            return Err(self.syntax("invalid character after object key"));
        }
        self.pos += 1;
        Ok(key)
    }

    /// Reads the next value into the ordered value model.
    ///
    /// Open containers are kept on a heap stack, so any nesting the scanner
    /// accepted is read without deep recursion.
    pub fn value(&mut self) -> Result<Value> {
        let mut stack: Vec<OpenContainer> = Vec::new();
        loop {
            let mut done = match self.peek_kind()? {
                Kind::Array => {
                    self.pos = skip_ws(self.data, self.pos + 1);
                    if self.byte() == Some(b']') {
                        self.pos += 1;
                        Some(Value::Array(Vec::new()))
                    } else {
                        stack.push(OpenContainer::Array(Vec::new()));
                        None
                    }
                }
                Kind::Object => {
                    self.pos = skip_ws(self.data, self.pos + 1);
                    if self.byte() == Some(b'}') {
                        self.pos += 1;
                        Some(Value::Object(Object::new()))
                    } else {
                        let key = self.member_key()?.into_owned();
                        stack.push(OpenContainer::Object(Object::new(), key));
                        None
                    }
                }
                _ => Some(match self.scalar()? {
                    Scalar::Bool(b) => Value::Bool(b),
                    Scalar::Number(text) => Value::Number(Number::from(text)),
                    Scalar::String(s) => Value::String(s.into_owned()),
                    _ => Value::Null,
                }),
            };

            // Hand each finished value to its container, closing containers
            // whose last element it was.
            while let Some(value) = done.take() {
                let Some(top) = stack.last_mut() else {
                    return Ok(value);
                };
                self.pos = skip_ws(self.data, self.pos);
                let closed = match top {
                    OpenContainer::Array(items) => {
                        items.push(value);
                        match self.byte() {
                            Some(b',') => {
                                self.pos += 1;
                                false
                            }
                            Some(b']') => true,
                            _ => return Err(self.syntax("invalid character after array element")),
                        }
                    }
                    OpenContainer::Object(obj, key) => {
                        obj.push(std::mem::take(key), value);
                        match self.byte() {
                            Some(b',') => {
                                self.pos += 1;
                                *key = self.member_key()?.into_owned();
                                false
                            }
                            Some(b'}') => true,
                            _ => {
                                return Err(
                                    self.syntax("invalid character after object key:value pair")
                                )
                            }
                        }
                    }
                };
                if closed {
                    self.pos += 1;
                    done = stack.pop().map(OpenContainer::close);
                }
            }
        }
    }

    /// Reads a value under the `string` field option: `null` gives `None`,
    /// a string gives its content, anything else records an error for
    /// `target` and gives `None`.
    pub fn quoted(&mut self, target: &str) -> Result<Option<String>> {
        match self.scalar()? {
            Scalar::Null => Ok(None),
            Scalar::String(s) => Ok(Some(s.into_owned())),
            _ => {
                self.save_error(JsonError::StringTag {
                    value: "unquoted value".into(),
                    target: target.to_string(),
                });
                Ok(None)
            }
        }
    }

    /// Records a `string` option misuse for `text` against `target`.
    pub fn invalid_quoted(&mut self, text: &str, target: &str) {
        self.save_error(JsonError::StringTag {
            value: format!("{text:?}"),
            target: target.to_string(),
        });
    }

    /// Parses integer text, honoring `integral_exponents`.
    pub fn parse_integer<T: std::str::FromStr>(&self, text: &str) -> Option<T> {
        if let Ok(v) = text.parse() {
            return Some(v);
        }
        if self.options.integral_exponents {
            return integral_text(text)?.parse().ok();
        }
        None
    }

    /// Unquotes `text` if it is exactly one JSON string literal.
    pub fn string_literal(&self, text: &str) -> Option<String> {
        let bytes = text.as_bytes();
        check_valid_depth(bytes, 1).ok()?;
        let mut inner = Decoder::new(bytes, &self.options);
        if inner.peek_kind().ok()? != Kind::String {
            return None;
        }
        inner.read_string().ok().map(Cow::into_owned)
    }

    /// Records that the input `value` does not fit `target`; decoding goes on.
    pub fn type_mismatch(&mut self, value: impl Into<String>, target: &str) {
        let field = match self.fields.as_slice() {
            [] => None,
            frames => {
                let path: Vec<&str> = frames.iter().map(|f| f.field.as_str()).collect();
                let record = frames[frames.len() - 1].record;
                Some(format!("{record}.{}", path.join(".")))
            }
        };
        self.save_error(JsonError::UnmarshalType {
            value: value.into(),
            target: target.to_string(),
            offset: self.offset(),
            field,
        });
    }

    /// Keeps `err` if it is the first error of this decode.
    pub fn save_error(&mut self, err: JsonError) {
        if self.saved.is_none() {
            self.saved = Some(err);
        }
    }

    pub(crate) fn enter_field(&mut self, record: &'static str, field: &str) {
        self.fields.push(FieldFrame {
            record,
            field: field.to_string(),
        });
    }

    pub(crate) fn leave_field(&mut self) {
        self.fields.pop();
    }
}

/// Unescapes the body of a string literal. Returns `None` on a malformed
/// escape, which validated input never contains.
fn unquote(body: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\\' => {
                let escape = *body.get(i + 1)?;
                i += 2;
                let c = match escape {
                    b'"' => '"',
                    b'\\' => '\\',
                    b'/' => '/',
                    b'b' => '\u{8}',
                    b'f' => '\u{c}',
                    b'n' => '\n',
                    b'r' => '\r',
                    b't' => '\t',
                    b'u' => {
                        let unit = hex4(body.get(i..i + 4)?)?;
                        i += 4;
                        if (0xD800..0xDC00).contains(&unit) {
                            let low = body
                                .get(i..i + 6)
                                .filter(|s| s.starts_with(b"\\u"))
                                .and_then(|s| hex4(&s[2..]))
                                .filter(|low| (0xDC00..0xE000).contains(low));
                            match low {
                                Some(low) => {
                                    i += 6;
                                    let code = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                                    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
                                }
                                None => char::REPLACEMENT_CHARACTER,
                            }
                        } else {
                            char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER)
                        }
                    }
                    _ => return None,
                };
                out.push(c);
            }
            b if b < 0x80 => {
                out.push(char::from(b));
                i += 1;
            }
            _ => {
                let (c, len) = decode_char(&body[i..]);
                out.push(c);
                i += len;
            }
        }
    }
    Some(out)
}

/// Decodes one UTF-8 sequence; an invalid byte decodes as U+FFFD of
/// length one.
fn decode_char(bytes: &[u8]) -> (char, usize) {
    let width = match bytes[0] {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return (char::REPLACEMENT_CHARACTER, 1),
    };
    bytes
        .get(..width)
        .and_then(|seq| std::str::from_utf8(seq).ok())
        .and_then(|s| s.chars().next())
        .map_or((char::REPLACEMENT_CHARACTER, 1), |c| (c, width))
}

fn hex4(digits: &[u8]) -> Option<u32> {
    let text = std::str::from_utf8(digits).ok()?;
    u32::from_str_radix(text, 16).ok()
}
