//! Syntax validation.
//!
//! The scanner walks one JSON value with an explicit container stack so that
//! deeply nested input cannot exhaust the call stack. Typed decoding only
//! starts after the whole input has passed this check, which keeps partially
//! decoded targets free of syntax surprises.

use crate::error::{JsonError, Result};

/// Maximum container nesting accepted on input.
pub const MAX_DEPTH: usize = 10_000;

/// Outcome of scanning the start of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
    /// A complete value ends at this offset.
    Complete(usize),
    /// The buffer ends before the value does.
    Incomplete,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Frame {
    Array,
    Object,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Value,
    /// Just after `[`: a value or `]`.
    ArrayStart,
    /// Just after `{`: a key or `}`.
    ObjectStart,
    /// After `,` inside an object.
    Key,
    AfterValue,
}

/// Checks that `data` holds exactly one JSON value, optionally surrounded by
/// whitespace.
pub fn check_valid(data: &[u8]) -> Result<()> {
    check_valid_depth(data, MAX_DEPTH)
}

pub(crate) fn check_valid_depth(data: &[u8], max_depth: usize) -> Result<()> {
    match scan_value(data, true, max_depth)? {
        Scan::Complete(end) => {
            let rest = skip_ws(data, end);
            match data.get(rest) {
                None => Ok(()),
                Some(&c) => Err(invalid(rest, c, "after top-level value")),
            }
        }
        Scan::Incomplete => Err(unexpected_end(data.len())),
    }
}

/// Reports whether `data` is a single valid JSON value.
pub fn valid(data: &[u8]) -> bool {
    check_valid(data).is_ok()
}

pub(crate) fn skip_ws(data: &[u8], mut i: usize) -> usize {
    while matches!(data.get(i), Some(b' ' | b'\t' | b'\n' | b'\r')) {
        i += 1;
    }
    i
}

pub(crate) fn unexpected_end(offset: usize) -> JsonError {
    JsonError::syntax(offset, "unexpected end of JSON input")
}

/// Scans the first value of `data`, after leading whitespace.
///
/// With `at_eof == false` a buffer that stops mid-value, including a
/// top-level number that might continue, reports [`Scan::Incomplete`]
/// instead of an error.
pub(crate) fn scan_value(data: &[u8], at_eof: bool, max_depth: usize) -> Result<Scan> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut state = State::Value;
    let mut i = 0;

    loop {
        if state == State::AfterValue {
            let Some(&top) = stack.last() else {
                return Ok(Scan::Complete(i));
            };
            i = skip_ws(data, i);
            let Some(&c) = data.get(i) else {
                return more::<()>(data.len(), at_eof).map(|_| Scan::Incomplete);
            };
            state = match (top, c) {
                (Frame::Array, b',') => State::Value,
                (Frame::Object, b',') => State::Key,
                (Frame::Array, b']') | (Frame::Object, b'}') => {
                    stack.pop();
                    State::AfterValue
                }
                (Frame::Array, _) => return Err(invalid(i, c, "after array element")),
                (Frame::Object, _) => return Err(invalid(i, c, "after object key:value pair")),
            };
            i += 1;
            continue;
        }

        i = skip_ws(data, i);
        let Some(&c) = data.get(i) else {
            return more::<()>(data.len(), at_eof).map(|_| Scan::Incomplete);
        };

        let end = match (state, c) {
            (State::ArrayStart, b']') | (State::ObjectStart, b'}') => {
                stack.pop();
                Some(i + 1)
            }
            (State::ObjectStart | State::Key, b'"') => {
                let Some(end) = scan_string(data, i, at_eof)? else {
                    return Ok(Scan::Incomplete);
                };
                i = skip_ws(data, end);
                match data.get(i) {
                    None => return more::<()>(data.len(), at_eof).map(|_| Scan::Incomplete),
                    Some(b':') => {}
                    Some(&c) => return Err(invalid(i, c, "after object key")),
                }
                i += 1;
                state = State::Value;
                continue;
            }
            (State::ObjectStart | State::Key, _) => {
                return Err(invalid(i, c, "looking for beginning of object key string"));
            }
            (_, b'[' | b'{') => {
                if stack.len() >= max_depth {
                    return Err(JsonError::syntax(i, "exceeded max depth"));
                }
                if c == b'[' {
                    stack.push(Frame::Array);
                    state = State::ArrayStart;
                } else {
                    stack.push(Frame::Object);
                    state = State::ObjectStart;
                }
                i += 1;
                continue;
            }
            (_, b'"') => scan_string(data, i, at_eof)?,
            (_, b'-' | b'0'..=b'9') => match scan_number(data, i, at_eof)? {
                Some(end) if end == data.len() && !at_eof && stack.is_empty() => None,
                end => end,
            },
            (_, b't') => scan_literal(data, i, b"true", at_eof)?,
            (_, b'f') => scan_literal(data, i, b"false", at_eof)?,
            (_, b'n') => scan_literal(data, i, b"null", at_eof)?,
            _ => return Err(invalid(i, c, "looking for beginning of value")),
        };

        match end {
            Some(end) => {
                i = end;
                state = State::AfterValue;
            }
            None => return Ok(Scan::Incomplete),
        }
    }
}

/// Scans a string literal starting at the opening quote; returns the offset
/// just past the closing quote.
fn scan_string(data: &[u8], start: usize, at_eof: bool) -> Result<Option<usize>> {
    let mut i = start + 1;
    loop {
        let Some(&c) = data.get(i) else {
            return more(data.len(), at_eof);
        };
        match c {
            b'"' => return Ok(Some(i + 1)),
            b'\\' => {
                let Some(&e) = data.get(i + 1) else {
                    return more(data.len(), at_eof);
                };
                match e {
                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => i += 2,
                    b'u' => {
                        for k in 0..4 {
                            match data.get(i + 2 + k) {
                                None => return more(data.len(), at_eof),
                                Some(h) if h.is_ascii_hexdigit() => {}
                                Some(&h) => {
                                    return Err(invalid(
                                        i + 2 + k,
                                        h,
                                        "in \\u hexadecimal character escape",
                                    ))
                                }
                            }
                        }
                        i += 6;
                    }
                    _ => return Err(invalid(i + 1, e, "in string escape code")),
                }
            }
            0x00..=0x1F => return Err(invalid(i, c, "in string literal")),
            _ => i += 1,
        }
    }
}

/// Scans a number literal; returns the offset just past it.
fn scan_number(data: &[u8], start: usize, at_eof: bool) -> Result<Option<usize>> {
    let mut i = start;
    if data[i] == b'-' {
        i += 1;
    }
    match data.get(i) {
        None => return more(data.len(), at_eof),
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i = digits(data, i + 1),
        Some(&c) => return Err(invalid(i, c, "in numeric literal")),
    }
    if data.get(i) == Some(&b'.') {
        i += 1;
        match data.get(i) {
            None => return more(data.len(), at_eof),
            Some(b'0'..=b'9') => i = digits(data, i),
            Some(&c) => return Err(invalid(i, c, "after decimal point in numeric literal")),
        }
    }
    if matches!(data.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(data.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        match data.get(i) {
            None => return more(data.len(), at_eof),
            Some(b'0'..=b'9') => i = digits(data, i),
            Some(&c) => return Err(invalid(i, c, "in exponent of numeric literal")),
        }
    }
    Ok(Some(i))
}

fn digits(data: &[u8], mut i: usize) -> usize {
    while matches!(data.get(i), Some(b'0'..=b'9')) {
        i += 1;
    }
    i
}

fn scan_literal(data: &[u8], start: usize, word: &[u8], at_eof: bool) -> Result<Option<usize>> {
    for (k, &want) in word.iter().enumerate() {
        match data.get(start + k) {
            None => return more(data.len(), at_eof),
            Some(&c) if c == want => {}
            Some(&c) => {
                let context = format!(
                    "in literal {} (expecting {})",
                    String::from_utf8_lossy(word),
                    quote_char(want)
                );
                return Err(invalid(start + k, c, &context));
            }
        }
    }
    Ok(Some(start + word.len()))
}

/// Running out of input is an error at EOF and a request for more otherwise.
fn more<T>(len: usize, at_eof: bool) -> Result<Option<T>> {
    if at_eof {
        Err(unexpected_end(len))
    } else {
        Ok(None)
    }
}

fn invalid(offset: usize, c: u8, context: &str) -> JsonError {
    JsonError::syntax(offset, format!("invalid character {} {context}", quote_char(c)))
}

fn quote_char(c: u8) -> String {
    match c {
        b'\'' => "'\\''".to_string(),
        b'"' => "'\"'".to_string(),
        _ => format!("'{}'", char::from(c).escape_debug()),
    }
}
