//! Re-rendering of already encoded JSON.

use crate::error::Result;
use crate::escape::html_escape;
use crate::scan::check_valid;

/// Appends `src` to `dst` with insignificant whitespace removed.
///
/// With `escape_html` set, `<`, `>`, `&`, U+2028 and U+2029 inside strings
/// are rewritten as `\u` escapes. `src` is validated first; on error nothing
/// is appended.
pub fn compact(dst: &mut Vec<u8>, src: &[u8], escape_html: bool) -> Result<()> {
    check_valid(src)?;
    let start = dst.len();
    let mut in_string = false;
    let mut escaped = false;
    for &c in src {
        if in_string {
            dst.push(c);
            if escaped {
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == b'"' {
                in_string = false;
            }
            continue;
        }
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => {}
            b'"' => {
                in_string = true;
                dst.push(c);
            }
            _ => dst.push(c),
        }
    }
    if escape_html {
        let plain = dst.split_off(start);
        html_escape(dst, &plain);
    }
    Ok(())
}

/// Appends an indented form of `src` to `dst`.
///
/// Each element of an array or object starts on a new line beginning with
/// `prefix` followed by one copy of `indent` per nesting level. The first
/// line carries no prefix, empty containers stay `[]` and `{}`, and a single
/// space follows every object key colon.
///
/// ```
/// let mut out = Vec::new();
/// ordered_json::indent(&mut out, br#"{"a":[1,2],"b":{}}"#, "", "  ").unwrap();
/// assert_eq!(out, b"{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": {}\n}".to_vec());
/// ```
pub fn indent(dst: &mut Vec<u8>, src: &[u8], prefix: &str, indent: &str) -> Result<()> {
    check_valid(src)?;
    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut open_pending = false;

    for &c in src {
        if in_string {
            dst.push(c);
            if escaped {
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == b'"' {
                in_string = false;
            }
            continue;
        }
        if matches!(c, b' ' | b'\t' | b'\n' | b'\r') {
            continue;
        }
        if open_pending && c != b']' && c != b'}' {
            open_pending = false;
            depth += 1;
            newline(dst, prefix, indent, depth);
        }
        match c {
            b'"' => {
                in_string = true;
                dst.push(c);
            }
            b'[' | b'{' => {
                dst.push(c);
                open_pending = true;
            }
            b',' => {
                dst.push(c);
                newline(dst, prefix, indent, depth);
            }
            b':' => dst.extend_from_slice(b": "),
            b']' | b'}' => {
                if open_pending {
                    open_pending = false;
                } else {
                    depth = depth.saturating_sub(1);
                    newline(dst, prefix, indent, depth);
                }
                dst.push(c);
            }
            _ => dst.push(c),
        }
    }
    Ok(())
}

fn newline(dst: &mut Vec<u8>, prefix: &str, indent: &str, depth: usize) {
    dst.push(b'\n');
    dst.extend_from_slice(prefix.as_bytes());
    for _ in 0..depth {
        dst.extend_from_slice(indent.as_bytes());
    }
}
