//! String escaping.
//!
//! The escape table is the compatibility contract with the Go encoder used by
//! neo-go, which differs from RFC 8259 encoders in three ways:
//!
//! - every rune at or above U+0080 is written as a `\uXXXX` escape, so the
//!   output is always plain ASCII;
//! - a byte that does not start a valid UTF-8 sequence is written as `\u00XX`
//!   of the byte itself, one escape per byte, instead of U+FFFD;
//! - hex digits are uppercase.
//!
//! Three code paths produce the same bytes: [`write_string`] for `&str`,
//! [`write_string_bytes`] for arbitrary bytes and the incremental [`Escaper`]
//! for input arriving in chunks.

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Appends `s` as a quoted JSON string.
pub fn write_string(dst: &mut Vec<u8>, s: &str, escape_html: bool) {
    dst.push(b'"');
    for c in s.chars() {
        push_char(dst, c, escape_html);
    }
    dst.push(b'"');
}

/// Appends `bytes` as a quoted JSON string, escaping invalid UTF-8 per byte.
pub fn write_string_bytes(dst: &mut Vec<u8>, bytes: &[u8], escape_html: bool) {
    dst.push(b'"');
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            push_char(dst, c, escape_html);
        }
        for &b in chunk.invalid() {
            push_u00(dst, b);
        }
    }
    dst.push(b'"');
}

/// Returns `s` encoded as a quoted JSON string.
pub fn quote(s: &str, escape_html: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 2);
    write_string(&mut out, s, escape_html);
    out
}

/// Incremental string escaper.
///
/// Bytes may be pushed in arbitrary chunks; a UTF-8 sequence split across two
/// chunks is held back until it is complete or proven invalid.
///
/// ```
/// use ordered_json::escape::Escaper;
///
/// let mut esc = Escaper::new(true);
/// esc.push(&[0xE6, 0xB5]);
/// esc.push(&[0x8B]);
/// assert_eq!(esc.finish(), b"\"\\u6D4B\"".to_vec());
/// ```
#[derive(Debug)]
pub struct Escaper {
    out: Vec<u8>,
    pending: [u8; 4],
    pending_len: usize,
    escape_html: bool,
}

impl Escaper {
    pub fn new(escape_html: bool) -> Self {
        Escaper {
            out: vec![b'"'],
            pending: [0; 4],
            pending_len: 0,
            escape_html,
        }
    }

    /// Feeds the next chunk of raw string bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        for &b in chunk {
            self.push_byte(b);
        }
    }

    /// Flushes held-back bytes and returns the quoted string.
    pub fn finish(mut self) -> Vec<u8> {
        while self.pending_len > 0 {
            self.reject_lead();
        }
        self.out.push(b'"');
        self.out
    }

    fn push_byte(&mut self, b: u8) {
        if self.pending_len == 0 {
            match sequence_len(b) {
                Some(1) => push_ascii(&mut self.out, b, self.escape_html),
                Some(_) => {
                    self.pending[0] = b;
                    self.pending_len = 1;
                }
                None => push_u00(&mut self.out, b),
            }
            return;
        }

        if continues(&self.pending[..self.pending_len], b) {
            self.pending[self.pending_len] = b;
            self.pending_len += 1;
            let want = sequence_len(self.pending[0]).unwrap_or(1);
            if self.pending_len == want {
                let held = &self.pending[..self.pending_len];
                if let Some(c) = std::str::from_utf8(held).ok().and_then(|s| s.chars().next()) {
                    push_char(&mut self.out, c, self.escape_html);
                }
                self.pending_len = 0;
            }
        } else {
            // The lead byte is invalid on its own; the bytes after it are
            // re-examined as fresh input, followed by `b`.
            self.reject_lead();
            self.push_byte(b);
        }
    }

    fn reject_lead(&mut self) {
        push_u00(&mut self.out, self.pending[0]);
        let rest = self.pending;
        let rest_len = self.pending_len - 1;
        self.pending_len = 0;
        for &b in &rest[1..=rest_len] {
            self.push_byte(b);
        }
    }
}

/// Length of the UTF-8 sequence introduced by `lead`, `None` if `lead` can
/// never start one.
fn sequence_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

/// Whether `b` extends the partial sequence `held` towards a valid rune.
fn continues(held: &[u8], b: u8) -> bool {
    if held.len() == 1 {
        return match held[0] {
            0xE0 => (0xA0..=0xBF).contains(&b),
            0xED => (0x80..=0x9F).contains(&b),
            0xF0 => (0x90..=0xBF).contains(&b),
            0xF4 => (0x80..=0x8F).contains(&b),
            _ => (0x80..=0xBF).contains(&b),
        };
    }
    (0x80..=0xBF).contains(&b)
}

fn push_char(dst: &mut Vec<u8>, c: char, escape_html: bool) {
    if c.is_ascii() {
        push_ascii(dst, c as u8, escape_html);
        return;
    }
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        push_u(dst, *unit);
    }
}

fn push_ascii(dst: &mut Vec<u8>, b: u8, escape_html: bool) {
    match b {
        b'\\' => dst.extend_from_slice(b"\\\\"),
        0x08 => dst.extend_from_slice(b"\\b"),
        b'\t' => dst.extend_from_slice(b"\\t"),
        b'\n' => dst.extend_from_slice(b"\\n"),
        0x0C => dst.extend_from_slice(b"\\f"),
        b'\r' => dst.extend_from_slice(b"\\r"),
        b'"' | 0x00..=0x1F | 0x7F => push_u00(dst, b),
        b'<' | b'>' | b'&' | b'\'' | b'+' | b'`' if escape_html => push_u00(dst, b),
        _ => dst.push(b),
    }
}

fn push_u00(dst: &mut Vec<u8>, b: u8) {
    push_u(dst, u16::from(b));
}

fn push_u(dst: &mut Vec<u8>, unit: u16) {
    dst.extend_from_slice(b"\\u");
    for shift in [12, 8, 4, 0] {
        dst.push(HEX[usize::from((unit >> shift) & 0xF)]);
    }
}

/// Rewrites `<`, `>`, `&`, U+2028 and U+2029 in already-encoded JSON so it
/// can be embedded in HTML `<script>` tags.
pub fn html_escape(dst: &mut Vec<u8>, src: &[u8]) {
    let mut i = 0;
    while i < src.len() {
        let b = src[i];
        if matches!(b, b'<' | b'>' | b'&') {
            push_u00(dst, b);
        } else if b == 0xE2 && src.get(i + 1) == Some(&0x80) && matches!(src.get(i + 2), Some(0xA8 | 0xA9)) {
            push_u(dst, if src[i + 2] == 0xA8 { 0x2028 } else { 0x2029 });
            i += 3;
            continue;
        } else {
            dst.push(b);
        }
        i += 1;
    }
}
