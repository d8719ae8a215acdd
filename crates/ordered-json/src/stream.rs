//! Reader and writer adapters for sequences of top-level values.

use std::io::{ErrorKind, Read, Write};

use tracing::trace;

use crate::decoder::Decoder;
use crate::encoder::encode_with;
use crate::error::{JsonError, Result};
use crate::marshal::Marshal;
use crate::options::{DecodeOptions, EncodeOptions};
use crate::scan::{scan_value, skip_ws, Scan};
use crate::unmarshal::Unmarshal;
use crate::value::Value;

const READ_CHUNK: usize = 512;

/// Reads consecutive JSON values from a byte stream.
///
/// Values may be separated by whitespace or simply concatenated. A number at
/// the end of the buffered input is not decoded until more input, or the end
/// of the stream, shows where it stops.
///
/// ```
/// use ordered_json::StreamDecoder;
///
/// let mut dec = StreamDecoder::new(&b"{\"a\":1} [2] 3"[..]);
/// let mut count = 0;
/// while let Some(_value) = dec.next_value().unwrap() {
///     count += 1;
/// }
/// assert_eq!(count, 3);
/// ```
pub struct StreamDecoder<R> {
    reader: R,
    buf: Vec<u8>,
    /// Start of unread data in `buf`.
    scanp: usize,
    /// Bytes dropped from the front of `buf` so far.
    consumed: usize,
    eof: bool,
    options: DecodeOptions,
}

impl<R: Read> StreamDecoder<R> {
    pub fn new(reader: R) -> Self {
        StreamDecoder::with_options(reader, DecodeOptions::default())
    }

    pub fn with_options(reader: R, options: DecodeOptions) -> Self {
        StreamDecoder {
            reader,
            buf: Vec::new(),
            scanp: 0,
            consumed: 0,
            eof: false,
            options,
        }
    }

    /// Report object keys that match no record field.
    pub fn disallow_unknown_fields(&mut self) {
        self.options.disallow_unknown_fields = true;
    }

    /// Decodes the next value into `target`.
    ///
    /// Returns [`JsonError::Eof`] once the stream ends cleanly between
    /// values.
    pub fn decode<T: Unmarshal + ?Sized>(&mut self, target: &mut T) -> Result<()> {
        let n = self.read_value()?;
        let start = self.scanp;
        self.scanp += n;
        let base = self.consumed + start;
        let mut d = Decoder::with_base(&self.buf[start..start + n], &self.options, base);
        target.unmarshal(&mut d)?;
        d.finish()
    }

    /// Next value of the stream, or `None` at a clean end.
    pub fn next_value(&mut self) -> Result<Option<Value>> {
        let mut value = Value::Null;
        match self.decode(&mut value) {
            Ok(()) => Ok(Some(value)),
            Err(JsonError::Eof) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Whether another value follows in the stream.
    pub fn more(&mut self) -> bool {
        matches!(self.peek(), Ok(c) if c != b']' && c != b'}')
    }

    /// Input read from the stream but not decoded yet.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.scanp..]
    }

    /// Absolute offset of the next unread byte.
    pub fn input_offset(&self) -> usize {
        self.consumed + self.scanp
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Length of the next complete value in `buf[scanp..]`, reading more
    /// input as needed.
    fn read_value(&mut self) -> Result<usize> {
        loop {
            let start = skip_ws(&self.buf, self.scanp);
            if start < self.buf.len() {
                let base = self.consumed + self.scanp;
                let scanned = scan_value(&self.buf[self.scanp..], self.eof, self.options.max_depth)
                    .map_err(|err| shift(err, base))?;
                if let Scan::Complete(n) = scanned {
                    return Ok(n);
                }
            } else if self.eof {
                return Err(JsonError::Eof);
            }
            self.refill()?;
        }
    }

    fn peek(&mut self) -> Result<u8> {
        loop {
            let i = skip_ws(&self.buf, self.scanp);
            if let Some(&c) = self.buf.get(i) {
                self.scanp = i;
                return Ok(c);
            }
            if self.eof {
                return Err(JsonError::Eof);
            }
            self.refill()?;
        }
    }

    fn refill(&mut self) -> Result<()> {
        if self.scanp > 0 {
            self.consumed += self.scanp;
            self.buf.drain(..self.scanp);
            self.scanp = 0;
        }
        let len = self.buf.len();
        self.buf.resize(len + READ_CHUNK, 0);
        let read = loop {
            match self.reader.read(&mut self.buf[len..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(len);
                    return Err(err.into());
                }
            }
        };
        self.buf.truncate(len + read);
        self.eof = read == 0;
        trace!(read, buffered = self.buf.len(), "refilled stream buffer");
        Ok(())
    }
}

/// Moves a slice-relative error offset to the stream position.
fn shift(err: JsonError, base: usize) -> JsonError {
    match err {
        JsonError::Syntax { offset, message } => JsonError::Syntax {
            offset: offset + base,
            message,
        },
        other => other,
    }
}

/// Writes JSON values to a byte stream, one per line.
pub struct StreamEncoder<W> {
    writer: W,
    options: EncodeOptions,
}

impl<W: Write> StreamEncoder<W> {
    pub fn new(writer: W) -> Self {
        StreamEncoder {
            writer,
            options: EncodeOptions::default(),
        }
    }

    /// Writes `value` followed by a newline. Nothing is written on error.
    pub fn encode<T: Marshal + ?Sized>(&mut self, value: &T) -> Result<()> {
        let mut out = encode_with(value, &self.options)?;
        out.push(b'\n');
        self.writer.write_all(&out)?;
        Ok(())
    }

    pub fn set_escape_html(&mut self, on: bool) {
        self.options.escape_html = on;
    }

    pub fn set_indent(&mut self, prefix: &str, indent: &str) {
        self.options.indented = true;
        self.options.prefix = prefix.to_string();
        self.options.indent = indent.to_string();
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
