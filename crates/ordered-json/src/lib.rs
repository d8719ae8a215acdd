//! # ordered-json
//!
//! Order-preserving JSON codec whose output matches the nspcc-dev
//! `go-ordered-json` encoder byte for byte: every non-ASCII rune is written as
//! a `\u` escape, HTML-sensitive characters are escaped by default, floats use
//! the shortest round-trip text and objects keep member order and duplicate
//! keys through a decode/encode round trip.
//!
//! ## Quick start
//!
//! ```rust
//! use ordered_json::{decode, decode_into, encode, Marshal, Unmarshal};
//!
//! #[derive(Marshal, Unmarshal, Debug, Default, PartialEq)]
//! struct Transfer {
//!     #[json(rename = "from")]
//!     pub from: String,
//!     #[json(rename = "amount", string)]
//!     pub amount: i64,
//!     #[json(rename = "memo", omitempty)]
//!     pub memo: String,
//! }
//!
//! let t = Transfer { from: "Алиса".into(), amount: 5, memo: String::new() };
//! let bytes = encode(&t).unwrap();
//! assert_eq!(
//!     bytes,
//!     br#"{"from":"\u0410\u043B\u0438\u0441\u0430","amount":"5"}"#.to_vec()
//! );
//!
//! let mut back = Transfer::default();
//! decode_into(&bytes, &mut back).unwrap();
//! assert_eq!(back, t);
//!
//! // Untyped decoding keeps member order and duplicates.
//! let value = decode(br#"{"A":1,"A":2}"#).unwrap();
//! assert_eq!(encode(&value).unwrap(), br#"{"A":1,"A":2}"#.to_vec());
//! ```
//!
//! ## Modules
//!
//! - [`escape`] — string escaping, whole and incremental
//! - [`number`] — float formatting and number grammar
//! - [`format`] — `compact` / `indent` re-rendering of encoded JSON
//! - [`value`] — ordered `Value` model (`Object`, `Number`, `RawValue`, `ByteString`)
//! - [`marshal`] / [`unmarshal`] — host type adaptation and hook traits
//! - [`record`] / [`plan`] — struct field resolution behind the derives
//! - [`encoder`] / [`decoder`] — one-shot entry points
//! - [`stream`] — reader/writer adapters for value sequences
//! - [`options`] — encode and decode settings
//! - [`error`] — `JsonError`

extern crate self as ordered_json;

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod escape;
pub mod format;
pub mod marshal;
pub mod number;
pub mod options;
pub mod plan;
pub mod record;
pub mod scan;
mod serde_impl;
pub mod stream;
pub mod unmarshal;
pub mod value;

pub use decoder::{decode, decode_into, decode_with, Decoder, Kind, Scalar};
pub use encoder::{encode, encode_indent, encode_to_string, encode_with, from_value, to_value};
pub use error::{JsonError, Result};
pub use escape::{html_escape, quote, write_string, write_string_bytes, Escaper};
pub use format::{compact, indent};
pub use marshal::{
    marshal_json_hook, marshal_json_hook_absent, marshal_text_hook, Adaptation, Context, MapKey,
    Marshal, MarshalJson, MarshalText,
};
pub use number::{format_float, is_valid_number, FloatBits};
pub use options::{DecodeOptions, EncodeOptions};
pub use record::{marshal_record, unmarshal_record, Field, FieldMut, Record, RecordMut};
pub use scan::{check_valid, valid, MAX_DEPTH};
pub use stream::{StreamDecoder, StreamEncoder};
pub use unmarshal::{
    unmarshal_json_hook, unmarshal_text_hook, FromMapKey, Unmarshal, UnmarshalJson, UnmarshalText,
};
pub use value::{ByteString, Member, Number, Object, RawValue, Value};

pub use ordered_json_derive::{Marshal, Unmarshal};
