use std::collections::BTreeMap;

use ordered_json::{
    decode, decode_into, encode, from_value, to_value, DecodeOptions, EncodeOptions, Marshal,
    Number, Object, RawValue, Unmarshal, Value,
};
use serde_json::json;

fn assert_json(actual: &[u8], expected: &str) {
    let actual = String::from_utf8_lossy(actual);
    assert_eq!(
        actual, expected,
        "JSON mismatch:\n  actual:   {actual}\n  expected: {expected}"
    );
}

// ============================================================================
// Records
// ============================================================================

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq, Clone)]
#[json(rename_all = "camelCase")]
struct Witness {
    pub invocation: Vec<u8>,
    pub verification: Vec<u8>,
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq, Clone)]
struct Header {
    pub version: u32,
    #[json(rename = "previousblockhash")]
    pub prev_hash: String,
    pub time: u64,
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq, Clone)]
struct Block {
    #[json(embed)]
    pub header: Header,
    #[json(string)]
    pub size: i64,
    pub ratio: f64,
    #[json(omitempty)]
    pub nonce: Option<u64>,
    pub witnesses: Vec<Witness>,
    pub tags: BTreeMap<String, bool>,
    pub extra: Option<RawValue>,
    pub memo: String,
}

fn sample_block() -> Block {
    let mut tags = BTreeMap::new();
    tags.insert("main".to_string(), true);
    tags.insert("alt".to_string(), false);
    Block {
        header: Header {
            version: 0,
            prev_hash: "0x1f4d".into(),
            time: 1_627_894_840_919,
        },
        size: 1024,
        ratio: 0.25,
        nonce: None,
        witnesses: vec![Witness {
            invocation: vec![0x0c, 0x40],
            verification: Vec::new(),
        }],
        tags,
        extra: Some(RawValue::from(r#"{"k":[1,2]}"#)),
        memo: "\u{41F}\u{440}\u{438}\u{432}\u{435}\u{442} <&>".into(),
    }
}

#[test]
fn block_encodes_to_expected_bytes() {
    let out = encode(&sample_block()).unwrap();
    assert_json(
        &out,
        concat!(
            r#"{"version":0,"previousblockhash":"0x1f4d","time":1627894840919,"#,
            r#""size":"1024","ratio":0.25,"#,
            r#""witnesses":[{"invocation":"DEA=","verification":""}],"#,
            r#""tags":{"alt":false,"main":true},"extra":{"k":[1,2]},"#,
            r#""memo":"\u041F\u0440\u0438\u0432\u0435\u0442 \u003C\u0026\u003E"}"#,
        ),
    );
}

#[test]
fn block_round_trips() {
    let block = sample_block();
    let bytes = encode(&block).unwrap();
    let mut back = Block::default();
    decode_into(&bytes, &mut back).unwrap();
    assert_eq!(back, block);
    assert_eq!(encode(&back).unwrap(), bytes);
}

#[test]
fn block_round_trips_through_indentation() {
    let block = sample_block();
    let opts = EncodeOptions::indented("", "    ");
    let bytes = ordered_json::encode_with(&block, &opts).unwrap();
    let mut back = Block::default();
    decode_into(&bytes, &mut back).unwrap();
    // RawValue keeps the indented span; everything else is equal.
    assert_eq!(back.header, block.header);
    assert_eq!(back.witnesses, block.witnesses);
    assert_eq!(encode(&back).unwrap(), encode(&block).unwrap());
}

// ============================================================================
// Value model
// ============================================================================

#[test]
fn value_reencodes_to_identical_bytes() {
    let input = br#"{"z":[1.0,-0,1E+2,"x y"],"a":{"a":null,"a":true},"":""}"#;
    let value = decode(input).unwrap();
    assert_eq!(encode(&value).unwrap(), input.to_vec());
}

#[test]
fn value_normalizes_escapes_to_canonical_form() {
    let value = decode(br#"["\u00e9\/A"]"#).unwrap();
    assert_json(&encode(&value).unwrap(), r#"["\u00E9/A"]"#);
}

#[test]
fn to_value_and_back() {
    let block = sample_block();
    let value = to_value(&block).unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.get(0).map(|m| m.key.as_str()), Some("version"));
    assert_eq!(obj.find("size").and_then(Value::as_str), Some("1024"));

    let back: Block = from_value(&value).unwrap();
    assert_eq!(back, block);
}

// ============================================================================
// serde interop
// ============================================================================

#[test]
fn serde_json_serializes_in_member_order() {
    let value = decode(br#"{"b":1,"a":[true,null,"x"],"b":2.5}"#).unwrap();
    assert_eq!(
        serde_json::to_string(&value).unwrap(),
        r#"{"b":1,"a":[true,null,"x"],"b":2.5}"#
    );
}

#[test]
fn serde_json_deserializes_duplicates() {
    let value: Value = serde_json::from_str(r#"{"k":1,"j":{},"k":"two"}"#).unwrap();
    let obj = value.as_object().unwrap();
    let keys: Vec<&str> = obj.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, ["k", "j", "k"]);
    assert_eq!(obj.find_all("k").nth(1).and_then(Value::as_str), Some("two"));
}

#[test]
fn serde_json_value_converts_in_order() {
    let value = Value::from(json!({"z": 1, "a": [true, null], "m": {"x": "\u{e9}"}}));
    assert_json(
        &encode(&value).unwrap(),
        r#"{"z":1,"a":[true,null],"m":{"x":"\u00E9"}}"#,
    );
}

#[test]
fn raw_value_serializes_as_parsed_json() {
    let mut obj = Object::new();
    obj.push("raw", Value::Raw(RawValue::from(r#"{"q":[1, 2]}"#)));
    obj.push("n", Number::from(7i64));
    assert_eq!(
        serde_json::to_string(&Value::Object(obj)).unwrap(),
        r#"{"raw":{"q":[1,2]},"n":7}"#
    );
}

#[test]
fn options_deserialize_with_defaults() {
    let enc: EncodeOptions = serde_json::from_str(r#"{"indent":"  "}"#).unwrap();
    assert!(enc.escape_html);
    assert_eq!(enc.indent, "  ");

    let dec: DecodeOptions = serde_json::from_str(r#"{"disallow_unknown_fields":true}"#).unwrap();
    assert!(dec.disallow_unknown_fields);
    assert_eq!(dec.max_depth, DecodeOptions::default().max_depth);
}
