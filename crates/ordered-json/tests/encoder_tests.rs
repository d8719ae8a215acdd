use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use ordered_json::{
    encode, encode_indent, encode_to_string, encode_with, to_value, EncodeOptions, JsonError,
    Marshal, Number, Object, RawValue, Value,
};

fn encoded(value: &(impl Marshal + ?Sized)) -> String {
    String::from_utf8(encode(value).unwrap()).unwrap()
}

fn assert_json(actual: &str, expected: &str) {
    assert_eq!(
        actual, expected,
        "JSON mismatch:\n  actual:   {actual}\n  expected: {expected}"
    );
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn encode_primitives() {
    assert_json(&encoded(&true), "true");
    assert_json(&encoded(&-12i64), "-12");
    assert_json(&encoded(&u64::MAX), "18446744073709551615");
    assert_json(&encoded(&1.5f64), "1.5");
    assert_json(&encoded(&1e21f64), "1e+21");
    assert_json(&encoded(&0.000001f64), "0.000001");
    assert_json(&encoded(&1e-7f64), "1e-7");
    assert_json(&encoded(&Value::Null), "null");
}

#[test]
fn encode_non_finite_floats_fails() {
    for (f, name) in [(f64::NAN, "NaN"), (f64::INFINITY, "+Inf"), (f64::NEG_INFINITY, "-Inf")] {
        let err = encode(&f).unwrap_err();
        assert!(
            matches!(&err, JsonError::UnsupportedValue(v) if v == name),
            "got {err:?}"
        );
    }
}

#[test]
fn encode_invalid_number_fails() {
    let err = encode(&Number::from("1.")).unwrap_err();
    assert!(matches!(err, JsonError::InvalidNumber(_)), "got {err:?}");
    assert_json(&encoded(&Number::default()), "0");
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn encode_object_keeps_insertion_order() {
    let mut obj = Object::new();
    obj.push("z", 1i64);
    obj.push("a", Value::Array(vec![Value::Null, Value::from("x")]));
    obj.push("z", false);
    assert_json(&encoded(&obj), r#"{"z":1,"a":[null,"x"],"z":false}"#);
}

#[test]
fn encode_maps_sorted_by_key_text() {
    let mut h: HashMap<u32, &str> = HashMap::new();
    h.insert(9, "nine");
    h.insert(10, "ten");
    h.insert(1, "one");
    assert_json(&encoded(&h), r#"{"1":"one","10":"ten","9":"nine"}"#);

    let mut b: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    b.insert("b".into(), vec![1, 2]);
    b.insert("a".into(), Vec::new());
    assert_json(&encoded(&b), r#"{"a":"","b":"AQI="}"#);
}

#[test]
fn encode_bool_map_key_is_unsupported() {
    let mut m = HashMap::new();
    m.insert(true, 1);
    let err = encode(&m).unwrap_err();
    assert!(
        matches!(&err, JsonError::UnsupportedValue(msg) if msg.contains("bool")),
        "got {err:?}"
    );
}

#[test]
fn encode_fixed_byte_array_as_numbers() {
    assert_json(&encoded(&[0u8, 1]), "[0,1]");
    assert_json(&encoded(&vec![0u8, 1]), r#""AAE=""#);
}

#[test]
fn encode_options_and_nesting() {
    let v: Vec<Option<i32>> = vec![Some(1), None];
    assert_json(&encoded(&v), "[1,null]");
    let empty: Vec<i32> = Vec::new();
    assert_json(&encoded(&empty), "[]");
}

// ============================================================================
// Cycles
// ============================================================================

#[derive(Marshal, Default)]
struct Node {
    pub name: String,
    pub next: Option<Rc<RefCell<Node>>>,
}

#[test]
fn encode_shared_pointer_chain() {
    let tail = Rc::new(RefCell::new(Node {
        name: "tail".into(),
        next: None,
    }));
    let head = Node {
        name: "head".into(),
        next: Some(tail),
    };
    assert_json(
        &encoded(&head),
        r#"{"name":"head","next":{"name":"tail","next":null}}"#,
    );
}

#[test]
fn encode_same_pointer_twice_is_not_a_cycle() {
    let shared = Rc::new(RefCell::new(Node::default()));
    let pair = vec![Rc::clone(&shared), shared];
    assert_json(
        &encoded(&pair),
        r#"[{"name":"","next":null},{"name":"","next":null}]"#,
    );
}

#[test]
fn encode_cycle_fails() {
    let node = Rc::new(RefCell::new(Node {
        name: "loop".into(),
        next: None,
    }));
    node.borrow_mut().next = Some(Rc::clone(&node));

    let err = encode(&node).unwrap_err();
    assert!(
        matches!(&err, JsonError::UnsupportedValue(msg) if msg.starts_with("encountered a cycle via")),
        "got {err:?}"
    );
    // Break the cycle so the test does not leak.
    node.borrow_mut().next = None;
}

#[derive(Marshal)]
struct Shared {
    #[json(string)]
    pub count: Rc<i64>,
    #[json(string)]
    pub total: std::sync::Arc<u64>,
}

#[test]
fn encode_shared_pointer_keeps_string_option() {
    let s = Shared {
        count: Rc::new(42),
        total: std::sync::Arc::new(7),
    };
    assert_json(&encoded(&s), r#"{"count":"42","total":"7"}"#);
}

// ============================================================================
// Raw values
// ============================================================================

#[test]
fn encode_raw_value_is_compacted_and_escaped() {
    let raw = RawValue::from(r#"{ "a" : [1, "<"] }"#);
    assert_json(&encoded(&raw), r#"{"a":[1,"\u003C"]}"#);
    assert_json(&encoded(&RawValue::default()), "null");
}

#[test]
fn encode_invalid_raw_value_fails() {
    let err = encode(&RawValue::from("{")).unwrap_err();
    assert!(
        matches!(&err, JsonError::Hook { type_name, .. } if type_name == "RawValue"),
        "got {err:?}"
    );
}

// ============================================================================
// Entry points
// ============================================================================

#[test]
fn encode_indent_with_prefix() {
    let mut obj = Object::new();
    obj.push("a", Value::Array(vec![Value::from(1i64), Value::from(2i64)]));
    obj.push("b", Object::new());
    let out = encode_indent(&obj, "# ", "\t").unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "{\n# \t\"a\": [\n# \t\t1,\n# \t\t2\n# \t],\n# \t\"b\": {}\n# }"
    );
}

#[test]
fn encode_indent_with_empty_strings_still_breaks_lines() {
    let mut obj = Object::new();
    obj.push("a", 1i64);
    obj.push("b", Value::Array(vec![Value::Bool(true)]));
    let out = encode_indent(&obj, "", "").unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "{\n\"a\": 1,\n\"b\": [\ntrue\n]\n}"
    );
    assert_json(&encoded(&obj), r#"{"a":1,"b":[true]}"#);
}

#[test]
fn encode_with_html_escaping_off() {
    let opts = EncodeOptions {
        escape_html: false,
        ..EncodeOptions::default()
    };
    let out = encode_with(&vec!["a&b", "<>"], &opts).unwrap();
    assert_eq!(out, br#"["a&b","<>"]"#.to_vec());
}

#[test]
fn encode_to_string_escapes_non_ascii() {
    assert_eq!(encode_to_string("caf\u{e9}").unwrap(), r#""caf\u00E9""#);
}

#[test]
fn to_value_builds_tree() {
    let mut m = BTreeMap::new();
    m.insert("k".to_string(), vec![1i64, 2]);
    let v = to_value(&m).unwrap();
    let obj = v.as_object().unwrap();
    assert_eq!(obj.len(), 1);
    let items = obj.find("k").and_then(Value::as_array).unwrap();
    assert_eq!(items[1].as_number().and_then(Number::as_i64), Some(2));
}
