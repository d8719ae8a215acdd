use std::sync::Arc;
use std::thread;

use ordered_json::plan::plan_for;
use ordered_json::{decode_into, decode_with, encode, DecodeOptions, JsonError, Marshal, Record, Unmarshal};

fn encoded(value: &impl Marshal) -> String {
    String::from_utf8(encode(value).unwrap()).unwrap()
}

fn assert_json(actual: &str, expected: &str) {
    assert_eq!(
        actual, expected,
        "JSON mismatch:\n  actual:   {actual}\n  expected: {expected}"
    );
}

fn plan_names<T: Record>() -> Vec<String> {
    plan_for(T::describe())
        .fields()
        .iter()
        .map(|f| f.name.clone())
        .collect()
}

// ============================================================================
// Embedded dominance
// ============================================================================

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
#[json(rename_all = "PascalCase")]
struct BugA {
    pub s: String,
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
#[json(rename_all = "PascalCase")]
struct BugB {
    #[json(embed)]
    pub bug_a: BugA,
    pub s: String,
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
#[json(rename_all = "PascalCase")]
struct BugC {
    pub s: String,
}

#[derive(Marshal, Default)]
#[json(rename_all = "PascalCase")]
struct BugX {
    pub a: i64,
    #[json(embed)]
    pub bug_a: BugA,
    #[json(embed)]
    pub bug_b: BugB,
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
struct BugD {
    #[json(rename = "S")]
    pub xxx: String,
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
struct BugY {
    #[json(embed)]
    pub bug_a: BugA,
    #[json(embed)]
    pub bug_d: BugD,
}

#[derive(Marshal, Default)]
struct BugZ {
    #[json(embed)]
    pub bug_a: BugA,
    #[json(embed)]
    pub bug_c: BugC,
    #[json(embed)]
    pub bug_y: BugY,
}

#[test]
fn shallower_field_wins() {
    let v = BugB {
        bug_a: BugA { s: "A".into() },
        s: "B".into(),
    };
    assert_json(&encoded(&v), r#"{"S":"B"}"#);
}

#[test]
fn ambiguous_field_at_same_depth_disappears() {
    let x = BugX {
        a: 23,
        ..BugX::default()
    };
    assert_json(&encoded(&x), r#"{"A":23}"#);
    assert_eq!(plan_names::<BugX>(), ["A"]);
}

#[test]
fn tagged_field_dominates_untagged() {
    let v = BugY {
        bug_a: BugA { s: "BugA".into() },
        bug_d: BugD { xxx: "BugD".into() },
    };
    assert_json(&encoded(&v), r#"{"S":"BugD"}"#);
}

#[test]
fn deeper_tagged_field_does_not_break_a_tie() {
    let v = BugZ {
        bug_a: BugA { s: "BugA".into() },
        bug_c: BugC { s: "BugC".into() },
        bug_y: BugY {
            bug_a: BugA {
                s: "nested BugA".into(),
            },
            bug_d: BugD {
                xxx: "nested BugD".into(),
            },
        },
    };
    assert_json(&encoded(&v), "{}");
}

#[test]
fn decode_targets_the_dominant_field() {
    let mut v = BugB::default();
    decode_into(br#"{"S":"outer"}"#, &mut v).unwrap();
    assert_eq!(v.s, "outer");
    assert_eq!(v.bug_a.s, "");

    let mut y = BugY::default();
    decode_into(br#"{"S":"tagged"}"#, &mut y).unwrap();
    assert_eq!(y.bug_d.xxx, "tagged");
    assert_eq!(y.bug_a.s, "");
}

// ============================================================================
// Visibility
// ============================================================================

#[derive(Marshal, Default)]
#[json(rename_all = "PascalCase")]
struct Inner2 {
    pub exported_int_type2: i64,
    hidden: i64,
}

#[derive(Marshal, Default)]
#[json(rename_all = "PascalCase")]
struct Inner1 {
    pub exported_int_type1: i64,
    hidden: i64,
    #[json(embed)]
    inner2: Inner2,
}

#[derive(Marshal, Default)]
#[json(rename_all = "PascalCase")]
struct Outer {
    #[json(embed)]
    inner1: Inner1,
    hidden: i64,
}

#[test]
fn private_embedded_records_still_promote_public_fields() {
    let a = Outer {
        inner1: Inner1 {
            exported_int_type1: 1,
            hidden: 2,
            inner2: Inner2 {
                exported_int_type2: 3,
                hidden: 4,
            },
        },
        hidden: 6,
    };
    assert_json(
        &encoded(&a),
        r#"{"ExportedIntType1":1,"ExportedIntType2":3}"#,
    );
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
struct Account {
    pub name: String,
    secret: String,
    #[json(skip)]
    pub cache: Vec<u8>,
}

#[test]
fn private_and_skipped_fields_are_invisible_both_ways() {
    let acc = Account {
        name: "neo".into(),
        secret: "k".into(),
        cache: vec![1, 2],
    };
    assert_json(&encoded(&acc), r#"{"name":"neo"}"#);

    let mut back = Account::default();
    decode_into(br#"{"name":"gas","secret":"x","cache":"AQI="}"#, &mut back).unwrap();
    assert_eq!(back.name, "gas");
    assert_eq!(back.secret, "");
    assert!(back.cache.is_empty());
}

// ============================================================================
// Flattening, pointers and tags
// ============================================================================

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
struct Meta {
    pub version: u32,
    pub nonce: u32,
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
struct Envelope {
    pub id: u32,
    #[json(embed)]
    pub meta: Meta,
    pub trailer: String,
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
struct Lazy {
    pub id: u32,
    #[json(embed)]
    pub meta: Option<Box<Meta>>,
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
struct Nested {
    pub id: u32,
    #[json(embed, rename = "meta")]
    pub meta: Meta,
}

#[test]
fn embedded_fields_flatten_in_declaration_order() {
    let e = Envelope {
        id: 1,
        meta: Meta {
            version: 2,
            nonce: 3,
        },
        trailer: "t".into(),
    };
    assert_json(
        &encoded(&e),
        r#"{"id":1,"version":2,"nonce":3,"trailer":"t"}"#,
    );
    assert_eq!(plan_names::<Envelope>(), ["id", "version", "nonce", "trailer"]);
}

#[test]
fn absent_embedded_pointer_hides_its_fields() {
    let l = Lazy { id: 7, meta: None };
    assert_json(&encoded(&l), r#"{"id":7}"#);

    let l = Lazy {
        id: 7,
        meta: Some(Box::new(Meta {
            version: 1,
            nonce: 0,
        })),
    };
    assert_json(&encoded(&l), r#"{"id":7,"version":1,"nonce":0}"#);
}

#[test]
fn decode_allocates_embedded_pointer_on_first_field() {
    let mut l = Lazy::default();
    decode_into(br#"{"id":1}"#, &mut l).unwrap();
    assert!(l.meta.is_none());

    decode_into(br#"{"nonce":9}"#, &mut l).unwrap();
    assert_eq!(
        l.meta.as_deref(),
        Some(&Meta {
            version: 0,
            nonce: 9
        })
    );
}

#[test]
fn tagged_embedded_record_is_a_named_member() {
    let n = Nested {
        id: 1,
        meta: Meta {
            version: 2,
            nonce: 3,
        },
    };
    let json = encoded(&n);
    assert_json(&json, r#"{"id":1,"meta":{"version":2,"nonce":3}}"#);

    let mut back = Nested::default();
    decode_into(json.as_bytes(), &mut back).unwrap();
    assert_eq!(back, n);
}

#[derive(Marshal, Default)]
struct BadTags {
    #[json(rename = "bad\"name")]
    pub quoted: i32,
    #[json(rename = "")]
    pub empty: i32,
    #[json(rename = "a-b.c:d")]
    pub punct: i32,
}

#[test]
fn invalid_rename_tags_fall_back_to_field_name() {
    assert_json(
        &encoded(&BadTags::default()),
        r#"{"quoted":0,"empty":0,"a-b.c:d":0}"#,
    );
}

#[derive(Marshal, Unmarshal, Default, Debug, PartialEq)]
#[json(rename_all = "camelCase")]
struct Renamed {
    pub block_hash: String,
    pub tx_count: u32,
    #[json(rename = "Witness")]
    pub witness_script: String,
    pub r#type: u8,
}

#[test]
fn rename_all_applies_to_untagged_fields() {
    let r = Renamed {
        block_hash: "h".into(),
        tx_count: 2,
        witness_script: "w".into(),
        r#type: 1,
    };
    assert_json(
        &encoded(&r),
        r#"{"blockHash":"h","txCount":2,"Witness":"w","type":1}"#,
    );
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn decode_matches_names_case_insensitively() {
    let mut r = Renamed::default();
    decode_into(br#"{"BLOCKHASH":"x","witness":"y","TxCount":3}"#, &mut r).unwrap();
    assert_eq!(r.block_hash, "x");
    assert_eq!(r.witness_script, "y");
    assert_eq!(r.tx_count, 3);
}

#[test]
fn exact_name_is_preferred_over_folded_match() {
    #[derive(Unmarshal, Default)]
    struct Twins {
        #[json(rename = "key")]
        pub lower: i32,
        #[json(rename = "KEY")]
        pub upper: i32,
    }
    let mut t = Twins::default();
    decode_into(br#"{"KEY":1,"key":2,"Key":3}"#, &mut t).unwrap();
    assert_eq!(t.upper, 1);
    assert_eq!(t.lower, 3);
}

#[test]
fn unknown_fields_are_reported_on_request() {
    let opts = DecodeOptions {
        disallow_unknown_fields: true,
        ..DecodeOptions::default()
    };
    let mut e = Envelope::default();
    let err = decode_with(br#"{"id":4,"bogus":1,"nonce":5}"#, &mut e, &opts).unwrap_err();
    assert!(matches!(&err, JsonError::UnknownField(name) if name == "bogus"), "got {err:?}");
    // Decoding still applies the rest of the object.
    assert_eq!(e.id, 4);
    assert_eq!(e.meta.nonce, 5);
}

// ============================================================================
// Plan cache
// ============================================================================

#[test]
fn plans_are_built_once_and_shared() {
    let first = plan_for(<Envelope as Record>::describe());
    let second = plan_for(<Envelope as Record>::describe());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.record(), "Envelope");
}

#[derive(Marshal, Default)]
struct Contended {
    pub a: u8,
    #[json(embed)]
    pub meta: Meta,
    pub z: u8,
}

#[test]
fn concurrent_first_use_yields_one_plan() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let c = Contended {
                    a: i,
                    ..Contended::default()
                };
                (encoded(&c), plan_for(<Contended as Record>::describe()))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (i, (json, plan)) in results.iter().enumerate() {
        assert_json(json, &format!(r#"{{"a":{i},"version":0,"nonce":0,"z":0}}"#));
        assert!(Arc::ptr_eq(plan, &results[0].1));
    }
}
