//! Failure modes: malformed input, then badly declared targets.

mod common;

use std::collections::HashMap;

use serde_json::Value;
use serde_json::value::RawValue;
use spillover_json::{
    Error, ErrorKind, PREFIX, Record, Schema, Span, TokenErrorKind, decode, record,
};

const RAW_E: &str = r#"{
    "foo": "alpha", "bar": 42, "Direct": true, "more": "wibble", "num": 3.14159
}"#;

#[derive(Debug, Default)]
struct Loose {
    foo: String,
    bar: i64,
    rest: Option<HashMap<String, Value>>,
}

record! {
    Loose {
        foo: field "foo",
        bar: field "bar",
        rest: map "-",
    }
}

fn decode_loose(raw: &str) -> Error {
    let mut loose = Loose::default();
    decode(&mut loose, "rest", raw.as_bytes()).unwrap_err()
}

fn token_kind(err: &Error) -> &TokenErrorKind {
    match &err.kind {
        ErrorKind::Token(kind) => kind,
        other => panic!("expected a tokenizer error, got {other:?}"),
    }
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn bare_words_bubble_from_serde_json() {
    common::setup();
    for raw in ["alfa", "foxtrot"] {
        let err = decode_loose(raw);
        assert!(matches!(err.kind, ErrorKind::Json(_)), "{raw}: {err:?}");
        assert!(!err.to_string().starts_with(PREFIX), "{raw}: {err}");
    }
}

#[test]
fn array_is_not_a_struct() {
    common::setup();
    let err = decode_loose("[]");
    assert!(matches!(err.kind, ErrorKind::NotGivenStruct { .. }));
    assert_eq!(err.span, Some(Span::new(0, 1)));
    insta::assert_snapshot!(err.to_string(), @"spillover: not given a struct in the raw stream: expected '{' got '['");
}

#[test]
fn scalar_is_not_a_struct() {
    common::setup();
    insta::assert_snapshot!(
        decode_loose(r#"  "text""#),
        @r#"spillover: not given a struct in the raw stream: expected '{' got string "text""#
    );
    insta::assert_snapshot!(
        decode_loose("42"),
        @"spillover: not given a struct in the raw stream: expected '{' got number 42"
    );
}

#[test]
fn wrong_field_type_bubbles_from_serde_json() {
    common::setup();
    let err = decode_loose(r#"{"foo": 42}"#);
    assert!(matches!(err.kind, ErrorKind::Json(_)));
    assert!(
        err.to_string()
            .starts_with("invalid type: integer `42`, expected a string"),
        "{err}"
    );
    assert!(
        matches!(err.span, Some(span) if (8..=10).contains(&span.start)),
        "{:?}",
        err.span
    );
}

#[test]
fn numeric_key_is_a_tokenizer_error() {
    common::setup();
    let err = decode_loose(r#"{ 42: "foo"}"#);
    assert_eq!(
        token_kind(&err),
        &TokenErrorKind::UnexpectedCharacter {
            found: '4',
            context: "looking for beginning of object key string",
        }
    );
    insta::assert_snapshot!(err.to_string(), @"invalid character '4' looking for beginning of object key string");
    assert_eq!(err.span, Some(Span::new(2, 1)));
}

#[test]
fn missing_colon() {
    common::setup();
    let err = decode_loose(r#"{"foo", 42}"#);
    assert_eq!(token_kind(&err), &TokenErrorKind::ExpectedColon);
    insta::assert_snapshot!(err.to_string(), @"expected colon after object key");
    assert_eq!(err.span, Some(Span::new(6, 1)));
}

#[test]
fn missing_colon_before_overflow_value() {
    common::setup();
    let err = decode_loose(r#"{"other" 42}"#);
    assert_eq!(token_kind(&err), &TokenErrorKind::ExpectedColon);
}

#[test]
fn truncated_object() {
    common::setup();
    for raw in ["{", "{\"foo\": \"alpha\",", "{\"foo\""] {
        let err = decode_loose(raw);
        assert_eq!(
            token_kind(&err),
            &TokenErrorKind::UnexpectedEof,
            "{raw:?}: {err}"
        );
        assert_eq!(err.span, Some(Span::new(raw.len(), 0)));
    }
    insta::assert_snapshot!(decode_loose("{"), @"unexpected end of input");
}

#[test]
fn empty_input() {
    common::setup();
    let err = decode_loose("   ");
    assert_eq!(token_kind(&err), &TokenErrorKind::UnexpectedEof);
}

#[test]
fn trailing_comma() {
    common::setup();
    let err = decode_loose(r#"{"foo": "alpha",}"#);
    assert!(matches!(
        token_kind(&err),
        TokenErrorKind::UnexpectedCharacter { found: '}', .. }
    ));
}

#[test]
fn mismatched_close() {
    common::setup();
    let err = decode_loose(r#"{"foo": "alpha"]"#);
    assert_eq!(
        token_kind(&err),
        &TokenErrorKind::UnexpectedCharacter {
            found: ']',
            context: "after object key:value pair",
        }
    );
}

#[test]
fn trailing_garbage() {
    common::setup();
    let err = decode_loose(r#"{"foo": "alpha"} x"#);
    assert_eq!(
        token_kind(&err),
        &TokenErrorKind::UnexpectedCharacter {
            found: 'x',
            context: "after top-level value",
        }
    );

    let mut loose = Loose::default();
    decode(&mut loose, "rest", b"{\"foo\": \"alpha\"}\n\t ").unwrap();
    assert_eq!(loose.foo, "alpha");
}

#[test]
fn second_object_is_trailing_garbage() {
    common::setup();
    let err = decode_loose("{}{}");
    assert!(matches!(
        token_kind(&err),
        TokenErrorKind::UnexpectedCharacter { found: '{', .. }
    ));
}

// ============================================================================
// Badly declared targets
// ============================================================================

#[derive(Default)]
struct NoSpill {}

record! { NoSpill {} }

#[derive(Default)]
struct BadSpill {
    rest: String,
}

record! {
    BadSpill {
        rest: field,
    }
}

#[derive(Default)]
struct BadSpillKey {
    rest: HashMap<i32, Box<RawValue>>,
}

record! {
    BadSpillKey {
        rest: map,
    }
}

#[derive(Default)]
struct IntSpillValue {
    rest: HashMap<String, i64>,
}

record! {
    IntSpillValue {
        rest: map,
    }
}

#[derive(Default)]
struct Frozen {
    rest: HashMap<String, Value>,
}

record! {
    Frozen {
        rest: read_only_map,
    }
}

struct Many(Vec<Loose>);

impl Record for Many {
    fn schema() -> Schema<Self> {
        Schema::opaque()
    }
}

fn assert_declaration(err: Error, expected: &str) {
    assert!(err.kind.is_declaration(), "{err:?}");
    assert_eq!(err.kind.code(), expected);
    assert!(err.to_string().starts_with(PREFIX), "{err}");
    assert_eq!(err.span, None);
}

#[test]
fn shared_reference_is_not_mutable() {
    common::setup();
    let loose = Loose::default();
    let err = decode(&loose, "rest", RAW_E.as_bytes()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotGivenMutable));
    insta::assert_snapshot!(err.to_string(), @"spillover: not given something which we can assign to");
    assert_declaration(err, "spillover::not_given_mutable");
}

#[test]
fn opaque_holder_is_not_a_struct() {
    common::setup();
    let mut many = Many(Vec::new());
    let err = decode(&mut many, "rest", RAW_E.as_bytes()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotStructHolder { .. }));
    assert!(many.0.is_empty());
    assert_declaration(err, "spillover::not_struct_holder");
}

#[test]
fn overflow_field_must_exist() {
    common::setup();
    let err = decode(&mut NoSpill::default(), "rest", RAW_E.as_bytes()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"spillover: target struct missing specified spillover field `rest`");
    assert_declaration(err, "spillover::missing_spillover_field");

    let err = decode(&mut Loose::default(), "Rest", RAW_E.as_bytes()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"spillover: target struct missing specified spillover field `Rest` (did you mean `rest`?)");
}

#[test]
fn overflow_field_must_be_a_map() {
    common::setup();
    let err = decode(&mut BadSpill::default(), "rest", RAW_E.as_bytes()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"spillover: target's spillover field is not a string-keyed map: `rest` is `alloc::string::String`");
    assert_declaration(err, "spillover::spill_not_right_map");
}

#[test]
fn overflow_keys_must_be_strings() {
    common::setup();
    let err = decode(&mut BadSpillKey::default(), "rest", RAW_E.as_bytes()).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::SpillNotRightMap { field: "rest", .. }
    ));
    assert_declaration(err, "spillover::spill_not_right_map");
}

#[test]
fn overflow_field_must_be_writable() {
    common::setup();
    let err = decode(&mut Frozen::default(), "rest", RAW_E.as_bytes()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"spillover: target struct's spillover field not assignable: `rest`");
    assert_declaration(err, "spillover::unsetable_spillover_field");
}

#[test]
fn overflow_value_type_mismatch_bubbles() {
    common::setup();
    let mut target = IntSpillValue::default();
    let err = decode(&mut target, "rest", RAW_E.as_bytes()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Json(_)));
    assert!(
        err.to_string()
            .starts_with("invalid type: string \"alpha\", expected i64"),
        "{err}"
    );
    assert!(target.rest.is_empty());
}

#[test]
fn duplicate_wire_keys_are_rejected() {
    common::setup();
    #[derive(Default)]
    struct Clash {
        name: String,
        title: String,
        rest: HashMap<String, Value>,
    }

    record! {
        Clash {
            name: field,
            title: field "name",
            rest: map "-",
        }
    }

    let err = decode(&mut Clash::default(), "rest", b"{}").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"spillover: fields `name` and `title` both decode from key `name`");
    assert_declaration(err, "spillover::duplicate_wire_key");
}

#[test]
fn declaration_errors_win_over_bad_input() {
    common::setup();
    let loose = Loose::default();
    let cases: [(Error, &str); 6] = [
        (
            decode(&loose, "rest", b"alfa").unwrap_err(),
            "spillover::not_given_mutable",
        ),
        (
            decode(&mut Many(Vec::new()), "rest", b"alfa").unwrap_err(),
            "spillover::not_struct_holder",
        ),
        (
            decode(&mut NoSpill::default(), "rest", b"alfa").unwrap_err(),
            "spillover::missing_spillover_field",
        ),
        (
            decode(&mut BadSpill::default(), "rest", b"[").unwrap_err(),
            "spillover::spill_not_right_map",
        ),
        (
            decode(&mut BadSpillKey::default(), "rest", b"").unwrap_err(),
            "spillover::spill_not_right_map",
        ),
        (
            decode(&mut Frozen::default(), "rest", b"{ 42: 1 }").unwrap_err(),
            "spillover::unsetable_spillover_field",
        ),
    ];
    for (err, code) in cases {
        assert_declaration(err, code);
    }
}

#[test]
fn mutability_is_checked_before_shape() {
    common::setup();
    let many = Many(Vec::new());
    let err = decode(&many, "nope", b"").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotGivenMutable));
}
