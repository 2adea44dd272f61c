//! Spillover decoding: walk one JSON object and route every key either into
//! its declared field or into the overflow map.

use alloc::boxed::Box;
use alloc::string::{String, ToString};

use serde::Deserialize;
use serde::de::Error as _;
use serde_json::value::RawValue;

use crate::error::{Error, ErrorKind, Result};
use crate::schema::{Layout, Record, Target};
use crate::span::Span;
use crate::tokenizer::{Token, Tokenizer};

// ============================================================================
// Deserializer
// ============================================================================

/// Walks a single JSON object on behalf of one record.
struct SpilloverDeserializer<'input, 's, R> {
    tokenizer: Tokenizer<'input>,
    layout: Layout<'s, R>,
}

impl<'input, 's, R: Record> SpilloverDeserializer<'input, 's, R> {
    fn new(input: &'input [u8], layout: Layout<'s, R>) -> Self {
        SpilloverDeserializer {
            tokenizer: Tokenizer::new(input),
            layout,
        }
    }

    /// Consume `{`, every key/value pair, and `}`.
    ///
    /// Stops at the first error. Pairs routed before the failing one stay
    /// applied to `record`.
    fn deserialize_object(&mut self, record: &mut R) -> Result<()> {
        let open = self.tokenizer.next_token()?;
        if open.node != Token::LBrace {
            return Err(Error::new(
                ErrorKind::NotGivenStruct {
                    expected: "'{'",
                    got: open.node.to_string(),
                },
                open.span,
            ));
        }

        while self.tokenizer.more() {
            let key_token = self.tokenizer.next_token()?;
            let key = match key_token.node {
                Token::String(key) => key,
                other => {
                    return Err(Error::new(
                        ErrorKind::GivenNonStringKey {
                            got: other.to_string(),
                        },
                        key_token.span,
                    ));
                }
            };
            self.route(record, key, key_token.span)?;
        }

        let close = self.tokenizer.next_token()?;
        if close.node != Token::RBrace {
            return Err(Error::new(
                ErrorKind::MalformedJson {
                    got: close.node.to_string(),
                },
                close.span,
            ));
        }
        Ok(())
    }

    /// Decode the value pending after `key` into its destination.
    ///
    /// A key naming a read-only field is an error rather than overflow.
    fn route(&mut self, record: &mut R, key: String, key_span: Span) -> Result<()> {
        if let Some(field) = self.layout.lookup(&key) {
            if !field.is_writable() {
                return Err(Error::new(
                    ErrorKind::ReadOnlyField { field: field.name },
                    key_span,
                ));
            }
            log::trace!("routing `{key}` to field `{}`", field.name);
            return field.slot.decode(record, field.name, &mut self.tokenizer);
        }

        let spill = self.layout.spill;
        log::trace!("routing `{key}` to overflow field `{}`", spill.name);
        spill.slot.spill(record, spill.name, key, &mut self.tokenizer)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Decode the JSON object in `raw` into `target`.
///
/// Keys naming a declared field are decoded as that field's type. Every
/// other key is decoded as the value type of the map field called
/// `overflow` and inserted into it; an absent (`None`) overflow map is
/// created on the first such key and left alone otherwise.
///
/// The shape of the target type is checked before any input is read, so a
/// badly declared target is reported even when `raw` is not valid JSON.
///
/// Note: For rich error diagnostics with source code display, prefer
/// [`decode_str`] which can attach the source string to errors.
pub fn decode<T: Target>(mut target: T, overflow: &str, raw: &[u8]) -> Result<()> {
    let Some(record) = target.record_mut() else {
        return Err(Error::without_span(ErrorKind::NotGivenMutable));
    };

    let schema = T::Record::schema();
    let layout = schema.layout(overflow, true)?;
    log::trace!(
        "decode: target={}, overflow={overflow}",
        core::any::type_name::<T::Record>()
    );

    let mut deserializer = SpilloverDeserializer::new(raw, layout);
    deserializer.deserialize_object(record)?;
    deserializer.tokenizer.finish()?;
    log::trace!(
        "decode: consumed {} of {} bytes",
        deserializer.tokenizer.position(),
        raw.len()
    );
    Ok(())
}

/// Decode the JSON object in the UTF-8 string `raw` into `target`.
///
/// A leading byte order mark is skipped. Errors from this function include
/// source code context for rich diagnostic display when using [`miette`]'s
/// reporting features.
pub fn decode_str<T: Target>(target: T, overflow: &str, raw: &str) -> Result<()> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    decode(target, overflow, raw.as_bytes()).map_err(|e| e.with_source(raw))
}

/// Decode a new `R`, starting from `R::default()`.
pub fn from_slice<R: Record + Default>(raw: &[u8], overflow: &str) -> Result<R> {
    let mut record = R::default();
    decode(&mut record, overflow, raw)?;
    Ok(record)
}

/// Decode a new `R` from a UTF-8 string, starting from `R::default()`.
pub fn from_str<R: Record + Default>(raw: &str, overflow: &str) -> Result<R> {
    let mut record = R::default();
    decode_str(&mut record, overflow, raw)?;
    Ok(record)
}

/// Body of a `serde::Deserialize` impl for a record.
///
/// ```
/// use serde::{Deserialize, Deserializer};
/// use std::collections::BTreeMap;
///
/// #[derive(Default)]
/// struct Tagged {
///     id: u32,
///     rest: BTreeMap<String, serde_json::Value>,
/// }
///
/// spillover_json::record! {
///     Tagged {
///         id: field,
///         rest: map "-",
///     }
/// }
///
/// impl<'de> Deserialize<'de> for Tagged {
///     fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
///         spillover_json::deserialize(deserializer, "rest")
///     }
/// }
///
/// let all: Vec<Tagged> = serde_json::from_str(r#"[{"id": 1, "x": true}, {"id": 2}]"#).unwrap();
/// assert_eq!(all[0].rest["x"], true);
/// assert!(all[1].rest.is_empty());
/// ```
///
/// The value is buffered as a [`RawValue`] first, so this only works with
/// `serde_json` deserializers.
pub fn deserialize<'de, D, R>(deserializer: D, overflow: &str) -> core::result::Result<R, D::Error>
where
    D: serde::Deserializer<'de>,
    R: Record + Default,
{
    let raw = Box::<RawValue>::deserialize(deserializer)?;
    from_slice(raw.get().as_bytes(), overflow).map_err(D::Error::custom)
}
