//! Re-encoding a record together with its overflow map.
//!
//! Declared fields are written in declaration order, followed by the
//! overflow entries. Overflow keys that name a declared field are dropped so
//! the output never carries the same key twice.

use alloc::string::String;
use alloc::vec::Vec;

use log::{debug, trace};
use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};

use crate::error::Result;
use crate::schema::{Layout, Record};

/// A record paired with a validated layout, ready to be serialized.
struct Flattened<'a, 's, R> {
    record: &'a R,
    layout: Layout<'s, R>,
}

impl<R: Record> Flattened<'_, '_, R> {
    fn entries(&self) -> Result<Vec<(String, serde_json::Value)>> {
        let mut entries = Vec::with_capacity(self.layout.fields.len());

        for field in self.layout.fields {
            if core::ptr::eq(field, self.layout.spill) {
                continue;
            }
            let Some(key) = field.wire_key() else {
                trace!("skipping excluded field `{}`", field.name);
                continue;
            };
            entries.push((key.into(), field.slot.to_value(self.record)?));
        }

        for (key, value) in self.layout.spill.slot.spilled(self.record)? {
            if self.layout.is_declared(&key) {
                debug!(
                    "dropping overflow key `{key}` from `{}`: it names a declared field",
                    self.layout.spill.name
                );
                continue;
            }
            entries.push((key, value));
        }

        Ok(entries)
    }
}

impl<R: Record> Serialize for Flattened<'_, '_, R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        trace!(
            "Serializing {} with overflow `{}`",
            core::any::type_name::<R>(),
            self.layout.spill.name
        );
        let entries = self.entries().map_err(S::Error::custom)?;
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in &entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Validate `R` against `overflow` for reading and run `f` on the result.
fn with_layout<R: Record, T>(
    record: &R,
    overflow: &str,
    f: impl FnOnce(&Flattened<'_, '_, R>) -> Result<T>,
) -> Result<T> {
    let schema = R::schema();
    let layout = schema.layout(overflow, false)?;
    f(&Flattened { record, layout })
}

/// Encode `record` as a [`serde_json::Value`].
///
/// Unless `serde_json`'s `preserve_order` feature is enabled the resulting
/// object is sorted by key; use [`to_string`] to keep declaration order.
pub fn to_value<R: Record>(record: &R, overflow: &str) -> Result<serde_json::Value> {
    with_layout(record, overflow, |flat| Ok(serde_json::to_value(flat)?))
}

/// Encode `record` as a JSON string.
pub fn to_string<R: Record>(record: &R, overflow: &str) -> Result<String> {
    with_layout(record, overflow, |flat| Ok(serde_json::to_string(flat)?))
}

/// Encode `record` as a pretty-printed JSON string.
pub fn to_string_pretty<R: Record>(record: &R, overflow: &str) -> Result<String> {
    with_layout(record, overflow, |flat| {
        Ok(serde_json::to_string_pretty(flat)?)
    })
}

/// Encode `record` as JSON bytes.
pub fn to_vec<R: Record>(record: &R, overflow: &str) -> Result<Vec<u8>> {
    with_layout(record, overflow, |flat| Ok(serde_json::to_vec(flat)?))
}

/// Encode `record` as JSON and write it to `writer`.
pub fn to_writer<R: Record, W: std::io::Write>(
    record: &R,
    overflow: &str,
    writer: W,
) -> Result<()> {
    with_layout(record, overflow, |flat| {
        Ok(serde_json::to_writer(writer, flat)?)
    })
}

/// Encode `record` as pretty-printed JSON and write it to `writer`.
pub fn to_writer_pretty<R: Record, W: std::io::Write>(
    record: &R,
    overflow: &str,
    writer: W,
) -> Result<()> {
    with_layout(record, overflow, |flat| {
        Ok(serde_json::to_writer_pretty(writer, flat)?)
    })
}

/// Body of a `serde::Serialize` impl for a record.
///
/// ```
/// use serde::{Serialize, Serializer};
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
/// impl Serialize for Tagged {
///     fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
///         spillover_json::serialize(self, "rest", serializer)
///     }
/// }
///
/// let mut tagged = Tagged { id: 3, ..Default::default() };
/// tagged.rest.insert("x".into(), true.into());
/// assert_eq!(serde_json::to_string(&[tagged]).unwrap(), r#"[{"id":3,"x":true}]"#);
/// ```
pub fn serialize<R, S>(record: &R, overflow: &str, serializer: S) -> core::result::Result<S::Ok, S::Error>
where
    R: Record,
    S: Serializer,
{
    let schema = R::schema();
    let layout = schema.layout(overflow, false).map_err(S::Error::custom)?;
    Flattened { record, layout }.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Note {
        title: String,
        draft: bool,
        rest: BTreeMap<String, serde_json::Value>,
    }

    impl Record for Note {
        fn schema() -> Schema<Self> {
            Schema::<Self>::record()
                .field("title", None, |r| &r.title, |r| &mut r.title)
                .field("draft", Some("-"), |r| &r.draft, |r| &mut r.draft)
                .map("rest", Some("-"), |r| &r.rest, |r| &mut r.rest)
        }
    }

    #[test]
    fn declared_fields_come_first() {
        let mut note = Note {
            title: "hi".into(),
            draft: true,
            ..Default::default()
        };
        note.rest.insert("a".into(), 1.into());
        assert_eq!(to_string(&note, "rest").unwrap(), r#"{"title":"hi","a":1}"#);
    }

    #[test]
    fn colliding_overflow_keys_are_dropped() {
        let mut note = Note::default();
        note.rest.insert("title".into(), "shadow".into());
        note.rest.insert("z".into(), serde_json::Value::Null);
        assert_eq!(to_string(&note, "rest").unwrap(), r#"{"title":"","z":null}"#);
    }
}
