//! Field descriptors registered at compile time, and the lookup table built
//! from them for each call.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, ErrorKind, Result};
use crate::tokenizer::Tokenizer;

/// A type whose fields can be decoded by this crate.
///
/// Usually implemented with the [`record!`](crate::record) macro:
///
/// ```
/// use std::collections::HashMap;
///
/// #[derive(Default)]
/// struct Event {
///     kind: String,
///     at: u64,
///     rest: Option<HashMap<String, serde_json::Value>>,
/// }
///
/// spillover_json::record! {
///     Event {
///         kind: field,
///         at: field "timestamp",
///         rest: map "-",
///     }
/// }
///
/// let event: Event = spillover_json::from_str(
///     r#"{"kind": "click", "timestamp": 7, "x": 3}"#,
///     "rest",
/// )
/// .unwrap();
/// assert_eq!(event.at, 7);
/// assert_eq!(event.rest.unwrap()["x"], 3);
/// ```
pub trait Record: Sized + 'static {
    /// Describe the fields of this type, in declaration order.
    fn schema() -> Schema<Self>;
}

/// A handle on the value being decoded into.
///
/// Implemented for `&mut R`, which can be decoded into, and for `&R`, which
/// is always rejected with [`ErrorKind::NotGivenMutable`].
pub trait Target {
    /// The record type behind the handle
    type Record: Record;

    /// Borrow the record for writing, if the handle allows it.
    fn record_mut(&mut self) -> Option<&mut Self::Record>;
}

impl<R: Record> Target for &mut R {
    type Record = R;

    fn record_mut(&mut self) -> Option<&mut R> {
        Some(&mut **self)
    }
}

impl<R: Record> Target for &R {
    type Record = R;

    fn record_mut(&mut self) -> Option<&mut R> {
        None
    }
}

// ============================================================================
// Map traits
// ============================================================================

/// Key type of an overflow map.
///
/// Only string-like keys can receive overflow entries; the other
/// implementations exist so that a wrongly keyed map is reported as
/// [`ErrorKind::SpillNotRightMap`] instead of being rejected at compile time
/// with a less helpful message.
pub trait MapKey: Sized {
    /// Whether wire keys can be stored as this type
    const STRING_LIKE: bool;

    /// Convert a wire key, or `None` if this key type is not string-like.
    fn from_wire(key: String) -> Option<Self>;

    /// View this key as a wire key, or `None` if it is not string-like.
    fn as_wire(&self) -> Option<&str>;
}

impl MapKey for String {
    const STRING_LIKE: bool = true;

    fn from_wire(key: String) -> Option<Self> {
        Some(key)
    }

    fn as_wire(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

macro_rules! string_like_key {
    ($($ty:ty),*) => {
        $(
            impl MapKey for $ty {
                const STRING_LIKE: bool = true;

                fn from_wire(key: String) -> Option<Self> {
                    Some(key.into())
                }

                fn as_wire(&self) -> Option<&str> {
                    Some(&**self)
                }
            }
        )*
    };
}

string_like_key!(Box<str>, Cow<'static, str>);

macro_rules! non_string_key {
    ($($ty:ty),*) => {
        $(
            impl MapKey for $ty {
                const STRING_LIKE: bool = false;

                fn from_wire(_key: String) -> Option<Self> {
                    None
                }

                fn as_wire(&self) -> Option<&str> {
                    None
                }
            }
        )*
    };
}

non_string_key!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char);

/// A map that can receive overflow entries.
pub trait SpillMap: Serialize + DeserializeOwned + 'static {
    /// Type each overflow value is decoded as
    type Value: Serialize + DeserializeOwned;

    /// Whether the map's key type is string-like
    const STRING_KEYS: bool;

    /// Insert one overflow entry, creating the map first if it is absent.
    ///
    /// Returns `false` if the key cannot be represented by the map's key type.
    fn insert_spilled(&mut self, key: String, value: Self::Value) -> bool;

    /// Entries currently held, in the map's iteration order.
    fn spilled(&self) -> Vec<(&str, &Self::Value)>;
}

impl<K, V, S> SpillMap for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash + Serialize + DeserializeOwned + 'static,
    V: Serialize + DeserializeOwned + 'static,
    S: BuildHasher + Default + 'static,
{
    type Value = V;
    const STRING_KEYS: bool = K::STRING_LIKE;

    fn insert_spilled(&mut self, key: String, value: V) -> bool {
        match K::from_wire(key) {
            Some(key) => {
                self.insert(key, value);
                true
            }
            None => false,
        }
    }

    fn spilled(&self) -> Vec<(&str, &V)> {
        self.iter()
            .filter_map(|(k, v)| Some((k.as_wire()?, v)))
            .collect()
    }
}

impl<K, V> SpillMap for BTreeMap<K, V>
where
    K: MapKey + Ord + Serialize + DeserializeOwned + 'static,
    V: Serialize + DeserializeOwned + 'static,
{
    type Value = V;
    const STRING_KEYS: bool = K::STRING_LIKE;

    fn insert_spilled(&mut self, key: String, value: V) -> bool {
        match K::from_wire(key) {
            Some(key) => {
                self.insert(key, value);
                true
            }
            None => false,
        }
    }

    fn spilled(&self) -> Vec<(&str, &V)> {
        self.iter()
            .filter_map(|(k, v)| Some((k.as_wire()?, v)))
            .collect()
    }
}

impl SpillMap for serde_json::Map<String, serde_json::Value> {
    type Value = serde_json::Value;
    const STRING_KEYS: bool = true;

    fn insert_spilled(&mut self, key: String, value: serde_json::Value) -> bool {
        self.insert(key, value);
        true
    }

    fn spilled(&self) -> Vec<(&str, &serde_json::Value)> {
        self.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}

/// An overflow map that starts absent and is created on the first
/// unmatched key.
impl<M: SpillMap + Default> SpillMap for Option<M> {
    type Value = M::Value;
    const STRING_KEYS: bool = M::STRING_KEYS;

    fn insert_spilled(&mut self, key: String, value: M::Value) -> bool {
        M::STRING_KEYS
            && self
                .get_or_insert_with(M::default)
                .insert_spilled(key, value)
    }

    fn spilled(&self) -> Vec<(&str, &M::Value)> {
        self.as_ref().map(M::spilled).unwrap_or_default()
    }
}

// ============================================================================
// Slots
// ============================================================================

/// Broad category of a field's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any value that is not a map
    Value,
    /// A map; `string_keys` tells whether it can hold wire keys
    Map {
        /// Whether the key type is string-like
        string_keys: bool,
    },
}

/// Typed access to one field of `R`.
pub(crate) trait Slot<R> {
    fn kind(&self) -> FieldKind;

    fn type_name(&self) -> &'static str;

    fn is_writable(&self) -> bool;

    /// Decode the pending value into the field, replacing what was there.
    fn decode(
        &self,
        record: &mut R,
        field: &'static str,
        tokens: &mut Tokenizer<'_>,
    ) -> Result<()>;

    /// Decode the pending value as an overflow entry and insert it under `key`.
    fn spill(
        &self,
        record: &mut R,
        field: &'static str,
        key: String,
        tokens: &mut Tokenizer<'_>,
    ) -> Result<()> {
        let _ = (record, key, tokens);
        Err(Error::without_span(ErrorKind::SpillNotRightMap {
            field,
            type_name: self.type_name(),
        }))
    }

    /// The field's current value as JSON.
    fn to_value(&self, record: &R) -> Result<serde_json::Value>;

    /// Overflow entries currently held, as JSON.
    fn spilled(&self, record: &R) -> Result<Vec<(String, serde_json::Value)>> {
        let _ = record;
        Ok(Vec::new())
    }
}

type Getter<R, T> = fn(&R) -> &T;
type Setter<R, T> = fn(&mut R) -> &mut T;

fn unsetable(field: &'static str) -> Error {
    Error::without_span(ErrorKind::UnsetableSpilloverField { field })
}

fn read_only(field: &'static str) -> Error {
    Error::without_span(ErrorKind::ReadOnlyField { field })
}

struct ValueSlot<R, T> {
    get: Getter<R, T>,
    get_mut: Option<Setter<R, T>>,
}

impl<R, T> Slot<R> for ValueSlot<R, T>
where
    T: Serialize + DeserializeOwned,
{
    fn kind(&self) -> FieldKind {
        FieldKind::Value
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }

    fn is_writable(&self) -> bool {
        self.get_mut.is_some()
    }

    fn decode(
        &self,
        record: &mut R,
        field: &'static str,
        tokens: &mut Tokenizer<'_>,
    ) -> Result<()> {
        let get_mut = self.get_mut.ok_or_else(|| read_only(field))?;
        let value = tokens.decode::<T>()?;
        *get_mut(record) = value.node;
        Ok(())
    }

    fn to_value(&self, record: &R) -> Result<serde_json::Value> {
        Ok(serde_json::to_value((self.get)(record))?)
    }
}

struct MapSlot<R, M> {
    get: Getter<R, M>,
    get_mut: Option<Setter<R, M>>,
}

impl<R, M: SpillMap> Slot<R> for MapSlot<R, M> {
    fn kind(&self) -> FieldKind {
        FieldKind::Map {
            string_keys: M::STRING_KEYS,
        }
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<M>()
    }

    fn is_writable(&self) -> bool {
        self.get_mut.is_some()
    }

    fn decode(
        &self,
        record: &mut R,
        field: &'static str,
        tokens: &mut Tokenizer<'_>,
    ) -> Result<()> {
        let get_mut = self.get_mut.ok_or_else(|| read_only(field))?;
        let value = tokens.decode::<M>()?;
        *get_mut(record) = value.node;
        Ok(())
    }

    fn spill(
        &self,
        record: &mut R,
        field: &'static str,
        key: String,
        tokens: &mut Tokenizer<'_>,
    ) -> Result<()> {
        let get_mut = self.get_mut.ok_or_else(|| unsetable(field))?;
        let value = tokens.decode::<M::Value>()?;
        if get_mut(record).insert_spilled(key, value.node) {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::SpillNotRightMap {
                    field,
                    type_name: self.type_name(),
                },
                value.span,
            ))
        }
    }

    fn to_value(&self, record: &R) -> Result<serde_json::Value> {
        Ok(serde_json::to_value((self.get)(record))?)
    }

    fn spilled(&self, record: &R) -> Result<Vec<(String, serde_json::Value)>> {
        let mut out = Vec::new();
        for (key, value) in (self.get)(record).spilled() {
            out.push((key.into(), serde_json::to_value(value)?));
        }
        Ok(out)
    }
}

// ============================================================================
// Schema
// ============================================================================

/// One declared field.
pub struct Field<R> {
    /// Declared field name
    pub name: &'static str,
    /// Serialization tag, as in `"name,option"` or `"-"`
    pub tag: Option<&'static str>,
    pub(crate) slot: Box<dyn Slot<R>>,
}

impl<R> Field<R> {
    /// The key this field is matched against, or `None` if the tag excludes it.
    ///
    /// A non-empty tag names the key with its first comma-separated segment,
    /// even when that segment is empty; a first segment of `"-"` excludes the
    /// field. Without a tag the declared name is the key.
    pub fn wire_key(&self) -> Option<&'static str> {
        match self.tag {
            None | Some("") => Some(self.name),
            Some(tag) => match tag.split_once(',').map_or(tag, |(name, _)| name) {
                "-" => None,
                name => Some(name),
            },
        }
    }

    /// Broad category of the declared type
    pub fn kind(&self) -> FieldKind {
        self.slot.kind()
    }

    /// Name of the declared type
    pub fn type_name(&self) -> &'static str {
        self.slot.type_name()
    }

    /// Whether this decoder may write to the field; keys naming a read-only
    /// field are rejected with [`ErrorKind::ReadOnlyField`]
    pub fn is_writable(&self) -> bool {
        self.slot.is_writable()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Record,
    Opaque,
}

/// Ordered field descriptors for a [`Record`].
pub struct Schema<R> {
    shape: Shape,
    fields: Vec<Field<R>>,
}

impl<R: 'static> Schema<R> {
    /// Start describing a record type.
    pub fn record() -> Self {
        Schema {
            shape: Shape::Record,
            fields: Vec::new(),
        }
    }

    /// Describe a type that is not a record; decoding into it fails with
    /// [`ErrorKind::NotStructHolder`].
    pub fn opaque() -> Self {
        Schema {
            shape: Shape::Opaque,
            fields: Vec::new(),
        }
    }

    /// Declare a plain field.
    pub fn field<T>(
        self,
        name: &'static str,
        tag: Option<&'static str>,
        get: Getter<R, T>,
        get_mut: Setter<R, T>,
    ) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.push(name, tag, ValueSlot {
            get,
            get_mut: Some(get_mut),
        })
    }

    /// Declare a map field, which may serve as the overflow field.
    pub fn map<M: SpillMap>(
        self,
        name: &'static str,
        tag: Option<&'static str>,
        get: Getter<R, M>,
        get_mut: Setter<R, M>,
    ) -> Self {
        self.push(name, tag, MapSlot {
            get,
            get_mut: Some(get_mut),
        })
    }

    /// Declare a field that is encoded but never written by the decoder.
    pub fn read_only<T>(
        self,
        name: &'static str,
        tag: Option<&'static str>,
        get: Getter<R, T>,
    ) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.push(name, tag, ValueSlot { get, get_mut: None })
    }

    /// Declare a map field that is encoded but never written by the decoder.
    pub fn read_only_map<M: SpillMap>(
        self,
        name: &'static str,
        tag: Option<&'static str>,
        get: Getter<R, M>,
    ) -> Self {
        self.push(name, tag, MapSlot { get, get_mut: None })
    }

    fn push(
        mut self,
        name: &'static str,
        tag: Option<&'static str>,
        slot: impl Slot<R> + 'static,
    ) -> Self {
        self.fields.push(Field {
            name,
            tag,
            slot: Box::new(slot),
        });
        self
    }
}

impl<R> Schema<R> {
    /// Declared fields, in declaration order
    pub fn fields(&self) -> &[Field<R>] {
        &self.fields
    }

    /// Whether this schema describes a record
    pub fn is_record(&self) -> bool {
        self.shape == Shape::Record
    }

    /// Validate the overflow field and build the wire-key lookup table.
    ///
    /// Checks run in a fixed order and the first failure is returned. When
    /// `writable` is false the overflow field is only read, so read-only maps
    /// are accepted.
    pub(crate) fn layout(&self, overflow: &str, writable: bool) -> Result<Layout<'_, R>> {
        if !self.is_record() {
            return Err(Error::without_span(ErrorKind::NotStructHolder {
                type_name: core::any::type_name::<R>(),
            }));
        }

        let Some(spill) = self.fields.iter().find(|f| f.name == overflow) else {
            let names: Vec<&'static str> = self.fields.iter().map(|f| f.name).collect();
            return Err(Error::without_span(ErrorKind::MissingSpilloverField {
                field: overflow.into(),
                suggestion: find_similar_field(overflow, &names),
            }));
        };
        match spill.kind() {
            FieldKind::Map { string_keys: true } => {}
            FieldKind::Value | FieldKind::Map { string_keys: false } => {
                return Err(Error::without_span(ErrorKind::SpillNotRightMap {
                    field: spill.name,
                    type_name: spill.type_name(),
                }));
            }
        }
        if writable && !spill.is_writable() {
            return Err(Error::without_span(ErrorKind::UnsetableSpilloverField {
                field: spill.name,
            }));
        }

        let mut lookup: HashMap<&'static str, &Field<R>> =
            HashMap::with_capacity(self.fields.len());
        for field in &self.fields {
            let Some(key) = field.wire_key() else {
                continue;
            };
            if let Some(first) = lookup.insert(key, field) {
                return Err(Error::without_span(ErrorKind::DuplicateWireKey {
                    key,
                    first: first.name,
                    second: field.name,
                }));
            }
        }

        Ok(Layout {
            fields: &self.fields,
            lookup,
            spill,
        })
    }
}

/// Find the best matching field name from a list of declared fields.
/// Returns Some(suggestion) if a match with similarity >= 0.6 is found.
fn find_similar_field(unknown: &str, expected: &[&'static str]) -> Option<&'static str> {
    let mut best_match: Option<(&'static str, f64)> = None;

    for &candidate in expected {
        let similarity = strsim::jaro_winkler(unknown, candidate);
        if similarity >= 0.6 && best_match.is_none_or(|(_, best_sim)| similarity > best_sim) {
            best_match = Some((candidate, similarity));
        }
    }

    best_match.map(|(name, _)| name)
}

/// Result of validating a schema against an overflow field name.
pub(crate) struct Layout<'s, R> {
    pub(crate) fields: &'s [Field<R>],
    lookup: HashMap<&'static str, &'s Field<R>>,
    pub(crate) spill: &'s Field<R>,
}

impl<'s, R> Layout<'s, R> {
    /// The field a wire key decodes into, matched byte for byte.
    pub(crate) fn lookup(&self, key: &str) -> Option<&'s Field<R>> {
        self.lookup.get(key).copied()
    }

    /// Whether a wire key names a declared field.
    pub(crate) fn is_declared(&self, key: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.wire_key() == Some(key) && !core::ptr::eq(f, self.spill))
    }
}
