/// Implement [`Record`](crate::Record) for a struct by listing its fields.
///
/// Each entry is `name: kind`, optionally followed by a tag string literal.
/// `kind` is one of:
///
/// - `field`: a plain field, decoded and encoded as its own type
/// - `map`: a map field, which may serve as the overflow field
/// - `read_only`: encoded but never written; decoding its key is an error
/// - `read_only_map`: a map that is encoded but never written by the decoder
///
/// Tags follow the usual `"name,option"` convention: the first segment is
/// the key, even when empty, and `"-"` excludes the field from matching.
/// Only a missing or empty tag keeps the field name. List fields in declaration order;
/// encoding writes them in that order.
///
/// ```
/// use std::collections::BTreeMap;
///
/// #[derive(Default)]
/// struct Reading {
///     sensor: String,
///     value: f64,
///     extra: BTreeMap<String, serde_json::Value>,
/// }
///
/// spillover_json::record! {
///     Reading {
///         sensor: field "id",
///         value: field,
///         extra: map "-",
///     }
/// }
///
/// let reading: Reading =
///     spillover_json::from_str(r#"{"id": "t1", "value": 20.5, "unit": "C"}"#, "extra").unwrap();
/// assert_eq!(reading.sensor, "t1");
/// assert_eq!(reading.extra["unit"], "C");
/// ```
#[macro_export]
macro_rules! record {
    (@tag) => {
        ::core::option::Option::None
    };
    (@tag $tag:literal) => {
        ::core::option::Option::Some($tag)
    };

    (@slot $schema:ident, $name:ident, field, $tag:expr) => {
        $schema.field(stringify!($name), $tag, |r| &r.$name, |r| &mut r.$name)
    };
    (@slot $schema:ident, $name:ident, map, $tag:expr) => {
        $schema.map(stringify!($name), $tag, |r| &r.$name, |r| &mut r.$name)
    };
    (@slot $schema:ident, $name:ident, read_only, $tag:expr) => {
        $schema.read_only(stringify!($name), $tag, |r| &r.$name)
    };
    (@slot $schema:ident, $name:ident, read_only_map, $tag:expr) => {
        $schema.read_only_map(stringify!($name), $tag, |r| &r.$name)
    };

    ($ty:ident { $($name:ident : $kind:ident $($tag:literal)?),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn schema() -> $crate::Schema<Self> {
                let schema: $crate::Schema<Self> = $crate::Schema::record();
                $(
                    let schema = $crate::record!(
                        @slot schema, $name, $kind, $crate::record!(@tag $($tag)?)
                    );
                )*
                schema
            }
        }
    };
}
