#![warn(missing_docs)]
//! Decode JSON objects into typed records while keeping every unrecognised
//! key in an overflow map.
//!
//! A record lists its fields once, usually through [`record!`]. Decoding
//! routes each key of the incoming object either to the field it names or,
//! when no field claims it, into the map field chosen as the overflow field
//! for that call. Encoding reverses the process: declared fields first, then
//! the overflow entries.
//!
//! ```
//! use std::collections::HashMap;
//!
//! #[derive(Default)]
//! struct Item {
//!     name: String,
//!     price: u32,
//!     rest: Option<HashMap<String, serde_json::Value>>,
//! }
//!
//! spillover_json::record! {
//!     Item {
//!         name: field,
//!         price: field "cost",
//!         rest: map "-",
//!     }
//! }
//!
//! let raw = r#"{"name": "lamp", "cost": 12, "color": "red"}"#;
//! let mut item = Item::default();
//! spillover_json::decode_str(&mut item, "rest", raw).unwrap();
//! assert_eq!(item.price, 12);
//! assert_eq!(item.rest.as_ref().unwrap()["color"], "red");
//!
//! let back = spillover_json::to_string(&item, "rest").unwrap();
//! assert_eq!(back, r#"{"name":"lamp","cost":12,"color":"red"}"#);
//! ```

extern crate alloc;

mod deserialize;
mod error;
mod macros;
mod schema;
mod serialize;
mod span;
mod tokenizer;

pub use deserialize::{decode, decode_str, deserialize, from_slice, from_str};
pub use error::{Error, ErrorKind, PREFIX, Result};
pub use schema::{Field, FieldKind, MapKey, Record, Schema, SpillMap, Target};
pub use serialize::{
    serialize, to_string, to_string_pretty, to_value, to_vec, to_writer, to_writer_pretty,
};
pub use span::{Pos, Span, Spanned};
pub use tokenizer::{Token, TokenError, TokenErrorKind, Tokenizer};
