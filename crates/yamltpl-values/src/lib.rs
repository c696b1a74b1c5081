//! Values - the data model templates are rendered against.
//!
//! A [`Values`] store is a root mapping of string keys to [`Value`] trees. It is
//! built by merging zero or more YAML documents in order, then applying
//! `key.path=value` overrides on top:
//!
//! ```rust
//! use yamltpl_values::{parse_overrides, Value, Values};
//!
//! let mut values = Values::merge_documents([
//!     "image:\n  name: nginx\n  tag: '1.25'\n".as_bytes(),
//!     "image:\n  tag: '1.27'\n".as_bytes(),
//! ])
//! .unwrap();
//! values.override_with(&parse_overrides(["replicas=3"]));
//!
//! assert_eq!(values.path_value("image.name").unwrap(), &Value::from("nginx"));
//! assert_eq!(values.path_value("image.tag").unwrap(), &Value::from("1.27"));
//! assert_eq!(values.path_value("replicas").unwrap(), &Value::from("3"));
//! ```
//!
//! # Path Semantics
//!
//! Paths are period-separated key segments. Only mappings ("tables") are
//! addressable; a path never descends into a sequence.
//!
//! | Operation | Succeeds when |
//! |-----------|---------------|
//! | [`Values::table`] | every segment names a mapping |
//! | [`Values::path_value`] | every segment but the last names a mapping, and the last names a non-mapping leaf |
//!
//! # Merging
//!
//! [`Values::override_with`] merges node by node: when both sides hold a
//! mapping for a key the mappings are merged recursively, otherwise the
//! overriding side wins.

mod error;
mod overrides;
mod value;
mod values;

pub use error::{Result, ValuesError};
pub use overrides::parse_overrides;
pub use value::{Mapping, Value};
pub use values::Values;
