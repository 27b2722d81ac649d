//! # Gridlink Codec
//!
//! Value model and encodings shared by every gridlink crate.
//!
//! This crate provides:
//! - [`Value`], the dynamic column value carried by tuples
//! - [`TypeRegistry`], mapping scalar type tags to encode/decode functions
//! - [`flatten`] / [`unflatten`], a collision-safe composite key encoding
//! - [`to_cbor`] / [`from_cbor`], document serialization for byte stores
//!
//! ## Usage
//!
//! ```
//! use gridlink_codec::{flatten, unflatten, Value};
//!
//! let key = flatten(&[Value::from("users"), Value::Integer(42)]).unwrap();
//! assert_eq!(key, "s5:usersi2:42");
//! assert_eq!(unflatten(&key).unwrap()[1], Value::Integer(42));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod flatten;
mod registry;
mod value;

pub use cbor::{from_cbor, to_cbor};
pub use error::{CodecError, CodecResult};
pub use flatten::{flatten, flatten_one, unflatten};
pub use registry::{ConvertFn, ScalarCodec, ScalarType, TypeRegistry};
pub use value::Value;
