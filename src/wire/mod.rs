//! Wire layer: framing and serde encoding of every value that crosses
//! the process boundary.

pub mod codec;

pub use codec::{
    SerializationBuffer, decode, decode_into, encode, read_object, read_object_into, write_object,
};
