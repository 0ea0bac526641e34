//! Serializes checkpoint state to bytes for persistent checkpointers.

use serde::{de::DeserializeOwned, Serialize};

use crate::memory::checkpointer::CheckpointError;

/// Type tag byte stored alongside a serialized payload, so a reader knows how
/// to interpret bytes without out-of-band schema information.
pub const TYPE_NULL: u8 = 0;
pub const TYPE_JSON: u8 = 1;
pub const TYPE_BYTES: u8 = 2;

/// Serializes/deserializes checkpoint state `S` to/from bytes.
///
/// Implemented as a trait (rather than requiring `S: Serialize` directly on
/// `Checkpointer`) so callers can swap encodings without changing the
/// checkpointer implementation.
pub trait Serializer<S>: Send + Sync {
    fn serialize(&self, value: &S) -> Result<Vec<u8>, CheckpointError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError>;
}

/// JSON-backed serializer. Requires `S: Serialize + DeserializeOwned`.
pub struct JsonSerializer;

impl<S> Serializer<S> for JsonSerializer
where
    S: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &S) -> Result<Vec<u8>, CheckpointError> {
        serde_json::to_vec(value).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError> {
        serde_json::from_slice(bytes).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }
}

/// A type-tagged payload: lets a store distinguish JSON, raw bytes, or null
/// without inspecting the bytes themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedData {
    pub type_tag: u8,
    pub bytes: Vec<u8>,
}

impl TypedData {
    pub fn json(bytes: Vec<u8>) -> Self {
        Self {
            type_tag: TYPE_JSON,
            bytes,
        }
    }

    pub fn null() -> Self {
        Self {
            type_tag: TYPE_NULL,
            bytes: Vec::new(),
        }
    }
}

/// A `Serializer` that also exposes the type tag of what it produced, for
/// callers that store `TypedData` rather than bare bytes.
pub trait TypedSerializer<S>: Serializer<S> {
    fn serialize_typed(&self, value: &S) -> Result<TypedData, CheckpointError> {
        self.serialize(value).map(TypedData::json)
    }
}

impl<S> TypedSerializer<S> for JsonSerializer where S: Serialize + DeserializeOwned {}
