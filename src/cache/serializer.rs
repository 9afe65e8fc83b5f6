//! Record serialization for remote backends
//!
//! A serializer turns the (response, request, metadata) triple into a
//! self-describing payload and back. The in-memory store keeps records as
//! values and never serializes.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::models::{Metadata, RequestSnapshot, ResponseSnapshot, StoredRecord};

/// Encodes and decodes stored records.
pub trait Serializer: Send + Sync + fmt::Debug {
    fn dumps(
        &self,
        response: &ResponseSnapshot,
        request: &RequestSnapshot,
        metadata: &Metadata,
    ) -> Result<Vec<u8>>;

    fn loads(&self, data: &[u8]) -> Result<StoredRecord>;

    /// `false` when the payload is valid UTF-8 text.
    fn is_binary(&self) -> bool;
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    response: &'a ResponseSnapshot,
    request: &'a RequestSnapshot,
    metadata: &'a Metadata,
}

// == JSON Serializer ==
/// JSON text payload with `response`, `request` and `metadata` sections.
///
/// Body bytes are base64 encoded so binary responses survive intact.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn dumps(
        &self,
        response: &ResponseSnapshot,
        request: &RequestSnapshot,
        metadata: &Metadata,
    ) -> Result<Vec<u8>> {
        let payload = PayloadRef {
            response,
            request,
            metadata,
        };
        Ok(serde_json::to_vec(&payload)?)
    }

    fn loads(&self, data: &[u8]) -> Result<StoredRecord> {
        Ok(serde_json::from_slice(data)?)
    }

    fn is_binary(&self) -> bool {
        false
    }
}
