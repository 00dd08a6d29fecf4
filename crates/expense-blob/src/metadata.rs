//! Conversion of JSON metadata into stored documents

use mongodb::bson::Document;
use serde_json::Value;

use crate::error::{BlobError, Result};

/// Convert a JSON object into a metadata document.
///
/// Only objects are accepted; GridFS stores metadata as a sub-document.
pub fn metadata_from_json(value: Value) -> Result<Document> {
    if !value.is_object() {
        return Err(BlobError::invalid_argument(format!(
            "metadata must be a JSON object, got {}",
            json_kind(&value)
        )));
    }
    Ok(bson::to_document(&value)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
