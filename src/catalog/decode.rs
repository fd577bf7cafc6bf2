use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Collection, RetrievalError};

pub struct DecodedRows<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

/// Decodes a collection body row by row. The body itself must be a JSON
/// array; rows that fail to decode are dropped and counted.
pub fn decode_rows<T: DeserializeOwned>(
    collection: Collection,
    body: &[u8],
) -> Result<DecodedRows<T>, RetrievalError> {
    let raw: Vec<Value> = serde_json::from_slice(body)
        .map_err(|source| RetrievalError::Decode { collection, source })?;

    let mut rows = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for value in raw {
        match serde_json::from_value::<T>(value) {
            Ok(row) => rows.push(row),
            Err(_) => skipped += 1,
        }
    }

    Ok(DecodedRows { rows, skipped })
}
