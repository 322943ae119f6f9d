//! `uniqueidentifier`: 16 bytes with the first three fields little-endian.

use common::{Result, Value};
use uuid::Uuid;

use super::{expect_len, mismatch};

pub(crate) fn serialize_guid(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Guid(g) => Ok(g.to_bytes_le().to_vec()),
        other => Err(mismatch("uniqueidentifier", other)),
    }
}

pub(crate) fn deserialize_guid(bytes: &[u8]) -> Result<Value> {
    let raw: [u8; 16] = expect_len("uniqueidentifier", bytes)?;
    Ok(Value::Guid(Uuid::from_bytes_le(raw)))
}
