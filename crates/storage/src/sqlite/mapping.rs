use stitch_core::model::{PatternId, StitchId, UserId, WorkSessionId};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn index_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn pattern_id_from_i64(v: i64) -> Result<PatternId, StorageError> {
    Ok(PatternId::new(i64_to_u64("pattern_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("owner_id", v)?))
}

pub(crate) fn stitch_id_from_i64(v: i64) -> Result<StitchId, StorageError> {
    Ok(StitchId::new(i64_to_u64("stitch_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<WorkSessionId, StorageError> {
    Ok(WorkSessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn version_from_i64(v: i64) -> Result<u64, StorageError> {
    i64_to_u64("version", v)
}
