use rkyv::api::high::{HighDeserializer, HighSerializer, HighValidator};
use rkyv::bytecheck::CheckBytes;
use rkyv::rancor::Error;
use rkyv::ser::allocator::ArenaHandle;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::snapshot::{validate_snapshot, GameSnapshot, SnapshotError};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("binary snapshot is malformed: {0}")]
    Archive(#[from] Error),
    #[error(transparent)]
    Invalid(#[from] SnapshotError),
}

pub fn encode<T>(value: &T) -> Result<Vec<u8>, CodecError>
where
    T: for<'a> Serialize<HighSerializer<AlignedVec, ArenaHandle<'a>, Error>>,
{
    Ok(rkyv::to_bytes::<Error>(value)?.into_vec())
}

pub fn decode<T>(bytes: &[u8]) -> Result<T, CodecError>
where
    T: Archive,
    T::Archived:
        for<'a> CheckBytes<HighValidator<'a, Error>> + Deserialize<T, HighDeserializer<Error>>,
{
    Ok(rkyv::from_bytes::<T, Error>(bytes)?)
}

pub fn encode_snapshot(snapshot: &GameSnapshot) -> Result<Vec<u8>, CodecError> {
    encode(snapshot)
}

/// Decodes and validates in one step; a snapshot that fails validation is
/// never handed out.
pub fn decode_snapshot(bytes: &[u8]) -> Result<GameSnapshot, CodecError> {
    let snapshot: GameSnapshot = decode(bytes)?;
    validate_snapshot(&snapshot)?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;

    #[test]
    fn bounds_survive_archive() {
        let bounds = Bounds::new(-1.5, 2.0, 30.0, 40.25);
        let bytes = encode(&bounds).unwrap();
        assert_eq!(decode::<Bounds>(&bytes).unwrap(), bounds);
    }

    #[test]
    fn truncated_snapshot_is_rejected() {
        assert!(matches!(
            decode_snapshot(&[1, 2, 3]),
            Err(CodecError::Archive(_))
        ));
    }
}
