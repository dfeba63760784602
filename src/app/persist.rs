//! Per-field persistence over a [`StoragePort`].
//!
//! Each [`Field`] lives under its own key in the `plug` namespace as a
//! postcard-encoded [`Value`]. A missing key is not an error: it is the
//! first-boot state and loads as `None`.

use log::warn;

use super::characteristics::{Field, Value};
use super::ports::{StorageError, StoragePort};

pub const NAMESPACE: &str = "plug";

/// Largest encoded [`Value`] (variant tag + payload).
const MAX_ENCODED: usize = 8;

pub fn save_field(store: &mut impl StoragePort, field: Field, value: Value) -> Result<(), StorageError> {
    let mut buf = [0u8; MAX_ENCODED];
    let bytes = postcard::to_slice(&value, &mut buf).map_err(|_| StorageError::Corrupted)?;
    store.write(NAMESPACE, field.key(), bytes)
}

pub fn load_field(store: &impl StoragePort, field: Field) -> Result<Option<Value>, StorageError> {
    let mut buf = [0u8; MAX_ENCODED];
    let len = match store.read(NAMESPACE, field.key(), &mut buf) {
        Ok(len) => len,
        Err(StorageError::NotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    let value: Value = postcard::from_bytes(&buf[..len]).map_err(|_| StorageError::Corrupted)?;
    // A value of the wrong shape is treated like a corrupt entry.
    let shape_ok = match field {
        Field::On => value.as_bool().is_some(),
        Field::WifiCheckInterval => value.as_u8().is_some_and(|v| v > 0),
    };
    if !shape_ok {
        warn!("Persist: {} holds unexpected {:?}", field.key(), value);
        return Err(StorageError::Corrupted);
    }
    Ok(Some(value))
}

pub fn erase_fields(store: &mut impl StoragePort) -> Result<(), StorageError> {
    for field in Field::ALL {
        store.delete(NAMESPACE, field.key())?;
    }
    Ok(())
}
