//! Protocol-visible values exposed by the accessory.
//!
//! The protocol server itself is an external collaborator; the core only
//! knows which characteristics exist, what type their values have, and
//! which of them are persisted to flash.

use serde::{Deserialize, Serialize};

use crate::error::RemoteWriteError;

/// Characteristics exposed on the switch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Characteristic {
    /// Relay on/off. Persisted.
    On,
    /// Seconds between WiFi health checks. Persisted.
    WifiCheckInterval,
    /// Write `true` to erase WiFi + pairing data and restart.
    WifiReset,
    /// Write `true` to hand over to the OTA updater and restart.
    OtaTrigger,
    /// Select the beta firmware channel for the next OTA.
    OtaBeta,
    /// Select the beta loader channel for the next OTA.
    LcmBeta,
    /// Write `true` to request a task-statistics dump.
    TaskStats,
    /// Any write runs the identify blink sequence.
    Identify,
}

/// A characteristic value as seen by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    U8(u8),
}

impl Value {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            Self::U8(_) => None,
        }
    }

    pub fn as_u8(self) -> Option<u8> {
        match self {
            Self::U8(v) => Some(v),
            Self::Bool(_) => None,
        }
    }
}

/// Fields written to non-volatile storage. Each owns an independent
/// pending-save slot in the [`SaveScheduler`](crate::scheduler::SaveScheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    On,
    WifiCheckInterval,
}

impl Field {
    pub const COUNT: usize = 2;
    pub const ALL: [Field; Field::COUNT] = [Field::On, Field::WifiCheckInterval];

    /// Dense index for per-field slot arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::On => 0,
            Self::WifiCheckInterval => 1,
        }
    }

    /// NVS key (max 15 chars).
    pub const fn key(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::WifiCheckInterval => "wifi_chk_int",
        }
    }

    /// Characteristic that carries this field on the protocol side.
    pub const fn characteristic(self) -> Characteristic {
        match self {
            Self::On => Characteristic::On,
            Self::WifiCheckInterval => Characteristic::WifiCheckInterval,
        }
    }
}

impl Characteristic {
    /// The persisted field backing this characteristic, if any.
    pub const fn field(self) -> Option<Field> {
        match self {
            Self::On => Some(Field::On),
            Self::WifiCheckInterval => Some(Field::WifiCheckInterval),
            _ => None,
        }
    }

    /// Type and range check for an inbound protocol write.
    pub fn validate(self, value: Value) -> Result<(), RemoteWriteError> {
        match (self, value) {
            (Self::Identify, _) => Ok(()),
            (Self::WifiCheckInterval, Value::U8(0)) => Err(RemoteWriteError::OutOfRange(self)),
            (Self::WifiCheckInterval, Value::U8(_)) => Ok(()),
            (Self::WifiCheckInterval, Value::Bool(_)) => Err(RemoteWriteError::InvalidValue(self)),
            (_, Value::Bool(_)) => Ok(()),
            (_, Value::U8(_)) => Err(RemoteWriteError::InvalidValue(self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_indices_are_dense() {
        for (i, f) in Field::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn field_keys_fit_nvs_limit() {
        for f in Field::ALL {
            assert!(f.key().len() <= 15, "{:?} key too long", f);
        }
    }

    #[test]
    fn field_characteristic_mapping_is_symmetric() {
        for f in Field::ALL {
            assert_eq!(f.characteristic().field(), Some(f));
        }
        assert_eq!(Characteristic::Identify.field(), None);
    }

    #[test]
    fn value_accessors_reject_wrong_type() {
        assert_eq!(Value::Bool(true).as_u8(), None);
        assert_eq!(Value::U8(7).as_bool(), None);
        assert_eq!(Value::U8(7).as_u8(), Some(7));
    }

    #[test]
    fn validate_checks_type_and_range() {
        assert!(Characteristic::On.validate(Value::Bool(true)).is_ok());
        assert_eq!(
            Characteristic::On.validate(Value::U8(1)),
            Err(RemoteWriteError::InvalidValue(Characteristic::On))
        );
        assert_eq!(
            Characteristic::WifiCheckInterval.validate(Value::U8(0)),
            Err(RemoteWriteError::OutOfRange(Characteristic::WifiCheckInterval))
        );
        assert!(Characteristic::WifiCheckInterval.validate(Value::U8(255)).is_ok());
        assert!(Characteristic::Identify.validate(Value::U8(3)).is_ok());
    }
}
