use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Freeze mode of a logical database's live physical.
///
/// `Normal` and `Frozen` are the settled modes; `Freezing` and `Thawing`
/// mark an attempt in flight. A failed attempt falls back to the mode it
/// started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FreezeMode {
    /// Live physical is fully writable
    #[default]
    Normal,
    /// Write access is being revoked
    Freezing,
    /// Writes blocked, migration may proceed
    Frozen,
    /// Write access is being restored
    Thawing,
}

impl FreezeMode {
    /// Human-printable label, as reported by remote applications.
    pub fn printable(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Freezing => "Freezing",
            Self::Frozen => "Frozen",
            Self::Thawing => "Thawing",
        }
    }

    /// Description of the transition this mode represents.
    pub fn transition(&self) -> &'static str {
        match self {
            Self::Normal => "Write access restored",
            Self::Freezing => "Revoking write access",
            Self::Frozen => "Write access revoked",
            Self::Thawing => "Restoring write access",
        }
    }

    /// Machine code used on the wire.
    pub fn code(&self) -> i16 {
        match self {
            Self::Normal => 0,
            Self::Freezing => 1,
            Self::Frozen => 2,
            Self::Thawing => 3,
        }
    }

    /// Resolve a mode from its machine code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::Freezing),
            2 => Some(Self::Frozen),
            3 => Some(Self::Thawing),
            _ => None,
        }
    }

    /// Check if an attempt is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Freezing | Self::Thawing)
    }

    /// Check if writes are permitted in this mode.
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Normal)
    }

    /// The settled mode an in-flight attempt falls back to on failure.
    pub fn fallback(&self) -> FreezeMode {
        match self {
            Self::Freezing => Self::Normal,
            Self::Thawing => Self::Frozen,
            settled => *settled,
        }
    }
}

impl fmt::Display for FreezeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.printable())
    }
}

impl std::str::FromStr for FreezeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(Self::Normal),
            "Freezing" => Ok(Self::Freezing),
            "Frozen" => Ok(Self::Frozen),
            "Thawing" => Ok(Self::Thawing),
            _ => Err(format!("Invalid freeze mode: {s}")),
        }
    }
}

/// Wire shape: `{"printable": ..., "transition": ..., "code": ...}`.
/// The code is authoritative; the descriptive fields are optional and
/// defaulted when a remote application omits them.
#[derive(Deserialize)]
struct FreezeModeWire {
    #[serde(default)]
    #[allow(dead_code)]
    printable: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    transition: Option<String>,
    code: i16,
}

impl Serialize for FreezeMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FreezeMode", 3)?;
        state.serialize_field("printable", self.printable())?;
        state.serialize_field("transition", self.transition())?;
        state.serialize_field("code", &self.code())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for FreezeMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = FreezeModeWire::deserialize(deserializer)?;
        FreezeMode::from_code(wire.code)
            .ok_or_else(|| D::Error::custom(format!("Unknown freeze mode code: {}", wire.code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags() {
        assert!(FreezeMode::Normal.is_writable());
        assert!(!FreezeMode::Frozen.is_writable());
        assert!(FreezeMode::Freezing.is_in_flight());
        assert!(FreezeMode::Thawing.is_in_flight());
        assert!(!FreezeMode::Normal.is_in_flight());
        assert!(!FreezeMode::Frozen.is_in_flight());
    }

    #[test]
    fn test_fallback_targets() {
        assert_eq!(FreezeMode::Freezing.fallback(), FreezeMode::Normal);
        assert_eq!(FreezeMode::Thawing.fallback(), FreezeMode::Frozen);
        assert_eq!(FreezeMode::Normal.fallback(), FreezeMode::Normal);
        assert_eq!(FreezeMode::Frozen.fallback(), FreezeMode::Frozen);
    }

    #[test]
    fn test_code_round_trip() {
        for mode in [
            FreezeMode::Normal,
            FreezeMode::Freezing,
            FreezeMode::Frozen,
            FreezeMode::Thawing,
        ] {
            assert_eq!(FreezeMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(FreezeMode::from_code(99), None);
    }

    #[test]
    fn test_serialize_wire_shape() {
        let json = serde_json::to_value(FreezeMode::Frozen).unwrap();
        assert_eq!(json["printable"], "Frozen");
        assert_eq!(json["transition"], "Write access revoked");
        assert_eq!(json["code"], 2);
    }

    #[test]
    fn test_deserialize_defaults_missing_transition() {
        let mode: FreezeMode =
            serde_json::from_str(r#"{"printable": "Frozen", "code": 2}"#).unwrap();
        assert_eq!(mode, FreezeMode::Frozen);

        // code alone is enough
        let mode: FreezeMode = serde_json::from_str(r#"{"code": 3}"#).unwrap();
        assert_eq!(mode, FreezeMode::Thawing);
    }

    #[test]
    fn test_deserialize_rejects_unknown_code() {
        assert!(serde_json::from_str::<FreezeMode>(r#"{"code": 7}"#).is_err());
    }
}
