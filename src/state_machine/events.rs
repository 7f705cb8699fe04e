use serde::{Deserialize, Serialize};

/// Events that drive freeze-mode transitions for a logical database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FreezeEvent {
    /// Start revoking write access
    BeginFreeze { username: String },
    /// Conclude a freeze attempt with the lock acquisition result
    CompleteFreeze {
        lock_succeeded: bool,
        transition_error: Option<String>,
    },
    /// Start restoring write access
    BeginThaw { username: String },
    /// Conclude a thaw attempt with the lock release result
    CompleteThaw {
        lock_succeeded: bool,
        transition_error: Option<String>,
    },
}

impl FreezeEvent {
    /// String representation of the event type for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::BeginFreeze { .. } => "begin_freeze",
            Self::CompleteFreeze { .. } => "complete_freeze",
            Self::BeginThaw { .. } => "begin_thaw",
            Self::CompleteThaw { .. } => "complete_thaw",
        }
    }

    /// Initiating username, for begin events.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::BeginFreeze { username } | Self::BeginThaw { username } => Some(username),
            _ => None,
        }
    }

    /// Migration-step error recorded at completion, if any.
    pub fn transition_error(&self) -> Option<&str> {
        match self {
            Self::CompleteFreeze {
                transition_error, ..
            }
            | Self::CompleteThaw {
                transition_error, ..
            } => transition_error.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_labels() {
        let begin = FreezeEvent::BeginFreeze {
            username: "amy".to_string(),
        };
        assert_eq!(begin.event_type(), "begin_freeze");
        assert_eq!(begin.username(), Some("amy"));
        assert_eq!(begin.transition_error(), None);

        let complete = FreezeEvent::CompleteFreeze {
            lock_succeeded: false,
            transition_error: Some("copy verification failed".to_string()),
        };
        assert_eq!(complete.event_type(), "complete_freeze");
        assert_eq!(
            complete.transition_error(),
            Some("copy verification failed")
        );
    }

    #[test]
    fn test_event_serde_tagging() {
        let event = FreezeEvent::BeginThaw {
            username: "amy".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "BeginThaw");
        assert_eq!(json["data"]["username"], "amy");
    }
}
