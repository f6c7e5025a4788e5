use chrono::{DateTime, Utc};
use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// DeliveryState - Processing state of a (message, subscriber) pair
// ============================================================================

/// Written as `IN_PROGRESS` / `DELIVERED`. Reading also accepts the numeric
/// tags used by older writers (`0` = delivered, `1` = in progress).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryState {
    /// A worker has claimed the message and is processing it
    InProgress,
    /// Processing finished; terminal
    Delivered,
}

impl DeliveryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::InProgress => "IN_PROGRESS",
            DeliveryState::Delivered => "DELIVERED",
        }
    }
}

impl DeliveryState {
    /// Map a legacy numeric tag
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(DeliveryState::Delivered),
            1 => Some(DeliveryState::InProgress),
            _ => None,
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliveryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(DeliveryState::InProgress),
            "DELIVERED" => Ok(DeliveryState::Delivered),
            _ => Err(format!("Unknown delivery state: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for DeliveryState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StateVisitor;

        impl<'de> Visitor<'de> for StateVisitor {
            type Value = DeliveryState;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("IN_PROGRESS, DELIVERED, 0 or 1")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                DeliveryState::from_code(v)
                    .ok_or_else(|| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .ok()
                    .and_then(DeliveryState::from_code)
                    .ok_or_else(|| E::invalid_value(Unexpected::Signed(v), &self))
            }
        }

        deserializer.deserialize_any(StateVisitor)
    }
}

// ============================================================================
// DeliveryRecord - Persisted value behind a DeliveryKey
// ============================================================================

/// Last known processing state for a delivery key
///
/// `created_time` is the time of the most recent transition, it is
/// overwritten every time the record is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub state: DeliveryState,
    pub created_time: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn new(state: DeliveryState, created_time: DateTime<Utc>) -> Self {
        Self {
            state,
            created_time,
        }
    }

    /// In-progress record stamped with the current time
    pub fn in_progress_now() -> Self {
        Self::new(DeliveryState::InProgress, Utc::now())
    }

    /// Delivered record stamped with the current time
    pub fn delivered_now() -> Self {
        Self::new(DeliveryState::Delivered, Utc::now())
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == DeliveryState::InProgress
    }

    pub fn is_delivered(&self) -> bool {
        self.state == DeliveryState::Delivered
    }
}

// ============================================================================
// Verdict - Outcome of a delivery eligibility check
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The message may be (re)delivered to the subscriber
    Yes,
    /// The message was already delivered to the subscriber
    NoAlreadyDelivered,
    /// Another worker is still inside its acknowledge window
    NoInProgress,
}

impl Verdict {
    /// Coarse projection used by `can_start_processing`
    pub fn is_yes(&self) -> bool {
        matches!(self, Verdict::Yes)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Yes => "yes",
            Verdict::NoAlreadyDelivered => "no_already_delivered",
            Verdict::NoInProgress => "no_in_progress",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Verdict> for bool {
    fn from(verdict: Verdict) -> Self {
        verdict.is_yes()
    }
}
