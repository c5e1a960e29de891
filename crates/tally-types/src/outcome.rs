//! Result of one remote increment attempt.
//!
//! On the wire an outcome is a discriminated object:
//!
//! ```text
//! { "success": true,  "counter": { "value": 1, "version": 1 } }
//! { "success": false, "error": "Network Failed...!", "counter": { ... } }
//! ```
//!
//! Binary formats (postcard) always carry the `error` slot, since their fields
//! are positional.
//!
//! In Rust it is the [`MutationOutcome`] enum, so a rejected attempt can never
//! be mistaken for an applied one. A rejection is an expected, retryable
//! result and not an `Err`: transport failures are a separate concern owned by
//! the endpoint trait.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, EnumString};
use thiserror::Error;

use crate::counter::Counter;

/// Recoverable failure of a mutation attempt.
///
/// The display string doubles as the wire `error` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, EnumString, AsRefStr)]
pub enum MutationFailure {
    /// The simulated network dropped the mutation. The store is unchanged.
    #[error("Network Failed...!")]
    #[strum(serialize = "Network Failed...!")]
    RemoteMutationFailed,
}

/// Outcome of `attempt_increment`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The store applied the increment; `counter` is the new authoritative state.
    Applied { counter: Counter },
    /// The attempt failed; `counter` is the store state captured at attempt time.
    Rejected {
        failure: MutationFailure,
        counter: Counter,
    },
}

impl MutationOutcome {
    pub fn applied(counter: Counter) -> Self {
        Self::Applied { counter }
    }

    pub fn rejected(failure: MutationFailure, counter: Counter) -> Self {
        Self::Rejected { failure, counter }
    }

    /// The counter carried by either variant.
    pub fn counter(&self) -> Counter {
        match self {
            Self::Applied { counter } | Self::Rejected { counter, .. } => *counter,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn failure(&self) -> Option<MutationFailure> {
        match self {
            Self::Applied { .. } => None,
            Self::Rejected { failure, .. } => Some(*failure),
        }
    }
}

/// Error converting a wire object into a [`MutationOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("rejected outcome is missing its error message")]
    MissingError,
    #[error("successful outcome carries an error message: {0}")]
    UnexpectedError(String),
    #[error("unknown mutation failure: {0}")]
    UnknownFailure(String),
}

#[derive(Serialize, Deserialize)]
struct WireOutcome {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    counter: Counter,
}

/// Positional form of [`WireOutcome`] for non-self-describing formats.
#[derive(Serialize, Deserialize)]
struct CompactOutcome {
    success: bool,
    error: Option<String>,
    counter: Counter,
}

impl From<WireOutcome> for CompactOutcome {
    fn from(wire: WireOutcome) -> Self {
        Self {
            success: wire.success,
            error: wire.error,
            counter: wire.counter,
        }
    }
}

impl From<CompactOutcome> for WireOutcome {
    fn from(compact: CompactOutcome) -> Self {
        Self {
            success: compact.success,
            error: compact.error,
            counter: compact.counter,
        }
    }
}

impl Serialize for MutationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = WireOutcome::from(*self);
        if serializer.is_human_readable() {
            wire.serialize(serializer)
        } else {
            CompactOutcome::from(wire).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for MutationOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = if deserializer.is_human_readable() {
            WireOutcome::deserialize(deserializer)?
        } else {
            CompactOutcome::deserialize(deserializer)?.into()
        };
        MutationOutcome::try_from(wire).map_err(serde::de::Error::custom)
    }
}

impl From<MutationOutcome> for WireOutcome {
    fn from(outcome: MutationOutcome) -> Self {
        match outcome {
            MutationOutcome::Applied { counter } => Self {
                success: true,
                error: None,
                counter,
            },
            MutationOutcome::Rejected { failure, counter } => Self {
                success: false,
                error: Some(failure.as_ref().to_string()),
                counter,
            },
        }
    }
}

impl TryFrom<WireOutcome> for MutationOutcome {
    type Error = WireError;

    fn try_from(wire: WireOutcome) -> Result<Self, Self::Error> {
        match (wire.success, wire.error) {
            (true, None) => Ok(Self::Applied {
                counter: wire.counter,
            }),
            (true, Some(msg)) => Err(WireError::UnexpectedError(msg)),
            (false, None) => Err(WireError::MissingError),
            (false, Some(msg)) => {
                let failure = msg
                    .parse::<MutationFailure>()
                    .map_err(|_| WireError::UnknownFailure(msg.clone()))?;
                Ok(Self::Rejected {
                    failure,
                    counter: wire.counter,
                })
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
