//! Error types shared by the elevator crates.

use crate::elevator::ElevatorId;
use crate::request::RequestType;

/// Errors raised by dispatch and orchestration.
///
/// Out-of-range destination floors are deliberately absent: they are
/// silently dropped by [`Elevator::add_destination`](crate::Elevator::add_destination).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElevatorError {
    /// Dispatch was asked to choose from a fleet with no elevators.
    #[error("cannot dispatch a request to an empty fleet")]
    EmptyFleet,

    /// No elevator with this id exists in the fleet.
    #[error("unknown elevator: {0}")]
    UnknownElevator(ElevatorId),

    /// A destination request whose destination equals its origin floor.
    #[error("destination floor {0} is the same as the origin floor")]
    SameFloorDestination(u32),

    /// A request whose destination floor does not match its type.
    #[error("{0} request has an inconsistent destination floor")]
    MalformedRequest(RequestType),

    /// The controller has been stopped and no longer accepts requests.
    #[error("controller is shutting down")]
    ShuttingDown,
}

/// Errors raised while loading or validating a [`BuildingConfig`](crate::BuildingConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for a building config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the simulator cannot run with.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// The offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
