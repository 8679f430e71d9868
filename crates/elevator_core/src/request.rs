//! Elevator requests.
//!
//! A request is either a hall call (someone on a floor pressed Up or Down) or
//! a destination request (someone on a floor wants to reach another floor).

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::ElevatorError;

/// The kind of call that produced a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    Up,
    Down,
    Destination,
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestType::Up => "Up",
            RequestType::Down => "Down",
            RequestType::Destination => "Destination",
        };
        f.write_str(name)
    }
}

/// An immutable request for service.
///
/// `destination_floor` is `Some` exactly when the type is
/// [`RequestType::Destination`]; the constructors uphold this, and
/// deserialization goes through them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RequestRecord")]
pub struct ElevatorRequest {
    floor: u32,
    request_type: RequestType,
    destination_floor: Option<u32>,
    /// Creation time. Informational only; dispatch never reads it.
    requested_at: SystemTime,
}

impl ElevatorRequest {
    /// A hall call asking for a car going up from `floor`.
    #[must_use]
    pub fn up(floor: u32) -> Self {
        Self::call(floor, RequestType::Up)
    }

    /// A hall call asking for a car going down from `floor`.
    #[must_use]
    pub fn down(floor: u32) -> Self {
        Self::call(floor, RequestType::Down)
    }

    /// A request to be picked up at `floor` and taken to `destination_floor`.
    ///
    /// # Errors
    ///
    /// Returns [`ElevatorError::SameFloorDestination`] if both floors match.
    pub fn destination(floor: u32, destination_floor: u32) -> Result<Self, ElevatorError> {
        if floor == destination_floor {
            return Err(ElevatorError::SameFloorDestination(floor));
        }
        Ok(Self {
            floor,
            request_type: RequestType::Destination,
            destination_floor: Some(destination_floor),
            requested_at: SystemTime::now(),
        })
    }

    fn call(floor: u32, request_type: RequestType) -> Self {
        Self {
            floor,
            request_type,
            destination_floor: None,
            requested_at: SystemTime::now(),
        }
    }

    /// The floor the call was made from.
    #[must_use]
    pub fn floor(&self) -> u32 {
        self.floor
    }

    #[must_use]
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    #[must_use]
    pub fn destination_floor(&self) -> Option<u32> {
        self.destination_floor
    }

    #[must_use]
    pub fn requested_at(&self) -> SystemTime {
        self.requested_at
    }
}

/// Wire shape of a request. `requested_at` is restamped on arrival.
#[derive(Deserialize)]
struct RequestRecord {
    floor: u32,
    request_type: RequestType,
    #[serde(default)]
    destination_floor: Option<u32>,
}

impl TryFrom<RequestRecord> for ElevatorRequest {
    type Error = ElevatorError;

    fn try_from(record: RequestRecord) -> Result<Self, Self::Error> {
        match (record.request_type, record.destination_floor) {
            (RequestType::Up, None) => Ok(Self::up(record.floor)),
            (RequestType::Down, None) => Ok(Self::down(record.floor)),
            (RequestType::Destination, Some(to)) => Self::destination(record.floor, to),
            (kind, _) => Err(ElevatorError::MalformedRequest(kind)),
        }
    }
}

impl std::fmt::Display for ElevatorRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.destination_floor {
            Some(to) => write!(f, "Destination to floor {to} request on floor {}", self.floor),
            None => write!(f, "{} request on floor {}", self.request_type, self.floor),
        }
    }
}
