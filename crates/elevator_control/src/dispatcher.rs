//! Request dispatch — choosing which elevator serves a request.
//!
//! The default policy is a greedy cost minimisation over the fleet. Each
//! elevator gets a scalar cost for the request and the cheapest one wins.
//! Dispatch never mutates the fleet.

use elevator_core::{Direction, Elevator, ElevatorError, ElevatorRequest, RequestType};

/// Multiplier applied when an elevator is already travelling toward the call
/// in the direction the caller wants to go.
pub const SAME_DIRECTION_FACTOR: f64 = 0.5;

/// Multiplier applied to idle elevators.
pub const IDLE_FACTOR: f64 = 0.8;

/// Cost added per pending destination.
pub const LOAD_PENALTY: f64 = 2.0;

/// Picks the elevator that should serve a request.
pub trait Dispatcher: Send + Sync {
    /// Select one elevator from `fleet` for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ElevatorError::EmptyFleet`] if `fleet` is empty.
    fn select_elevator<'a>(
        &self,
        request: &ElevatorRequest,
        fleet: &'a [Elevator],
    ) -> Result<&'a Elevator, ElevatorError>;
}

/// Greedy distance/direction/load cost dispatcher.
///
/// ```text
/// cost  = |floor - request.floor|
/// cost *= 0.5   if heading the requested way and not yet past the caller
/// cost *= 0.8   if idle
/// cost += 2 * pending destinations
/// ```
///
/// Ties go to the elevator that appears first in the fleet.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostDispatcher;

impl CostDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The cost of sending `elevator` to serve `request`. Lower is better.
    #[must_use]
    pub fn cost(elevator: &Elevator, request: &ElevatorRequest) -> f64 {
        let current = elevator.current_floor();
        let mut cost = f64::from(current.abs_diff(request.floor()));

        let heading_to_caller = match (request.request_type(), elevator.direction()) {
            (RequestType::Up, Direction::Up) => current <= request.floor(),
            (RequestType::Down, Direction::Down) => current >= request.floor(),
            _ => false,
        };
        if heading_to_caller {
            cost *= SAME_DIRECTION_FACTOR;
        }
        if elevator.direction() == Direction::Idle {
            cost *= IDLE_FACTOR;
        }

        // Destination counts are bounded by the floor count.
        #[allow(clippy::cast_precision_loss)]
        let load = elevator.destinations().len() as f64;
        cost + load * LOAD_PENALTY
    }
}

impl Dispatcher for CostDispatcher {
    fn select_elevator<'a>(
        &self,
        request: &ElevatorRequest,
        fleet: &'a [Elevator],
    ) -> Result<&'a Elevator, ElevatorError> {
        let mut best: Option<(&Elevator, f64)> = None;
        for elevator in fleet {
            let cost = Self::cost(elevator, request);
            match best {
                Some((_, best_cost)) if cost >= best_cost => {}
                _ => best = Some((elevator, cost)),
            }
        }
        best.map(|(elevator, _)| elevator)
            .ok_or(ElevatorError::EmptyFleet)
    }
}
