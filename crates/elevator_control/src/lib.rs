//! # elevator_control
//!
//! Scheduling and concurrency engine for the elevator bank simulator.
//!
//! This crate provides:
//!
//! - [`dispatcher`] — the [`Dispatcher`] trait and the greedy [`CostDispatcher`].
//! - [`movement`] — the per-elevator [`MovementEngine`] state machine.
//! - [`controller`] — the [`ElevatorController`] that owns the fleet and
//!   guarantees at most one movement activation per elevator.
//! - [`fleet`] — the lock-guarded fleet arena and activation table.
//! - [`events`] — observational events and the sinks that receive them.
//! - [`generator`] — random request generation for unattended runs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use elevator_control::ElevatorController;
//! use elevator_core::{BuildingConfig, ElevatorRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), elevator_core::ElevatorError> {
//!     let controller = ElevatorController::with_defaults(BuildingConfig::default());
//!     let id = controller.process_request(ElevatorRequest::up(5))?;
//!     println!("elevator {id} is on its way");
//!     controller.stop().await;
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod dispatcher;
pub mod events;
pub mod fleet;
pub mod generator;
pub mod movement;

pub use controller::{ElevatorController, ShutdownReport};
pub use dispatcher::{CostDispatcher, Dispatcher};
pub use events::{ElevatorEvent, EventSink, Notifier, RecordingSink, SinkError, TracingSink};
pub use fleet::{ActivationTicket, Fleet, FleetState, SharedFleet};
pub use generator::RequestGenerator;
pub use movement::{ActivationOutcome, MovementEngine, MovementTiming};
