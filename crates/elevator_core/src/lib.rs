//! # elevator_core
//!
//! Data model of the elevator bank simulator.
//!
//! This crate provides:
//!
//! - [`Elevator`] — one car, its flags, and its destination set.
//! - [`ElevatorRequest`] — an immutable hall call or destination request.
//! - [`BuildingConfig`] — floor/elevator counts and simulated timing.
//! - [`ElevatorError`] / [`ConfigError`] — shared error types.

pub mod config;
pub mod elevator;
pub mod error;
pub mod request;

pub use config::{BuildingConfig, ScanPolicy};
pub use elevator::{Direction, Elevator, ElevatorId, GROUND_FLOOR};
pub use error::{ConfigError, ElevatorError};
pub use request::{ElevatorRequest, RequestType};
