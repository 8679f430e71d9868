//! Observational events emitted by the controller and movement engine.
//!
//! Sinks are pure observers. A sink that fails or panics never reaches the
//! scheduling code: [`Notifier::emit`] swallows the failure after logging it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use elevator_core::{Elevator, ElevatorId, ElevatorRequest};

/// Something observable happened in the elevator bank.
#[derive(Debug, Clone, PartialEq)]
pub enum ElevatorEvent {
    /// A request entered the controller.
    RequestReceived(ElevatorRequest),
    /// An elevator left `from` heading for `to`.
    MovementStarted {
        elevator: ElevatorId,
        from: u32,
        to: u32,
    },
    /// An elevator stopped at `floor` and opened its doors.
    Arrived { elevator: ElevatorId, floor: u32 },
    /// Status line for one elevator.
    ElevatorStatus(Elevator),
    /// Status snapshot of the whole fleet.
    FleetStatus(Vec<Elevator>),
}

/// Failure reported by an [`EventSink`].
#[derive(Debug, thiserror::Error)]
#[error("event sink failed: {0}")]
pub struct SinkError(pub String);

/// Receiver of [`ElevatorEvent`]s.
pub trait EventSink: Send + Sync {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the event could not be recorded. The caller
    /// logs the error and carries on.
    fn notify(&self, event: &ElevatorEvent) -> Result<(), SinkError>;
}

/// Writes every event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn notify(&self, event: &ElevatorEvent) -> Result<(), SinkError> {
        match event {
            ElevatorEvent::RequestReceived(request) => {
                info!(
                    target: "elevator::events",
                    floor = request.floor(),
                    kind = %request.request_type(),
                    "REQUEST: {request}"
                );
            }
            ElevatorEvent::MovementStarted { elevator, from, to } => {
                let heading = if to > from { "UP" } else { "DOWN" };
                info!(
                    target: "elevator::events",
                    elevator = elevator.get(),
                    from,
                    to,
                    "MOVEMENT: Elevator {elevator} moving {heading} from floor {from} to floor {to}"
                );
            }
            ElevatorEvent::Arrived { elevator, floor } => {
                info!(
                    target: "elevator::events",
                    elevator = elevator.get(),
                    floor,
                    "ARRIVAL: Elevator {elevator} arrived at floor {floor}"
                );
            }
            ElevatorEvent::ElevatorStatus(elevator) => {
                info!(target: "elevator::events", "STATUS: {elevator}");
            }
            ElevatorEvent::FleetStatus(fleet) => {
                info!(target: "elevator::events", elevators = fleet.len(), "SYSTEM STATUS:");
                for elevator in fleet {
                    info!(target: "elevator::events", "  {elevator}");
                }
            }
        }
        Ok(())
    }
}

/// Keeps every event in memory. Used by tests and by callers that want to
/// inspect the event stream after the fact.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ElevatorEvent>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<ElevatorEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Floors at which `elevator` has arrived, in order.
    #[must_use]
    pub fn arrivals(&self, elevator: ElevatorId) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ElevatorEvent::Arrived { elevator: id, floor } if id == elevator => Some(floor),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn notify(&self, event: &ElevatorEvent) -> Result<(), SinkError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Shared handle that delivers events to a sink and isolates its failures.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn EventSink>,
}

impl Notifier {
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Deliver `event`. Errors and panics from the sink are logged and
    /// dropped.
    pub fn emit(&self, event: ElevatorEvent) {
        match catch_unwind(AssertUnwindSafe(|| self.sink.notify(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(%err, "event sink rejected event"),
            Err(_) => warn!("event sink panicked; event dropped"),
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    impl EventSink for FailingSink {
        fn notify(&self, _event: &ElevatorEvent) -> Result<(), SinkError> {
            Err(SinkError("disk full".to_string()))
        }
    }

    struct PanickingSink;

    impl EventSink for PanickingSink {
        fn notify(&self, _event: &ElevatorEvent) -> Result<(), SinkError> {
            panic!("sink exploded");
        }
    }

    fn arrival(floor: u32) -> ElevatorEvent {
        ElevatorEvent::Arrived {
            elevator: ElevatorId(1),
            floor,
        }
    }

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = Arc::new(RecordingSink::new());
        let notifier = Notifier::new(sink.clone());
        notifier.emit(arrival(3));
        notifier.emit(arrival(5));
        assert_eq!(sink.events(), vec![arrival(3), arrival(5)]);
        assert_eq!(sink.arrivals(ElevatorId(1)), vec![3, 5]);
        assert!(sink.arrivals(ElevatorId(2)).is_empty());
    }

    #[test]
    fn test_failing_sink_is_isolated() {
        let notifier = Notifier::new(Arc::new(FailingSink));
        notifier.emit(arrival(2));
    }

    #[test]
    fn test_panicking_sink_is_isolated() {
        let notifier = Notifier::new(Arc::new(PanickingSink));
        notifier.emit(arrival(2));
        notifier.emit(arrival(4));
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        let fleet = vec![Elevator::new(ElevatorId(1), 1, 10)];
        let events = [
            ElevatorEvent::RequestReceived(ElevatorRequest::up(3)),
            ElevatorEvent::MovementStarted {
                elevator: ElevatorId(1),
                from: 1,
                to: 3,
            },
            arrival(3),
            ElevatorEvent::ElevatorStatus(fleet[0].clone()),
            ElevatorEvent::FleetStatus(fleet),
        ];
        for event in &events {
            assert!(sink.notify(event).is_ok());
        }
    }
}
