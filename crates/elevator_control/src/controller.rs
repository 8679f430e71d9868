//! Elevator controller — request intake and activation lifecycle.
//!
//! The controller owns the fleet and is the only component that starts
//! movement activations. A request is handled in one critical section:
//!
//! 1. Dispatch the request to an elevator.
//! 2. Add the call floor (and destination floor) to that elevator.
//! 3. If no live activation serves the elevator, claim the slot and spawn one.
//!
//! Because step 3 happens under the same lock the movement engine uses to
//! retire itself, an elevator can never have two activations, and a
//! destination added while an activation is finishing is never stranded.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use elevator_core::{BuildingConfig, Elevator, ElevatorError, ElevatorId, ElevatorRequest};

use crate::dispatcher::{CostDispatcher, Dispatcher};
use crate::events::{ElevatorEvent, EventSink, Notifier, TracingSink};
use crate::fleet::{ActivationHandle, ActivationTicket, Fleet, SharedFleet};
use crate::movement::{MovementEngine, MovementTiming};

/// Result of [`ElevatorController::stop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Activations that finished before the timeout.
    pub settled: usize,
    /// Activations still running when the timeout elapsed. They are detached
    /// and left to observe their cancellation on their own.
    pub abandoned: usize,
}

/// Owns the fleet and coordinates dispatch with movement.
pub struct ElevatorController {
    config: BuildingConfig,
    fleet: SharedFleet,
    dispatcher: Arc<dyn Dispatcher>,
    engine: Arc<MovementEngine>,
    notifier: Notifier,
    /// Parent of every activation token. Cancelled once by `stop`.
    shutdown: CancellationToken,
}

impl ElevatorController {
    /// Create a controller with a fresh fleet built from `config`.
    ///
    /// `config` is expected to have passed [`BuildingConfig::validate`].
    #[must_use]
    pub fn new(
        config: BuildingConfig,
        dispatcher: Arc<dyn Dispatcher>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let fleet = Fleet::new(&config);
        Self::with_fleet(config, fleet, dispatcher, sink)
    }

    /// Create a controller around an existing fleet.
    #[must_use]
    pub fn with_fleet(
        config: BuildingConfig,
        fleet: Fleet,
        dispatcher: Arc<dyn Dispatcher>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let notifier = Notifier::new(sink);
        let engine = MovementEngine::new(MovementTiming::from_config(&config), notifier.clone());
        Self {
            config,
            fleet: SharedFleet::new(fleet),
            dispatcher,
            engine: Arc::new(engine),
            notifier,
            shutdown: CancellationToken::new(),
        }
    }

    /// Controller with the cost dispatcher and the `tracing` event sink.
    #[must_use]
    pub fn with_defaults(config: BuildingConfig) -> Self {
        Self::new(config, Arc::new(CostDispatcher), Arc::new(TracingSink))
    }

    #[must_use]
    pub fn config(&self) -> &BuildingConfig {
        &self.config
    }

    /// Route `request` to an elevator and make sure that elevator is moving.
    ///
    /// Returns the id of the chosen elevator. The call does not wait for any
    /// movement; it returns as soon as the destinations are recorded.
    ///
    /// # Errors
    ///
    /// - [`ElevatorError::ShuttingDown`] after [`stop`](Self::stop).
    /// - [`ElevatorError::EmptyFleet`] if the fleet has no elevators.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since it may spawn a task.
    pub fn process_request(&self, request: ElevatorRequest) -> Result<ElevatorId, ElevatorError> {
        if self.shutdown.is_cancelled() {
            return Err(ElevatorError::ShuttingDown);
        }
        self.notifier
            .emit(ElevatorEvent::RequestReceived(request.clone()));

        let (id, started) = {
            let mut state = self.fleet.lock();
            // `stop` may have cancelled between the check above and the lock.
            if self.shutdown.is_cancelled() {
                return Err(ElevatorError::ShuttingDown);
            }
            let id = self
                .dispatcher
                .select_elevator(&request, state.fleet().as_slice())?
                .id();

            let elevator = state.elevator_mut(id)?;
            elevator.add_destination(request.floor());
            if let Some(to) = request.destination_floor() {
                elevator.add_destination(to);
            }
            let has_work = elevator.has_destinations();

            let started = if has_work {
                state.begin_activation(id, &self.shutdown).map(|ticket| {
                    let handle = self.spawn_activation(ticket.clone());
                    state.attach_handle(&ticket, handle);
                    ticket.run_id
                })
            } else {
                None
            };
            (id, started)
        };

        match started {
            Some(run_id) => info!(elevator = %id, %run_id, "request assigned, activation started"),
            None => debug!(elevator = %id, "request assigned, no new activation needed"),
        }
        Ok(id)
    }

    fn spawn_activation(&self, ticket: ActivationTicket) -> ActivationHandle {
        let engine = Arc::clone(&self.engine);
        let fleet = self.fleet.clone();
        let span = info_span!("activation", elevator = %ticket.elevator, run_id = %ticket.run_id);
        tokio::spawn(async move { engine.run(&fleet, &ticket).await }.instrument(span))
    }

    /// A copy of every elevator, in fleet order.
    #[must_use]
    pub fn elevators(&self) -> Vec<Elevator> {
        self.fleet.snapshot()
    }

    /// A copy of one elevator.
    #[must_use]
    pub fn elevator(&self, id: ElevatorId) -> Option<Elevator> {
        self.fleet.lock().fleet().get(id).cloned()
    }

    /// Returns `true` if a movement activation is serving `id`.
    #[must_use]
    pub fn is_active(&self, id: ElevatorId) -> bool {
        self.fleet.lock().is_active(id)
    }

    /// Cancel the activation serving `id` without touching the others.
    ///
    /// Returns `true` if a live activation was signalled. Its destinations
    /// stay queued and are picked up by the next request for that elevator.
    ///
    /// # Errors
    ///
    /// Returns [`ElevatorError::UnknownElevator`] if `id` is not in the fleet.
    pub fn cancel_elevator(&self, id: ElevatorId) -> Result<bool, ElevatorError> {
        let state = self.fleet.lock();
        if state.fleet().get(id).is_none() {
            return Err(ElevatorError::UnknownElevator(id));
        }
        Ok(state.cancel(id))
    }

    /// Emit one status line per elevator.
    pub fn report_status(&self) {
        self.notifier
            .emit(ElevatorEvent::FleetStatus(self.elevators()));
    }

    /// Emit one status line for a single elevator.
    ///
    /// # Errors
    ///
    /// Returns [`ElevatorError::UnknownElevator`] if `id` is not in the fleet.
    pub fn report_elevator(&self, id: ElevatorId) -> Result<(), ElevatorError> {
        let elevator = self
            .elevator(id)
            .ok_or(ElevatorError::UnknownElevator(id))?;
        self.notifier.emit(ElevatorEvent::ElevatorStatus(elevator));
        Ok(())
    }

    /// Report the fleet, then keep reporting every `status_interval` until
    /// `cancel` fires or the controller is stopped. An interval of zero
    /// disables the periodic reports.
    pub async fn start(&self, cancel: CancellationToken) {
        info!(
            floors = self.config.total_floors,
            elevators = self.config.total_elevators,
            "elevator controller started"
        );
        self.report_status();

        let interval = self.config.status_interval();
        if interval.is_zero() {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = self.shutdown.cancelled() => {}
            }
            return;
        }

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.report_status(),
            }
        }
    }

    /// Cancel every activation and wait up to `shutdown_timeout` for them to
    /// settle.
    ///
    /// Safe to call more than once; later calls find nothing left to wait for.
    pub async fn stop(&self) -> ShutdownReport {
        self.shutdown.cancel();
        let handles = self.fleet.lock().take_handles();
        if handles.is_empty() {
            return ShutdownReport::default();
        }

        let timeout = self.config.shutdown_timeout();
        info!(activations = handles.len(), ?timeout, "stopping elevator controller");
        let report = settle(handles, timeout).await;
        if report.abandoned > 0 {
            warn!(
                abandoned = report.abandoned,
                "activations did not settle before shutdown timeout"
            );
        }
        info!(settled = report.settled, "elevator controller stopped");
        report
    }
}

impl std::fmt::Debug for ElevatorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevatorController")
            .field("config", &self.config)
            .field("fleet", &self.fleet)
            .field("stopped", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn settle(handles: Vec<(ElevatorId, ActivationHandle)>, timeout: Duration) -> ShutdownReport {
    let deadline = tokio::time::Instant::now() + timeout;
    let waits = handles.into_iter().map(|(id, handle)| async move {
        (id, tokio::time::timeout_at(deadline, handle).await)
    });

    let mut report = ShutdownReport::default();
    for (id, result) in join_all(waits).await {
        match result {
            Ok(Ok(Ok(outcome))) => {
                debug!(elevator = %id, ?outcome, "activation settled");
                report.settled += 1;
            }
            Ok(Ok(Err(err))) => {
                warn!(elevator = %id, %err, "activation failed");
                report.settled += 1;
            }
            Ok(Err(err)) => {
                warn!(elevator = %id, %err, "activation task did not complete");
                report.settled += 1;
            }
            Err(_) => report.abandoned += 1,
        }
    }
    report
}
