//! Per-elevator movement engine.
//!
//! One call to [`MovementEngine::run`] is an *activation*: it drives a single
//! elevator through its pending destinations and returns when the set is
//! drained, when the direction-locked scan runs out of floors, or when its
//! cancellation token fires.
//!
//! ```text
//!            ┌──────── more destinations ────────┐
//!            ▼                                   │
//!   Idle ─► EnRoute ─► (floor reached) ─► DoorsOpen ─► Idle
//!             ▲   │ passing floor                │ none left
//!             └───┘                              ▼
//! ```
//!
//! Every state change happens in a short critical section on the
//! [`SharedFleet`] lock, and the cancellation token is checked inside each of
//! those sections. The only suspension points are the floor-travel and
//! door-operation delays, both of which wake early on cancellation.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use elevator_core::{BuildingConfig, Direction, Elevator, ElevatorError, ScanPolicy};

use crate::events::{ElevatorEvent, Notifier};
use crate::fleet::{ActivationTicket, SharedFleet};

/// How an activation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Every destination was served; the elevator is idle.
    Drained,
    /// Destinations remain, but all of them are behind the direction of
    /// travel. The elevator was reset to idle for the next activation.
    ScanExhausted,
    /// The cancellation token fired. Remaining destinations stay queued.
    Cancelled,
}

/// Simulated timing and scan behaviour used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementTiming {
    /// Delay to travel one floor.
    pub floor_travel: Duration,
    /// Delay the doors stay open at a stop.
    pub door_operation: Duration,
    pub scan_policy: ScanPolicy,
}

impl MovementTiming {
    #[must_use]
    pub fn from_config(config: &BuildingConfig) -> Self {
        Self {
            floor_travel: config.floor_travel_delay(),
            door_operation: config.door_operation_delay(),
            scan_policy: config.scan_policy,
        }
    }
}

/// Why the drive loop stopped early.
enum Interrupt {
    Cancelled,
    Fleet(ElevatorError),
}

impl From<ElevatorError> for Interrupt {
    fn from(err: ElevatorError) -> Self {
        Interrupt::Fleet(err)
    }
}

/// What the drive loop does next.
enum Plan {
    Travel(u32),
    Rescan,
    Finish(ActivationOutcome),
}

/// Drives elevators floor by floor over simulated time.
#[derive(Debug, Clone)]
pub struct MovementEngine {
    timing: MovementTiming,
    notifier: Notifier,
}

impl MovementEngine {
    #[must_use]
    pub fn new(timing: MovementTiming, notifier: Notifier) -> Self {
        Self { timing, notifier }
    }

    #[must_use]
    pub fn timing(&self) -> MovementTiming {
        self.timing
    }

    /// Run one activation for `ticket.elevator`.
    ///
    /// The activation is retired in the fleet's activation table in the same
    /// critical section as its final state change, so a request arriving
    /// afterwards starts a fresh activation instead of relying on this one.
    ///
    /// On cancellation the motion and door flags are cleared and the
    /// remaining destinations are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`ElevatorError::UnknownElevator`] if the ticket names an
    /// elevator that is not in the fleet.
    pub async fn run(
        &self,
        fleet: &SharedFleet,
        ticket: &ActivationTicket,
    ) -> Result<ActivationOutcome, ElevatorError> {
        debug!(elevator = %ticket.elevator, "activation started");

        let outcome = match self.drive(fleet, ticket).await {
            Ok(outcome) => outcome,
            Err(Interrupt::Cancelled) => {
                let mut state = fleet.lock();
                if let Ok(elevator) = state.elevator_mut(ticket.elevator) {
                    elevator.set_moving(false);
                    elevator.set_door_open(false);
                }
                state.retire(ticket);
                ActivationOutcome::Cancelled
            }
            Err(Interrupt::Fleet(err)) => {
                fleet.lock().retire(ticket);
                return Err(err);
            }
        };

        debug!(elevator = %ticket.elevator, ?outcome, "activation finished");
        Ok(outcome)
    }

    async fn drive(
        &self,
        fleet: &SharedFleet,
        ticket: &ActivationTicket,
    ) -> Result<ActivationOutcome, Interrupt> {
        loop {
            match self.plan(fleet, ticket)? {
                Plan::Travel(target) => self.travel(fleet, ticket, target).await?,
                Plan::Rescan => {}
                Plan::Finish(outcome) => return Ok(outcome),
            }
        }
    }

    /// Decide the next target, or finish and retire the activation.
    fn plan(&self, fleet: &SharedFleet, ticket: &ActivationTicket) -> Result<Plan, Interrupt> {
        let mut state = fleet.lock();
        if ticket.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }

        let elevator = state.elevator_mut(ticket.elevator)?;
        let plan = if !elevator.has_destinations() {
            park(elevator);
            Plan::Finish(ActivationOutcome::Drained)
        } else if let Some(target) = elevator.next_destination() {
            Plan::Travel(target)
        } else {
            // Everything left is behind the car.
            park(elevator);
            match self.timing.scan_policy {
                ScanPolicy::DirectionLocked => Plan::Finish(ActivationOutcome::ScanExhausted),
                ScanPolicy::ReverseImmediately => Plan::Rescan,
            }
        };

        if matches!(plan, Plan::Finish(_)) {
            state.retire(ticket);
        }
        Ok(plan)
    }

    /// Move toward `target` one floor at a time, stopping at every pending
    /// destination passed on the way and finally at `target` itself.
    async fn travel(
        &self,
        fleet: &SharedFleet,
        ticket: &ActivationTicket,
        target: u32,
    ) -> Result<(), Interrupt> {
        let id = ticket.elevator;
        let (from, direction) = self.step(fleet, ticket, |e| {
            let from = e.current_floor();
            let direction = Direction::towards(from, target);
            e.set_door_open(false);
            e.set_direction(direction);
            e.set_moving(true);
            (from, direction)
        })?;
        self.notifier.emit(ElevatorEvent::MovementStarted {
            elevator: id,
            from,
            to: target,
        });

        let mut floor = from;
        while floor != target {
            self.pause(self.timing.floor_travel, &ticket.cancel).await?;
            floor = match direction {
                Direction::Up => floor + 1,
                Direction::Down => floor - 1,
                Direction::Idle => target,
            };

            let stopped = self.step(fleet, ticket, |e| {
                e.move_to_floor(floor);
                let stop = floor == target || e.has_destination(floor);
                if stop {
                    e.set_moving(false);
                    e.set_door_open(true);
                    e.remove_destination(floor);
                }
                stop
            })?;
            if !stopped {
                debug!(elevator = %id, floor, "passing floor");
                continue;
            }

            self.notifier.emit(ElevatorEvent::Arrived { elevator: id, floor });
            self.pause(self.timing.door_operation, &ticket.cancel).await?;

            let resume = floor != target;
            self.step(fleet, ticket, |e| {
                e.set_door_open(false);
                e.set_moving(resume);
            })?;
        }
        Ok(())
    }

    /// Apply one state transition under the fleet lock, unless cancelled.
    fn step<R>(
        &self,
        fleet: &SharedFleet,
        ticket: &ActivationTicket,
        f: impl FnOnce(&mut Elevator) -> R,
    ) -> Result<R, Interrupt> {
        let mut state = fleet.lock();
        if ticket.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        Ok(f(state.elevator_mut(ticket.elevator)?))
    }

    /// Wait for `delay`, returning early if `cancel` fires.
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> Result<(), Interrupt> {
        if cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Interrupt::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

fn park(elevator: &mut Elevator) {
    elevator.set_direction(Direction::Idle);
    elevator.set_moving(false);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use elevator_core::ElevatorId;

    use super::*;
    use crate::events::RecordingSink;
    use crate::fleet::Fleet;

    const TRAVEL: Duration = Duration::from_millis(100);
    const DOOR: Duration = Duration::from_millis(100);
    const ID: ElevatorId = ElevatorId(1);

    struct Harness {
        engine: Arc<MovementEngine>,
        fleet: SharedFleet,
        sink: Arc<RecordingSink>,
    }

    impl Harness {
        fn new(floor: u32, direction: Direction, destinations: &[u32], policy: ScanPolicy) -> Self {
            let mut elevator = Elevator::new(ID, floor, 10);
            elevator.set_direction(direction);
            for &d in destinations {
                elevator.add_destination(d);
            }
            let sink = Arc::new(RecordingSink::new());
            let timing = MovementTiming {
                floor_travel: TRAVEL,
                door_operation: DOOR,
                scan_policy: policy,
            };
            Self {
                engine: Arc::new(MovementEngine::new(timing, Notifier::new(sink.clone()))),
                fleet: SharedFleet::new(Fleet::from_elevators(vec![elevator])),
                sink,
            }
        }

        fn elevator(&self) -> Elevator {
            self.fleet.snapshot()[0].clone()
        }

        fn spawn(
            &self,
            cancel: &CancellationToken,
        ) -> tokio::task::JoinHandle<Result<ActivationOutcome, ElevatorError>> {
            let engine = Arc::clone(&self.engine);
            let fleet = self.fleet.clone();
            let ticket = ActivationTicket::detached(ID, cancel.clone());
            tokio::spawn(async move { engine.run(&fleet, &ticket).await })
        }
    }

    async fn run_once(harness: &Harness) -> ActivationOutcome {
        let ticket = ActivationTicket::detached(ID, CancellationToken::new());
        harness.engine.run(&harness.fleet, &ticket).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_destination_drains_to_idle() {
        let harness = Harness::new(1, Direction::Idle, &[5], ScanPolicy::DirectionLocked);

        assert_eq!(run_once(&harness).await, ActivationOutcome::Drained);

        let elevator = harness.elevator();
        assert_eq!(elevator.current_floor(), 5);
        assert!(!elevator.has_destinations());
        assert_eq!(elevator.direction(), Direction::Idle);
        assert!(!elevator.is_moving());
        assert!(!elevator.is_door_open());

        let events = harness.sink.events();
        assert_eq!(
            events.first(),
            Some(&ElevatorEvent::MovementStarted {
                elevator: ID,
                from: 1,
                to: 5
            })
        );
        assert_eq!(harness.sink.arrivals(ID), vec![5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_moving_down() {
        let harness = Harness::new(9, Direction::Idle, &[6, 2], ScanPolicy::DirectionLocked);

        assert_eq!(run_once(&harness).await, ActivationOutcome::Drained);
        assert_eq!(harness.sink.arrivals(ID), vec![6, 2]);
        assert_eq!(harness.elevator().current_floor(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_matches_floors_and_stops() {
        let harness = Harness::new(1, Direction::Idle, &[4], ScanPolicy::DirectionLocked);
        let start = tokio::time::Instant::now();

        run_once(&harness).await;

        assert_eq!(start.elapsed(), TRAVEL * 3 + DOOR);
    }

    #[tokio::test(start_paused = true)]
    async fn test_intermediate_stop_for_destination_added_en_route() {
        let harness = Harness::new(1, Direction::Idle, &[6], ScanPolicy::DirectionLocked);
        let cancel = CancellationToken::new();
        let task = harness.spawn(&cancel);

        // Halfway between floors 2 and 3.
        tokio::time::sleep(TRAVEL + TRAVEL / 2).await;
        harness
            .fleet
            .with_elevator(ID, |e| e.add_destination(4))
            .unwrap();

        assert_eq!(task.await.unwrap().unwrap(), ActivationOutcome::Drained);
        assert_eq!(harness.sink.arrivals(ID), vec![4, 6]);

        let started = harness
            .sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, ElevatorEvent::MovementStarted { .. }))
            .count();
        assert_eq!(started, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_travel_keeps_destinations() {
        let harness = Harness::new(1, Direction::Idle, &[8], ScanPolicy::DirectionLocked);
        let cancel = CancellationToken::new();
        let task = harness.spawn(&cancel);

        tokio::time::sleep(TRAVEL * 2 + TRAVEL / 2).await;
        assert!(harness.elevator().is_moving());
        cancel.cancel();

        assert_eq!(task.await.unwrap().unwrap(), ActivationOutcome::Cancelled);
        let elevator = harness.elevator();
        assert_eq!(elevator.current_floor(), 3);
        assert!(!elevator.is_moving());
        assert!(!elevator.is_door_open());
        assert!(elevator.has_destination(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_with_doors_open_closes_them() {
        let harness = Harness::new(1, Direction::Idle, &[2, 5], ScanPolicy::DirectionLocked);
        let cancel = CancellationToken::new();
        let task = harness.spawn(&cancel);

        tokio::time::sleep(TRAVEL + DOOR / 2).await;
        let elevator = harness.elevator();
        assert!(elevator.is_door_open());
        assert!(!elevator.is_moving());
        cancel.cancel();

        assert_eq!(task.await.unwrap().unwrap(), ActivationOutcome::Cancelled);
        let elevator = harness.elevator();
        assert!(!elevator.is_door_open());
        assert!(!elevator.is_moving());
        assert_eq!(elevator.current_floor(), 2);
        assert!(elevator.has_destination(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_does_nothing() {
        let harness = Harness::new(1, Direction::Idle, &[3], ScanPolicy::DirectionLocked);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let ticket = ActivationTicket::detached(ID, cancel);
        let outcome = harness.engine.run(&harness.fleet, &ticket).await.unwrap();

        assert_eq!(outcome, ActivationOutcome::Cancelled);
        assert_eq!(harness.elevator().current_floor(), 1);
        assert!(harness.elevator().has_destination(3));
        assert!(harness.sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_direction_locked_scan_stops_then_next_activation_reverses() {
        let harness = Harness::new(6, Direction::Up, &[2, 4], ScanPolicy::DirectionLocked);

        assert_eq!(run_once(&harness).await, ActivationOutcome::ScanExhausted);
        let elevator = harness.elevator();
        assert_eq!(elevator.current_floor(), 6);
        assert_eq!(elevator.direction(), Direction::Idle);
        assert_eq!(elevator.destinations().len(), 2);
        assert!(harness.sink.events().is_empty());

        assert_eq!(run_once(&harness).await, ActivationOutcome::Drained);
        assert_eq!(harness.sink.arrivals(ID), vec![4, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverse_immediately_serves_everything_in_one_activation() {
        let harness = Harness::new(6, Direction::Up, &[2, 4], ScanPolicy::ReverseImmediately);

        assert_eq!(run_once(&harness).await, ActivationOutcome::Drained);
        assert_eq!(harness.sink.arrivals(ID), vec![4, 2]);
        assert_eq!(harness.elevator().direction(), Direction::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_elevator() {
        let harness = Harness::new(1, Direction::Idle, &[3], ScanPolicy::DirectionLocked);
        let ticket = ActivationTicket::detached(ElevatorId(7), CancellationToken::new());

        let err = harness.engine.run(&harness.fleet, &ticket).await.unwrap_err();
        assert_eq!(err, ElevatorError::UnknownElevator(ElevatorId(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_activation_is_retired() {
        let harness = Harness::new(1, Direction::Idle, &[2], ScanPolicy::DirectionLocked);
        let root = CancellationToken::new();
        let ticket = harness
            .fleet
            .lock()
            .begin_activation(ID, &root)
            .unwrap();
        assert!(harness.fleet.lock().is_active(ID));

        harness.engine.run(&harness.fleet, &ticket).await.unwrap();

        assert!(!harness.fleet.lock().is_active(ID));
    }
}
