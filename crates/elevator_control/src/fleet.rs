//! Fleet storage and the activation table.
//!
//! The [`SharedFleet`] is the single mutual-exclusion boundary of the
//! controller. It guards both the elevator records and the per-elevator
//! activation table, so that "add a destination" and "is a movement task
//! already serving this elevator?" are decided in one critical section.
//!
//! The lock is a `std::sync::Mutex` and is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use elevator_core::{BuildingConfig, Elevator, ElevatorError, ElevatorId, GROUND_FLOOR};

use crate::movement::ActivationOutcome;

/// Join handle of a spawned movement activation.
pub type ActivationHandle = JoinHandle<Result<ActivationOutcome, ElevatorError>>;

/// The fixed set of elevators, addressed by id.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    elevators: Vec<Elevator>,
}

impl Fleet {
    /// Create `total_elevators` idle elevators on the ground floor, with ids
    /// `1..=total_elevators`.
    #[must_use]
    pub fn new(config: &BuildingConfig) -> Self {
        let elevators = (1..=config.total_elevators)
            .map(|id| Elevator::new(ElevatorId(id), GROUND_FLOOR, config.total_floors))
            .collect();
        Self { elevators }
    }

    /// Build a fleet from pre-positioned elevators, kept in the given order.
    #[must_use]
    pub fn from_elevators(elevators: Vec<Elevator>) -> Self {
        Self { elevators }
    }

    #[must_use]
    pub fn get(&self, id: ElevatorId) -> Option<&Elevator> {
        self.elevators.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: ElevatorId) -> Option<&mut Elevator> {
        self.elevators.iter_mut().find(|e| e.id() == id)
    }

    /// The elevators in fleet order.
    #[must_use]
    pub fn as_slice(&self) -> &[Elevator] {
        &self.elevators
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elevators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elevators.is_empty()
    }
}

/// Credentials handed to one movement activation.
///
/// The `run_id` distinguishes successive activations of the same elevator so
/// a finishing activation can never retire its successor's slot.
#[derive(Debug, Clone)]
pub struct ActivationTicket {
    pub elevator: ElevatorId,
    pub run_id: Uuid,
    pub cancel: CancellationToken,
}

impl ActivationTicket {
    /// A ticket that is not registered in any activation table. Retiring it
    /// is a no-op, which lets the movement engine run on its own.
    #[must_use]
    pub fn detached(elevator: ElevatorId, cancel: CancellationToken) -> Self {
        Self {
            elevator,
            run_id: Uuid::new_v4(),
            cancel,
        }
    }
}

#[derive(Debug)]
struct ActivationSlot {
    run_id: Uuid,
    cancel: CancellationToken,
    handle: Option<ActivationHandle>,
    live: bool,
}

impl ActivationSlot {
    fn is_alive(&self) -> bool {
        self.live && self.handle.as_ref().is_none_or(|h| !h.is_finished())
    }
}

/// Everything guarded by the fleet lock.
#[derive(Debug, Default)]
pub struct FleetState {
    fleet: Fleet,
    activations: HashMap<ElevatorId, ActivationSlot>,
}

impl FleetState {
    #[must_use]
    pub fn new(fleet: Fleet) -> Self {
        Self {
            fleet,
            activations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Mutable access to one elevator.
    ///
    /// # Errors
    ///
    /// Returns [`ElevatorError::UnknownElevator`] if `id` is not in the fleet.
    pub fn elevator_mut(&mut self, id: ElevatorId) -> Result<&mut Elevator, ElevatorError> {
        self.fleet
            .get_mut(id)
            .ok_or(ElevatorError::UnknownElevator(id))
    }

    /// Returns `true` if an activation is currently serving `id`.
    #[must_use]
    pub fn is_active(&self, id: ElevatorId) -> bool {
        self.activations
            .get(&id)
            .is_some_and(ActivationSlot::is_alive)
    }

    /// Claim the activation slot for `id`.
    ///
    /// Returns `None` if a live activation already owns the elevator.
    /// Otherwise records a new live slot whose cancellation token is a child
    /// of `parent`, and returns its ticket.
    pub fn begin_activation(
        &mut self,
        id: ElevatorId,
        parent: &CancellationToken,
    ) -> Option<ActivationTicket> {
        if self.is_active(id) {
            return None;
        }
        let ticket = ActivationTicket {
            elevator: id,
            run_id: Uuid::new_v4(),
            cancel: parent.child_token(),
        };
        self.activations.insert(
            id,
            ActivationSlot {
                run_id: ticket.run_id,
                cancel: ticket.cancel.clone(),
                handle: None,
                live: true,
            },
        );
        Some(ticket)
    }

    /// Store the join handle of the task spawned for `ticket`.
    pub fn attach_handle(&mut self, ticket: &ActivationTicket, handle: ActivationHandle) {
        if let Some(slot) = self.activations.get_mut(&ticket.elevator)
            && slot.run_id == ticket.run_id
        {
            slot.handle = Some(handle);
        }
    }

    /// Mark the activation behind `ticket` as finished. After this call the
    /// activation must not touch the elevator again.
    pub fn retire(&mut self, ticket: &ActivationTicket) {
        if let Some(slot) = self.activations.get_mut(&ticket.elevator)
            && slot.run_id == ticket.run_id
        {
            slot.live = false;
        }
    }

    /// Signal cancellation to the live activation serving `id`, if any.
    ///
    /// Returns `true` if a live activation was signalled.
    pub fn cancel(&self, id: ElevatorId) -> bool {
        match self.activations.get(&id) {
            Some(slot) if slot.is_alive() => {
                slot.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Take every join handle out of the table, leaving the slots in place.
    pub fn take_handles(&mut self) -> Vec<(ElevatorId, ActivationHandle)> {
        self.activations
            .iter_mut()
            .filter_map(|(id, slot)| slot.handle.take().map(|h| (*id, h)))
            .collect()
    }
}

/// Cloneable handle to the lock-guarded [`FleetState`].
#[derive(Debug, Clone)]
pub struct SharedFleet {
    inner: Arc<Mutex<FleetState>>,
}

impl SharedFleet {
    #[must_use]
    pub fn new(fleet: Fleet) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FleetState::new(fleet))),
        }
    }

    /// Acquire the fleet lock. A poisoned lock is recovered: every critical
    /// section leaves the state consistent before it can panic.
    pub fn lock(&self) -> MutexGuard<'_, FleetState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on one elevator under the fleet lock.
    ///
    /// # Errors
    ///
    /// Returns [`ElevatorError::UnknownElevator`] if `id` is not in the fleet.
    pub fn with_elevator<R>(
        &self,
        id: ElevatorId,
        f: impl FnOnce(&mut Elevator) -> R,
    ) -> Result<R, ElevatorError> {
        let mut state = self.lock();
        state.elevator_mut(id).map(f)
    }

    /// A copy of every elevator, in fleet order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Elevator> {
        self.lock().fleet().as_slice().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(elevators: u32) -> BuildingConfig {
        BuildingConfig {
            total_elevators: elevators,
            ..BuildingConfig::default()
        }
    }

    #[test]
    fn test_fleet_ids_start_at_one() {
        let fleet = Fleet::new(&config(3));
        let ids: Vec<_> = fleet.as_slice().iter().map(|e| e.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(fleet.as_slice().iter().all(|e| e.current_floor() == GROUND_FLOOR));
        assert!(fleet.get(ElevatorId(4)).is_none());
    }

    #[test]
    fn test_unknown_elevator() {
        let shared = SharedFleet::new(Fleet::new(&config(1)));
        let err = shared.with_elevator(ElevatorId(9), |_| ()).unwrap_err();
        assert_eq!(err, ElevatorError::UnknownElevator(ElevatorId(9)));
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let shared = SharedFleet::new(Fleet::new(&config(2)));
        let before = shared.snapshot();
        shared
            .with_elevator(ElevatorId(1), |e| e.add_destination(6))
            .unwrap();
        assert!(!before[0].has_destinations());
        assert!(shared.snapshot()[0].has_destination(6));
    }

    #[test]
    fn test_begin_activation_is_exclusive() {
        let mut state = FleetState::new(Fleet::new(&config(2)));
        let root = CancellationToken::new();

        let first = state.begin_activation(ElevatorId(1), &root);
        assert!(first.is_some());
        assert!(state.begin_activation(ElevatorId(1), &root).is_none());
        assert!(state.begin_activation(ElevatorId(2), &root).is_some());
        assert!(state.is_active(ElevatorId(1)));
    }

    #[test]
    fn test_retire_frees_the_slot() {
        let mut state = FleetState::new(Fleet::new(&config(1)));
        let root = CancellationToken::new();

        let ticket = state.begin_activation(ElevatorId(1), &root).unwrap();
        state.retire(&ticket);
        assert!(!state.is_active(ElevatorId(1)));

        let next = state.begin_activation(ElevatorId(1), &root).unwrap();
        assert_ne!(next.run_id, ticket.run_id);
    }

    #[test]
    fn test_stale_ticket_cannot_retire_successor() {
        let mut state = FleetState::new(Fleet::new(&config(1)));
        let root = CancellationToken::new();

        let old = state.begin_activation(ElevatorId(1), &root).unwrap();
        state.retire(&old);
        let _new = state.begin_activation(ElevatorId(1), &root).unwrap();
        state.retire(&old);
        assert!(state.is_active(ElevatorId(1)));
    }

    #[test]
    fn test_cancel_reaches_child_token() {
        let mut state = FleetState::new(Fleet::new(&config(1)));
        let root = CancellationToken::new();

        assert!(!state.cancel(ElevatorId(1)));
        let ticket = state.begin_activation(ElevatorId(1), &root).unwrap();
        assert!(state.cancel(ElevatorId(1)));
        assert!(ticket.cancel.is_cancelled());
        assert!(!root.is_cancelled());
    }

    #[test]
    fn test_root_cancellation_reaches_every_ticket() {
        let mut state = FleetState::new(Fleet::new(&config(2)));
        let root = CancellationToken::new();

        let a = state.begin_activation(ElevatorId(1), &root).unwrap();
        let b = state.begin_activation(ElevatorId(2), &root).unwrap();
        root.cancel();
        assert!(a.cancel.is_cancelled());
        assert!(b.cancel.is_cancelled());
    }
}
