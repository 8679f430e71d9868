//! Elevator entity and destination selection.
//!
//! An [`Elevator`] is a plain state record. It never enforces the ordering of
//! its own transitions: the movement engine is responsible for calling the
//! setters in a valid sequence. The only rules enforced here are the ones on
//! the destination set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Lowest floor served by every building.
pub const GROUND_FLOOR: u32 = 1;

/// Identifier of an elevator within its fleet, assigned 1..=N at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElevatorId(pub u32);

impl ElevatorId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ElevatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Travel direction of an elevator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    #[default]
    Idle,
}

impl Direction {
    /// The direction that leads from `from` to `to`, or `Idle` if they match.
    #[must_use]
    pub fn towards(from: u32, to: u32) -> Self {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Idle,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Idle => "Idle",
        };
        f.write_str(name)
    }
}

/// One car in the elevator bank.
///
/// Destinations are kept in a [`BTreeSet`] so iteration is ascending; the set
/// itself carries no service order, which is derived by
/// [`Elevator::next_destination`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elevator {
    id: ElevatorId,
    top_floor: u32,
    current_floor: u32,
    direction: Direction,
    is_moving: bool,
    is_door_open: bool,
    destinations: BTreeSet<u32>,
}

impl Elevator {
    /// Create an idle elevator with closed doors at `initial_floor` in a
    /// building whose highest floor is `top_floor`.
    #[must_use]
    pub fn new(id: ElevatorId, initial_floor: u32, top_floor: u32) -> Self {
        Self {
            id,
            top_floor,
            current_floor: initial_floor,
            direction: Direction::Idle,
            is_moving: false,
            is_door_open: false,
            destinations: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ElevatorId {
        self.id
    }

    #[must_use]
    pub fn current_floor(&self) -> u32 {
        self.current_floor
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    #[must_use]
    pub fn is_door_open(&self) -> bool {
        self.is_door_open
    }

    /// Highest floor this elevator will accept as a destination.
    #[must_use]
    pub fn top_floor(&self) -> u32 {
        self.top_floor
    }

    /// Pending destinations in ascending floor order.
    #[must_use]
    pub fn destinations(&self) -> &BTreeSet<u32> {
        &self.destinations
    }

    /// Returns `true` if `floor` is a pending destination.
    #[must_use]
    pub fn has_destination(&self, floor: u32) -> bool {
        self.destinations.contains(&floor)
    }

    /// Returns `true` if any destination is pending.
    #[must_use]
    pub fn has_destinations(&self) -> bool {
        !self.destinations.is_empty()
    }

    /// Queue `floor` as a destination.
    ///
    /// Floors outside `[GROUND_FLOOR, top_floor]` and the current floor are
    /// ignored. Adding an already queued floor has no effect.
    pub fn add_destination(&mut self, floor: u32) {
        if (GROUND_FLOOR..=self.top_floor).contains(&floor) && floor != self.current_floor {
            self.destinations.insert(floor);
        }
    }

    /// Drop `floor` from the destination set if present.
    pub fn remove_destination(&mut self, floor: u32) {
        self.destinations.remove(&floor);
    }

    /// Pick the next floor to travel to.
    ///
    /// - `Up`: the nearest destination strictly above the current floor.
    /// - `Down`: the nearest destination strictly below the current floor.
    /// - `Idle`: the destination closest to the current floor; on a distance
    ///   tie the lower floor wins.
    ///
    /// Up and Down never look behind the car. They return `None` when every
    /// pending destination lies in the opposite direction.
    #[must_use]
    pub fn next_destination(&self) -> Option<u32> {
        let current = self.current_floor;
        match self.direction {
            Direction::Up => self.destinations.range(current + 1..).next().copied(),
            Direction::Down => self.destinations.range(..current).next_back().copied(),
            Direction::Idle => self
                .destinations
                .iter()
                .copied()
                .min_by_key(|floor| floor.abs_diff(current)),
        }
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn set_moving(&mut self, moving: bool) {
        self.is_moving = moving;
    }

    pub fn set_door_open(&mut self, open: bool) {
        self.is_door_open = open;
    }

    /// Place the car at `floor`. Does not touch the destination set.
    pub fn move_to_floor(&mut self, floor: u32) {
        self.current_floor = floor;
    }
}

impl std::fmt::Display for Elevator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let destinations = self
            .destinations
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(
            f,
            "Elevator {}: Floor {}, Direction {}, Moving {}, Destinations [{}]",
            self.id, self.current_floor, self.direction, self.is_moving, destinations
        )
    }
}
