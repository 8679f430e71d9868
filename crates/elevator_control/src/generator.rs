//! Random request generator.
//!
//! Produces a plausible stream of hall calls and destination requests for
//! unattended simulation runs. Seeding with [`RequestGenerator::seeded`] makes
//! a run reproducible.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use elevator_core::{BuildingConfig, ElevatorRequest, GROUND_FLOOR};

/// Probability that a generated request is a destination request.
const DESTINATION_PROBABILITY: f64 = 1.0 / 3.0;

/// Generates random [`ElevatorRequest`]s for a building.
#[derive(Debug, Clone)]
pub struct RequestGenerator<R = SmallRng> {
    top_floor: u32,
    interval_ms: [u64; 2],
    rng: R,
}

impl RequestGenerator<SmallRng> {
    /// Generator seeded from operating-system entropy.
    #[must_use]
    pub fn from_entropy(config: &BuildingConfig) -> Self {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs.
    #[must_use]
    pub fn seeded(config: &BuildingConfig, seed: u64) -> Self {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RequestGenerator<R> {
    /// Generator drawing from `rng`.
    ///
    /// `config` must have passed [`BuildingConfig::validate`]: drawing from a
    /// building with fewer than two floors panics.
    #[must_use]
    pub fn with_rng(config: &BuildingConfig, rng: R) -> Self {
        Self {
            top_floor: config.total_floors,
            interval_ms: config.request_interval_ms,
            rng,
        }
    }

    /// Draw the next request.
    ///
    /// One request in three is a destination request to a different floor.
    /// The rest are hall calls, always Up from the ground floor and always
    /// Down from the top floor.
    pub fn next_request(&mut self) -> ElevatorRequest {
        let floor = self.rng.gen_range(GROUND_FLOOR..=self.top_floor);

        if self.rng.gen_bool(DESTINATION_PROBABILITY) {
            // Uniform over every floor except `floor`.
            let mut to = self.rng.gen_range(GROUND_FLOOR..self.top_floor);
            if to >= floor {
                to += 1;
            }
            if let Ok(request) = ElevatorRequest::destination(floor, to) {
                return request;
            }
        }

        if floor == self.top_floor {
            ElevatorRequest::down(floor)
        } else if floor == GROUND_FLOOR || self.rng.gen_bool(0.5) {
            ElevatorRequest::up(floor)
        } else {
            ElevatorRequest::down(floor)
        }
    }

    /// Draw the pause before the next request.
    pub fn next_pause(&mut self) -> Duration {
        let [min, max] = self.interval_ms;
        Duration::from_millis(self.rng.gen_range(min..=max.max(min)))
    }
}
