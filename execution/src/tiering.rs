//! Score tiers.
//!
//! A player is `Top` at the population maximum, `Bottom` at the minimum and
//! `Middle` otherwise. `Top` is checked first, so when everyone ties the whole
//! population is `Top`. Ties are never broken.

use ridethebus_types::game::Tier;
use serde::Serialize;

/// Population extremes captured once per settlement run or review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Standings {
    pub max: u32,
    pub min: u32,
    pub top_count: usize,
    pub middle_count: usize,
    pub bottom_count: usize,
}

impl Standings {
    /// Returns `None` for an empty population.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = u32>,
        I::IntoIter: Clone,
    {
        let points = points.into_iter();
        let max = points.clone().max()?;
        let min = points.clone().min()?;
        let mut standings = Self {
            max,
            min,
            top_count: 0,
            middle_count: 0,
            bottom_count: 0,
        };
        for value in points {
            match standings.tier_of(value) {
                Tier::Top => standings.top_count += 1,
                Tier::Middle => standings.middle_count += 1,
                Tier::Bottom => standings.bottom_count += 1,
            }
        }
        Some(standings)
    }

    pub fn tier_of(&self, points: u32) -> Tier {
        if points == self.max {
            Tier::Top
        } else if points == self.min {
            Tier::Bottom
        } else {
            Tier::Middle
        }
    }

    pub fn population(&self) -> usize {
        self.top_count + self.middle_count + self.bottom_count
    }
}
