#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Fieldmarch engine.
//!
//! This crate defines the value types that describe positions and movement
//! on the grid, together with the synchronous [`Event`] bus that connects
//! the world model, the command scheduler, and external presentation
//! layers. Everything here is deliberately free of field or scheduling
//! state: higher crates own the mutable world, this one owns the vocabulary.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

pub mod event;

pub use event::{Event, Listener};

/// Location of a single grid cell expressed as integer x/y indices.
///
/// Coordinates are signed so that direction offsets can be applied with
/// plain component-wise arithmetic; the field decides what is in bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    x: i32,
    y: i32,
}

impl Coordinate {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal index of the coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical index of the coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Computes the Manhattan distance between two coordinates.
    #[must_use]
    pub const fn manhattan_distance(self, other: Coordinate) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl Add for Coordinate {
    type Output = Coordinate;

    fn add(self, other: Coordinate) -> Coordinate {
        Coordinate::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Coordinate {
    type Output = Coordinate;

    fn sub(self, other: Coordinate) -> Coordinate {
        Coordinate::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul for Coordinate {
    type Output = Coordinate;

    fn mul(self, other: Coordinate) -> Coordinate {
        Coordinate::new(self.x * other.x, self.y * other.y)
    }
}

/// Cardinal movement directions available to units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Unit displacement applied to a position when stepping this way.
    #[must_use]
    pub const fn offset(self) -> Coordinate {
        match self {
            Self::North => Coordinate::new(0, -1),
            Self::South => Coordinate::new(0, 1),
            Self::East => Coordinate::new(1, 0),
            Self::West => Coordinate::new(-1, 0),
        }
    }
}

/// Travel speed of a unit, shifted up or down by the terrain it stands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Speed {
    /// Slowest gait.
    Slow,
    /// Default gait.
    Medium,
    /// Fastest gait.
    Fast,
}

impl Speed {
    /// Returns the next slower speed, saturating at [`Speed::Slow`].
    #[must_use]
    pub const fn slowed(self) -> Self {
        match self {
            Self::Fast => Self::Medium,
            Self::Medium | Self::Slow => Self::Slow,
        }
    }

    /// Returns the next faster speed, saturating at [`Speed::Fast`].
    #[must_use]
    pub const fn hastened(self) -> Self {
        match self {
            Self::Slow => Self::Medium,
            Self::Medium | Self::Fast => Self::Fast,
        }
    }
}

/// Unique identifier assigned to a unit when it enters the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}
