#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative field state and the unit model for Fieldmarch.
//!
//! The [`Field`] is a dense grid of [`Tile`]s carrying surface passability
//! and single-cell occupancy. A [`Unit`] owns its position, facing and
//! speed exclusively; everything else observes it through the domain events
//! it publishes (`moved`, `turned`, `route_calculated`, `path_completed`).
//! Units and fields are shared across command actions and presentation
//! listeners via `Rc`, so unit state lives in `Cell` fields and the field
//! behind a `RefCell`; all mutation is single-threaded and synchronous.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fieldmarch_core::{Coordinate, Direction, Event, Speed, UnitId};
use thiserror::Error;

pub mod map;
pub mod route;

pub use route::Route;

/// Default speed assigned to a freshly spawned unit.
pub const DEFAULT_UNIT_SPEED: Speed = Speed::Medium;
/// Default facing assigned to a freshly spawned unit.
pub const DEFAULT_UNIT_DIRECTION: Direction = Direction::East;

/// Terrain kind of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Bare ground with no movement effect.
    Empty,
    /// Flat sand, passable with no movement effect.
    Sand,
    /// Loose dune sand that slows units standing on it.
    Dune,
    /// Solid rock, impassable.
    Rock,
}

impl Surface {
    /// Whether units may enter tiles with this surface at all.
    #[must_use]
    pub const fn passable(self) -> bool {
        !matches!(self, Self::Rock)
    }

    /// Speed shift applied to a unit standing on this surface.
    ///
    /// Negative values slow the unit by one gait, positive values hasten
    /// it; the shift is relative to the unit's base speed and is undone
    /// when the unit leaves the tile.
    #[must_use]
    pub const fn speed_shift(self) -> i8 {
        match self {
            Self::Dune => -1,
            Self::Empty | Self::Sand | Self::Rock => 0,
        }
    }

    /// Stable text token naming this surface in map layouts.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Sand => "sand",
            Self::Dune => "dune",
            Self::Rock => "rock",
        }
    }

    /// Resolves a map-layout token back to a surface.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "empty" => Some(Self::Empty),
            "sand" => Some(Self::Sand),
            "dune" => Some(Self::Dune),
            "rock" => Some(Self::Rock),
            _ => None,
        }
    }
}

/// A single grid cell: surface terrain plus at most one occupying unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    surface: Surface,
    occupant: Option<UnitId>,
}

impl Tile {
    const fn new(surface: Surface) -> Self {
        Self {
            surface,
            occupant: None,
        }
    }

    /// Terrain of the tile.
    #[must_use]
    pub const fn surface(&self) -> Surface {
        self.surface
    }

    /// Unit currently standing on the tile, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<UnitId> {
        self.occupant
    }

    /// Whether a unit may enter the tile right now.
    ///
    /// Passable means the surface permits entry and no unit occupies the
    /// tile.
    #[must_use]
    pub const fn passable(&self) -> bool {
        self.surface.passable() && self.occupant.is_none()
    }
}

/// Dense width×height grid of tiles in row-major order.
#[derive(Clone, Debug)]
pub struct Field {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Field {
    /// Creates a field of the given dimensions filled with empty ground.
    ///
    /// # Panics
    ///
    /// Panics when either dimension is negative.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(
            width >= 0 && height >= 0,
            "field dimensions must be non-negative, got {width}x{height}"
        );
        let capacity = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tiles: vec![Tile::new(Surface::Empty); capacity],
        }
    }

    /// Number of tile columns in the field.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Number of tile rows in the field.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Tile at the provided position, if it lies within the field.
    #[must_use]
    pub fn at(&self, position: Coordinate) -> Option<&Tile> {
        self.index(position).map(|index| &self.tiles[index])
    }

    /// Whether the position is inside the field and currently enterable.
    #[must_use]
    pub fn is_passable(&self, position: Coordinate) -> bool {
        self.at(position).is_some_and(Tile::passable)
    }

    /// Unit occupying the position, if the position is in bounds and held.
    #[must_use]
    pub fn occupant(&self, position: Coordinate) -> Option<UnitId> {
        self.at(position).and_then(Tile::occupant)
    }

    /// Replaces the surface of the tile at the provided position.
    ///
    /// # Panics
    ///
    /// Panics when the position lies outside the field; surface edits are a
    /// map-building concern and never race against movement.
    pub fn set_surface(&mut self, position: Coordinate, surface: Surface) {
        let index = self
            .index(position)
            .unwrap_or_else(|| panic!("surface edit outside the field at {position:?}"));
        self.tiles[index].surface = surface;
    }

    fn occupy(&mut self, id: UnitId, position: Coordinate) {
        let index = self
            .index(position)
            .unwrap_or_else(|| panic!("occupy outside the field at {position:?}"));
        let tile = &mut self.tiles[index];
        assert!(
            tile.occupant.is_none(),
            "tile at {position:?} is already occupied"
        );
        tile.occupant = Some(id);
    }

    fn vacate(&mut self, id: UnitId, position: Coordinate) {
        let index = self
            .index(position)
            .unwrap_or_else(|| panic!("vacate outside the field at {position:?}"));
        let tile = &mut self.tiles[index];
        assert_eq!(
            tile.occupant,
            Some(id),
            "tile at {position:?} is not held by the vacating unit"
        );
        tile.occupant = None;
    }

    fn index(&self, position: Coordinate) -> Option<usize> {
        if (0..self.width).contains(&position.x()) && (0..self.height).contains(&position.y()) {
            Some((position.y() as usize) * (self.width as usize) + position.x() as usize)
        } else {
            None
        }
    }
}

/// Change of facing reported through a unit's `turned` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Turn {
    /// Facing before the turn.
    pub from: Direction,
    /// Facing after the turn.
    pub to: Direction,
}

/// Freshly computed route reported through a unit's `route_calculated`
/// event, for optional path-preview rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedRoute {
    /// Position the route was planned from.
    pub start: Coordinate,
    /// Requested destination.
    pub destination: Coordinate,
    /// Ordered steps from start to destination.
    pub route: Route,
}

/// Reasons a unit cannot be placed onto the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// The requested position lies outside the field.
    #[error("spawn position {position:?} lies outside the field")]
    OutOfBounds {
        /// Position that was requested.
        position: Coordinate,
    },
    /// The surface at the requested position does not permit entry.
    #[error("spawn position {position:?} is impassable terrain")]
    Impassable {
        /// Position that was requested.
        position: Coordinate,
    },
    /// Another unit already holds the requested position.
    #[error("spawn position {position:?} is already occupied")]
    Occupied {
        /// Position that was requested.
        position: Coordinate,
    },
}

/// A unit standing on the field.
///
/// Position, facing and speed are owned exclusively by the unit and only
/// change in response to a successful [`turn`](Unit::turn) or
/// [`step`](Unit::step). The unit shares the field with its peers and keeps
/// the occupancy grid consistent with its own position.
#[derive(Debug)]
pub struct Unit {
    id: UnitId,
    name: String,
    field: Rc<RefCell<Field>>,
    position: Cell<Coordinate>,
    direction: Cell<Direction>,
    base_speed: Cell<Speed>,
    speed: Cell<Speed>,
    moved: Event<Direction>,
    turned: Event<Turn>,
    route_calculated: Event<PlannedRoute>,
    path_completed: Event<()>,
}

impl Unit {
    /// Places a new unit onto the field at the provided position.
    ///
    /// The unit starts facing [`DEFAULT_UNIT_DIRECTION`] at
    /// [`DEFAULT_UNIT_SPEED`]; the spawn tile's surface shift applies
    /// immediately.
    pub fn spawn(
        field: Rc<RefCell<Field>>,
        id: UnitId,
        name: impl Into<String>,
        position: Coordinate,
    ) -> Result<Rc<Self>, SpawnError> {
        {
            let mut grid = field.borrow_mut();
            let tile = grid.at(position).ok_or(SpawnError::OutOfBounds { position })?;
            if !tile.surface().passable() {
                return Err(SpawnError::Impassable { position });
            }
            if tile.occupant().is_some() {
                return Err(SpawnError::Occupied { position });
            }
            grid.occupy(id, position);
        }

        let unit = Rc::new(Self {
            id,
            name: name.into(),
            field,
            position: Cell::new(position),
            direction: Cell::new(DEFAULT_UNIT_DIRECTION),
            base_speed: Cell::new(DEFAULT_UNIT_SPEED),
            speed: Cell::new(DEFAULT_UNIT_SPEED),
            moved: Event::new(),
            turned: Event::new(),
            route_calculated: Event::new(),
            path_completed: Event::new(),
        });
        unit.apply_surface_shift();
        Ok(unit)
    }

    /// Identifier the unit occupies field tiles under.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Display name of the unit.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tile the unit currently stands on.
    #[must_use]
    pub fn position(&self) -> Coordinate {
        self.position.get()
    }

    /// Direction the unit currently faces.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction.get()
    }

    /// Effective speed, including the current tile's surface shift.
    #[must_use]
    pub fn speed(&self) -> Speed {
        self.speed.get()
    }

    /// Fired with the direction taken whenever the unit enters a new tile.
    #[must_use]
    pub fn moved(&self) -> &Event<Direction> {
        &self.moved
    }

    /// Fired whenever the unit changes facing.
    #[must_use]
    pub fn turned(&self) -> &Event<Turn> {
        &self.turned
    }

    /// Fired with every freshly planned route.
    #[must_use]
    pub fn route_calculated(&self) -> &Event<PlannedRoute> {
        &self.route_calculated
    }

    /// Fired once when a motion request concludes.
    #[must_use]
    pub fn path_completed(&self) -> &Event<()> {
        &self.path_completed
    }

    /// Turns the unit to face the provided direction.
    ///
    /// A no-op when already facing that way; otherwise the `turned` event
    /// fires with the old and new facing.
    pub fn turn(&self, direction: Direction) {
        let from = self.direction.get();
        if from != direction {
            self.direction.set(direction);
            self.turned.notify(&Turn {
                from,
                to: direction,
            });
        }
    }

    /// Attempts to move the unit one tile in the provided direction.
    ///
    /// On success the occupancy grid is updated (vacate the old tile,
    /// update the position, occupy the new tile), the surface shift of the
    /// entered tile is applied, the unit turns to face the direction of
    /// travel if needed, and the `moved` event fires. Returns `false`
    /// without any state change when the destination tile is out of bounds,
    /// impassable or occupied.
    pub fn step(&self, direction: Direction) -> bool {
        let from = self.position.get();
        let to = from + direction.offset();
        {
            let mut field = self.field.borrow_mut();
            if !field.is_passable(to) {
                tracing::trace!(unit = self.id.get(), ?to, "step blocked");
                return false;
            }
            field.vacate(self.id, from);
            self.position.set(to);
            field.occupy(self.id, to);
        }
        self.apply_surface_shift();

        self.turn(direction);
        self.moved.notify(&direction);
        true
    }

    /// Plans a fresh route from the unit's current position.
    ///
    /// Returns `Some` with an empty route when already at the destination
    /// and `None` when no path exists. Non-empty routes are announced
    /// through `route_calculated` before being returned.
    #[must_use]
    pub fn route_to(&self, destination: Coordinate) -> Option<Route> {
        let start = self.position.get();
        let route = {
            let field = self.field.borrow();
            route::plan(&field, start, destination)
        }?;
        if !route.is_empty() {
            tracing::debug!(
                unit = self.id.get(),
                ?start,
                ?destination,
                steps = route.len(),
                "route planned"
            );
            self.route_calculated.notify(&PlannedRoute {
                start,
                destination,
                route: route.clone(),
            });
        }
        Some(route)
    }

    fn apply_surface_shift(&self) {
        let shift = {
            let field = self.field.borrow();
            field
                .at(self.position.get())
                .map_or(0, |tile| tile.surface().speed_shift())
        };
        let base = self.base_speed.get();
        let effective = match shift {
            shift if shift < 0 => base.slowed(),
            shift if shift > 0 => base.hastened(),
            _ => base,
        };
        self.speed.set(effective);
    }
}
