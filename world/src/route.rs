//! Grid pathfinder: breadth-first weight labeling over a field snapshot.
//!
//! The planner labels every reachable tile with its step distance from the
//! start (start = 1) and stops as soon as it expands a tile adjacent to the
//! destination, labeling the destination itself with the next weight. The
//! destination's own passability deliberately does not gate discovery: the
//! returned route always terminates on the destination tile, and the
//! executing step stops short if that tile turns out to be blocked. The
//! route is reconstructed by walking the weights backward from the
//! destination with a fixed neighbor scan order, which doubles as the
//! tie-break rule between equally short paths.

use std::collections::VecDeque;

use fieldmarch_core::{Coordinate, Direction};

use crate::Field;

const BLOCKED: i32 = -1;
const UNVISITED: i32 = 0;

/// Ordered sequence of single-tile steps from a start to a destination.
///
/// An empty route means the start already is the destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    steps: Vec<Direction>,
}

impl Route {
    pub(crate) fn new(steps: Vec<Direction>) -> Self {
        Self { steps }
    }

    /// First step of the route, if any.
    #[must_use]
    pub fn first(&self) -> Option<Direction> {
        self.steps.first().copied()
    }

    /// Number of steps between start and destination.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the route contains no steps at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All steps in start-to-destination order.
    #[must_use]
    pub fn steps(&self) -> &[Direction] {
        &self.steps
    }
}

/// Plans the shortest 4-directional route between two tiles.
///
/// Pure function of the field snapshot passed in: occupied tiles count as
/// blocked, and the planner is never notified of later field changes;
/// callers re-plan whenever the field may have moved under them. Returns
/// `Some` with an empty route when the start equals the destination and
/// `None` when the destination is outside the field or unreachable.
#[must_use]
pub fn plan(field: &Field, start: Coordinate, destination: Coordinate) -> Option<Route> {
    if start == destination {
        return Some(Route::new(Vec::new()));
    }
    if field.at(start).is_none() || field.at(destination).is_none() {
        return None;
    }

    let mut weights = WeightMap::snapshot(field);
    weights.set(start, 1);

    let mut frontier = VecDeque::new();
    frontier.push_back(start);
    let mut reached = false;

    while let Some(tile) = frontier.pop_front() {
        let next_weight = weights.get(tile) + 1;

        for neighbor in scan_neighbors(tile) {
            if weights.in_bounds(neighbor) && weights.get(neighbor) == UNVISITED {
                weights.set(neighbor, next_weight);
                frontier.push_back(neighbor);
            }
        }

        if tile.manhattan_distance(destination) == 1 {
            weights.set(destination, next_weight);
            reached = true;
            break;
        }
    }

    if !reached {
        return None;
    }

    Some(Route::new(backtrack(&weights, destination)))
}

/// Neighbors in the fixed scan order the whole planner is pinned to:
/// `y-1`, `y+1`, `x-1`, `x+1`.
fn scan_neighbors(tile: Coordinate) -> [Coordinate; 4] {
    [
        Coordinate::new(tile.x(), tile.y() - 1),
        Coordinate::new(tile.x(), tile.y() + 1),
        Coordinate::new(tile.x() - 1, tile.y()),
        Coordinate::new(tile.x() + 1, tile.y()),
    ]
}

fn backtrack(weights: &WeightMap, destination: Coordinate) -> Vec<Direction> {
    let mut x = destination.x();
    let mut y = destination.y();
    let mut weight = weights.get(destination);
    let mut steps = vec![Direction::North; (weight - 1) as usize];

    while weight > 1 {
        weight -= 1;
        // The first matching neighbor in scan order decides between
        // equally short paths; the recorded direction is the one that was
        // traversed from that neighbor into the current tile.
        if y > 0 && weights.at(x, y - 1) == weight {
            steps[(weight - 1) as usize] = Direction::South;
            y -= 1;
        } else if y < weights.height - 1 && weights.at(x, y + 1) == weight {
            steps[(weight - 1) as usize] = Direction::North;
            y += 1;
        } else if x > 0 && weights.at(x - 1, y) == weight {
            steps[(weight - 1) as usize] = Direction::East;
            x -= 1;
        } else if x < weights.width - 1 && weights.at(x + 1, y) == weight {
            steps[(weight - 1) as usize] = Direction::West;
            x += 1;
        } else {
            panic!("weight map lost the trail at ({x}, {y}) looking for weight {weight}");
        }
    }

    steps
}

/// Dense per-tile step distances captured from one field snapshot.
struct WeightMap {
    width: i32,
    height: i32,
    weights: Vec<i32>,
}

impl WeightMap {
    fn snapshot(field: &Field) -> Self {
        let width = field.width();
        let height = field.height();
        let mut weights = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                let position = Coordinate::new(x, y);
                let passable = field.at(position).is_some_and(crate::Tile::passable);
                weights.push(if passable { UNVISITED } else { BLOCKED });
            }
        }
        Self {
            width,
            height,
            weights,
        }
    }

    fn in_bounds(&self, position: Coordinate) -> bool {
        (0..self.width).contains(&position.x()) && (0..self.height).contains(&position.y())
    }

    fn at(&self, x: i32, y: i32) -> i32 {
        self.weights[(y as usize) * (self.width as usize) + x as usize]
    }

    fn get(&self, position: Coordinate) -> i32 {
        self.at(position.x(), position.y())
    }

    fn set(&mut self, position: Coordinate, weight: i32) {
        let index = (position.y() as usize) * (self.width as usize) + position.x() as usize;
        self.weights[index] = weight;
    }
}
