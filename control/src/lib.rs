#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Unit motion control for Fieldmarch.
//!
//! The [`UnitController`] turns "move this unit to that tile" into one
//! trigger-gated command on the unit's chain. The command's action performs
//! a single quantum of movement (a turn or a one-tile translation) per
//! scheduling opportunity and replans the route from the unit's current
//! position every time, so a unit redirected mid-flight never follows stale
//! steps. A new request pre-empts an in-flight one by interrupting the
//! chain; the interrupted command finishes on the next trigger firing and
//! the chain advances straight into the replacement.

use std::rc::Rc;

use fieldmarch_core::{Coordinate, Event, Listener};
use fieldmarch_scheduler::{Chain, Command, StepCommand};
use fieldmarch_world::Unit;

/// Drives a single unit's movement through a command chain.
///
/// The controller owns the chain and relays its completion to the unit's
/// `path_completed` event, so external listeners see exactly one terminal
/// notification per request sequence no matter how many requests pre-empted
/// each other along the way.
#[derive(Debug)]
pub struct UnitController {
    unit: Rc<Unit>,
    trigger: Rc<Event<()>>,
    chain: Chain,
}

impl UnitController {
    /// Creates a controller for the unit, resumed by the provided trigger.
    ///
    /// The trigger is fired externally once a requested step's presentation
    /// has completed; the controller only ever subscribes to it.
    #[must_use]
    pub fn new(unit: Rc<Unit>, trigger: Rc<Event<()>>) -> Self {
        let chain = Chain::new();
        let arrived = Rc::clone(&unit);
        let relay: Listener<()> = Rc::new(move |_| arrived.path_completed().notify(&()));
        chain.completed().subscribe(&relay);
        Self {
            unit,
            trigger,
            chain,
        }
    }

    /// The unit this controller drives.
    #[must_use]
    pub fn unit(&self) -> &Rc<Unit> {
        &self.unit
    }

    /// Whether a motion request is currently in flight.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.chain.is_running()
    }

    /// Requests that the unit move to the destination.
    ///
    /// An in-flight request is interrupted and the new one queued behind
    /// it; the chain picks it up as soon as the interrupted command reacts.
    /// An idle chain is reset first to drop stale consumed commands, then
    /// kicked off immediately.
    pub fn move_to(&self, destination: Coordinate) {
        tracing::debug!(
            unit = self.unit.id().get(),
            ?destination,
            "movement requested"
        );
        if self.chain.is_running() {
            self.chain.interrupt();
        } else {
            self.chain.clear();
        }

        let walker = Rc::clone(&self.unit);
        let command = StepCommand::new(Rc::clone(&self.trigger), move || {
            advance_toward(&walker, destination)
        });
        self.chain.add(command);

        if !self.chain.is_running() {
            self.chain.execute();
        }
    }

    /// Stops the unit at its current tile.
    ///
    /// The in-flight command finishes at its next scheduling opportunity
    /// and `path_completed` fires as usual. A no-op when idle.
    pub fn stop(&self) {
        if self.chain.is_running() {
            self.chain.interrupt();
        }
    }
}

/// One scheduling quantum of movement toward the destination.
///
/// Returns whether another quantum is needed. Arrival is detected on the
/// invocation after the final translation; turning to face the travel
/// direction costs its own quantum, matching the presentation layer's
/// separate turn playback.
fn advance_toward(unit: &Unit, destination: Coordinate) -> bool {
    if unit.position() == destination {
        return false;
    }

    let Some(route) = unit.route_to(destination) else {
        return false;
    };
    let Some(next) = route.first() else {
        return false;
    };

    if unit.direction() != next {
        unit.turn(next);
        return true;
    }
    unit.step(next)
}
