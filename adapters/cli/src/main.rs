#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Fieldmarch scenarios in the terminal.
//!
//! Loads, decodes or generates a field, spawns a unit, issues one or more
//! destinations, and stands in for the presentation layer by firing the
//! unit's step trigger in a loop, rendering an ASCII frame after every
//! firing. Unit events are reported through `tracing`.

mod share;

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use fieldmarch_control::UnitController;
use fieldmarch_core::{Coordinate, Direction, Event, Listener, UnitId};
use fieldmarch_world::{map, Field, PlannedRoute, Surface, Turn, Unit};

/// Plays a Fieldmarch movement scenario in the terminal.
#[derive(Debug, Parser)]
#[command(name = "fieldmarch")]
struct Args {
    /// Path to a tab-separated map layout to load.
    #[arg(long, conflicts_with = "share")]
    map: Option<PathBuf>,

    /// Field share code to decode instead of loading or generating a map.
    #[arg(long)]
    share: Option<String>,

    /// Width of the randomly generated field.
    #[arg(long, default_value_t = 10)]
    width: i32,

    /// Height of the randomly generated field.
    #[arg(long, default_value_t = 8)]
    height: i32,

    /// Seed for the random field generator.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// Probability of a generated tile being impassable rock.
    #[arg(long, default_value_t = 0.18)]
    rock_chance: f64,

    /// Tile the unit starts on, as `x,y`.
    #[arg(long, default_value = "0,0")]
    start: String,

    /// Destination tiles, as `x,y`; each leg runs once the previous ends.
    #[arg(long = "to", value_name = "X,Y")]
    destinations: Vec<String>,

    /// Fire this many triggers into the first leg, then pre-empt it with
    /// the second destination mid-flight.
    #[arg(long)]
    redirect_after: Option<u32>,

    /// Print the field's share code and exit.
    #[arg(long)]
    export_share: bool,
}

/// Entry point for the Fieldmarch command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();

    let start = parse_coordinate(&args.start)
        .with_context(|| format!("invalid --start '{}'", args.start))?;
    let field = build_field(&args, start)?;

    if args.export_share {
        println!("{}", share::encode(&field));
        return Ok(());
    }

    let mut destinations = Vec::with_capacity(args.destinations.len());
    for raw in &args.destinations {
        destinations.push(parse_coordinate(raw).with_context(|| format!("invalid --to '{raw}'"))?);
    }
    if destinations.is_empty() {
        bail!("at least one --to destination is required");
    }

    let field = Rc::new(RefCell::new(field));
    let unit = Unit::spawn(Rc::clone(&field), UnitId::new(1), "scout", start)
        .context("could not place the unit")?;
    attach_observers(&unit);

    let trigger = Rc::new(Event::new());
    let controller = UnitController::new(Rc::clone(&unit), Rc::clone(&trigger));

    play(
        &controller,
        &trigger,
        &field,
        &destinations,
        args.redirect_after,
    )
}

fn build_field(args: &Args, start: Coordinate) -> Result<Field> {
    if let Some(code) = &args.share {
        return share::decode(code).context("could not decode the share code");
    }
    if let Some(path) = &args.map {
        let layout = fs::read_to_string(path)
            .with_context(|| format!("could not read map layout {}", path.display()))?;
        return map::parse(&layout).context("could not parse the map layout");
    }
    if args.width <= 0 || args.height <= 0 {
        bail!("generated fields need positive dimensions");
    }
    Ok(random_field(
        args.width,
        args.height,
        args.seed,
        args.rock_chance,
        start,
    ))
}

/// Scatters terrain over a fresh field, deterministically per seed.
///
/// The start tile is always left as open ground so the scenario can spawn.
fn random_field(width: i32, height: i32, seed: u64, rock_chance: f64, start: Coordinate) -> Field {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut field = Field::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let roll: f64 = rng.gen();
            let surface = if roll < rock_chance {
                Surface::Rock
            } else if roll < rock_chance + 0.15 {
                Surface::Dune
            } else if roll < rock_chance + 0.35 {
                Surface::Sand
            } else {
                Surface::Empty
            };
            field.set_surface(Coordinate::new(x, y), surface);
        }
    }
    if field.at(start).is_some() {
        field.set_surface(start, Surface::Empty);
    }
    field
}

fn attach_observers(unit: &Rc<Unit>) {
    let id = unit.id().get();

    let moved: Listener<Direction> = Rc::new(move |direction| {
        tracing::info!(unit = id, ?direction, "moved");
    });
    unit.moved().subscribe(&moved);

    let turned: Listener<Turn> = Rc::new(move |turn| {
        tracing::info!(unit = id, from = ?turn.from, to = ?turn.to, "turned");
    });
    unit.turned().subscribe(&turned);

    let planned: Listener<PlannedRoute> = Rc::new(move |planned| {
        tracing::info!(
            unit = id,
            from = ?planned.start,
            to = ?planned.destination,
            steps = planned.route.len(),
            "route calculated"
        );
    });
    unit.route_calculated().subscribe(&planned);

    let completed: Listener<()> = Rc::new(move |_| {
        tracing::info!(unit = id, "path completed");
    });
    unit.path_completed().subscribe(&completed);
}

fn play(
    controller: &UnitController,
    trigger: &Rc<Event<()>>,
    field: &Rc<RefCell<Field>>,
    destinations: &[Coordinate],
    redirect_after: Option<u32>,
) -> Result<()> {
    let budget = frame_budget(field);
    let mut fired = 0u64;
    let mut legs = destinations.iter().copied();

    let first = legs.next().expect("destination list was checked non-empty");
    controller.move_to(first);
    render_frame(field, controller.unit());

    if let Some(head_start) = redirect_after {
        for _ in 0..head_start {
            if !controller.is_moving() {
                break;
            }
            fire(trigger, &mut fired, budget)?;
            render_frame(field, controller.unit());
        }
        if let Some(next) = legs.next() {
            tracing::info!(?next, "pre-empting the current route");
            controller.move_to(next);
        }
    }

    loop {
        while controller.is_moving() {
            fire(trigger, &mut fired, budget)?;
            render_frame(field, controller.unit());
        }
        match legs.next() {
            Some(next) => {
                controller.move_to(next);
                render_frame(field, controller.unit());
            }
            None => break,
        }
    }

    println!(
        "settled at ({}, {}) after {fired} trigger firings",
        controller.unit().position().x(),
        controller.unit().position().y()
    );
    Ok(())
}

fn fire(trigger: &Rc<Event<()>>, fired: &mut u64, budget: u64) -> Result<()> {
    if *fired >= budget {
        bail!("movement did not settle within {budget} trigger firings");
    }
    *fired += 1;
    trigger.notify(&());
    Ok(())
}

fn frame_budget(field: &Rc<RefCell<Field>>) -> u64 {
    let field = field.borrow();
    (field.width() as u64) * (field.height() as u64) * 8 + 16
}

fn render_frame(field: &Rc<RefCell<Field>>, unit: &Rc<Unit>) {
    let field = field.borrow();
    let mut frame = String::new();
    for y in 0..field.height() {
        for x in 0..field.width() {
            let position = Coordinate::new(x, y);
            let glyph = if field.occupant(position) == Some(unit.id()) {
                direction_glyph(unit.direction())
            } else {
                surface_glyph(
                    field
                        .at(position)
                        .expect("render iterates within bounds")
                        .surface(),
                )
            };
            frame.push(glyph);
            frame.push(' ');
        }
        let _ = frame.pop();
        frame.push('\n');
    }
    println!("{frame}");
}

const fn direction_glyph(direction: Direction) -> char {
    match direction {
        Direction::North => '^',
        Direction::South => 'v',
        Direction::East => '>',
        Direction::West => '<',
    }
}

const fn surface_glyph(surface: Surface) -> char {
    match surface {
        Surface::Empty => '.',
        Surface::Sand => ',',
        Surface::Dune => '~',
        Surface::Rock => '#',
    }
}

fn parse_coordinate(value: &str) -> Result<Coordinate> {
    let (x, y) = value
        .split_once(',')
        .with_context(|| format!("expected `x,y`, got '{value}'"))?;
    Ok(Coordinate::new(x.trim().parse()?, y.trim().parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_parse_from_comma_pairs() {
        assert_eq!(
            parse_coordinate("3,4").expect("pair parses"),
            Coordinate::new(3, 4)
        );
        assert_eq!(
            parse_coordinate(" 7 , -2 ").expect("pair parses"),
            Coordinate::new(7, -2)
        );
        assert!(parse_coordinate("3;4").is_err());
        assert!(parse_coordinate("3,four").is_err());
    }

    #[test]
    fn generated_fields_are_deterministic_per_seed() {
        let start = Coordinate::new(0, 0);
        let first = random_field(6, 5, 99, 0.2, start);
        let second = random_field(6, 5, 99, 0.2, start);

        for y in 0..5 {
            for x in 0..6 {
                let position = Coordinate::new(x, y);
                assert_eq!(
                    first.at(position).map(|tile| tile.surface()),
                    second.at(position).map(|tile| tile.surface()),
                );
            }
        }
        assert_eq!(
            first.at(start).map(|tile| tile.surface()),
            Some(Surface::Empty),
            "the start tile is always spawnable"
        );
    }
}
