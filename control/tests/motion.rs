use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fieldmarch_control::UnitController;
use fieldmarch_core::{Coordinate, Direction, Event, Listener, UnitId};
use fieldmarch_world::{map, Field, Turn, Unit};

#[test]
fn unit_detours_around_a_wall_with_deterministic_steps() {
    let layout = "empty\tempty\tempty\tempty\n\
                  empty\trock\trock\tempty\n\
                  empty\tempty\tempty\tempty\n";
    let field = Rc::new(RefCell::new(map::parse(layout).expect("layout parses")));
    let unit = Unit::spawn(
        Rc::clone(&field),
        UnitId::new(1),
        "scout",
        Coordinate::new(0, 1),
    )
    .expect("spawn succeeds");
    let trigger = Rc::new(Event::new());
    let moves = record_moves(&unit);
    let turns = record_turns(&unit);
    let completions = count_completions(&unit);
    let controller = UnitController::new(unit, Rc::clone(&trigger));

    controller.move_to(Coordinate::new(3, 1));
    drive(&controller, &trigger);

    assert_eq!(controller.unit().position(), Coordinate::new(3, 1));
    assert_eq!(
        *moves.borrow(),
        vec![
            Direction::North,
            Direction::East,
            Direction::East,
            Direction::East,
            Direction::South,
        ]
    );
    assert_eq!(
        *turns.borrow(),
        vec![
            Turn {
                from: Direction::East,
                to: Direction::North,
            },
            Turn {
                from: Direction::North,
                to: Direction::East,
            },
            Turn {
                from: Direction::East,
                to: Direction::South,
            },
        ]
    );
    assert_eq!(completions.get(), 1);
}

#[test]
fn redirect_mid_route_switches_to_the_new_destination() {
    let field = Rc::new(RefCell::new(Field::new(5, 5)));
    let unit = Unit::spawn(
        Rc::clone(&field),
        UnitId::new(1),
        "scout",
        Coordinate::new(0, 0),
    )
    .expect("spawn succeeds");
    let trigger = Rc::new(Event::new());
    let moves = record_moves(&unit);
    let completions = count_completions(&unit);
    let controller = UnitController::new(unit, Rc::clone(&trigger));

    controller.move_to(Coordinate::new(4, 0));
    trigger.notify(&());
    trigger.notify(&());
    assert_eq!(controller.unit().position(), Coordinate::new(3, 0));

    controller.move_to(Coordinate::new(3, 2));
    drive(&controller, &trigger);

    assert_eq!(controller.unit().position(), Coordinate::new(3, 2));
    assert_eq!(
        *moves.borrow(),
        vec![
            Direction::East,
            Direction::East,
            Direction::East,
            Direction::South,
            Direction::South,
        ]
    );
    assert_eq!(completions.get(), 1, "one terminal notification overall");
}

#[test]
fn occupied_destination_halts_the_unit_on_the_nearest_reachable_tile() {
    let field = Rc::new(RefCell::new(Field::new(3, 1)));
    let _blocker = Unit::spawn(
        Rc::clone(&field),
        UnitId::new(2),
        "blocker",
        Coordinate::new(2, 0),
    )
    .expect("spawn succeeds");
    let unit = Unit::spawn(
        Rc::clone(&field),
        UnitId::new(1),
        "scout",
        Coordinate::new(0, 0),
    )
    .expect("spawn succeeds");
    let trigger = Rc::new(Event::new());
    let moves = record_moves(&unit);
    let completions = count_completions(&unit);
    let controller = UnitController::new(unit, Rc::clone(&trigger));

    controller.move_to(Coordinate::new(2, 0));
    drive(&controller, &trigger);

    assert_eq!(controller.unit().position(), Coordinate::new(1, 0));
    assert_eq!(*moves.borrow(), vec![Direction::East]);
    assert_eq!(completions.get(), 1);
}

#[test]
fn destinations_queued_on_completion_run_back_to_back() {
    let field = Rc::new(RefCell::new(Field::new(3, 3)));
    let unit = Unit::spawn(
        Rc::clone(&field),
        UnitId::new(1),
        "scout",
        Coordinate::new(0, 0),
    )
    .expect("spawn succeeds");
    let trigger = Rc::new(Event::new());
    let completions = count_completions(&unit);
    let controller = Rc::new(UnitController::new(
        Rc::clone(&unit),
        Rc::clone(&trigger),
    ));

    let itinerary = Rc::new(RefCell::new(vec![
        Coordinate::new(0, 2),
        Coordinate::new(2, 2),
    ]));
    let next_leg: Listener<()> = {
        let controller = Rc::clone(&controller);
        let itinerary = Rc::clone(&itinerary);
        Rc::new(move |_| {
            let next = itinerary.borrow_mut().pop();
            if let Some(destination) = next {
                controller.move_to(destination);
            }
        })
    };
    unit.path_completed().subscribe(&next_leg);

    controller.move_to(Coordinate::new(2, 0));
    drive(&controller, &trigger);

    assert!(itinerary.borrow().is_empty());
    assert_eq!(controller.unit().position(), Coordinate::new(0, 2));
    assert_eq!(completions.get(), 3, "each leg concludes exactly once");
}

fn drive(controller: &UnitController, trigger: &Rc<Event<()>>) {
    let mut budget = 200;
    while controller.is_moving() {
        assert!(budget > 0, "movement did not settle");
        budget -= 1;
        trigger.notify(&());
    }
}

fn record_moves(unit: &Rc<Unit>) -> Rc<RefCell<Vec<Direction>>> {
    let moves = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&moves);
    let listener: Listener<Direction> = Rc::new(move |direction| sink.borrow_mut().push(*direction));
    unit.moved().subscribe(&listener);
    moves
}

fn record_turns(unit: &Rc<Unit>) -> Rc<RefCell<Vec<Turn>>> {
    let turns = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&turns);
    let listener: Listener<Turn> = Rc::new(move |turn| sink.borrow_mut().push(*turn));
    unit.turned().subscribe(&listener);
    turns
}

fn count_completions(unit: &Rc<Unit>) -> Rc<Cell<u32>> {
    let completions = Rc::new(Cell::new(0));
    let sink = Rc::clone(&completions);
    let listener: Listener<()> = Rc::new(move |_| sink.set(sink.get() + 1));
    unit.path_completed().subscribe(&listener);
    completions
}
