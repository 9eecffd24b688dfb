#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooperative command scheduling for Fieldmarch.
//!
//! A [`Command`] is a single unit of interruptible, trigger-gated work; a
//! [`Chain`] executes commands one at a time, advancing on each command's
//! `finished` notification. There is no preemption and no polling:
//! "suspended" means the command subscribed itself to an external trigger
//! event and returned control, and it resumes only when that trigger is
//! fired by whoever drives the presentation of the step. Cancellation is
//! cooperative: an interrupted command finishes at its next scheduling
//! opportunity, never mid-step.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use fieldmarch_core::{Event, Listener};

/// A single unit of interruptible, trigger-gated work.
///
/// Completion is always announced through the `finished` event; it fires
/// exactly once per lifecycle and is raised by the command itself, never by
/// its owner. A finished command may be executed again, starting a fresh
/// lifecycle.
pub trait Command {
    /// Starts or resumes the command.
    ///
    /// A resumed command first unsubscribes from its trigger, so a single
    /// trigger firing can never re-invoke it twice. A pending interrupt
    /// wins over the action running again.
    fn execute(&self);

    /// Requests that the command finish at its next scheduling opportunity.
    ///
    /// The request is a flag, consulted the next time [`execute`]
    /// (Command::execute) runs; a suspended command is not unwound in
    /// place.
    fn interrupt(&self);

    /// Event fired exactly once per completed lifecycle.
    fn finished(&self) -> &Event<()>;
}

/// Trigger-gated command that runs an action until it reports no more work.
///
/// The action returns `true` when a further invocation will be needed; the
/// command then suspends on its trigger and re-runs the action on the next
/// firing. One `StepCommand` can this way carry an entire multi-step route,
/// re-suspending on the same trigger for every grid step.
pub struct StepCommand {
    trigger: Rc<Event<()>>,
    action: RefCell<Box<dyn FnMut() -> bool>>,
    finished: Event<()>,
    subscribed: Cell<bool>,
    interrupted: Cell<bool>,
    resume: RefCell<Option<Listener<()>>>,
}

impl StepCommand {
    /// Creates a command gated on the provided trigger.
    #[must_use]
    pub fn new(trigger: Rc<Event<()>>, action: impl FnMut() -> bool + 'static) -> Rc<Self> {
        let command = Rc::new(Self {
            trigger,
            action: RefCell::new(Box::new(action)),
            finished: Event::new(),
            subscribed: Cell::new(false),
            interrupted: Cell::new(false),
            resume: RefCell::new(None),
        });

        let resumable = Rc::downgrade(&command);
        let resume: Listener<()> = Rc::new(move |_| {
            if let Some(command) = resumable.upgrade() {
                command.execute();
            }
        });
        *command.resume.borrow_mut() = Some(resume);

        command
    }

    /// Whether the command is currently suspended on its trigger.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.subscribed.get()
    }

    fn resume_listener(&self) -> Listener<()> {
        self.resume
            .borrow()
            .clone()
            .expect("resume listener is installed at construction")
    }

    fn finish(&self) {
        tracing::trace!("command finished");
        self.finished.notify(&());
    }
}

impl Command for StepCommand {
    fn execute(&self) {
        if self.subscribed.get() {
            let _ = self.trigger.unsubscribe(&self.resume_listener());
            self.subscribed.set(false);
        }

        if self.interrupted.get() {
            self.interrupted.set(false);
            self.finish();
            return;
        }

        let more_work = (self.action.borrow_mut())();
        if more_work {
            self.trigger.subscribe(&self.resume_listener());
            self.subscribed.set(true);
        } else {
            self.finish();
        }
    }

    fn interrupt(&self) {
        self.interrupted.set(true);
    }

    fn finished(&self) -> &Event<()> {
        &self.finished
    }
}

impl fmt::Debug for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepCommand")
            .field("suspended", &self.subscribed.get())
            .field("interrupted", &self.interrupted.get())
            .finish_non_exhaustive()
    }
}

/// Ordered sequence of commands executed one at a time.
///
/// At most one command is current at any moment. The chain subscribes an
/// internal advance listener to every added command's `finished` event and
/// unsubscribes it again the first time it fires, so each command instance
/// advances the chain at most once. When the chain runs dry it raises its
/// `completed` event, the terminal notification external listeners wait
/// on.
pub struct Chain {
    state: Rc<ChainState>,
}

struct ChainState {
    commands: RefCell<Vec<Rc<dyn Command>>>,
    current_index: Cell<usize>,
    running: Cell<bool>,
    completed: Event<()>,
    advance: RefCell<Option<Listener<()>>>,
}

impl Chain {
    /// Creates an empty, idle chain.
    #[must_use]
    pub fn new() -> Self {
        let state = Rc::new(ChainState {
            commands: RefCell::new(Vec::new()),
            current_index: Cell::new(0),
            running: Cell::new(false),
            completed: Event::new(),
            advance: RefCell::new(None),
        });

        let advancing = Rc::downgrade(&state);
        let advance: Listener<()> = Rc::new(move |_| {
            if let Some(state) = advancing.upgrade() {
                state.advance();
            }
        });
        *state.advance.borrow_mut() = Some(advance);

        Self { state }
    }

    /// Appends a command and wires it to advance the chain on completion.
    ///
    /// Adding while the chain is executing is safe and extends the tail;
    /// the command runs once everything queued ahead of it has finished.
    pub fn add(&self, command: Rc<dyn Command>) {
        command.finished().subscribe(&self.state.advance_listener());
        self.state.commands.borrow_mut().push(command);
    }

    /// Whether a command is currently executing or suspended.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.running.get()
    }

    /// The command the cursor currently rests on, if any.
    #[must_use]
    pub fn current(&self) -> Option<Rc<dyn Command>> {
        self.state.current()
    }

    /// Number of commands held by the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.commands.borrow().len()
    }

    /// Whether the chain holds no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.commands.borrow().is_empty()
    }

    /// Starts executing the chain from its first command.
    ///
    /// A no-op on an empty chain.
    ///
    /// # Panics
    ///
    /// Panics when the chain is already running; callers guard with
    /// [`is_running`](Chain::is_running).
    pub fn execute(&self) {
        assert!(!self.state.running.get(), "chain is already executing");
        let first = self.state.commands.borrow().first().cloned();
        if let Some(first) = first {
            self.state.current_index.set(0);
            self.state.running.set(true);
            first.execute();
        }
    }

    /// Interrupts the current command and discards everything queued after
    /// it.
    ///
    /// The cursor does not move here; the chain advances through the
    /// current command's own `finished` notification once it reacts to the
    /// interrupt. A no-op when no command is current.
    pub fn interrupt(&self) {
        if let Some(current) = self.state.current() {
            tracing::trace!("chain interrupted");
            self.state
                .commands
                .borrow_mut()
                .truncate(self.state.current_index.get() + 1);
            current.interrupt();
        }
    }

    /// Resets the chain to empty and idle.
    ///
    /// A running chain is first interrupted and its current command drained
    /// synchronously: the command observes the interrupt, detaches from
    /// its trigger and finishes, so no dangling subscriptions survive the
    /// reset.
    pub fn clear(&self) {
        if self.is_running() {
            self.interrupt();
            let current = self
                .state
                .current()
                .expect("running chain has a current command");
            current.execute();
        }
        self.state.current_index.set(0);
        self.state.commands.borrow_mut().clear();
    }

    /// Fired once each time the chain finishes its last command.
    #[must_use]
    pub fn completed(&self) -> &Event<()> {
        &self.state.completed
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("running", &self.state.running.get())
            .field("current_index", &self.state.current_index.get())
            .field("commands", &self.state.commands.borrow().len())
            .finish()
    }
}

impl ChainState {
    fn advance_listener(&self) -> Listener<()> {
        self.advance
            .borrow()
            .clone()
            .expect("advance listener is installed at construction")
    }

    fn current(&self) -> Option<Rc<dyn Command>> {
        self.commands
            .borrow()
            .get(self.current_index.get())
            .cloned()
    }

    fn advance(&self) {
        let current = self
            .current()
            .expect("chain advanced without a current command");
        let _ = current.finished().unsubscribe(&self.advance_listener());

        let next = {
            let commands = self.commands.borrow();
            commands.get(self.current_index.get() + 1).cloned()
        };
        match next {
            Some(next) => {
                self.current_index.set(self.current_index.get() + 1);
                next.execute();
            }
            None => {
                tracing::trace!("chain completed");
                self.running.set(false);
                self.completed.notify(&());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_listener(count: &Rc<Cell<u32>>) -> Listener<()> {
        let count = Rc::clone(count);
        Rc::new(move |_: &()| count.set(count.get() + 1))
    }

    /// Action that asks for `extra` further invocations before reporting
    /// done, recording every call.
    fn scripted_action(calls: &Rc<Cell<u32>>, extra: u32) -> impl FnMut() -> bool {
        let calls = Rc::clone(calls);
        let mut remaining = extra;
        move || {
            calls.set(calls.get() + 1);
            if remaining > 0 {
                remaining -= 1;
                true
            } else {
                false
            }
        }
    }

    #[test]
    fn command_without_further_work_finishes_synchronously() {
        let trigger = Rc::new(Event::new());
        let calls = Rc::new(Cell::new(0));
        let finishes = Rc::new(Cell::new(0));

        let command = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls, 0));
        let finish_counter = counting_listener(&finishes);
        command.finished().subscribe(&finish_counter);

        command.execute();

        assert_eq!(calls.get(), 1);
        assert_eq!(finishes.get(), 1);
        assert!(!command.is_suspended());
        assert_eq!(trigger.listener_count(), 0);
    }

    #[test]
    fn suspended_command_resumes_on_each_trigger_firing() {
        let trigger = Rc::new(Event::new());
        let calls = Rc::new(Cell::new(0));
        let finishes = Rc::new(Cell::new(0));

        let command = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls, 2));
        let finish_counter = counting_listener(&finishes);
        command.finished().subscribe(&finish_counter);

        command.execute();
        assert!(command.is_suspended());
        assert_eq!(calls.get(), 1);

        trigger.notify(&());
        assert!(command.is_suspended());
        assert_eq!(calls.get(), 2);

        trigger.notify(&());
        assert!(!command.is_suspended());
        assert_eq!(calls.get(), 3);
        assert_eq!(finishes.get(), 1);
        assert_eq!(trigger.listener_count(), 0);

        // the trigger keeps firing for other units; this command stays done
        trigger.notify(&());
        assert_eq!(calls.get(), 3);
        assert_eq!(finishes.get(), 1);
    }

    #[test]
    fn interrupt_is_deferred_until_the_next_scheduling_opportunity() {
        let trigger = Rc::new(Event::new());
        let calls = Rc::new(Cell::new(0));
        let finishes = Rc::new(Cell::new(0));

        let command = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls, 5));
        let finish_counter = counting_listener(&finishes);
        command.finished().subscribe(&finish_counter);

        command.execute();
        command.interrupt();

        // still suspended: the flag is consulted on the next execute
        assert!(command.is_suspended());
        assert_eq!(finishes.get(), 0);

        trigger.notify(&());

        assert!(!command.is_suspended());
        assert_eq!(calls.get(), 1, "the action must not run past an interrupt");
        assert_eq!(finishes.get(), 1);
    }

    #[test]
    fn finished_command_can_start_a_fresh_lifecycle() {
        let trigger = Rc::new(Event::new());
        let calls = Rc::new(Cell::new(0));
        let finishes = Rc::new(Cell::new(0));

        let command = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls, 0));
        let finish_counter = counting_listener(&finishes);
        command.finished().subscribe(&finish_counter);

        command.execute();
        command.execute();

        assert_eq!(calls.get(), 2);
        assert_eq!(finishes.get(), 2);
    }

    #[test]
    fn chain_runs_mixed_synchronous_and_suspended_commands_in_order() {
        let trigger = Rc::new(Event::new());
        let calls_a = Rc::new(Cell::new(0));
        let calls_b = Rc::new(Cell::new(0));
        let calls_c = Rc::new(Cell::new(0));
        let completions = Rc::new(Cell::new(0));

        let a = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls_a, 0));
        let b = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls_b, 1));
        let c = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls_c, 1));

        let chain = Chain::new();
        let completion_counter = counting_listener(&completions);
        chain.completed().subscribe(&completion_counter);
        chain.add(Rc::clone(&a) as Rc<dyn Command>);
        chain.add(Rc::clone(&b) as Rc<dyn Command>);
        chain.add(Rc::clone(&c) as Rc<dyn Command>);

        chain.execute();

        // A finished synchronously, B suspended
        assert!(chain.is_running());
        let current = chain.current().expect("chain has a current command");
        assert!(Rc::ptr_eq(&current, &(Rc::clone(&b) as Rc<dyn Command>)));
        assert_eq!(calls_a.get(), 1);
        assert_eq!(calls_b.get(), 1);
        assert_eq!(calls_c.get(), 0);

        trigger.notify(&());

        // B finished, C suspended
        assert!(chain.is_running());
        let current = chain.current().expect("chain has a current command");
        assert!(Rc::ptr_eq(&current, &(Rc::clone(&c) as Rc<dyn Command>)));

        trigger.notify(&());

        assert!(!chain.is_running());
        assert_eq!(completions.get(), 1);
        assert_eq!(trigger.listener_count(), 0);
    }

    #[test]
    fn execute_on_an_empty_chain_is_a_no_op() {
        let chain = Chain::new();
        chain.execute();
        assert!(!chain.is_running());
        assert!(chain.is_empty());
    }

    #[test]
    fn interrupt_discards_commands_queued_after_the_current_one() {
        let trigger = Rc::new(Event::new());
        let calls_a = Rc::new(Cell::new(0));
        let calls_b = Rc::new(Cell::new(0));
        let completions = Rc::new(Cell::new(0));

        let a = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls_a, 9));
        let b = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls_b, 0));

        let chain = Chain::new();
        let completion_counter = counting_listener(&completions);
        chain.completed().subscribe(&completion_counter);
        chain.add(Rc::clone(&a) as Rc<dyn Command>);
        chain.add(Rc::clone(&b) as Rc<dyn Command>);
        chain.execute();

        chain.interrupt();
        assert_eq!(chain.len(), 1, "queued tail is discarded");

        trigger.notify(&());

        assert!(!chain.is_running());
        assert_eq!(calls_a.get(), 1);
        assert_eq!(calls_b.get(), 0, "discarded command never runs");
        assert_eq!(completions.get(), 1);
    }

    #[test]
    fn interrupt_then_clear_drains_the_suspended_command_exactly_once() {
        let trigger = Rc::new(Event::new());
        let calls = Rc::new(Cell::new(0));
        let finishes = Rc::new(Cell::new(0));

        let command = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls, 9));
        let finish_counter = counting_listener(&finishes);
        command.finished().subscribe(&finish_counter);

        let chain = Chain::new();
        chain.add(Rc::clone(&command) as Rc<dyn Command>);
        chain.execute();
        assert!(command.is_suspended());

        chain.interrupt();
        chain.clear();

        assert!(chain.is_empty());
        assert!(!chain.is_running());
        assert_eq!(finishes.get(), 1);
        assert_eq!(trigger.listener_count(), 0, "no dangling trigger subscription");

        // the chain is immediately reusable
        let follow_up = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls, 0));
        chain.add(Rc::clone(&follow_up) as Rc<dyn Command>);
        chain.execute();
        assert!(!chain.is_running());
    }

    #[test]
    fn clear_on_an_idle_chain_drops_stale_commands_silently() {
        let trigger = Rc::new(Event::new());
        let calls = Rc::new(Cell::new(0));
        let completions = Rc::new(Cell::new(0));

        let chain = Chain::new();
        let completion_counter = counting_listener(&completions);
        chain.completed().subscribe(&completion_counter);

        let spent = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls, 0));
        chain.add(Rc::clone(&spent) as Rc<dyn Command>);
        chain.execute();
        assert!(!chain.is_running());
        assert_eq!(completions.get(), 1);
        assert_eq!(chain.len(), 1, "the consumed command lingers until reset");

        chain.clear();

        assert!(chain.is_empty());
        assert!(!chain.is_running());
        assert_eq!(completions.get(), 1, "clearing an idle chain completes nothing");
    }

    #[test]
    fn commands_added_while_running_extend_the_tail() {
        let trigger = Rc::new(Event::new());
        let calls_a = Rc::new(Cell::new(0));
        let calls_b = Rc::new(Cell::new(0));

        let a = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls_a, 1));
        let chain = Chain::new();
        chain.add(Rc::clone(&a) as Rc<dyn Command>);
        chain.execute();
        assert!(chain.is_running());

        let b = StepCommand::new(Rc::clone(&trigger), scripted_action(&calls_b, 0));
        chain.add(Rc::clone(&b) as Rc<dyn Command>);
        assert_eq!(chain.len(), 2);

        trigger.notify(&());

        assert!(!chain.is_running());
        assert_eq!(calls_a.get(), 2);
        assert_eq!(calls_b.get(), 1);
    }
}
