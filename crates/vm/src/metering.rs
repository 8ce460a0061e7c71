use crate::signal::{Fault, Trap};
use std::cell::RefCell;
use std::rc::Rc;

/// Outcome returned by metering hooks to indicate whether execution should continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterResult {
    Continue,
    Halt,
}

/// Pluggable metering interface. Implementors can count or budget execution
/// without changing the engine core. All methods default to no-op/continue.
pub trait Metering: std::fmt::Debug {
    /// Called before each instruction is dispatched.
    fn on_instruction(&mut self, _pc: u16, _opcode: u8) -> MeterResult {
        MeterResult::Continue
    }

    /// Called when a trap is handed to the signaler.
    fn on_trap(&mut self, _trap: &Trap) {}

    /// Called when a fault is handed to the signaler.
    fn on_fault(&mut self, _fault: &Fault) {}

    /// Called after the scheduler loads a different process.
    fn on_process_switch(&mut self, _from: u16, _to: u16) {}

    /// Called for each idle pass of the interpreter loop.
    fn on_idle(&mut self) {}
}

/// Default metering that performs no accounting.
#[derive(Debug, Default)]
pub struct NoopMeter;

impl Metering for NoopMeter {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub instructions: u64,
    pub traps: u64,
    pub faults: u64,
    pub process_switches: u64,
    pub idle_passes: u64,
}

/// Counting meter with an optional instruction budget.
///
/// Clones share one tally, so a caller can keep a handle after boxing the
/// meter into an engine.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    tally: Rc<RefCell<Tally>>,
    budget: Option<u64>,
}

impl Counters {
    pub fn with_budget(budget: u64) -> Self {
        Self {
            tally: Rc::default(),
            budget: Some(budget),
        }
    }

    pub fn tally(&self) -> Tally {
        *self.tally.borrow()
    }
}

impl Metering for Counters {
    fn on_instruction(&mut self, _pc: u16, _opcode: u8) -> MeterResult {
        let mut tally = self.tally.borrow_mut();
        if self.budget.is_some_and(|budget| tally.instructions >= budget) {
            return MeterResult::Halt;
        }
        tally.instructions += 1;
        MeterResult::Continue
    }

    fn on_trap(&mut self, _trap: &Trap) {
        self.tally.borrow_mut().traps += 1;
    }

    fn on_fault(&mut self, _fault: &Fault) {
        self.tally.borrow_mut().faults += 1;
    }

    fn on_process_switch(&mut self, _from: u16, _to: u16) {
        self.tally.borrow_mut().process_switches += 1;
    }

    fn on_idle(&mut self) {
        self.tally.borrow_mut().idle_passes += 1;
    }
}
