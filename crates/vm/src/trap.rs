use crate::engine::Engine;
use crate::signal::{Exec, Fault, Signal, Trap};
use crate::trace;
use crate::xfer::XferKind;
use std::cell::RefCell;
use std::fmt::Debug;
use types::{pda, state_vector, ControlLink, PSB_NULL};

/// Delivers traps and faults.
///
/// A delivery returns [`Signal::Abort`] once control has been handed to a
/// handler. If delivery itself traps or faults, that signal is returned
/// instead and the interpreter loop delivers it in turn.
pub trait Signaler: Debug {
    fn trap(&self, engine: &mut Engine, trap: Trap) -> Signal;
    fn fault(&self, engine: &mut Engine, fault: Fault) -> Signal;
}

/// Transfers to the handlers named by the system dispatch table, the escape
/// trap table, and the PDA fault vectors.
#[derive(Debug, Default)]
pub struct TrapSignaler;

impl Signaler for TrapSignaler {
    fn trap(&self, engine: &mut Engine, trap: Trap) -> Signal {
        match engine.deliver_trap(trap) {
            Ok(()) => Signal::Abort,
            Err(signal) => signal,
        }
    }

    fn fault(&self, engine: &mut Engine, fault: Fault) -> Signal {
        match engine.deliver_fault(fault) {
            Ok(()) => Signal::Abort,
            Err(signal) => signal,
        }
    }
}

/// Records every trap and fault and otherwise does nothing.
#[derive(Debug, Default)]
pub struct RecordingSignaler {
    pub traps: RefCell<Vec<Trap>>,
    pub faults: RefCell<Vec<Fault>>,
}

impl RecordingSignaler {
    pub fn traps(&self) -> Vec<Trap> {
        self.traps.borrow().clone()
    }

    pub fn faults(&self) -> Vec<Fault> {
        self.faults.borrow().clone()
    }
}

impl Signaler for RecordingSignaler {
    fn trap(&self, _engine: &mut Engine, trap: Trap) -> Signal {
        self.traps.borrow_mut().push(trap);
        Signal::Abort
    }

    fn fault(&self, _engine: &mut Engine, fault: Fault) -> Signal {
        self.faults.borrow_mut().push(fault);
        Signal::Abort
    }
}

impl Engine {
    /// Transfer to the trap's handler and pass it the trap parameters in
    /// its first locals.
    pub fn deliver_trap(&mut self, trap: Trap) -> Exec {
        let handler = ControlLink(self.fetch_mds_dbl(trap.slot().pointer())?);
        trace!(self, "trap: {trap} -> {handler}");
        if !trap.is_naked() {
            self.regs.pc = self.regs.saved_pc;
            self.regs.sp = self.regs.saved_sp;
        }
        if self.valid_context() {
            self.store_frame_pc()?;
        }
        let source = self.regs.lf;
        self.xfer(handler, source, XferKind::Trap, false)?;

        let lf = self.regs.lf;
        for (i, &word) in trap.parameters().as_slice().iter().enumerate() {
            self.store_mds(lf.wrapping_add(i as u16), word)?;
        }
        Ok(())
    }

    /// Move the current process onto the fault's queue, wake the fault
    /// handler process and switch away. The faulting instruction restarts
    /// when the process is resumed.
    pub fn deliver_fault(&mut self, fault: Fault) -> Exec {
        let faulted = self.regs.psb;
        let index = fault.index();
        trace!(self, "fault: {fault} in psb {faulted}");
        if faulted == PSB_NULL {
            return Err(crate::EngineError::NullProcess.into());
        }
        self.requeue(Some(pda::READY), pda::fault_queue(index), faulted)?;
        self.notify_wakeup(pda::fault_condition(index))?;
        self.regs.pc = self.regs.saved_pc;
        self.regs.sp = self.regs.saved_sp;
        self.reschedule(true)?;

        let handle = self.fetch(pda::psb(faulted) + pda::PSB_CONTEXT)?;
        let data = pda::state_vector(handle) + state_vector::DATA;
        for (i, &word) in fault.parameters().as_slice().iter().enumerate() {
            self.store(data + i as u32, word)?;
        }
        Ok(())
    }
}
