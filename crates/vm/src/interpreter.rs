use crate::config::Config;
use crate::engine::Engine;
use crate::error::{EngineError, StopReason};
use crate::metering::MeterResult;
use crate::signal::{Exec, Signal};
use crate::trace;

impl Engine {
    /// Run until a stop is requested, the meter halts, or an engine error.
    pub fn run(&mut self) -> Result<StopReason, EngineError> {
        self.run_loop(None)
    }

    /// Like [`run`](Self::run), but give up after `iterations` passes of the
    /// loop. Idle passes count.
    pub fn run_for(&mut self, iterations: u64) -> Result<StopReason, EngineError> {
        self.run_loop(Some(iterations))
    }

    /// The interpreter loop.
    ///
    /// EDUCATIONAL: each pass first looks for pending interrupts and expired
    /// timeouts (either can make a waiting process ready and force a
    /// reschedule), then executes one instruction of the current process,
    /// or idles if no process is running. Traps and faults arrive here as
    /// `Err(signal)`; once delivered they become `Abort` and the loop simply
    /// carries on with whatever the handler transfer set up.
    fn run_loop(&mut self, limit: Option<u64>) -> Result<StopReason, EngineError> {
        self.wakeups.attach_current_thread();
        let mut passes = 0u64;
        loop {
            if self.wakeups.stop_requested() {
                trace!(self, "stop requested after {} instructions", self.regs.instructions);
                return Ok(StopReason::Requested);
            }
            if limit.is_some_and(|limit| passes >= limit) {
                return Ok(StopReason::IterationLimit);
            }
            passes += 1;

            if let Err(signal) = self.iterate() {
                if let Some(reason) = self.settle(signal)? {
                    return Ok(reason);
                }
            }
        }
    }

    fn iterate(&mut self) -> Exec {
        let mut requeue = self.check_for_interrupts()?;
        if self.check_for_timeouts()? {
            requeue = true;
        }
        if requeue {
            self.reschedule(true)?;
        }
        if self.regs.running {
            self.execute_next()
        } else {
            self.idle();
            Ok(())
        }
    }

    /// Fetch and execute one instruction, capturing the restart state first.
    pub fn execute_next(&mut self) -> Exec {
        self.regs.saved_pc = self.regs.pc;
        self.regs.saved_sp = self.regs.sp;
        let opcode = self.next_byte()?;
        if self.metering.on_instruction(self.regs.saved_pc, opcode) == MeterResult::Halt {
            return Err(Signal::Stopped);
        }
        self.regs.instructions += 1;
        trace!(
            self,
            "pc 0x{:04x} op 0x{:02x} sp {} lf 0x{:04x} psb {}",
            self.regs.saved_pc,
            opcode,
            self.regs.sp,
            self.regs.lf,
            self.regs.psb
        );
        self.dispatch(opcode)
    }

    /// Deliver a signal and anything its delivery raises in turn.
    ///
    /// Returns `Ok(None)` when execution can continue and `Ok(Some(..))`
    /// when it should stop cleanly.
    pub fn settle(&mut self, mut signal: Signal) -> Result<Option<StopReason>, EngineError> {
        for _ in 0..Config::MAX_TRAP_NESTING {
            signal = match signal {
                Signal::Abort => return Ok(None),
                Signal::Stopped => return Ok(Some(StopReason::Metered)),
                Signal::Error(error) => {
                    trace!(self, "engine error: {error}");
                    return Err(error);
                }
                Signal::Trap(trap) => {
                    self.metering.on_trap(&trap);
                    self.signaler().trap(self, trap)
                }
                Signal::Fault(fault) => {
                    self.metering.on_fault(&fault);
                    self.signaler().fault(self, fault)
                }
            };
        }
        Err(EngineError::TrapNesting(format!("{signal:?}")))
    }

    fn idle(&mut self) {
        self.metering.on_idle();
        let sleep = self.config().idle_sleep();
        if !sleep.is_zero() {
            self.wakeups.sleep(sleep);
        }
    }
}
