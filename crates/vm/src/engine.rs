use crate::config::{Architecture, EngineConfig};
use crate::dispatch::OpcodeTable;
use crate::error::EngineError;
use crate::host_interface::{HostInterface, Statistics, WakeupRegister};
use crate::memory::Memory;
use crate::metering::{Metering, NoopMeter};
use crate::registers::Registers;
use crate::signal::{Exec, Signal, TrapSlot};
use crate::timer::IntervalTimer;
use crate::trap::{Signaler, TrapSignaler};
use crate::xfer::{ControlModel, FrameTableModel, Mds16Model, XferKind};
use crate::{ops, trace};
use std::rc::Rc;
use types::{local, sd, ControlLink};

/// The execution engine: registers, memory and the pluggable pieces that
/// decide how control transfers resolve and where traps go.
///
/// EXECUTION MODEL: the engine is an interpreter for a byte-coded stack
/// machine. Each instruction is fetched from the current code segment (CB)
/// at the byte offset PC, dispatched through an [`OpcodeTable`], and works
/// on a 14-word evaluation stack held in [`Registers`]. Procedure state lives
/// in memory: local frames (LF) are allocated from free lists, global frames
/// (GF) hold module state, and control links tie them together.
///
/// SEAMS:
/// - [`ControlModel`] decides how a procedure descriptor names its global
///   frame and code. Chosen once from [`Architecture`].
/// - [`Signaler`] delivers traps and faults. The default transfers to the
///   handlers named in the system tables; tests can record instead.
/// - [`Metering`] observes instructions, traps and process switches.
/// - [`HostInterface`] receives panel codes and periodic checkpoints.
///
/// THREADING: the engine itself is single-threaded. The only state shared
/// with other threads is the [`WakeupRegister`].
#[derive(Debug)]
pub struct Engine {
    pub regs: Registers,
    pub mem: Memory,
    /// Print a line per instruction, trap and process switch.
    pub verbose: bool,
    config: EngineConfig,
    opcodes: OpcodeTable,
    model: Rc<dyn ControlModel>,
    signaler: Rc<dyn Signaler>,
    pub(crate) metering: Box<dyn Metering>,
    host: Option<Box<dyn HostInterface>>,
    pub(crate) wakeups: WakeupRegister,
    pub(crate) timer: IntervalTimer,
}

impl Engine {
    /// Build an engine with the core instruction set installed, the default
    /// trap signaler and no metering.
    pub fn new(config: EngineConfig) -> Self {
        let model: Rc<dyn ControlModel> = match config.architecture {
            Architecture::Mds16 => Rc::new(Mds16Model),
            Architecture::FrameTable => Rc::new(FrameTableModel::new(config.global_frame_addressing)),
        };
        let mut opcodes = OpcodeTable::new();
        ops::install(&mut opcodes);
        let mut regs = Registers::default();
        regs.mds = config.boot_mds;
        Self {
            regs,
            mem: Memory::from_config(&config),
            verbose: config.verbose,
            timer: IntervalTimer::new(config.tick_interval(), config.timer_sample_interval),
            config,
            opcodes,
            model,
            signaler: Rc::new(TrapSignaler),
            metering: Box::new(NoopMeter),
            host: None,
            wakeups: WakeupRegister::default(),
        }
    }

    pub fn with_signaler(mut self, signaler: Rc<dyn Signaler>) -> Self {
        self.signaler = signaler;
        self
    }

    pub fn with_metering(mut self, metering: Box<dyn Metering>) -> Self {
        self.metering = metering;
        self
    }

    pub fn with_host(mut self, host: Box<dyn HostInterface>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn opcodes(&self) -> &OpcodeTable {
        &self.opcodes
    }

    /// Register or replace instructions before running.
    pub fn opcodes_mut(&mut self) -> &mut OpcodeTable {
        &mut self.opcodes
    }

    pub(crate) fn model(&self) -> Rc<dyn ControlModel> {
        Rc::clone(&self.model)
    }

    pub(crate) fn signaler(&self) -> Rc<dyn Signaler> {
        Rc::clone(&self.signaler)
    }

    /// Handle for posting interrupts or a stop request from another thread.
    pub fn wakeups(&self) -> WakeupRegister {
        self.wakeups.clone()
    }

    /// Return every register to its power-on value. Memory is untouched.
    pub fn reset(&mut self) {
        self.regs = Registers::default();
        self.timer.reset();
    }

    /// Reset, then transfer to the boot handler named in the system
    /// dispatch table on behalf of the configured boot process.
    pub fn boot(&mut self) -> Result<(), EngineError> {
        self.reset();
        self.regs.mds = self.config.boot_mds;
        self.regs.psb = self.config.boot_psb;
        self.regs.running = true;
        trace!(
            self,
            "boot: {} model, psb {} mds 0x{:08x}",
            self.model.name(),
            self.regs.psb,
            self.regs.mds
        );

        let result = self
            .fetch_mds_dbl(TrapSlot::System(sd::BOOT).pointer())
            .and_then(|link| self.xfer(ControlLink(link), 0, XferKind::Call, false));
        match result {
            Ok(()) => Ok(()),
            Err(signal) => self.settle(signal).map(|_| ()),
        }
    }

    /// Post a maintenance panel code.
    pub fn set_mp(&mut self, code: u16) {
        self.regs.mp = code;
        trace!(self, "mp {code}");
        if let Some(host) = self.host.as_mut() {
            host.accept_mp(code);
        }
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            instructions: self.regs.instructions,
            ticks: self.regs.ticks,
            psb: self.regs.psb,
            running: self.regs.running,
        }
    }

    /// Hand the host its periodic checkpoint.
    pub(crate) fn checkpoint(&mut self) {
        let refresh = self.wakeups.take_refresh();
        let stats = self.statistics();
        if let Some(host) = self.host.as_mut() {
            host.on_checkpoint(&self.mem, &stats, refresh);
        }
    }

    // --- memory -----------------------------------------------------------

    pub fn lengthen_pointer(&self, pointer: u16) -> u32 {
        self.regs.lengthen_pointer(pointer)
    }

    pub fn fetch(&mut self, address: u32) -> Exec<u16> {
        self.mem.fetch(address)
    }

    pub fn store(&mut self, address: u32, value: u16) -> Exec {
        self.mem.store(address, value)
    }

    pub fn fetch_dbl(&mut self, address: u32) -> Exec<u32> {
        self.mem.fetch_dbl(address)
    }

    pub fn store_dbl(&mut self, address: u32, value: u32) -> Exec {
        self.mem.store_dbl(address, value)
    }

    pub fn fetch_mds(&mut self, pointer: u16) -> Exec<u16> {
        self.mem.fetch(self.lengthen_pointer(pointer))
    }

    pub fn store_mds(&mut self, pointer: u16, value: u16) -> Exec {
        self.mem.store(self.lengthen_pointer(pointer), value)
    }

    pub fn fetch_mds_dbl(&mut self, pointer: u16) -> Exec<u32> {
        self.mem.fetch_dbl(self.lengthen_pointer(pointer))
    }

    /// Address of a local frame overhead word `below` words under `lf`.
    pub fn frame_word(&self, lf: u16, below: u16) -> u32 {
        self.lengthen_pointer(lf.wrapping_sub(below))
    }

    /// Byte `pc` of the code segment at `cb`; even bytes are the high half.
    pub fn code_byte(&mut self, cb: u32, pc: u16) -> Exec<u8> {
        let word = self.mem.fetch_code(cb.wrapping_add((pc >> 1) as u32))?;
        Ok(if pc & 1 == 0 { (word >> 8) as u8 } else { word as u8 })
    }

    /// Fetch the byte at PC and advance PC.
    pub fn next_byte(&mut self) -> Exec<u8> {
        let byte = self.code_byte(self.regs.cb, self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        Ok(byte)
    }

    /// Two code bytes, high byte first.
    pub fn next_word(&mut self) -> Exec<u16> {
        let high = self.next_byte()?;
        let low = self.next_byte()?;
        Ok((high as u16) << 8 | low as u16)
    }

    // --- stack ------------------------------------------------------------

    pub fn push(&mut self, value: u16) -> Exec {
        self.regs.push(value)
    }

    pub fn pop(&mut self) -> Exec<u16> {
        self.regs.pop()
    }

    pub fn push_long(&mut self, value: u32) -> Exec {
        self.regs.push_long(value)
    }

    pub fn pop_long(&mut self) -> Exec<u32> {
        self.regs.pop_long()
    }

    /// Make a multi-step instruction resumable.
    ///
    /// If `result` carries a trap or fault, the `state.len()` operand words
    /// just below the saved SP are overwritten with `state` before the
    /// signal propagates. Delivery resets SP to the saved SP, so the
    /// restarted instruction pops its progress instead of its original
    /// operands. More state words than the instruction had operands is an
    /// engine error.
    pub fn with_restart_state<T>(&mut self, state: &[u16], result: Exec<T>) -> Exec<T> {
        if let Err(Signal::Trap(_) | Signal::Fault(_)) = &result {
            let saved_sp = self.regs.saved_sp;
            let Some(base) = saved_sp.checked_sub(state.len()) else {
                return Err(EngineError::RestartStateTooLarge { words: state.len(), saved_sp }.into());
            };
            for (slot, &word) in self.regs.stack[base..].iter_mut().zip(state) {
                *slot = word;
            }
        }
        result
    }

    // --- frames -----------------------------------------------------------

    /// A zero local frame means there is no context to save a PC into.
    pub fn valid_context(&self) -> bool {
        self.regs.lf != 0
    }

    /// Record PC in the current frame's overhead so it can be resumed.
    pub fn store_frame_pc(&mut self) -> Exec {
        let address = self.frame_word(self.regs.lf, local::PC);
        self.mem.store(address, self.regs.pc)
    }
}
