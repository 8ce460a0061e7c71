//! Non-local outcomes of instruction execution.
//!
//! Every primitive that can trap or fault returns [`Exec`]. A raise site
//! returns `Err(Signal::Trap(..))` or `Err(Signal::Fault(..))`; the error
//! propagates with `?` up to the interpreter loop, which hands it to the
//! [`Signaler`](crate::trap::Signaler). Delivery turns it into
//! [`Signal::Abort`]: the instruction is abandoned and the loop carries on
//! with the next one.

use crate::error::EngineError;
use crate::xfer::XferKind;
use std::fmt;
use types::{pda, sd, ControlLink};

pub type Exec<T = ()> = Result<T, Signal>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Trap(Trap),
    Fault(Fault),
    /// The current instruction was abandoned after a delivered trap or fault.
    Abort,
    /// Execution was asked to stop.
    Stopped,
    Error(EngineError),
}

impl From<Trap> for Signal {
    fn from(trap: Trap) -> Self {
        Signal::Trap(trap)
    }
}

impl From<Fault> for Signal {
    fn from(fault: Fault) -> Self {
        Signal::Fault(fault)
    }
}

impl From<EngineError> for Signal {
    fn from(error: EngineError) -> Self {
        Signal::Error(error)
    }
}

/// Where a trap's handler link is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapSlot {
    /// Index into the system dispatch table.
    System(u16),
    /// Extended opcode, indexes the escape trap table.
    Escape(u8),
}

impl TrapSlot {
    /// MDS-relative address of the handler's control link.
    pub fn pointer(self) -> u16 {
        match self {
            TrapSlot::System(index) => types::MDS_SD + 2 * index,
            TrapSlot::Escape(opcode) => types::MDS_ETT + 2 * opcode as u16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    Bounds,
    Break,
    Code { global: u16 },
    Control { source: u16 },
    DivideCheck,
    DivideZero,
    EscOpcode(u8),
    InterruptError,
    Opcode(u8),
    Pointer,
    Process,
    RescheduleError,
    StackError,
    Unbound { link: ControlLink },
    HardwareError,
    /// Raised after a completed transfer into a module with trap-xfers set.
    Xfer { link: ControlLink, kind: XferKind },
}

impl Trap {
    pub fn slot(&self) -> TrapSlot {
        let index = match self {
            Trap::Bounds => sd::BOUNDS,
            Trap::Break => sd::BREAK,
            Trap::Code { .. } => sd::CODE,
            Trap::Control { .. } => sd::CONTROL,
            Trap::DivideCheck => sd::DIVIDE_CHECK,
            Trap::DivideZero => sd::DIVIDE_ZERO,
            Trap::EscOpcode(opcode) => return TrapSlot::Escape(*opcode),
            Trap::InterruptError => sd::INTERRUPT_ERROR,
            Trap::Opcode(_) => sd::OPCODE,
            Trap::Pointer => sd::POINTER,
            Trap::Process => sd::PROCESS,
            Trap::RescheduleError => sd::RESCHEDULE_ERROR,
            Trap::StackError => sd::STACK_ERROR,
            Trap::Unbound { .. } => sd::UNBOUND,
            Trap::HardwareError => sd::HARDWARE_ERROR,
            Trap::Xfer { .. } => sd::XFER,
        };
        TrapSlot::System(index)
    }

    /// A naked trap leaves PC and SP where the trapping code put them.
    pub fn is_naked(&self) -> bool {
        matches!(self, Trap::Xfer { .. })
    }

    /// Words stored into the handler's first locals.
    pub fn parameters(&self) -> Parameters {
        match *self {
            Trap::Code { global } => Parameters::one(global),
            Trap::Control { source } => Parameters::one(source),
            Trap::Opcode(opcode) | Trap::EscOpcode(opcode) => Parameters::one(opcode as u16),
            Trap::Unbound { link } => Parameters::two(link.low(), link.high()),
            Trap::Xfer { link, kind } => Parameters::three(link.low(), link.high(), kind as u16),
            _ => Parameters::default(),
        }
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::Code { global } => write!(f, "code trap (global 0x{global:04x})"),
            Trap::Control { source } => write!(f, "control trap (source 0x{source:04x})"),
            Trap::EscOpcode(op) => write!(f, "escape opcode trap 0x{op:02x}"),
            Trap::Opcode(op) => write!(f, "opcode trap 0x{op:02x}"),
            Trap::Unbound { link } => write!(f, "unbound trap {link}"),
            Trap::Xfer { link, kind } => write!(f, "xfer trap {link} ({kind:?})"),
            other => write!(f, "{other:?} trap"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Frame { fsi: u8 },
    Page { address: u32 },
    WriteProtect { address: u32 },
}

impl Fault {
    /// Fault vector in the PDA that receives the faulted process.
    pub fn index(&self) -> u16 {
        match self {
            Fault::Frame { .. } => pda::FAULT_FRAME,
            Fault::Page { .. } => pda::FAULT_PAGE,
            Fault::WriteProtect { .. } => pda::FAULT_WRITE_PROTECT,
        }
    }

    /// Words stored into the faulted process's state-vector data area.
    pub fn parameters(&self) -> Parameters {
        match *self {
            Fault::Frame { fsi } => Parameters::one(fsi as u16),
            Fault::Page { address } | Fault::WriteProtect { address } => {
                Parameters::two(address as u16, (address >> 16) as u16)
            }
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Frame { fsi } => write!(f, "frame fault (fsi {fsi})"),
            Fault::Page { address } => write!(f, "page fault at 0x{address:08x}"),
            Fault::WriteProtect { address } => write!(f, "write-protect fault at 0x{address:08x}"),
        }
    }
}

/// Up to three parameter words of a trap or fault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Parameters {
    words: [u16; 3],
    len: usize,
}

impl Parameters {
    fn one(a: u16) -> Self {
        Self { words: [a, 0, 0], len: 1 }
    }

    fn two(a: u16, b: u16) -> Self {
        Self { words: [a, b, 0], len: 2 }
    }

    fn three(a: u16, b: u16, c: u16) -> Self {
        Self { words: [a, b, c], len: 3 }
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.words[..self.len]
    }
}
