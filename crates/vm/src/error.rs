use thiserror::Error;
use types::ControlLink;

/// Unrecoverable engine conditions. Reaching one ends the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("virtual page 0x{0:x} is outside the page map")]
    VirtualPageOutOfRange(u32),
    #[error("real page 0x{0:x} is outside real memory")]
    RealPageOutOfRange(u32),
    #[error("real address 0x{0:x} is outside real memory")]
    RealAddressOutOfRange(usize),
    #[error("trap transfer through indirect link {0}")]
    IndirectLinkDuringTrap(ControlLink),
    #[error("indirect link chain starting at {0} does not end")]
    IndirectLinkLoop(ControlLink),
    #[error("trap transfer asked to free the current frame")]
    TrapWithFree,
    #[error("frame size index {0} is outside the allocation vector")]
    BadFrameSize(u16),
    #[error("allocation vector slot {slot} redirects to slot {target}, which redirects again")]
    NestedAllocationIndirection { slot: u16, target: u16 },
    #[error("restart state of {words} words does not fit below saved stack pointer {saved_sp}")]
    RestartStateTooLarge { words: usize, saved_sp: usize },
    #[error("no free state vector at priority {0}")]
    NoStateVector(u8),
    #[error("state vector 0x{address:08x} records stack depth {depth}")]
    CorruptStateVector { address: u32, depth: u8 },
    #[error("process queue at 0x{0:08x} does not close")]
    CorruptQueue(u32),
    #[error("requeue of the null process")]
    NullProcess,
    #[error("trap nesting limit reached while delivering {0}")]
    TrapNesting(String),
}

/// Why [`Engine::run`](crate::Engine::run) returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop bit of the wakeup register was set.
    Requested,
    /// The meter asked the engine to halt.
    Metered,
    /// The iteration limit passed to [`Engine::run_for`](crate::Engine::run_for) ran out.
    IterationLimit,
}
