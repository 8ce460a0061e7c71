//! Execution core of a byte-coded stack machine with paged word memory,
//! frame-based procedure calls and a priority process scheduler.

/// Print a trace line when the engine is verbose.
#[macro_export]
macro_rules! trace {
    ($engine:expr, $($arg:tt)+) => {
        if $engine.verbose {
            println!($($arg)+);
        }
    };
}

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod host_interface;
pub mod interpreter;
pub mod isa;
pub mod memory;
pub mod metering;
pub mod ops;
pub mod process;
pub mod registers;
pub mod signal;
pub mod snapshot;
pub mod timer;
pub mod trap;
pub mod xfer;

pub use config::{Architecture, Config, EngineConfig, GlobalFrameAddressing};
pub use dispatch::{Handler, OpcodeTable};
pub use engine::Engine;
pub use error::{EngineError, StopReason};
pub use host_interface::{HostInterface, Statistics, WakeupRegister};
pub use memory::{Access, Memory};
pub use metering::{Counters, MeterResult, Metering, NoopMeter, Tally};
pub use registers::Registers;
pub use signal::{Exec, Fault, Signal, Trap};
pub use snapshot::Snapshot;
pub use trap::{RecordingSignaler, Signaler, TrapSignaler};
pub use xfer::{ControlModel, XferKind};
