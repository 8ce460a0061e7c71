use crate::memory::Memory;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, Thread};
use std::time::Duration;

/// Snapshot of engine progress handed to the host at each checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub instructions: u64,
    pub ticks: u16,
    pub psb: u16,
    pub running: bool,
}

/// Host side of the engine: panel codes and periodic checkpoints.
///
/// Checkpoints run from the interpreter thread once per timeout tick. A host
/// that needs to raise interrupts or stop the engine from another thread does
/// so through a [`WakeupRegister`] clone.
pub trait HostInterface: Debug {
    /// A new maintenance panel code was posted.
    fn accept_mp(&mut self, _code: u16) {}

    /// Periodic checkpoint. `refresh` is true when a display refresh was
    /// requested since the previous checkpoint.
    fn on_checkpoint(&mut self, _memory: &Memory, _stats: &Statistics, _refresh: bool) {}
}

const INTERRUPT_MASK: u32 = 0xffff;
const REFRESH: u32 = 1 << 30;
const STOP: u32 = 1 << 31;

/// Pending wakeups shared between the interpreter and host threads.
///
/// The low 16 bits are interrupt levels; two high bits request a display
/// refresh and a stop. Bits are consumed with an atomic read-and-clear.
/// Posting an interrupt or a stop also wakes an idle interpreter.
#[derive(Debug, Clone, Default)]
pub struct WakeupRegister(Arc<Shared>);

#[derive(Debug, Default)]
struct Shared {
    bits: AtomicU32,
    sleeper: Mutex<Option<Thread>>,
}

impl WakeupRegister {
    pub fn post_interrupts(&self, levels: u16) {
        self.0.bits.fetch_or(levels as u32, Ordering::AcqRel);
        self.wake();
    }

    pub fn has_interrupts(&self) -> bool {
        self.0.bits.load(Ordering::Acquire) & INTERRUPT_MASK != 0
    }

    pub fn take_interrupts(&self) -> u16 {
        (self.0.bits.fetch_and(!INTERRUPT_MASK, Ordering::AcqRel) & INTERRUPT_MASK) as u16
    }

    pub fn request_refresh(&self) {
        self.0.bits.fetch_or(REFRESH, Ordering::AcqRel);
    }

    pub fn take_refresh(&self) -> bool {
        self.0.bits.fetch_and(!REFRESH, Ordering::AcqRel) & REFRESH != 0
    }

    pub fn request_stop(&self) {
        self.0.bits.fetch_or(STOP, Ordering::AcqRel);
        self.wake();
    }

    pub fn stop_requested(&self) -> bool {
        self.0.bits.load(Ordering::Acquire) & STOP != 0
    }

    pub fn clear_stop(&self) {
        self.0.bits.fetch_and(!STOP, Ordering::AcqRel);
    }

    /// Make the calling thread the one woken by posts. The interpreter
    /// registers itself when a run starts.
    pub fn attach_current_thread(&self) {
        if let Ok(mut sleeper) = self.0.sleeper.lock() {
            *sleeper = Some(thread::current());
        }
    }

    /// Park the attached interpreter for at most `timeout`. Returns early
    /// when an interrupt or stop is posted, including one posted since the
    /// thread attached.
    pub fn sleep(&self, timeout: Duration) {
        thread::park_timeout(timeout);
    }

    fn wake(&self) {
        if let Ok(sleeper) = self.0.sleeper.lock() {
            if let Some(thread) = sleeper.as_ref() {
                thread.unpark();
            }
        }
    }
}
