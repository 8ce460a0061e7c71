use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed engine limits.
pub struct Config;

impl Config {
    /// Deepest chain of trap-while-delivering-a-trap before the engine gives up.
    pub const MAX_TRAP_NESTING: usize = 8;
    /// Longest chain of indirect control links followed by one transfer.
    pub const MAX_INDIRECT_LINKS: usize = 64;
    /// Longest walk around a process queue or cleanup chain.
    pub const MAX_QUEUE_WALK: usize = 1024;
    /// Highest value of the wakeup-disable counter.
    pub const WDC_MAX: u16 = 7;
}

/// Which control-transfer model the machine implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    /// Global frames are 16-bit MDS pointers, code base stored in the frame.
    Mds16,
    /// Global frames are reached through the global frame table.
    FrameTable,
}

/// What the "global link" word of a local frame holds in the frame-table model.
///
/// Both conventions appear in practice and they differ by a factor of the
/// GFT entry size, so the choice is exposed instead of guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalFrameAddressing {
    /// The frame stores the GFT index; entry address is `GFT + 4 * index`.
    Index,
    /// The frame stores the GFT handle; entry address is `GFT + handle`.
    Handle,
}

/// Everything needed to construct an engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub virtual_pages: u32,
    pub real_pages: u32,
    /// Display pages live after normal real memory.
    pub display_pages: u32,
    pub architecture: Architecture,
    pub global_frame_addressing: GlobalFrameAddressing,
    /// Process loaded by [`Engine::boot`](crate::Engine::boot).
    pub boot_psb: u16,
    /// Data segment base used while the boot transfer runs.
    pub boot_mds: u32,
    /// Length of one process-timeout tick.
    pub tick_interval_ms: u64,
    /// Instructions between samples of the host clock.
    pub timer_sample_interval: u32,
    /// Sleep between interrupt polls while no process is ready.
    pub idle_sleep_ms: u64,
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            virtual_pages: 0x4000,
            real_pages: 0x1000,
            display_pages: 0,
            architecture: Architecture::FrameTable,
            global_frame_addressing: GlobalFrameAddressing::Index,
            boot_psb: types::pda::START_PSB,
            boot_mds: 0,
            tick_interval_ms: 40,
            timer_sample_interval: 1024,
            idle_sleep_ms: 1,
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
}
