//! Fixed addresses and offsets of the system data structures.
//!
//! All addresses are in 16-bit words. Short (MDS-relative) pointers are
//! `u16`, long virtual addresses are `u32`.

/// Words per virtual or real page.
pub const PAGE_SIZE: u32 = 256;
/// log2 of [`PAGE_SIZE`].
pub const PAGE_SHIFT: u32 = 8;
/// Mask selecting the word offset inside a page.
pub const PAGE_OFFSET_MASK: u32 = PAGE_SIZE - 1;

/// Depth of the evaluation stack.
pub const STACK_DEPTH: usize = 14;

/// Allocation vector: one list head per frame size index.
pub const MDS_AV: u16 = 0x0100;
/// Number of allocation vector slots (frame size indices 0..31).
pub const AV_SLOTS: u16 = 32;
/// System dispatch table: one long control link per trap.
pub const MDS_SD: u16 = 0x0200;
/// Escape trap table: one long control link per extended opcode.
pub const MDS_ETT: u16 = 0x0400;

/// Process data area.
pub const PDA_BASE: u32 = 0x0001_0000;
/// Global frame table, 4-word entries: global frame (long), code base (long).
pub const GFT_BASE: u32 = 0x0002_0000;
pub const GFT_ENTRY_SIZE: u32 = 4;

/// Slot of a trap handler in the system dispatch table.
pub mod sd {
    pub const BREAK: u16 = 0;
    pub const BOOT: u16 = 1;
    pub const STACK_ERROR: u16 = 2;
    pub const RESCHEDULE_ERROR: u16 = 3;
    pub const XFER: u16 = 4;
    pub const OPCODE: u16 = 5;
    pub const CONTROL: u16 = 6;
    pub const CODE: u16 = 7;
    pub const HARDWARE_ERROR: u16 = 8;
    pub const UNBOUND: u16 = 9;
    pub const DIVIDE_ZERO: u16 = 10;
    pub const DIVIDE_CHECK: u16 = 11;
    pub const INTERRUPT_ERROR: u16 = 12;
    pub const PROCESS: u16 = 13;
    pub const BOUNDS: u16 = 14;
    pub const POINTER: u16 = 15;
}

/// Process data area header and process state blocks.
///
/// The header occupies the first 64 words: the ready queue, the PSB count,
/// one free state-vector list per priority, 16 interrupt vectors and 8 fault
/// vectors. PSBs are 8 words each and share index space with the header, so
/// the first usable PSB is [`START_PSB`](pda::START_PSB).
pub mod pda {
    use super::PDA_BASE;

    pub const READY: u32 = PDA_BASE;
    pub const COUNT: u32 = PDA_BASE + 1;
    pub const STATE: u32 = PDA_BASE + 8;
    pub const INTERRUPT: u32 = PDA_BASE + 16;
    pub const FAULT: u32 = PDA_BASE + 48;

    pub const PRIORITIES: u16 = 8;
    pub const INTERRUPT_LEVELS: u16 = 16;
    pub const FAULT_VECTORS: u16 = 8;

    pub const PSB_SIZE: u32 = 8;
    pub const START_PSB: u16 = 8;
    /// PSB indices are 10-bit fields.
    pub const MAX_PSB: u16 = 0x3ff;

    pub const PSB_LINK: u32 = 0;
    pub const PSB_FLAGS: u32 = 1;
    pub const PSB_CONTEXT: u32 = 2;
    pub const PSB_TIMEOUT: u32 = 3;
    pub const PSB_MDS: u32 = 4;

    pub const FAULT_FRAME: u16 = 0;
    pub const FAULT_PAGE: u16 = 1;
    pub const FAULT_WRITE_PROTECT: u16 = 2;

    pub const fn psb(index: u16) -> u32 {
        PDA_BASE + index as u32 * PSB_SIZE
    }

    /// Free state-vector list head for `priority`.
    pub const fn state_list(priority: u8) -> u32 {
        STATE + priority as u32
    }

    /// State vectors are addressed by PDA-relative handles.
    pub const fn state_vector(handle: u16) -> u32 {
        PDA_BASE + handle as u32
    }

    pub const fn interrupt_condition(level: u16) -> u32 {
        INTERRUPT + 2 * level as u32
    }

    pub const fn fault_queue(index: u16) -> u32 {
        FAULT + 2 * index as u32
    }

    pub const fn fault_condition(index: u16) -> u32 {
        FAULT + 2 * index as u32 + 1
    }
}

/// Offsets inside a saved state vector.
pub mod state_vector {
    pub const STACK: u32 = 0;
    pub const WORD: u32 = 14;
    pub const FRAME: u32 = 15;
    pub const DATA: u32 = 16;
    pub const SIZE: u32 = 18;
}

/// Local frame overhead, as distances below the frame pointer.
pub mod local {
    pub const WORD: u16 = 4;
    pub const RETURN_LINK: u16 = 3;
    pub const GLOBAL_LINK: u16 = 2;
    pub const PC: u16 = 1;
}

/// Global frame overhead, as distances below the global frame pointer.
pub mod global {
    pub const WORD: u32 = 1;
    /// Code base (long) of a frame in the 16-bit MDS model.
    pub const CODEBASE: u32 = 3;
}
