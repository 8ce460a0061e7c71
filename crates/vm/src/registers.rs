use crate::signal::{Exec, Trap};
use serde::{Deserialize, Serialize};
use types::STACK_DEPTH;

/// Processor registers.
///
/// `saved_pc` and `saved_sp` are captured at the start of every instruction
/// so a trap or fault can restart it from a clean state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub pc: u16,
    pub saved_pc: u16,
    pub stack: [u16; STACK_DEPTH],
    pub sp: usize,
    pub saved_sp: usize,
    /// Opcode displaced by a breakpoint, executed by the next BRK.
    pub break_byte: u8,

    /// Main data space base; short pointers are offsets from here.
    pub mds: u32,
    pub lf: u16,
    pub gf: u32,
    pub gfi: u16,
    pub cb: u32,

    /// Current process.
    pub psb: u16,
    /// False while the processor idles waiting for an interrupt.
    pub running: bool,
    /// Wakeup-disable counter; interrupts are taken only while it is zero.
    pub wdc: u16,
    /// Xfer trap status, shifted right on every transfer.
    pub xts: u16,
    /// Maintenance panel code.
    pub mp: u16,
    /// Process-timeout clock, in ticks. Zero is skipped on wraparound.
    pub ticks: u16,
    pub instructions: u64,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            pc: 0,
            saved_pc: 0,
            stack: [0; STACK_DEPTH],
            sp: 0,
            saved_sp: 0,
            break_byte: 0,
            mds: 0,
            lf: 0,
            gf: 0,
            gfi: 0,
            cb: 0,
            psb: 0,
            running: false,
            wdc: 1,
            xts: 0,
            mp: 0,
            ticks: 0,
            instructions: 0,
        }
    }
}

impl Registers {
    pub fn lengthen_pointer(&self, pointer: u16) -> u32 {
        self.mds.wrapping_add(pointer as u32)
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.wdc == 0
    }

    pub fn push(&mut self, value: u16) -> Exec {
        if self.sp == STACK_DEPTH {
            return Err(Trap::StackError.into());
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Exec<u16> {
        if self.sp == 0 {
            return Err(Trap::StackError.into());
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// Low half is pushed first.
    pub fn push_long(&mut self, value: u32) -> Exec {
        if self.sp + 2 > STACK_DEPTH {
            return Err(Trap::StackError.into());
        }
        self.push(value as u16)?;
        self.push((value >> 16) as u16)
    }

    pub fn pop_long(&mut self) -> Exec<u32> {
        if self.sp < 2 {
            return Err(Trap::StackError.into());
        }
        let high = self.pop()?;
        let low = self.pop()?;
        Ok((high as u32) << 16 | low as u32)
    }

    /// Re-exposes the word just above the top of stack.
    pub fn recover(&mut self) -> Exec {
        if self.sp == STACK_DEPTH {
            return Err(Trap::StackError.into());
        }
        self.sp += 1;
        Ok(())
    }

    pub fn discard(&mut self) -> Exec {
        if self.sp == 0 {
            return Err(Trap::StackError.into());
        }
        self.sp -= 1;
        Ok(())
    }

    /// Write words just above the top of stack without moving SP. Words that
    /// would land past the last stack slot are dropped.
    pub fn stash_above(&mut self, words: &[u16]) {
        for (slot, &word) in self.stack.iter_mut().skip(self.sp).zip(words) {
            *slot = word;
        }
    }

    /// Stack contents from the bottom up to the top of stack.
    pub fn live_stack(&self) -> &[u16] {
        &self.stack[..self.sp]
    }
}
