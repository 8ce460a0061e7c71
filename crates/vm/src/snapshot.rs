use crate::engine::Engine;
use crate::error::EngineError;
use crate::registers::Registers;
use serde::{Deserialize, Serialize};

/// Complete machine state: registers, page map and real memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub registers: Registers,
    /// `(real page, flags)` per virtual page.
    pub map: Vec<(u32, u16)>,
    pub real: Vec<u16>,
}

impl Engine {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            registers: self.regs.clone(),
            map: self.mem.map_entries(),
            real: self.mem.real_words().to_vec(),
        }
    }

    /// Restore a snapshot taken from an engine with the same memory geometry.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), EngineError> {
        self.mem.restore(&snapshot.map, &snapshot.real)?;
        self.regs = snapshot.registers.clone();
        Ok(())
    }
}
