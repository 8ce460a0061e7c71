use crate::engine::Engine;
use crate::signal::{Exec, Trap};
use std::fmt;

/// An instruction implementation. Operands are fetched by the handler.
pub type Handler = fn(&mut Engine) -> Exec;

/// Two 256-entry opcode tables: one-byte opcodes, and the extended opcodes
/// reached through the escape instructions.
#[derive(Clone)]
pub struct OpcodeTable {
    primary: [Option<Handler>; 256],
    extended: [Option<Handler>; 256],
}

impl fmt::Debug for OpcodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |table: &[Option<Handler>; 256]| table.iter().filter(|h| h.is_some()).count();
        f.debug_struct("OpcodeTable")
            .field("primary", &count(&self.primary))
            .field("extended", &count(&self.extended))
            .finish()
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OpcodeTable {
    pub fn new() -> Self {
        Self {
            primary: [None; 256],
            extended: [None; 256],
        }
    }

    /// Install a one-byte opcode, returning the handler it replaces.
    pub fn register(&mut self, opcode: u8, handler: Handler) -> Option<Handler> {
        self.primary[opcode as usize].replace(handler)
    }

    /// Install an extended opcode, returning the handler it replaces.
    pub fn register_extended(&mut self, opcode: u8, handler: Handler) -> Option<Handler> {
        self.extended[opcode as usize].replace(handler)
    }

    pub fn primary(&self, opcode: u8) -> Option<Handler> {
        self.primary[opcode as usize]
    }

    pub fn extended(&self, opcode: u8) -> Option<Handler> {
        self.extended[opcode as usize]
    }
}

impl Engine {
    /// Run the handler for a one-byte opcode.
    pub fn dispatch(&mut self, opcode: u8) -> Exec {
        match self.opcodes().primary(opcode) {
            Some(handler) => handler(self),
            None => Err(Trap::Opcode(opcode).into()),
        }
    }

    /// Run the handler for an extended opcode.
    pub fn dispatch_extended(&mut self, opcode: u8) -> Exec {
        match self.opcodes().extended(opcode) {
            Some(handler) => handler(self),
            None => Err(Trap::EscOpcode(opcode).into()),
        }
    }
}
