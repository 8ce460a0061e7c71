//! Core instruction handlers.

mod control;
mod map;
mod process;

use crate::dispatch::OpcodeTable;
use crate::isa::{EscOpcode, Opcode};

/// Register the core instruction set.
pub fn install(table: &mut OpcodeTable) {
    table.register(Opcode::Noop as u8, control::noop);
    table.register(Opcode::Lfc as u8, control::lfc);
    table.register(Opcode::Sfc as u8, control::sfc);
    table.register(Opcode::Ret as u8, control::ret);
    table.register(Opcode::Kfcb as u8, control::kfcb);
    table.register(Opcode::Brk as u8, control::brk);
    table.register(Opcode::Me as u8, process::me);
    table.register(Opcode::Mx as u8, process::mx);
    table.register(Opcode::Esc as u8, control::esc);
    table.register(Opcode::Escl as u8, control::esc);

    table.register_extended(EscOpcode::Mw as u8, process::mw);
    table.register_extended(EscOpcode::Mr as u8, process::mr);
    table.register_extended(EscOpcode::Nc as u8, process::nc);
    table.register_extended(EscOpcode::Bc as u8, process::bc);
    table.register_extended(EscOpcode::Req as u8, process::req);
    table.register_extended(EscOpcode::Sm as u8, map::sm);
    table.register_extended(EscOpcode::Smf as u8, map::smf);
    table.register_extended(EscOpcode::Gmf as u8, map::gmf);
    table.register_extended(EscOpcode::Af as u8, control::af);
    table.register_extended(EscOpcode::Ff as u8, control::ff);
    table.register_extended(EscOpcode::Po as u8, control::po);
    table.register_extended(EscOpcode::Por as u8, control::po);
    table.register_extended(EscOpcode::Spp as u8, process::spp);
    table.register_extended(EscOpcode::Di as u8, process::di);
    table.register_extended(EscOpcode::Ei as u8, process::ei);
    table.register_extended(EscOpcode::Xe as u8, control::xe);
    table.register_extended(EscOpcode::Xf as u8, control::xf);
    table.register_extended(EscOpcode::Dsk as u8, control::dsk);
    table.register_extended(EscOpcode::Lsk as u8, control::lsk);
}
