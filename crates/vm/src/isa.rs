/// EDUCATIONAL: Opcode numbering of the core instruction set.
///
/// Instructions are one byte, optionally followed by operand bytes (α, β)
/// fetched by the instruction itself. Two one-byte opcodes, ESC and ESCL,
/// read a second byte that selects an instruction from the extended table.
/// Anything not registered in a table traps: primary opcodes to the opcode
/// trap, extended opcodes to their own slot in the escape trap table.
///
/// The core set covers what the execution engine itself needs: procedure
/// calls and returns, process and monitor operations, frame allocation and
/// map access. Arithmetic, memory-access and block instructions register
/// themselves through [`OpcodeTable`](crate::dispatch::OpcodeTable).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// NOOP: does nothing.
    Noop = 0x00,
    /// LFC β: local function call to the procedure at code byte β (a word).
    Lfc = 0xea,
    /// SFC: stack function call; pops a long control link and calls it.
    Sfc = 0xeb,
    /// RET: return through the frame's return link, freeing the frame.
    Ret = 0xec,
    /// KFCB α: call the handler in system dispatch slot α.
    Kfcb = 0xed,
    /// BRK: breakpoint; executes the displaced opcode if one is pending.
    Brk = 0xee,
    /// ME: monitor entry; pops a long monitor pointer.
    Me = 0xf1,
    /// MX: monitor exit; pops a long monitor pointer.
    Mx = 0xf2,
    /// ESC α: extended opcode α.
    Esc = 0xf8,
    /// ESCL α: extended opcode α (long form, same table).
    Escl = 0xf9,
}

/// EDUCATIONAL: Extended opcodes reached through ESC/ESCL.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscOpcode {
    /// MW: monitor wait (monitor, condition, timeout).
    Mw = 0x02,
    /// MR: monitor reentry after a wait.
    Mr = 0x03,
    /// NC: notify condition.
    Nc = 0x04,
    /// BC: broadcast condition.
    Bc = 0x05,
    /// REQ: requeue a process between two queues.
    Req = 0x06,
    /// SM: set map entry.
    Sm = 0x07,
    /// SMF: swap map flags.
    Smf = 0x08,
    /// GMF: get map flags.
    Gmf = 0x09,
    /// AF: allocate frame.
    Af = 0x0a,
    /// FF: free frame.
    Ff = 0x0b,
    /// PO: port out.
    Po = 0x0d,
    /// POR: port out, responding.
    Por = 0x0e,
    /// SPP: set process priority.
    Spp = 0x0f,
    /// DI: disable interrupts.
    Di = 0x10,
    /// EI: enable interrupts.
    Ei = 0x11,
    /// XE α: transfer through a descriptor in local α, then enable interrupts.
    Xe = 0x12,
    /// XF α: transfer through a descriptor in local α, freeing the frame.
    Xf = 0x13,
    /// DSK α: dump the stack into the state vector at local α.
    Dsk = 0x14,
    /// LSK α: load the stack from the state vector at local α.
    Lsk = 0x15,
}
