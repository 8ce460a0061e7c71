#![allow(dead_code)]

use std::rc::Rc;
use types::{global, local, pda, AvItem, ControlLink, GlobalWord, MapFlags, PsbLink, GFT_BASE, MDS_AV, MDS_SD};
use vm::{Architecture, Engine, EngineConfig, GlobalFrameAddressing, RecordingSignaler, Signaler};

pub const CODE_BASE: u32 = 0x4000;
/// Global frame of the test module, as a short pointer.
pub const GF: u16 = 0x0700;
pub const GFI: u16 = 1;
/// Frame the tests start executing in.
pub const CALLER_LF: u16 = 0x0900;
/// Frames on the size-2 free list, in allocation order.
pub const FREE_FRAMES: [u16; 3] = [0x0800, 0x0840, 0x0880];
pub const FRAME_FSI: u8 = 2;
/// Byte offset of a procedure whose first byte is its frame size index.
pub const PROC_PC: u16 = 0x20;
/// Byte offset of the trap handler procedure.
pub const HANDLER_PC: u16 = 0x40;
/// PC the caller frame resumes at.
pub const CALLER_PC: u16 = 0x10;

/// Virtual page left vacant, and one mapped write-protected.
pub const VACANT_PAGE: u32 = 0x50;
pub const PROTECTED_PAGE: u32 = 0x51;

pub const RUNNING_PSB: u16 = 8;
/// State vector handles (PDA-relative) given to every priority.
pub const STATE_HANDLES: [u16; 2] = [0x0200, 0x0220];

pub fn config(architecture: Architecture) -> EngineConfig {
    EngineConfig {
        virtual_pages: 0x300,
        real_pages: 32,
        display_pages: 2,
        architecture,
        global_frame_addressing: GlobalFrameAddressing::Index,
        boot_psb: RUNNING_PSB,
        boot_mds: 0,
        tick_interval_ms: 0,
        timer_sample_interval: u32::MAX,
        idle_sleep_ms: 0,
        verbose: false,
    }
}

/// Engine with memory mapped, a frame heap, one module, and one running
/// process executing in `CALLER_LF`.
pub fn engine(architecture: Architecture) -> Engine {
    engine_with(config(architecture))
}

pub fn engine_with(config: EngineConfig) -> Engine {
    let mut engine = Engine::new(config);
    build(&mut engine);
    engine
}

/// Same machine, but traps and faults are only recorded.
pub fn recording(architecture: Architecture) -> (Engine, Rc<RecordingSignaler>) {
    let signaler = Rc::new(RecordingSignaler::default());
    let shared: Rc<dyn Signaler> = signaler.clone();
    let mut engine = Engine::new(config(architecture)).with_signaler(shared);
    build(&mut engine);
    (engine, signaler)
}

fn build(engine: &mut Engine) {
    let rw = MapFlags::empty();
    // MDS low pages: AV, SD, ETT, globals, frames
    engine.mem.map_range(1, 1, 15, rw).unwrap();
    // code
    engine.mem.map_range(CODE_BASE >> 8, 16, 4, rw).unwrap();
    // PDA
    engine.mem.map_range(pda::READY >> 8, 20, 4, rw).unwrap();
    // GFT
    engine.mem.map_range(GFT_BASE >> 8, 24, 1, rw).unwrap();
    engine.mem.set_map(PROTECTED_PAGE, 25, MapFlags::PROTECTED).unwrap();

    for slot in 0..types::AV_SLOTS {
        engine.store_mds(MDS_AV + slot, AvItem::EMPTY.0).unwrap();
    }
    for &lf in FREE_FRAMES.iter().rev() {
        add_free_frame(engine, FRAME_FSI, lf);
    }

    install_module(engine, GFI, GF, CODE_BASE, false);
    write_code(engine, CODE_BASE, PROC_PC, &[FRAME_FSI]);
    write_code(engine, CODE_BASE, HANDLER_PC, &[FRAME_FSI]);

    let link = module_link(engine);
    frame_overhead(engine, CALLER_LF, FRAME_FSI, link, CALLER_PC);

    engine.regs.lf = CALLER_LF;
    engine.regs.pc = CALLER_PC;
    engine.regs.gf = engine.lengthen_pointer(GF);
    engine.regs.gfi = GFI;
    engine.regs.cb = CODE_BASE;

    add_psb(engine, RUNNING_PSB, 1, CALLER_LF);
    engine.enqueue(pda::READY, RUNNING_PSB).unwrap();
    engine.store(pda::COUNT, 16).unwrap();
    for priority in 0..pda::PRIORITIES as u8 {
        for &handle in STATE_HANDLES.iter() {
            free_state(engine, priority, handle + priority as u16 * 0x40);
        }
    }
    engine.regs.psb = RUNNING_PSB;
    engine.regs.running = true;
}

/// Push a frame onto the free list for `fsi`.
pub fn add_free_frame(engine: &mut Engine, fsi: u8, lf: u16) {
    engine.store_mds(lf - local::WORD, fsi as u16).unwrap();
    let head = engine.fetch_mds(MDS_AV + fsi as u16).unwrap();
    engine.store_mds(lf, head).unwrap();
    engine.store_mds(MDS_AV + fsi as u16, lf).unwrap();
}

/// Global frame at `gf`, reachable by index `gfi` in the frame table and
/// carrying its code base for the 16-bit model.
pub fn install_module(engine: &mut Engine, gfi: u16, gf: u16, cb: u32, trap_xfers: bool) {
    let gf_long = engine.lengthen_pointer(gf);
    engine.store(gf_long - global::WORD, GlobalWord::new(gfi, trap_xfers, false).0).unwrap();
    engine.store_dbl(gf_long - global::CODEBASE, cb).unwrap();
    let entry = GFT_BASE + gfi as u32 * types::GFT_ENTRY_SIZE;
    engine.store_dbl(entry, gf_long).unwrap();
    engine.store_dbl(entry + 2, cb).unwrap();
}

/// Global link value naming the test module under the engine's model.
pub fn module_link(engine: &Engine) -> u16 {
    match engine.config().architecture {
        Architecture::Mds16 => GF,
        Architecture::FrameTable => match engine.config().global_frame_addressing {
            GlobalFrameAddressing::Index => GFI,
            GlobalFrameAddressing::Handle => GFI * types::GFT_ENTRY_SIZE as u16,
        },
    }
}

/// Procedure descriptor for byte offset `pc` in the test module.
pub fn procedure(engine: &Engine, pc: u16) -> ControlLink {
    match engine.config().architecture {
        Architecture::Mds16 => ControlLink::old_procedure(GF, pc),
        Architecture::FrameTable => ControlLink::new_procedure(GFI, pc),
    }
}

pub fn frame_overhead(engine: &mut Engine, lf: u16, fsi: u8, global_link: u16, pc: u16) {
    engine.store_mds(lf - local::WORD, fsi as u16).unwrap();
    engine.store_mds(lf - local::GLOBAL_LINK, global_link).unwrap();
    engine.store_mds(lf - local::PC, pc).unwrap();
}

pub fn write_code(engine: &mut Engine, cb: u32, pc: u16, bytes: &[u8]) {
    for (i, &byte) in bytes.iter().enumerate() {
        let pc = pc + i as u16;
        let address = cb + (pc >> 1) as u32;
        let word = engine.fetch(address).unwrap();
        let word = if pc & 1 == 0 {
            (word & 0x00ff) | (byte as u16) << 8
        } else {
            (word & 0xff00) | byte as u16
        };
        engine.store(address, word).unwrap();
    }
}

/// Point system dispatch slot `index` at `link`.
pub fn set_trap_handler(engine: &mut Engine, index: u16, link: ControlLink) {
    engine.store_dbl(engine.lengthen_pointer(MDS_SD + 2 * index), link.0).unwrap();
}

pub fn add_psb(engine: &mut Engine, psb: u16, priority: u8, context: u16) {
    let mut link = PsbLink::default();
    link.set_priority(priority);
    link.set_next(psb);
    let base = pda::psb(psb);
    engine.store(base + pda::PSB_LINK, link.0).unwrap();
    engine.store(base + pda::PSB_FLAGS, 0).unwrap();
    engine.store(base + pda::PSB_CONTEXT, context).unwrap();
    engine.store(base + pda::PSB_TIMEOUT, 0).unwrap();
    engine.store(base + pda::PSB_MDS, 0).unwrap();
}

pub fn free_state(engine: &mut Engine, priority: u8, handle: u16) {
    let head = pda::state_list(priority);
    let next = engine.fetch(head).unwrap();
    engine.store(pda::state_vector(handle), next).unwrap();
    engine.store(head, handle).unwrap();
}

/// PSB indices on a queue, head first.
pub fn queue_members(engine: &mut Engine, queue: u32) -> Vec<u16> {
    let tail = types::QueueWord(engine.fetch(queue).unwrap()).tail();
    if tail == 0 {
        return Vec::new();
    }
    let mut members = Vec::new();
    let mut psb = engine.psb_link(tail).unwrap().next();
    loop {
        members.push(psb);
        if psb == tail {
            return members;
        }
        psb = engine.psb_link(psb).unwrap().next();
    }
}
