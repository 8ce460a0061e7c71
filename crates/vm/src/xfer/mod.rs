//! Control transfer.
//!
//! Every call, return, port transfer, trap entry and process switch goes
//! through [`Engine::xfer`]. A destination link is resolved to a frame and
//! a PC, all checks that can trap are made, and only then are LF, PC and the
//! global registers replaced. A transfer that traps leaves the registers as
//! they were.

mod frame_table;
mod frames;
mod mds16;

pub use frame_table::FrameTableModel;
pub use mds16::Mds16Model;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::signal::{Exec, Trap};
use crate::trace;
use std::fmt::Debug;
use std::rc::Rc;
use types::{local, ControlLink, GlobalWord, LinkType};

/// Why a transfer happens. Passed to trap-on-transfer handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum XferKind {
    Return = 0,
    Call = 1,
    LocalCall = 2,
    Port = 3,
    Xfer = 4,
    Trap = 5,
    ProcessSwitch = 6,
}

/// Module context installed by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalContext {
    /// Long address of the global frame.
    pub gf: u32,
    pub gfi: u16,
    pub cb: u32,
    /// Value stored in a new local frame's global link word.
    pub link: u16,
}

/// Result of resolving a procedure descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureTarget {
    Bound(GlobalContext),
    Unbound,
    /// The model does not accept this kind of descriptor.
    Unsupported,
}

/// How global frames and code bases are named.
pub trait ControlModel: Debug {
    fn name(&self) -> &'static str;

    /// Module context named by the global link word of a local frame.
    fn frame_global(&self, engine: &mut Engine, global_link: u16) -> Exec<GlobalContext>;

    /// Module context named by a procedure descriptor.
    fn procedure_global(&self, engine: &mut Engine, link: ControlLink) -> Exec<ProcedureTarget>;

    /// Global link word for the module currently installed in the registers.
    fn current_link(&self, engine: &Engine) -> u16;
}

impl Engine {
    /// Transfer control to `dst`.
    ///
    /// `src` is the return link recorded in a newly allocated frame (or, for
    /// trap entries, in the handler frame). With `free` set the current
    /// local frame is released once the destination is known to be good.
    pub fn xfer(&mut self, dst: ControlLink, src: u16, kind: XferKind, free: bool) -> Exec {
        if kind == XferKind::Trap && free {
            return Err(EngineError::TrapWithFree.into());
        }

        let mut link = dst;
        let mut push = false;
        let mut hops = 0;
        while link.link_type() == LinkType::Indirect {
            if kind == XferKind::Trap {
                return Err(EngineError::IndirectLinkDuringTrap(dst).into());
            }
            hops += 1;
            if hops > Config::MAX_INDIRECT_LINKS {
                return Err(EngineError::IndirectLinkLoop(dst).into());
            }
            link = ControlLink(self.fetch_mds_dbl(link.pointer())?);
            push = true;
        }

        let model = self.model();
        let (lf, pc, global) = match link.link_type() {
            LinkType::Frame => self.resolve_frame(model.as_ref(), link, src, kind)?,
            LinkType::OldProcedure | LinkType::NewProcedure => {
                self.resolve_procedure(model.as_ref(), link, src)?
            }
            LinkType::Indirect => return Err(EngineError::IndirectLinkLoop(dst).into()),
        };

        if push {
            self.regs.stash_above(&[link.low(), link.high(), src]);
        }
        if free {
            self.free_frame(self.regs.lf)?;
        }

        trace!(self, "xfer {kind:?}: {link} -> lf 0x{lf:04x} pc 0x{pc:04x} gf 0x{:08x}", global.gf);
        self.regs.lf = lf;
        self.regs.pc = pc;
        self.install_global(&global);
        self.check_for_xfer_traps(link, kind, global.gf)
    }

    fn resolve_frame(
        &mut self,
        model: &dyn ControlModel,
        link: ControlLink,
        src: u16,
        kind: XferKind,
    ) -> Exec<(u16, u16, GlobalContext)> {
        let lf = link.pointer();
        if lf == 0 {
            return Err(Trap::Control { source: src }.into());
        }
        let global_link = self.fetch(self.frame_word(lf, local::GLOBAL_LINK))?;
        if global_link == 0 {
            return Err(Trap::Unbound { link }.into());
        }
        let pc = self.fetch(self.frame_word(lf, local::PC))?;
        if pc == 0 {
            return Err(Trap::Unbound { link }.into());
        }
        let global = model.frame_global(self, global_link)?;
        if kind == XferKind::Trap {
            self.store(self.frame_word(lf, local::RETURN_LINK), src)?;
            self.regs.wdc = self.regs.wdc.saturating_add(1);
        }
        Ok((lf, pc, global))
    }

    fn resolve_procedure(
        &mut self,
        model: &dyn ControlModel,
        link: ControlLink,
        src: u16,
    ) -> Exec<(u16, u16, GlobalContext)> {
        let global = match model.procedure_global(self, link)? {
            ProcedureTarget::Bound(global) => global,
            ProcedureTarget::Unbound => return Err(Trap::Unbound { link }.into()),
            ProcedureTarget::Unsupported => return Err(Trap::Control { source: src }.into()),
        };
        if global.cb & 1 != 0 {
            return Err(Trap::Code { global: global.link }.into());
        }
        let pc = link.pc();
        if pc == 0 {
            return Err(Trap::Unbound { link }.into());
        }
        let fsi = self.code_byte(global.cb, pc)?;
        let lf = self.alloc_frame(fsi)?;
        self.store(self.frame_word(lf, local::GLOBAL_LINK), global.link)?;
        self.store(self.frame_word(lf, local::RETURN_LINK), src)?;
        Ok((lf, pc.wrapping_add(1), global))
    }

    fn install_global(&mut self, global: &GlobalContext) {
        self.regs.gf = global.gf;
        self.regs.gfi = global.gfi;
        self.regs.cb = global.cb;
    }

    /// Shift the xfer trap status; if its low bit was set and the
    /// destination module asks for it, raise a naked xfer trap.
    fn check_for_xfer_traps(&mut self, link: ControlLink, kind: XferKind, gf: u32) -> Exec {
        let armed = self.regs.xts & 1 != 0;
        self.regs.xts >>= 1;
        if armed {
            let word = GlobalWord(self.fetch(gf.wrapping_sub(types::global::WORD))?);
            if word.trap_xfers() {
                return Err(Trap::Xfer { link, kind }.into());
            }
        }
        Ok(())
    }

    /// Call a procedure in the current module at byte offset `pc`.
    pub fn local_call(&mut self, pc: u16) -> Exec {
        let model: Rc<dyn ControlModel> = self.model();
        if pc == 0 {
            return Err(Trap::Unbound { link: ControlLink::NULL }.into());
        }
        let fsi = self.code_byte(self.regs.cb, pc)?;
        let lf = self.alloc_frame(fsi)?;
        let global_link = model.current_link(self);
        self.store(self.frame_word(lf, local::GLOBAL_LINK), global_link)?;
        self.store(self.frame_word(lf, local::RETURN_LINK), self.regs.lf)?;

        trace!(self, "local call: pc 0x{pc:04x} -> lf 0x{lf:04x}");
        self.regs.lf = lf;
        self.regs.pc = pc.wrapping_add(1);
        self.check_for_xfer_traps(ControlLink::frame(lf), XferKind::LocalCall, self.regs.gf)
    }
}
