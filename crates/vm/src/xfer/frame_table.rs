use super::{ControlModel, GlobalContext, ProcedureTarget};
use crate::config::GlobalFrameAddressing;
use crate::engine::Engine;
use crate::signal::Exec;
use types::{global, ControlLink, GlobalWord, LinkType, GFT_BASE, GFT_ENTRY_SIZE};

/// Global frames are reached through the global frame table. Each entry
/// holds the long global frame address and the long code base.
///
/// New procedure descriptors name the entry directly. Old descriptors name
/// a 16-bit global frame whose global word carries the table index.
#[derive(Debug)]
pub struct FrameTableModel {
    addressing: GlobalFrameAddressing,
}

impl FrameTableModel {
    pub fn new(addressing: GlobalFrameAddressing) -> Self {
        Self { addressing }
    }

    fn entry(&self, global_link: u16) -> u32 {
        match self.addressing {
            GlobalFrameAddressing::Index => GFT_BASE + global_link as u32 * GFT_ENTRY_SIZE,
            GlobalFrameAddressing::Handle => GFT_BASE + global_link as u32,
        }
    }

    fn link_for_index(&self, gfi: u16) -> u16 {
        match self.addressing {
            GlobalFrameAddressing::Index => gfi,
            GlobalFrameAddressing::Handle => gfi.wrapping_mul(GFT_ENTRY_SIZE as u16),
        }
    }

    fn index_for_link(&self, global_link: u16) -> u16 {
        match self.addressing {
            GlobalFrameAddressing::Index => global_link,
            GlobalFrameAddressing::Handle => global_link / GFT_ENTRY_SIZE as u16,
        }
    }

    fn bound(&self, engine: &mut Engine, gfi: u16) -> Exec<ProcedureTarget> {
        if gfi == 0 {
            return Ok(ProcedureTarget::Unbound);
        }
        let context = self.frame_global(engine, self.link_for_index(gfi))?;
        if context.gf == 0 {
            return Ok(ProcedureTarget::Unbound);
        }
        Ok(ProcedureTarget::Bound(context))
    }
}

impl ControlModel for FrameTableModel {
    fn name(&self) -> &'static str {
        "frame-table"
    }

    fn frame_global(&self, engine: &mut Engine, global_link: u16) -> Exec<GlobalContext> {
        let entry = self.entry(global_link);
        let gf = engine.fetch_dbl(entry)?;
        let cb = engine.fetch_dbl(entry + 2)?;
        Ok(GlobalContext {
            gf,
            gfi: self.index_for_link(global_link),
            cb,
            link: global_link,
        })
    }

    fn procedure_global(&self, engine: &mut Engine, link: ControlLink) -> Exec<ProcedureTarget> {
        match link.link_type() {
            LinkType::NewProcedure => self.bound(engine, link.handle()),
            LinkType::OldProcedure => {
                let gf16 = link.pointer();
                if gf16 == 0 {
                    return Ok(ProcedureTarget::Unbound);
                }
                let gf = engine.lengthen_pointer(gf16);
                let word = GlobalWord(engine.fetch(gf.wrapping_sub(global::WORD))?);
                self.bound(engine, word.gfi())
            }
            _ => Ok(ProcedureTarget::Unsupported),
        }
    }

    fn current_link(&self, engine: &Engine) -> u16 {
        self.link_for_index(engine.regs.gfi)
    }
}
