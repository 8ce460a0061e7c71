use super::{ControlModel, GlobalContext, ProcedureTarget};
use crate::engine::Engine;
use crate::signal::Exec;
use types::{global, ControlLink, GlobalWord, LinkType};

/// Global frames are 16-bit MDS pointers and carry their code base in the
/// two words below the global word. Only old-style procedure descriptors
/// are accepted.
#[derive(Debug, Default)]
pub struct Mds16Model;

impl ControlModel for Mds16Model {
    fn name(&self) -> &'static str {
        "mds16"
    }

    fn frame_global(&self, engine: &mut Engine, global_link: u16) -> Exec<GlobalContext> {
        let gf = engine.lengthen_pointer(global_link);
        let cb = engine.fetch_dbl(gf.wrapping_sub(global::CODEBASE))?;
        let word = GlobalWord(engine.fetch(gf.wrapping_sub(global::WORD))?);
        Ok(GlobalContext {
            gf,
            gfi: word.gfi(),
            cb,
            link: global_link,
        })
    }

    fn procedure_global(&self, engine: &mut Engine, link: ControlLink) -> Exec<ProcedureTarget> {
        if link.link_type() != LinkType::OldProcedure {
            return Ok(ProcedureTarget::Unsupported);
        }
        let gf = link.pointer();
        if gf == 0 {
            return Ok(ProcedureTarget::Unbound);
        }
        Ok(ProcedureTarget::Bound(self.frame_global(engine, gf)?))
    }

    fn current_link(&self, engine: &Engine) -> u16 {
        engine.regs.gf.wrapping_sub(engine.regs.mds) as u16
    }
}
