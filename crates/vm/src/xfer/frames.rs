use crate::engine::Engine;
use crate::error::EngineError;
use crate::signal::{Exec, Fault};
use types::{local, AvItem, AvTag, LocalWord, AV_SLOTS, MDS_AV};

impl Engine {
    /// Take a frame from the allocation vector list for `fsi`.
    ///
    /// A slot may redirect once to a slot of a larger size; a redirect to
    /// another redirect is an engine error. An empty list raises a frame
    /// fault carrying the requested size index.
    pub fn alloc_frame(&mut self, fsi: u8) -> Exec<u16> {
        let mut slot = fsi as u16;
        if slot >= AV_SLOTS {
            return Err(EngineError::BadFrameSize(slot).into());
        }
        let mut item = AvItem(self.fetch_mds(MDS_AV + slot)?);
        if item.tag() == AvTag::Indirect {
            let target = item.data();
            if target >= AV_SLOTS {
                return Err(EngineError::BadFrameSize(target).into());
            }
            item = AvItem(self.fetch_mds(MDS_AV + target)?);
            if item.tag() == AvTag::Indirect {
                return Err(EngineError::NestedAllocationIndirection { slot, target }.into());
            }
            slot = target;
        }
        if item.tag() != AvTag::Frame {
            return Err(Fault::Frame { fsi }.into());
        }

        let frame = item.frame();
        let next = self.fetch_mds(frame)?;
        self.store_mds(MDS_AV + slot, next)?;
        Ok(frame)
    }

    /// Return `frame` to the list named by the size index in its overhead.
    pub fn free_frame(&mut self, frame: u16) -> Exec {
        let word = LocalWord(self.fetch_mds(frame.wrapping_sub(local::WORD))?);
        let slot = word.fsi() as u16;
        if slot >= AV_SLOTS {
            return Err(EngineError::BadFrameSize(slot).into());
        }
        let head = self.fetch_mds(MDS_AV + slot)?;
        self.store_mds(frame, head)?;
        self.store_mds(MDS_AV + slot, frame)
    }
}
