use crate::engine::Engine;
use crate::signal::{Exec, Trap};
use crate::xfer::XferKind;
use types::{local, ControlLink, MDS_SD};

pub fn noop(_engine: &mut Engine) -> Exec {
    Ok(())
}

pub fn esc(engine: &mut Engine) -> Exec {
    let opcode = engine.next_byte()?;
    engine.dispatch_extended(opcode)
}

pub fn lfc(engine: &mut Engine) -> Exec {
    let pc = engine.next_word()?;
    engine.store_frame_pc()?;
    engine.local_call(pc)
}

pub fn sfc(engine: &mut Engine) -> Exec {
    let link = ControlLink(engine.pop_long()?);
    engine.store_frame_pc()?;
    let src = engine.regs.lf;
    engine.xfer(link, src, XferKind::Call, false)
}

pub fn ret(engine: &mut Engine) -> Exec {
    let dst = engine.fetch(engine.frame_word(engine.regs.lf, local::RETURN_LINK))?;
    engine.xfer(ControlLink::from_short(dst), 0, XferKind::Return, true)
}

pub fn kfcb(engine: &mut Engine) -> Exec {
    let index = engine.next_byte()?;
    let link = ControlLink(engine.fetch_mds_dbl(MDS_SD + 2 * index as u16)?);
    engine.store_frame_pc()?;
    let src = engine.regs.lf;
    engine.xfer(link, src, XferKind::Call, false)
}

/// With no displaced opcode this is a breakpoint trap; otherwise the
/// displaced opcode runs in its place.
pub fn brk(engine: &mut Engine) -> Exec {
    let opcode = engine.regs.break_byte;
    if opcode == 0 {
        return Err(Trap::Break.into());
    }
    engine.regs.break_byte = 0;
    engine.dispatch(opcode)
}

pub fn af(engine: &mut Engine) -> Exec {
    let fsi = engine.pop()?;
    let frame = engine.alloc_frame(fsi as u8)?;
    engine.push(frame)
}

pub fn ff(engine: &mut Engine) -> Exec {
    let frame = engine.pop()?;
    engine.free_frame(frame)
}

/// Port out: record the current frame in the port and transfer to the
/// port's destination link. The port's address is the source link.
pub fn po(engine: &mut Engine) -> Exec {
    let _reserved = engine.pop()?;
    let port = engine.pop()?;
    engine.store_frame_pc()?;
    let lf = engine.regs.lf;
    engine.store_mds(port, lf)?;
    let dst = ControlLink(engine.fetch_mds_dbl(port.wrapping_add(2))?);
    engine.xfer(dst, port, XferKind::Port, false)
}

/// Transfer descriptor in the current frame at local α:
/// source link, a reserved word, then the destination link.
fn descriptor(engine: &mut Engine) -> Exec<(u16, ControlLink)> {
    let alpha = engine.next_byte()?;
    let pointer = engine.regs.lf.wrapping_add(alpha as u16);
    let src = engine.fetch_mds(pointer)?;
    let dst = ControlLink(engine.fetch_mds_dbl(pointer.wrapping_add(2))?);
    Ok((src, dst))
}

pub fn xe(engine: &mut Engine) -> Exec {
    let (src, dst) = descriptor(engine)?;
    engine.store_frame_pc()?;
    engine.xfer(dst, src, XferKind::Xfer, false)?;
    enable_interrupts(engine)
}

pub fn xf(engine: &mut Engine) -> Exec {
    let (src, dst) = descriptor(engine)?;
    engine.store_frame_pc()?;
    engine.xfer(dst, src, XferKind::Xfer, true)
}

pub fn dsk(engine: &mut Engine) -> Exec {
    let alpha = engine.next_byte()?;
    let state = engine.lengthen_pointer(engine.regs.lf.wrapping_add(alpha as u16));
    engine.save_stack(state)
}

pub fn lsk(engine: &mut Engine) -> Exec {
    let alpha = engine.next_byte()?;
    let state = engine.lengthen_pointer(engine.regs.lf.wrapping_add(alpha as u16));
    engine.load_stack(state)
}

pub(super) fn enable_interrupts(engine: &mut Engine) -> Exec {
    if engine.regs.wdc == 0 {
        return Err(Trap::InterruptError.into());
    }
    engine.regs.wdc -= 1;
    Ok(())
}
