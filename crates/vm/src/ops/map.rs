use crate::engine::Engine;
use crate::signal::Exec;
use types::MapFlags;

/// Set map: virtual page (long), real page (long), flags.
pub fn sm(engine: &mut Engine) -> Exec {
    let flags = MapFlags::from_bits_truncate(engine.pop()?);
    let real_page = engine.pop_long()?;
    let page = engine.pop_long()?;
    engine.mem.set_map(page, real_page, flags)?;
    Ok(())
}

/// Swap map flags: install new flags unless the page is vacant, and push
/// the old flags and real page.
pub fn smf(engine: &mut Engine) -> Exec {
    let new_flags = MapFlags::from_bits_truncate(engine.pop()?);
    let page = engine.pop_long()?;
    let (flags, real_page) = engine.mem.read_map(page)?;
    engine.push(flags.bits())?;
    engine.push_long(real_page)?;
    if !flags.is_vacant() {
        engine.mem.set_map(page, real_page, new_flags)?;
    }
    Ok(())
}

pub fn gmf(engine: &mut Engine) -> Exec {
    let page = engine.pop_long()?;
    let (flags, real_page) = engine.mem.read_map(page)?;
    engine.push(flags.bits())?;
    engine.push_long(real_page)
}
