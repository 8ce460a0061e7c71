use super::control::enable_interrupts;
use crate::config::Config;
use crate::engine::Engine;
use crate::signal::{Exec, Trap};
use types::{pda, ConditionWord, MonitorWord, PSB_NULL};

/// Lock the monitor and push TRUE, or block until it is released.
pub fn me(engine: &mut Engine) -> Exec {
    let monitor = engine.pop_long()?;
    let mut word = MonitorWord(engine.fetch(monitor)?);
    if word.locked() {
        return engine.enter_failed(monitor);
    }
    word.set_locked(true);
    engine.store(monitor, word.0)?;
    engine.push(1)
}

pub fn mx(engine: &mut Engine) -> Exec {
    let monitor = engine.pop_long()?;
    if engine.exit_monitor(monitor)? {
        engine.reschedule(false)?;
    }
    Ok(())
}

/// Release the monitor and wait on the condition, unless a wakeup is
/// already latched or an abort is pending on an abortable condition.
pub fn mw(engine: &mut Engine) -> Exec {
    let ticks = engine.pop()?;
    let condition = engine.pop_long()?;
    let monitor = engine.pop_long()?;
    engine.cleanup_condition(condition)?;
    let mut requeue = engine.exit_monitor(monitor)?;

    let psb = engine.regs.psb;
    let mut flags = engine.psb_flags(psb)?;
    let mut word = ConditionWord(engine.fetch(condition)?);
    if !(flags.abort() && word.abortable()) {
        if word.wakeup() {
            word.set_wakeup(false);
            engine.store(condition, word.0)?;
        } else {
            let timeout = engine.timeout_after(ticks);
            engine.store(pda::psb(psb) + pda::PSB_TIMEOUT, timeout)?;
            flags.set_waiting(true);
            engine.set_psb_flags(psb, flags)?;
            engine.requeue(Some(pda::READY), condition, psb)?;
            requeue = true;
        }
    }
    if requeue {
        engine.reschedule(false)?;
    }
    Ok(())
}

/// Reacquire the monitor after a wait.
pub fn mr(engine: &mut Engine) -> Exec {
    let condition = engine.pop_long()?;
    let monitor = engine.pop_long()?;
    let mut word = MonitorWord(engine.fetch(monitor)?);
    if word.locked() {
        return engine.enter_failed(monitor);
    }

    engine.cleanup_condition(condition)?;
    let psb = engine.regs.psb;
    let mut flags = engine.psb_flags(psb)?;
    flags.set_cleanup(PSB_NULL);
    engine.set_psb_flags(psb, flags)?;
    if flags.abort() && ConditionWord(engine.fetch(condition)?).abortable() {
        return Err(Trap::Process.into());
    }
    word.set_locked(true);
    engine.store(monitor, word.0)?;
    engine.push(1)
}

pub fn nc(engine: &mut Engine) -> Exec {
    let condition = engine.pop_long()?;
    engine.cleanup_condition(condition)?;
    if ConditionWord(engine.fetch(condition)?).tail() != PSB_NULL {
        engine.wake_head(condition)?;
        engine.reschedule(false)?;
    }
    Ok(())
}

pub fn bc(engine: &mut Engine) -> Exec {
    let condition = engine.pop_long()?;
    engine.cleanup_condition(condition)?;
    let mut requeue = false;
    while ConditionWord(engine.fetch(condition)?).tail() != PSB_NULL {
        engine.wake_head(condition)?;
        requeue = true;
    }
    if requeue {
        engine.reschedule(false)?;
    }
    Ok(())
}

/// Move a process between queues: source queue, destination queue and
/// the PSB index, pushed in that order.
pub fn req(engine: &mut Engine) -> Exec {
    let psb = engine.pop()?;
    let dst = engine.pop_long()?;
    let src = engine.pop_long()?;
    engine.requeue(Some(src), dst, psb)?;
    engine.reschedule(false)
}

pub fn spp(engine: &mut Engine) -> Exec {
    let priority = engine.pop()?;
    let psb = engine.regs.psb;
    let mut link = engine.psb_link(psb)?;
    link.set_priority(priority as u8);
    engine.set_psb_link(psb, link)?;
    engine.requeue(Some(pda::READY), pda::READY, psb)?;
    engine.reschedule(false)
}

pub fn di(engine: &mut Engine) -> Exec {
    if engine.regs.wdc >= Config::WDC_MAX {
        return Err(Trap::InterruptError.into());
    }
    engine.regs.wdc += 1;
    Ok(())
}

pub fn ei(engine: &mut Engine) -> Exec {
    enable_interrupts(engine)
}
