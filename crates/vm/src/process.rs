//! Process scheduling.
//!
//! Processes are PSBs in the PDA. Every queue (ready list, monitor queues,
//! condition queues, fault queues) is a circular list threaded through the
//! `next` field of the PSB links, kept in priority order, and named by a
//! single word holding the index of its tail. The tail is the lowest
//! priority member and `tail.next` is the head.
//!
//! A process that blocks voluntarily keeps its state in its frames. A process
//! that is preempted also needs its evaluation stack saved, which goes into a
//! state vector taken from the free list for its priority.

use crate::config::Config;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::signal::{Exec, Trap};
use crate::trace;
use types::{pda, state_vector, ConditionWord, MonitorWord, PsbFlags, PsbLink, QueueWord, StateWord, PSB_NULL, STACK_DEPTH};

impl Engine {
    pub fn psb_link(&mut self, psb: u16) -> Exec<PsbLink> {
        Ok(PsbLink(self.fetch(pda::psb(psb) + pda::PSB_LINK)?))
    }

    pub fn set_psb_link(&mut self, psb: u16, link: PsbLink) -> Exec {
        self.store(pda::psb(psb) + pda::PSB_LINK, link.0)
    }

    pub fn psb_flags(&mut self, psb: u16) -> Exec<PsbFlags> {
        Ok(PsbFlags(self.fetch(pda::psb(psb) + pda::PSB_FLAGS)?))
    }

    pub fn set_psb_flags(&mut self, psb: u16, flags: PsbFlags) -> Exec {
        self.store(pda::psb(psb) + pda::PSB_FLAGS, flags.0)
    }

    fn queue_tail(&mut self, queue: u32) -> Exec<u16> {
        Ok(QueueWord(self.fetch(queue)?).tail())
    }

    /// Rewrite only the tail field; monitor and condition flags survive.
    fn set_queue_tail(&mut self, queue: u32, tail: u16) -> Exec {
        let mut word = QueueWord(self.fetch(queue)?);
        word.set_tail(tail);
        self.store(queue, word.0)
    }

    /// Unlink `psb` from the circular list it is on.
    ///
    /// With a source queue, its tail moves back if `psb` was the tail. With
    /// no source queue (a condition that may have been walked already), the
    /// successor is remembered in the PSB's cleanup field instead.
    pub fn dequeue(&mut self, src: Option<u32>, psb: u16) -> Exec {
        let link = self.psb_link(psb)?;
        let mut prev = PSB_NULL;
        if link.next() != psb {
            prev = psb;
            let mut walked = 0;
            let mut temp = self.psb_link(prev)?;
            while temp.next() != psb {
                walked += 1;
                if walked > Config::MAX_QUEUE_WALK {
                    return Err(EngineError::CorruptQueue(pda::psb(psb)).into());
                }
                prev = temp.next();
                temp = self.psb_link(prev)?;
            }
            temp.set_next(link.next());
            self.set_psb_link(prev, temp)?;
        }
        match src {
            None => {
                let mut flags = self.psb_flags(psb)?;
                flags.set_cleanup(link.next());
                self.set_psb_flags(psb, flags)
            }
            Some(queue) => {
                if self.queue_tail(queue)? == psb {
                    self.set_queue_tail(queue, prev)?;
                }
                Ok(())
            }
        }
    }

    /// Insert `psb` behind every member of equal or higher priority.
    pub fn enqueue(&mut self, dst: u32, psb: u16) -> Exec {
        let mut link = self.psb_link(psb)?;
        let tail = self.queue_tail(dst)?;
        if tail == PSB_NULL {
            link.set_next(psb);
            self.set_psb_link(psb, link)?;
            return self.set_queue_tail(dst, psb);
        }

        let mut prev = tail;
        let mut current = self.psb_link(prev)?;
        if current.priority() >= link.priority() {
            // lowest priority so far: becomes the new tail
            self.set_queue_tail(dst, psb)?;
        } else {
            let mut walked = 0;
            loop {
                let next = current.next();
                let candidate = self.psb_link(next)?;
                if link.priority() > candidate.priority() {
                    break;
                }
                walked += 1;
                if walked > Config::MAX_QUEUE_WALK {
                    return Err(EngineError::CorruptQueue(dst).into());
                }
                prev = next;
                current = candidate;
            }
        }
        link.set_next(current.next());
        self.set_psb_link(psb, link)?;
        current.set_next(psb);
        self.set_psb_link(prev, current)
    }

    pub fn requeue(&mut self, src: Option<u32>, dst: u32, psb: u16) -> Exec {
        if psb == PSB_NULL {
            return Err(EngineError::NullProcess.into());
        }
        self.dequeue(src, psb)?;
        self.enqueue(dst, psb)
    }

    /// Save the current process if there is one and load the first ready
    /// process that can run. With nothing runnable the processor goes idle,
    /// which is only legal while interrupts are enabled.
    pub fn reschedule(&mut self, preemption: bool) -> Exec {
        if self.regs.running {
            self.save_process(preemption)?;
        }
        let tail = self.queue_tail(pda::READY)?;
        if tail != PSB_NULL {
            let mut link = self.psb_link(tail)?;
            let mut walked = 0;
            loop {
                let psb = link.next();
                link = self.psb_link(psb)?;
                if link.permanent() || link.preempted() || !self.state_list_empty(link.priority())? {
                    return self.dispatch_process(psb);
                }
                if psb == tail {
                    break;
                }
                walked += 1;
                if walked > Config::MAX_QUEUE_WALK {
                    return Err(EngineError::CorruptQueue(pda::READY).into());
                }
            }
        }
        if !self.regs.interrupts_enabled() {
            return Err(Trap::RescheduleError.into());
        }
        trace!(self, "reschedule: nothing ready, idling");
        self.regs.running = false;
        Ok(())
    }

    fn dispatch_process(&mut self, psb: u16) -> Exec {
        let previous = self.regs.psb;
        self.regs.psb = psb;
        self.regs.running = true;
        trace!(self, "dispatch: psb {previous} -> psb {psb}");
        self.metering.on_process_switch(previous, psb);
        self.load_process()
    }

    fn save_process(&mut self, preemption: bool) -> Exec {
        let psb = self.regs.psb;
        let mut link = self.psb_link(psb)?;
        if self.valid_context() {
            self.store_frame_pc()?;
        }
        let context = pda::psb(psb) + pda::PSB_CONTEXT;
        if preemption {
            link.set_preempted(true);
            let handle = if link.permanent() {
                self.fetch(context)?
            } else {
                self.alloc_state(link.priority())?
            };
            let state = pda::state_vector(handle);
            self.save_stack(state)?;
            self.store(state + state_vector::FRAME, self.regs.lf)?;
            if !link.permanent() {
                self.store(context, handle)?;
            }
        } else {
            link.set_preempted(false);
            if link.permanent() {
                let handle = self.fetch(context)?;
                self.store(pda::state_vector(handle) + state_vector::FRAME, self.regs.lf)?;
            } else {
                self.store(context, self.regs.lf)?;
            }
        }
        self.set_psb_link(psb, link)
    }

    /// Load the process named by PSB and transfer to its frame.
    fn load_process(&mut self) -> Exec {
        let psb = self.regs.psb;
        let mut link = self.psb_link(psb)?;
        let base = pda::psb(psb);
        let context = self.fetch(base + pda::PSB_CONTEXT)?;
        self.regs.mds = (self.fetch(base + pda::PSB_MDS)? as u32) << 16;

        if link.preempted() {
            let state = pda::state_vector(context);
            self.load_stack(state)?;
            self.regs.lf = self.fetch(state + state_vector::FRAME)?;
            if !link.permanent() {
                self.free_state(link.priority(), context)?;
            }
        } else {
            self.regs.lf = if link.permanent() {
                self.fetch(pda::state_vector(context) + state_vector::FRAME)?
            } else {
                context
            };
            self.regs.sp = 0;
            self.regs.break_byte = 0;
            if link.failed() {
                self.regs.push(0)?;
                link.set_failed(false);
            }
        }
        link.set_preempted(false);
        self.set_psb_link(psb, link)?;
        self.xfer(types::ControlLink::frame(self.regs.lf), 0, crate::xfer::XferKind::ProcessSwitch, false)
    }

    /// Copy the live stack (plus the two words above it) and the stack
    /// word into the state vector at `state`, then empty the stack.
    pub fn save_stack(&mut self, state: u32) -> Exec {
        let depth = STACK_DEPTH.min(self.regs.sp + 2);
        for i in 0..depth {
            self.store(state + state_vector::STACK + i as u32, self.regs.stack[i])?;
        }
        let word = StateWord::new(self.regs.break_byte, self.regs.sp as u8);
        self.store(state + state_vector::WORD, word.0)?;
        self.regs.sp = 0;
        self.regs.saved_sp = 0;
        self.regs.break_byte = 0;
        Ok(())
    }

    pub fn load_stack(&mut self, state: u32) -> Exec {
        let word = StateWord(self.fetch(state + state_vector::WORD)?);
        let sp = word.stack_pointer() as usize;
        if sp > STACK_DEPTH {
            return Err(EngineError::CorruptStateVector {
                address: state,
                depth: word.stack_pointer(),
            }
            .into());
        }
        for i in 0..STACK_DEPTH.min(sp + 2) {
            self.regs.stack[i] = self.fetch(state + state_vector::STACK + i as u32)?;
        }
        self.regs.sp = sp;
        self.regs.saved_sp = sp;
        self.regs.break_byte = word.break_byte();
        Ok(())
    }

    fn state_list_empty(&mut self, priority: u8) -> Exec<bool> {
        Ok(self.fetch(pda::state_list(priority))? == 0)
    }

    fn alloc_state(&mut self, priority: u8) -> Exec<u16> {
        let head = pda::state_list(priority);
        let handle = self.fetch(head)?;
        if handle == 0 {
            return Err(EngineError::NoStateVector(priority).into());
        }
        let next = self.fetch(pda::state_vector(handle))?;
        self.store(head, next)?;
        Ok(handle)
    }

    fn free_state(&mut self, priority: u8, handle: u16) -> Exec {
        let head = pda::state_list(priority);
        let next = self.fetch(head)?;
        self.store(pda::state_vector(handle), next)?;
        self.store(head, handle)
    }

    // --- monitors and conditions -------------------------------------------

    /// Block the current process on a locked monitor. It resumes with FALSE
    /// on its stack so the compiled entry sequence retries.
    pub fn enter_failed(&mut self, monitor: u32) -> Exec {
        let psb = self.regs.psb;
        let mut link = self.psb_link(psb)?;
        link.set_failed(true);
        self.set_psb_link(psb, link)?;
        self.requeue(Some(pda::READY), monitor, psb)?;
        self.reschedule(false)
    }

    /// Unlock a monitor and move its first waiter to the ready queue.
    /// Returns whether a process was moved. Exiting an unlocked monitor is
    /// not an error.
    pub fn exit_monitor(&mut self, monitor: u32) -> Exec<bool> {
        let mut word = MonitorWord(self.fetch(monitor)?);
        word.set_locked(false);
        self.store(monitor, word.0)?;
        if word.tail() == PSB_NULL {
            return Ok(false);
        }
        let head = self.psb_link(word.tail())?.next();
        self.requeue(Some(monitor), pda::READY, head)?;
        Ok(true)
    }

    /// Move the head of a condition queue to the ready queue, clearing its
    /// timeout and waiting flag.
    pub fn wake_head(&mut self, condition: u32) -> Exec {
        let tail = self.queue_tail(condition)?;
        let psb = self.psb_link(tail)?.next();
        let mut flags = self.psb_flags(psb)?;
        flags.set_waiting(false);
        self.set_psb_flags(psb, flags)?;
        self.store(pda::psb(psb) + pda::PSB_TIMEOUT, 0)?;
        self.requeue(Some(condition), pda::READY, psb)
    }

    /// Wake the first waiter, or latch the wakeup bit if nobody waits.
    /// Returns whether a process was made ready.
    ///
    /// Waiters that timed out left the condition without updating it, so
    /// its tail is repaired before it is trusted.
    pub fn notify_wakeup(&mut self, condition: u32) -> Exec<bool> {
        self.cleanup_condition(condition)?;
        let mut word = ConditionWord(self.fetch(condition)?);
        if word.tail() == PSB_NULL {
            word.set_wakeup(true);
            self.store(condition, word.0)?;
            return Ok(false);
        }
        self.wake_head(condition)?;
        Ok(true)
    }

    /// Repair a condition's tail after its members were dequeued without
    /// it, following the cleanup links those dequeues left behind.
    pub fn cleanup_condition(&mut self, condition: u32) -> Exec {
        let mut word = ConditionWord(self.fetch(condition)?);
        let mut psb = word.tail();
        if psb == PSB_NULL {
            return Ok(());
        }
        let mut flags = self.psb_flags(psb)?;
        if flags.cleanup() == PSB_NULL {
            return Ok(());
        }

        let mut walked = 0;
        while flags.cleanup() != PSB_NULL {
            if flags.cleanup() == psb {
                word.set_wakeup(false);
                word.set_tail(PSB_NULL);
                return self.store(condition, word.0);
            }
            psb = flags.cleanup();
            flags = self.psb_flags(psb)?;
            walked += 1;
            if walked > Config::MAX_QUEUE_WALK {
                return Err(EngineError::CorruptQueue(condition).into());
            }
        }

        let head = psb;
        let mut walked = 0;
        loop {
            let link = self.psb_link(psb)?;
            if link.next() == head {
                break;
            }
            psb = link.next();
            walked += 1;
            if walked > Config::MAX_QUEUE_WALK {
                return Err(EngineError::CorruptQueue(condition).into());
            }
        }
        word.set_tail(psb);
        self.store(condition, word.0)
    }

    // --- interrupts and timeouts -------------------------------------------

    pub fn check_for_interrupts(&mut self) -> Exec<bool> {
        if self.regs.interrupts_enabled() && self.wakeups.has_interrupts() {
            return self.interrupt();
        }
        Ok(false)
    }

    /// Take every pending interrupt level and notify its condition, highest
    /// level first. Returns whether any process became ready.
    pub fn interrupt(&mut self) -> Exec<bool> {
        let pending = self.wakeups.take_interrupts();
        let mut requeue = false;
        for level in (0..pda::INTERRUPT_LEVELS).rev() {
            if pending & (1 << level) != 0 && self.notify_wakeup(pda::interrupt_condition(level))? {
                requeue = true;
            }
        }
        if pending != 0 {
            trace!(self, "interrupt: levels 0x{pending:04x}");
        }
        Ok(requeue)
    }

    /// On each elapsed tick, hand the host its checkpoint and expire
    /// waiting processes. A tick that arrives with interrupts disabled is
    /// scanned once they are enabled again.
    pub fn check_for_timeouts(&mut self) -> Exec<bool> {
        let due = self.timer.tick_due();
        if due {
            self.checkpoint();
        }
        if !self.regs.interrupts_enabled() {
            if due {
                self.timer.owe();
            }
            return Ok(false);
        }
        let owed = self.timer.take_owed();
        if due || owed {
            return self.timeout_scan();
        }
        Ok(false)
    }

    /// Advance the tick clock and make ready every process whose timeout
    /// has arrived. Returns whether any process was moved.
    pub fn timeout_scan(&mut self) -> Exec<bool> {
        self.regs.ticks = match self.regs.ticks.wrapping_add(1) {
            0 => 1,
            tick => tick,
        };
        let count = self.fetch(pda::COUNT)?;
        let mut requeue = false;
        for psb in pda::START_PSB..pda::START_PSB.saturating_add(count) {
            let timeout_at = pda::psb(psb) + pda::PSB_TIMEOUT;
            let timeout = self.fetch(timeout_at)?;
            if timeout != 0 && timeout == self.regs.ticks {
                let mut flags = self.psb_flags(psb)?;
                flags.set_waiting(false);
                self.set_psb_flags(psb, flags)?;
                self.store(timeout_at, 0)?;
                self.requeue(None, pda::READY, psb)?;
                requeue = true;
            }
        }
        Ok(requeue)
    }

    /// Timeout value for a wait of `ticks` ticks; zero means no timeout.
    pub fn timeout_after(&self, ticks: u16) -> u16 {
        if ticks == 0 {
            return 0;
        }
        match self.regs.ticks.wrapping_add(ticks) {
            0 => 1,
            at => at,
        }
    }
}
