mod common;

use common::*;
use proptest::prelude::*;
use types::{pda, ConditionWord, PsbLink, QueueWord, StateWord};
use vm::{Architecture, Engine, EngineError, Signal, Trap};

/// A spare queue word in the MDS.
const QUEUE: u32 = 0x0b00;
/// A frame other processes resume in.
const OTHER_LF: u16 = 0x0a00;

fn with_process(engine: &mut Engine, psb: u16, priority: u8) {
    let link = module_link(engine);
    frame_overhead(engine, OTHER_LF, FRAME_FSI, link, HANDLER_PC + 1);
    add_psb(engine, psb, priority, OTHER_LF);
}

fn tail(engine: &mut Engine, queue: u32) -> u16 {
    QueueWord(engine.fetch(queue).unwrap()).tail()
}

#[test]
fn enqueue_into_empty_queue_links_to_itself() {
    let mut engine = engine(Architecture::FrameTable);
    add_psb(&mut engine, 9, 3, 0);
    engine.enqueue(QUEUE, 9).unwrap();
    assert_eq!(tail(&mut engine, QUEUE), 9);
    assert_eq!(engine.psb_link(9).unwrap().next(), 9);
}

#[test]
fn mixed_priorities_come_out_highest_first() {
    let mut engine = engine(Architecture::FrameTable);
    for (psb, priority) in [(9, 1), (10, 5), (11, 3)] {
        add_psb(&mut engine, psb, priority, 0);
        engine.enqueue(QUEUE, psb).unwrap();
    }
    let mut order = Vec::new();
    while tail(&mut engine, QUEUE) != 0 {
        let head = queue_members(&mut engine, QUEUE)[0];
        order.push(engine.psb_link(head).unwrap().priority());
        engine.dequeue(Some(QUEUE), head).unwrap();
    }
    assert_eq!(order, vec![5, 3, 1]);
}

#[test]
fn dequeue_of_the_tail_moves_the_tail_back() {
    let mut engine = engine(Architecture::FrameTable);
    for psb in 9..12 {
        add_psb(&mut engine, psb, 2, 0);
        engine.enqueue(QUEUE, psb).unwrap();
    }
    assert_eq!(queue_members(&mut engine, QUEUE), vec![9, 10, 11]);

    engine.dequeue(Some(QUEUE), 11).unwrap();
    assert_eq!(queue_members(&mut engine, QUEUE), vec![9, 10]);
    engine.dequeue(Some(QUEUE), 9).unwrap();
    assert_eq!(queue_members(&mut engine, QUEUE), vec![10]);
    engine.dequeue(Some(QUEUE), 10).unwrap();
    assert_eq!(tail(&mut engine, QUEUE), 0);
}

#[test]
fn dequeue_without_a_queue_remembers_the_successor() {
    let mut engine = engine(Architecture::FrameTable);
    for psb in 9..11 {
        add_psb(&mut engine, psb, 2, 0);
        engine.enqueue(QUEUE, psb).unwrap();
    }
    engine.dequeue(None, 9).unwrap();
    assert_eq!(engine.psb_flags(9).unwrap().cleanup(), 10);
    // the queue word was not touched
    assert_eq!(tail(&mut engine, QUEUE), 10);
}

#[test]
fn requeue_of_the_null_process_is_an_engine_error() {
    let mut engine = engine(Architecture::FrameTable);
    assert_eq!(
        engine.requeue(Some(pda::READY), QUEUE, 0),
        Err(Signal::Error(EngineError::NullProcess))
    );
}

proptest! {
    #[test]
    fn queues_stay_in_priority_order(priorities in prop::collection::vec(0u8..8, 1..12)) {
        let mut engine = engine(Architecture::FrameTable);
        let mut expected = Vec::new();
        for (i, &priority) in priorities.iter().enumerate() {
            let psb = 9 + i as u16;
            add_psb(&mut engine, psb, priority, 0);
            engine.enqueue(QUEUE, psb).unwrap();
            expected.push((priority, psb));
        }
        // highest priority first, first come first served among equals
        expected.sort_by(|a, b| b.0.cmp(&a.0));
        let expected: Vec<u16> = expected.into_iter().map(|(_, psb)| psb).collect();
        prop_assert_eq!(queue_members(&mut engine, QUEUE), expected);
    }

    #[test]
    fn saved_stacks_load_back(
        stack in prop::array::uniform14(any::<u16>()),
        sp in 0usize..=14,
        break_byte: u8,
    ) {
        let mut engine = engine(Architecture::FrameTable);
        engine.regs.stack = stack;
        engine.regs.sp = sp;
        engine.regs.break_byte = break_byte;

        engine.save_stack(0x0b40).unwrap();
        prop_assert_eq!(engine.regs.sp, 0);
        prop_assert_eq!(engine.regs.break_byte, 0);
        prop_assert_eq!(engine.fetch(0x0b40 + 14).unwrap(), StateWord::new(break_byte, sp as u8).0);

        engine.regs.stack = [0; 14];
        engine.load_stack(0x0b40).unwrap();
        let kept = (sp + 2).min(14);
        prop_assert_eq!(engine.regs.sp, sp);
        prop_assert_eq!(engine.regs.break_byte, break_byte);
        prop_assert_eq!(&engine.regs.stack[..kept], &stack[..kept]);
    }
}

#[test]
fn reschedule_switches_to_a_higher_priority_process() {
    let mut engine = engine(Architecture::FrameTable);
    with_process(&mut engine, 9, 5);
    engine.enqueue(pda::READY, 9).unwrap();

    engine.reschedule(false).unwrap();
    assert_eq!(engine.regs.psb, 9);
    assert_eq!(engine.regs.lf, OTHER_LF);
    assert_eq!(engine.regs.pc, HANDLER_PC + 1);
    assert!(engine.regs.running);

    // the old process parked its frame in its PSB
    assert_eq!(engine.fetch(pda::psb(RUNNING_PSB) + pda::PSB_CONTEXT).unwrap(), CALLER_LF);
    assert!(!engine.psb_link(RUNNING_PSB).unwrap().preempted());
}

#[test]
fn preempted_process_gets_its_stack_back() {
    let mut engine = engine(Architecture::FrameTable);
    with_process(&mut engine, 9, 5);
    engine.enqueue(pda::READY, 9).unwrap();
    for value in [1, 2, 3] {
        engine.push(value).unwrap();
    }
    let free_state = engine.fetch(pda::state_list(1)).unwrap();

    engine.reschedule(true).unwrap();
    assert_eq!(engine.regs.psb, 9);
    assert_eq!(engine.regs.sp, 0);
    assert!(engine.psb_link(RUNNING_PSB).unwrap().preempted());
    assert_eq!(engine.fetch(pda::psb(RUNNING_PSB) + pda::PSB_CONTEXT).unwrap(), free_state);

    engine.requeue(Some(pda::READY), QUEUE, 9).unwrap();
    engine.reschedule(false).unwrap();
    assert_eq!(engine.regs.psb, RUNNING_PSB);
    assert_eq!(engine.regs.live_stack(), &[1, 2, 3]);
    assert_eq!(engine.regs.lf, CALLER_LF);
    assert!(!engine.psb_link(RUNNING_PSB).unwrap().preempted());
    // the state vector went back on its list
    assert_eq!(engine.fetch(pda::state_list(1)).unwrap(), free_state);
}

#[test]
fn empty_ready_queue_needs_interrupts_enabled() {
    let mut engine = engine(Architecture::FrameTable);
    engine.requeue(Some(pda::READY), QUEUE, RUNNING_PSB).unwrap();
    assert_eq!(engine.reschedule(false), Err(Signal::Trap(Trap::RescheduleError)));

    let mut engine = common::engine(Architecture::FrameTable);
    engine.requeue(Some(pda::READY), QUEUE, RUNNING_PSB).unwrap();
    engine.regs.wdc = 0;
    engine.reschedule(false).unwrap();
    assert!(!engine.regs.running);
}

#[test]
fn process_without_a_state_vector_is_skipped() {
    let mut engine = engine(Architecture::FrameTable);
    with_process(&mut engine, 9, 5);
    engine.enqueue(pda::READY, 9).unwrap();
    engine.store(pda::state_list(5), 0).unwrap();

    engine.reschedule(false).unwrap();
    assert_eq!(engine.regs.psb, RUNNING_PSB);
}

#[test]
fn cleanup_repairs_a_condition_after_timeouts() {
    let mut engine = engine(Architecture::FrameTable);
    for psb in 9..12 {
        add_psb(&mut engine, psb, 2, 0);
        engine.enqueue(QUEUE, psb).unwrap();
    }
    engine.dequeue(None, 11).unwrap();
    engine.cleanup_condition(QUEUE).unwrap();
    assert_eq!(queue_members(&mut engine, QUEUE), vec![9, 10]);
}

#[test]
fn cleanup_empties_a_condition_whose_last_member_left() {
    let mut engine = engine(Architecture::FrameTable);
    add_psb(&mut engine, 9, 2, 0);
    engine.enqueue(QUEUE, 9).unwrap();
    let mut word = ConditionWord(engine.fetch(QUEUE).unwrap());
    word.set_wakeup(true);
    engine.store(QUEUE, word.0).unwrap();

    engine.dequeue(None, 9).unwrap();
    engine.cleanup_condition(QUEUE).unwrap();
    let word = ConditionWord(engine.fetch(QUEUE).unwrap());
    assert_eq!(word.tail(), 0);
    assert!(!word.wakeup());
}

#[test]
fn notify_latches_a_wakeup_when_nobody_waits() {
    let mut engine = engine(Architecture::FrameTable);
    assert!(!engine.notify_wakeup(QUEUE).unwrap());
    assert!(ConditionWord(engine.fetch(QUEUE).unwrap()).wakeup());
}

#[test]
fn notify_readies_the_first_waiter() {
    let mut engine = engine(Architecture::FrameTable);
    add_psb(&mut engine, 9, 2, 0);
    engine.enqueue(QUEUE, 9).unwrap();
    let mut flags = engine.psb_flags(9).unwrap();
    flags.set_waiting(true);
    engine.set_psb_flags(9, flags).unwrap();
    engine.store(pda::psb(9) + pda::PSB_TIMEOUT, 40).unwrap();

    assert!(engine.notify_wakeup(QUEUE).unwrap());
    assert_eq!(tail(&mut engine, QUEUE), 0);
    assert_eq!(queue_members(&mut engine, pda::READY), vec![9, RUNNING_PSB]);
    assert!(!engine.psb_flags(9).unwrap().waiting());
    assert_eq!(engine.fetch(pda::psb(9) + pda::PSB_TIMEOUT).unwrap(), 0);
}

#[test]
fn interrupts_notify_highest_level_first() {
    let mut engine = engine(Architecture::FrameTable);
    add_psb(&mut engine, 9, 2, 0);
    add_psb(&mut engine, 10, 2, 0);
    engine.enqueue(pda::interrupt_condition(3), 9).unwrap();
    engine.enqueue(pda::interrupt_condition(10), 10).unwrap();

    let wakeups = engine.wakeups();
    wakeups.post_interrupts(1 << 3 | 1 << 10);
    // disabled: nothing happens and the request stays pending
    assert!(!engine.check_for_interrupts().unwrap());
    assert!(wakeups.has_interrupts());

    engine.regs.wdc = 0;
    assert!(engine.check_for_interrupts().unwrap());
    assert!(!wakeups.has_interrupts());
    assert_eq!(queue_members(&mut engine, pda::READY), vec![10, 9, RUNNING_PSB]);
}

#[test]
fn interrupt_with_no_waiter_latches_the_wakeup() {
    let mut engine = engine(Architecture::FrameTable);
    engine.wakeups().post_interrupts(1 << 5);
    assert!(!engine.interrupt().unwrap());
    assert!(ConditionWord(engine.fetch(pda::interrupt_condition(5)).unwrap()).wakeup());
}

#[test]
fn timeout_scan_readies_expired_waiters() {
    let mut engine = engine(Architecture::FrameTable);
    for psb in [9, 10] {
        add_psb(&mut engine, psb, 2, 0);
        engine.enqueue(QUEUE, psb).unwrap();
        let mut flags = engine.psb_flags(psb).unwrap();
        flags.set_waiting(true);
        engine.set_psb_flags(psb, flags).unwrap();
    }
    engine.store(pda::psb(9) + pda::PSB_TIMEOUT, 1).unwrap();
    engine.store(pda::psb(10) + pda::PSB_TIMEOUT, 2).unwrap();

    assert!(engine.timeout_scan().unwrap());
    assert_eq!(engine.regs.ticks, 1);
    assert_eq!(queue_members(&mut engine, pda::READY), vec![9, RUNNING_PSB]);
    assert!(!engine.psb_flags(9).unwrap().waiting());
    assert!(engine.psb_flags(10).unwrap().waiting());

    engine.cleanup_condition(QUEUE).unwrap();
    assert_eq!(queue_members(&mut engine, QUEUE), vec![10]);

    assert!(engine.timeout_scan().unwrap());
    assert_eq!(queue_members(&mut engine, pda::READY), vec![9, 10, RUNNING_PSB]);
    assert!(!engine.timeout_scan().unwrap());
}

#[test]
fn interrupt_after_a_timed_out_wait_latches_the_wakeup() {
    let mut engine = engine(Architecture::FrameTable);
    let condition = pda::interrupt_condition(3);
    add_psb(&mut engine, 9, 2, 0);
    engine.enqueue(condition, 9).unwrap();
    let mut flags = engine.psb_flags(9).unwrap();
    flags.set_waiting(true);
    engine.set_psb_flags(9, flags).unwrap();
    engine.store(pda::psb(9) + pda::PSB_TIMEOUT, 1).unwrap();

    assert!(engine.timeout_scan().unwrap());
    assert_eq!(queue_members(&mut engine, pda::READY), vec![9, RUNNING_PSB]);
    // the condition word still names the process that left it
    assert_eq!(tail(&mut engine, condition), 9);

    engine.wakeups().post_interrupts(1 << 3);
    assert!(!engine.interrupt().unwrap());
    let word = ConditionWord(engine.fetch(condition).unwrap());
    assert_eq!(word.tail(), 0);
    assert!(word.wakeup());
    assert_eq!(queue_members(&mut engine, pda::READY), vec![9, RUNNING_PSB]);
}

#[test]
fn tick_during_disabled_interrupts_is_scanned_later() {
    let mut config = config(Architecture::FrameTable);
    config.tick_interval_ms = 200;
    config.timer_sample_interval = 0;
    let mut engine = engine_with(config);
    std::thread::sleep(std::time::Duration::from_millis(250));

    assert_eq!(engine.regs.wdc, 1);
    assert!(!engine.check_for_timeouts().unwrap());
    assert_eq!(engine.regs.ticks, 0);

    // the interval has not come round again, but the held tick is owed
    engine.regs.wdc = 0;
    engine.check_for_timeouts().unwrap();
    assert_eq!(engine.regs.ticks, 1);
    engine.check_for_timeouts().unwrap();
    assert_eq!(engine.regs.ticks, 1);
}

#[test]
fn timeouts_skip_zero_on_wraparound() {
    let mut engine = engine(Architecture::FrameTable);
    engine.regs.ticks = 0xffff;
    assert_eq!(engine.timeout_after(0), 0);
    assert_eq!(engine.timeout_after(1), 1);
    assert_eq!(engine.timeout_after(3), 2);
    engine.timeout_scan().unwrap();
    assert_eq!(engine.regs.ticks, 1);
}

#[test]
fn priority_field_survives_queue_moves() {
    let mut engine = engine(Architecture::FrameTable);
    add_psb(&mut engine, 9, 6, 0);
    engine.enqueue(QUEUE, 9).unwrap();
    engine.requeue(Some(QUEUE), pda::READY, 9).unwrap();
    let link: PsbLink = engine.psb_link(9).unwrap();
    assert_eq!(link.priority(), 6);
    assert_eq!(queue_members(&mut engine, pda::READY), vec![9, RUNNING_PSB]);
}
