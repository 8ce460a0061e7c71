//! Packed words of the process machinery: PSB link and flags, queue,
//! monitor and condition words, and the state-vector word.
//!
//! All fields are numbered from the most significant bit, so a 10-bit PSB
//! index that "starts at bit 3" lives in bits 12..3 of the `u16`.

/// Index 0 is never a real process; it terminates queues.
pub const PSB_NULL: u16 = 0;

const INDEX_SHIFT: u32 = 3;
const INDEX_MASK: u16 = 0x3ff;

macro_rules! packed_word {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub struct $name(pub u16);

        impl From<u16> for $name {
            fn from(word: u16) -> Self {
                Self(word)
            }
        }

        impl From<$name> for u16 {
            fn from(word: $name) -> u16 {
                word.0
            }
        }
    };
}

macro_rules! index_field {
    ($get:ident, $set:ident) => {
        pub const fn $get(self) -> u16 {
            (self.0 >> INDEX_SHIFT) & INDEX_MASK
        }

        pub fn $set(&mut self, index: u16) {
            self.0 = (self.0 & !(INDEX_MASK << INDEX_SHIFT)) | ((index & INDEX_MASK) << INDEX_SHIFT);
        }
    };
}

macro_rules! flag_bit {
    ($get:ident, $set:ident, $bit:expr) => {
        pub const fn $get(self) -> bool {
            self.0 & $bit != 0
        }

        pub fn $set(&mut self, on: bool) {
            if on {
                self.0 |= $bit;
            } else {
                self.0 &= !$bit;
            }
        }
    };
}

packed_word!(PsbLink);

impl PsbLink {
    pub const fn priority(self) -> u8 {
        (self.0 >> 13) as u8
    }

    pub fn set_priority(&mut self, priority: u8) {
        self.0 = (self.0 & 0x1fff) | ((priority as u16 & 7) << 13);
    }

    index_field!(next, set_next);
    flag_bit!(failed, set_failed, 4);
    flag_bit!(permanent, set_permanent, 2);
    flag_bit!(preempted, set_preempted, 1);
}

packed_word!(PsbFlags);

impl PsbFlags {
    index_field!(cleanup, set_cleanup);
    flag_bit!(waiting, set_waiting, 2);
    flag_bit!(abort, set_abort, 1);
}

packed_word!(QueueWord);

impl QueueWord {
    index_field!(tail, set_tail);
}

packed_word!(MonitorWord);

impl MonitorWord {
    index_field!(tail, set_tail);
    flag_bit!(locked, set_locked, 1);
}

packed_word!(ConditionWord);

impl ConditionWord {
    index_field!(tail, set_tail);
    flag_bit!(abortable, set_abortable, 2);
    flag_bit!(wakeup, set_wakeup, 1);
}

packed_word!(StateWord);

impl StateWord {
    pub const fn new(break_byte: u8, stack_pointer: u8) -> Self {
        Self((break_byte as u16) << 8 | stack_pointer as u16)
    }

    pub const fn break_byte(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn stack_pointer(self) -> u8 {
        self.0 as u8
    }
}
