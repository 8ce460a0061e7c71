#![no_std]

//! Word-level layout of the machine: where the system tables live and how
//! the packed words inside them are laid out.
//!
//! Everything here is plain data with no engine state, so the same views
//! serve the interpreter, loaders and test fixtures.

pub mod layout;
pub use layout::*;

pub mod link;
pub use link::{ControlLink, LinkType};

pub mod process;
pub use process::{ConditionWord, MonitorWord, PsbFlags, PsbLink, QueueWord, StateWord, PSB_NULL};

pub mod frame;
pub use frame::{AvItem, AvTag, GlobalWord, LocalWord};

pub mod map;
pub use map::{FieldSpec, MapFlags};
