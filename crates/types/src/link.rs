use core::fmt;

/// What a control link points at, taken from the low two bits of its low word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkType {
    /// A local frame pointer.
    Frame,
    /// Tagged 16-bit global frame pointer plus entry PC.
    OldProcedure,
    /// Short pointer to another control link.
    Indirect,
    /// Tagged global frame table handle plus entry PC.
    NewProcedure,
}

/// A 32-bit control link.
///
/// In memory the low word sits at the lower address. Short (16-bit) links
/// are zero-extended.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ControlLink(pub u32);

impl ControlLink {
    pub const NULL: ControlLink = ControlLink(0);

    pub const fn from_words(low: u16, high: u16) -> Self {
        Self((high as u32) << 16 | low as u32)
    }

    pub const fn from_short(low: u16) -> Self {
        Self(low as u32)
    }

    pub const fn frame(lf: u16) -> Self {
        Self::from_short(lf & !3)
    }

    pub const fn indirect(pointer: u16) -> Self {
        Self::from_short((pointer & !3) | 2)
    }

    pub const fn old_procedure(gf: u16, pc: u16) -> Self {
        Self::from_words((gf & !3) | 1, pc)
    }

    /// `handle` is the GFT handle field; it is shifted into place above the tag.
    pub const fn new_procedure(handle: u16, pc: u16) -> Self {
        Self::from_words(handle << 2 | 3, pc)
    }

    pub const fn low(self) -> u16 {
        self.0 as u16
    }

    pub const fn high(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn link_type(self) -> LinkType {
        match self.low() & 3 {
            0 => LinkType::Frame,
            1 => LinkType::OldProcedure,
            2 => LinkType::Indirect,
            _ => LinkType::NewProcedure,
        }
    }

    /// Local frame of a frame link, or the target pointer of an indirect link.
    pub const fn pointer(self) -> u16 {
        self.low() & !3
    }

    /// Global frame table handle of a new procedure descriptor.
    pub const fn handle(self) -> u16 {
        self.low() >> 2
    }

    /// Entry PC of a procedure descriptor.
    pub const fn pc(self) -> u16 {
        self.high()
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for ControlLink {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Debug for ControlLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControlLink({:?} 0x{:08x})", self.link_type(), self.0)
    }
}

impl fmt::Display for ControlLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}:{:04x}", self.high(), self.low())
    }
}
