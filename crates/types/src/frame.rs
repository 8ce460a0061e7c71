/// Tag of an allocation vector entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvTag {
    Frame,
    Empty,
    Indirect,
    Unused,
}

/// One allocation vector entry, also the link word of a free frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AvItem(pub u16);

impl AvItem {
    pub const EMPTY: AvItem = AvItem(1);

    pub const fn tag(self) -> AvTag {
        match self.0 & 3 {
            0 => AvTag::Frame,
            1 => AvTag::Empty,
            2 => AvTag::Indirect,
            _ => AvTag::Unused,
        }
    }

    /// Payload of an indirect entry: the frame size index to allocate from instead.
    pub const fn data(self) -> u16 {
        self.0 >> 2
    }

    pub const fn frame(self) -> u16 {
        self.0 & !3
    }

    pub const fn indirect(fsi: u16) -> Self {
        Self(fsi << 2 | 2)
    }
}

/// Word at LF-4: the frame size index lives in the low byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocalWord(pub u16);

impl LocalWord {
    pub const fn fsi(self) -> u8 {
        self.0 as u8
    }
}

/// Word at GF-1: global frame index and the per-module transfer flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlobalWord(pub u16);

impl GlobalWord {
    pub const fn new(gfi: u16, trap_xfers: bool, code_links: bool) -> Self {
        Self(gfi << 2 | (trap_xfers as u16) << 1 | code_links as u16)
    }

    pub const fn gfi(self) -> u16 {
        self.0 >> 2
    }

    pub const fn trap_xfers(self) -> bool {
        self.0 & 2 != 0
    }

    pub const fn code_links(self) -> bool {
        self.0 & 1 != 0
    }
}
