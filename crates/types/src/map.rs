use bitflags::bitflags;

bitflags! {
    /// Page map flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MapFlags: u16 {
        const REFERENCED = 1;
        const DIRTY = 2;
        const PROTECTED = 4;
    }
}

impl MapFlags {
    /// Protected and dirty without referenced marks an unmapped page.
    pub const VACANT: MapFlags = MapFlags::PROTECTED.union(MapFlags::DIRTY);

    pub fn is_vacant(self) -> bool {
        self.intersection(MapFlags::all()) == MapFlags::VACANT
    }
}

/// A field descriptor byte: bit position in the high nibble, size minus one
/// in the low nibble. Bits are numbered from the most significant end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec(pub u8);

impl FieldSpec {
    pub const fn new(pos: u8, size: u8) -> Self {
        Self((pos & 0xf) << 4 | (size.wrapping_sub(1) & 0xf))
    }

    pub const fn pos(self) -> u32 {
        (self.0 >> 4) as u32
    }

    /// Field width minus one.
    pub const fn size(self) -> u32 {
        (self.0 & 0xf) as u32
    }

    /// Distance of the field's least significant bit from bit 0.
    ///
    /// Descriptors whose field would run past the end of the word wrap the
    /// shift to zero rather than panic.
    pub const fn shift(self) -> u32 {
        16u32.wrapping_sub(self.pos() + self.size() + 1) & 15
    }

    pub const fn mask(self) -> u16 {
        let width_mask = ((1u32 << (self.size() + 1)) - 1) as u16;
        width_mask << self.shift()
    }

    pub const fn extract(self, word: u16) -> u16 {
        (word & self.mask()) >> self.shift()
    }

    pub const fn insert(self, word: u16, data: u16) -> u16 {
        (word & !self.mask()) | ((data << self.shift()) & self.mask())
    }
}
