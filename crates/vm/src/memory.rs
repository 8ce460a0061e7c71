use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::signal::{Exec, Fault};
use types::{FieldSpec, MapFlags, PAGE_OFFSET_MASK, PAGE_SHIFT, PAGE_SIZE};

/// Kind of access being translated. Each kind keeps its own one-entry
/// translation cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read = 0,
    Write = 1,
    Code = 2,
}

#[derive(Debug, Clone, Copy, Default)]
struct MapEntry {
    real_page: u32,
    flags: MapFlags,
}

#[derive(Debug, Clone, Copy)]
struct CachedPage {
    page: u32,
    real_base: usize,
}

/// Paged word memory.
///
/// Design at a glance:
/// - Real memory is one `Vec<u16>`: normal pages first, display pages after.
/// - The page map has one entry per virtual page: real page number plus
///   referenced/dirty/protected flags. A page is unmapped ("vacant") when its
///   flags read protected|dirty without referenced.
/// - `translate` checks the map, raises page or write-protect faults, sets
///   referenced (and dirty on writes) and returns an index into real memory.
/// - Read, write and code accesses each remember their last translated page.
///   `set_map` drops any cached translation of the page it rewrites.
/// - Virtual page 0 is never mapped, so null pointers fault.
#[derive(Debug)]
pub struct Memory {
    real: Vec<u16>,
    real_pages: u32,
    display_pages: u32,
    map: Vec<MapEntry>,
    cache: [Option<CachedPage>; 3],
}

impl Memory {
    pub fn new(virtual_pages: u32, real_pages: u32, display_pages: u32) -> Self {
        let total = (real_pages + display_pages) as usize * PAGE_SIZE as usize;
        let vacant = MapEntry {
            real_page: 0,
            flags: MapFlags::VACANT,
        };
        Self {
            real: vec![0; total],
            real_pages,
            display_pages,
            map: vec![vacant; virtual_pages as usize],
            cache: [None; 3],
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.virtual_pages, config.real_pages, config.display_pages)
    }

    pub fn virtual_pages(&self) -> u32 {
        self.map.len() as u32
    }

    pub fn real_pages(&self) -> u32 {
        self.real_pages
    }

    pub fn display_pages(&self) -> u32 {
        self.display_pages
    }

    /// First real page of the display band.
    pub fn display_base(&self) -> u32 {
        self.real_pages
    }

    fn total_real_pages(&self) -> u32 {
        self.real_pages + self.display_pages
    }

    pub fn read_map(&self, page: u32) -> Result<(MapFlags, u32), EngineError> {
        let entry = self
            .map
            .get(page as usize)
            .ok_or(EngineError::VirtualPageOutOfRange(page))?;
        Ok((entry.flags, entry.real_page))
    }

    pub fn set_map(&mut self, page: u32, real_page: u32, flags: MapFlags) -> Result<(), EngineError> {
        if page as usize >= self.map.len() {
            return Err(EngineError::VirtualPageOutOfRange(page));
        }
        let real_page = if flags.is_vacant() {
            0
        } else if real_page >= self.total_real_pages() {
            return Err(EngineError::RealPageOutOfRange(real_page));
        } else {
            real_page
        };
        self.map[page as usize] = MapEntry { real_page, flags };
        for slot in self.cache.iter_mut() {
            if matches!(slot, Some(cached) if cached.page == page) {
                *slot = None;
            }
        }
        Ok(())
    }

    /// Map `count` consecutive virtual pages onto consecutive real pages.
    pub fn map_range(
        &mut self,
        first_page: u32,
        first_real: u32,
        count: u32,
        flags: MapFlags,
    ) -> Result<(), EngineError> {
        for i in 0..count {
            self.set_map(first_page + i, first_real + i, flags)?;
        }
        Ok(())
    }

    /// Translate a virtual word address into an index into real memory.
    pub fn translate(&mut self, address: u32, access: Access) -> Exec<usize> {
        let page = address >> PAGE_SHIFT;
        let offset = (address & PAGE_OFFSET_MASK) as usize;
        if let Some(cached) = self.cache[access as usize] {
            if cached.page == page {
                return Ok(cached.real_base + offset);
            }
        }

        if page == 0 || page as usize >= self.map.len() {
            return Err(Fault::Page { address }.into());
        }
        let entry = &mut self.map[page as usize];
        if entry.flags.is_vacant() {
            return Err(Fault::Page { address }.into());
        }
        match access {
            Access::Write if entry.flags.contains(MapFlags::PROTECTED) => {
                return Err(Fault::WriteProtect { address }.into());
            }
            Access::Write => entry.flags |= MapFlags::REFERENCED | MapFlags::DIRTY,
            Access::Read | Access::Code => entry.flags |= MapFlags::REFERENCED,
        }

        let real_base = entry.real_page as usize * PAGE_SIZE as usize;
        self.cache[access as usize] = Some(CachedPage { page, real_base });
        Ok(real_base + offset)
    }

    pub fn fetch(&mut self, address: u32) -> Exec<u16> {
        let index = self.translate(address, Access::Read)?;
        Ok(self.real[index])
    }

    pub fn store(&mut self, address: u32, value: u16) -> Exec {
        let index = self.translate(address, Access::Write)?;
        self.real[index] = value;
        Ok(())
    }

    /// Long word: low half at `address`, high half at `address + 1`.
    pub fn fetch_dbl(&mut self, address: u32) -> Exec<u32> {
        let low = self.fetch(address)?;
        let high = self.fetch(address.wrapping_add(1))?;
        Ok((high as u32) << 16 | low as u32)
    }

    /// Both halves are translated before either is written.
    pub fn store_dbl(&mut self, address: u32, value: u32) -> Exec {
        let low = self.translate(address, Access::Write)?;
        let high = self.translate(address.wrapping_add(1), Access::Write)?;
        self.real[low] = value as u16;
        self.real[high] = (value >> 16) as u16;
        Ok(())
    }

    /// Code word fetch, through the code translation cache.
    pub fn fetch_code(&mut self, address: u32) -> Exec<u16> {
        let index = self.translate(address, Access::Code)?;
        Ok(self.real[index])
    }

    pub fn read_field(&mut self, address: u32, spec: FieldSpec) -> Exec<u16> {
        Ok(spec.extract(self.fetch(address)?))
    }

    pub fn write_field(&mut self, address: u32, spec: FieldSpec, data: u16) -> Exec {
        let index = self.translate(address, Access::Write)?;
        self.real[index] = spec.insert(self.real[index], data);
        Ok(())
    }

    pub fn read_real(&self, real_address: usize) -> Result<u16, EngineError> {
        self.real
            .get(real_address)
            .copied()
            .ok_or(EngineError::RealAddressOutOfRange(real_address))
    }

    pub fn write_real(&mut self, real_address: usize, value: u16) -> Result<(), EngineError> {
        let word = self
            .real
            .get_mut(real_address)
            .ok_or(EngineError::RealAddressOutOfRange(real_address))?;
        *word = value;
        Ok(())
    }

    /// Copy `words` into real memory starting at `real_address`, bypassing the map.
    pub fn load_real(&mut self, real_address: usize, words: &[u16]) -> Result<(), EngineError> {
        let end = real_address + words.len();
        if end > self.real.len() {
            return Err(EngineError::RealAddressOutOfRange(end.saturating_sub(1)));
        }
        self.real[real_address..end].copy_from_slice(words);
        Ok(())
    }

    pub fn real_words(&self) -> &[u16] {
        &self.real
    }

    /// Copy real memory seen through the map into `buffer`.
    ///
    /// `offset` is a word offset from the first word of `first_page`. The
    /// flags of every page touched are recorded in `page_flags`, one slot per
    /// page starting at `first_page`. Copying stops at the first vacant page,
    /// at the end of the map, or when either output is full. Returns the number
    /// of words copied. Flags are reported as they are, without marking the
    /// pages referenced.
    pub fn access_real_memory(
        &self,
        buffer: &mut [u16],
        offset: usize,
        page_flags: &mut [MapFlags],
        first_page: u32,
    ) -> usize {
        let page_size = PAGE_SIZE as usize;
        let mut copied = 0;
        while copied < buffer.len() {
            let position = offset + copied;
            let slot = position / page_size;
            let page = first_page as usize + slot;
            let (Some(entry), Some(flags_out)) = (self.map.get(page), page_flags.get_mut(slot)) else {
                break;
            };
            *flags_out = entry.flags;
            if entry.flags.is_vacant() {
                break;
            }
            let in_page = position % page_size;
            let run = (page_size - in_page).min(buffer.len() - copied);
            let base = entry.real_page as usize * page_size + in_page;
            buffer[copied..copied + run].copy_from_slice(&self.real[base..base + run]);
            copied += run;
        }
        copied
    }

    /// Page map as `(real page, flags)` pairs, for snapshots.
    pub fn map_entries(&self) -> Vec<(u32, u16)> {
        self.map.iter().map(|e| (e.real_page, e.flags.bits())).collect()
    }

    /// Replace memory contents wholesale, for snapshot restore.
    pub fn restore(&mut self, map: &[(u32, u16)], real: &[u16]) -> Result<(), EngineError> {
        if real.len() != self.real.len() {
            return Err(EngineError::RealAddressOutOfRange(real.len()));
        }
        if map.len() != self.map.len() {
            return Err(EngineError::VirtualPageOutOfRange(map.len() as u32));
        }
        self.real.copy_from_slice(real);
        for (entry, &(real_page, flags)) in self.map.iter_mut().zip(map) {
            *entry = MapEntry {
                real_page,
                flags: MapFlags::from_bits_truncate(flags),
            };
        }
        self.cache = [None; 3];
        Ok(())
    }
}
