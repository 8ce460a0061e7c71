use proptest::prelude::*;
use types::{FieldSpec, MapFlags};
use vm::{Access, EngineError, Fault, Memory, Signal};

fn memory() -> Memory {
    let mut memory = Memory::new(0x100, 16, 2);
    memory.map_range(1, 0, 8, MapFlags::empty()).unwrap();
    memory
}

#[test]
fn page_zero_and_vacant_pages_fault() {
    let mut memory = memory();
    assert_eq!(memory.fetch(0x0005), Err(Signal::Fault(Fault::Page { address: 0x0005 })));
    assert_eq!(memory.fetch(0x0a10), Err(Signal::Fault(Fault::Page { address: 0x0a10 })));
    assert_eq!(
        memory.store(0x0a10, 1),
        Err(Signal::Fault(Fault::Page { address: 0x0a10 }))
    );
}

#[test]
fn addresses_past_the_map_fault() {
    let mut memory = memory();
    assert_eq!(
        memory.fetch(0x0001_0000),
        Err(Signal::Fault(Fault::Page { address: 0x0001_0000 }))
    );
}

#[test]
fn reads_mark_referenced_and_writes_mark_dirty() {
    let mut memory = memory();
    memory.fetch(0x0110).unwrap();
    assert_eq!(memory.read_map(1).unwrap(), (MapFlags::REFERENCED, 0));

    memory.store(0x0210, 7).unwrap();
    assert_eq!(
        memory.read_map(2).unwrap(),
        (MapFlags::REFERENCED | MapFlags::DIRTY, 1)
    );
    assert_eq!(memory.read_real(0x0110).unwrap(), 7);
}

#[test]
fn protected_page_reads_but_refuses_writes() {
    let mut memory = memory();
    memory.write_real(3 * 256 + 4, 0xbeef).unwrap();
    memory.set_map(0x20, 3, MapFlags::PROTECTED).unwrap();

    assert_eq!(memory.fetch(0x2004).unwrap(), 0xbeef);
    assert_eq!(
        memory.store(0x2004, 1),
        Err(Signal::Fault(Fault::WriteProtect { address: 0x2004 }))
    );
    let (flags, _) = memory.read_map(0x20).unwrap();
    assert!(flags.contains(MapFlags::REFERENCED));
    assert!(!flags.contains(MapFlags::DIRTY));
}

#[test]
fn remapping_a_page_drops_cached_translations() {
    let mut memory = memory();
    memory.write_real(4 * 256, 0x1111).unwrap();
    memory.write_real(5 * 256, 0x2222).unwrap();
    memory.set_map(0x30, 4, MapFlags::empty()).unwrap();
    assert_eq!(memory.fetch(0x3000).unwrap(), 0x1111);
    assert_eq!(memory.fetch_code(0x3000).unwrap(), 0x1111);

    memory.set_map(0x30, 5, MapFlags::empty()).unwrap();
    assert_eq!(memory.fetch(0x3000).unwrap(), 0x2222);
    assert_eq!(memory.fetch_code(0x3000).unwrap(), 0x2222);

    memory.set_map(0x30, 0, MapFlags::VACANT).unwrap();
    assert_eq!(memory.fetch(0x3000), Err(Signal::Fault(Fault::Page { address: 0x3000 })));
}

#[test]
fn protecting_a_cached_page_takes_effect() {
    let mut memory = memory();
    memory.store(0x0300, 1).unwrap();
    memory.set_map(3, 2, MapFlags::PROTECTED).unwrap();
    assert_eq!(
        memory.store(0x0300, 2),
        Err(Signal::Fault(Fault::WriteProtect { address: 0x0300 }))
    );
}

#[test]
fn long_store_across_into_vacant_page_writes_nothing() {
    let mut memory = memory();
    memory.store(0x08ff, 0xaaaa).unwrap();
    let result = memory.store_dbl(0x08ff, 0x1234_5678);
    assert_eq!(result, Err(Signal::Fault(Fault::Page { address: 0x0900 })));
    assert_eq!(memory.fetch(0x08ff).unwrap(), 0xaaaa);
}

#[test]
fn long_words_store_low_half_first() {
    let mut memory = memory();
    memory.store_dbl(0x0120, 0xdead_beef).unwrap();
    assert_eq!(memory.fetch(0x0120).unwrap(), 0xbeef);
    assert_eq!(memory.fetch(0x0121).unwrap(), 0xdead);
    assert_eq!(memory.fetch_dbl(0x0120).unwrap(), 0xdead_beef);
}

#[test]
fn field_access_rewrites_only_the_field() {
    let mut memory = memory();
    memory.store(0x0150, 0xabcd).unwrap();
    let spec = FieldSpec::new(4, 4);
    assert_eq!(memory.read_field(0x0150, spec).unwrap(), 0xb);
    memory.write_field(0x0150, spec, 0x3).unwrap();
    assert_eq!(memory.fetch(0x0150).unwrap(), 0xa3cd);
}

#[test]
fn set_map_rejects_out_of_range_pages() {
    let mut memory = memory();
    assert_eq!(
        memory.set_map(0x100, 0, MapFlags::empty()),
        Err(EngineError::VirtualPageOutOfRange(0x100))
    );
    assert_eq!(
        memory.set_map(0x40, 18, MapFlags::empty()),
        Err(EngineError::RealPageOutOfRange(18))
    );
    // display pages sit after normal memory and are mappable
    memory.set_map(0x40, memory.display_base() + 1, MapFlags::empty()).unwrap();
    assert_eq!(memory.translate(0x4001, Access::Write).unwrap(), 17 * 256 + 1);
}

#[test]
fn access_real_memory_stops_at_vacant_page() {
    let mut memory = memory();
    memory.set_map(0x60, 9, MapFlags::empty()).unwrap();
    memory.set_map(0x61, 11, MapFlags::DIRTY).unwrap();
    memory.write_real(9 * 256 + 10, 0x0a0a).unwrap();
    memory.write_real(11 * 256, 0x0b0b).unwrap();

    let mut buffer = [0u16; 600];
    let mut flags = [MapFlags::empty(); 3];
    let copied = memory.access_real_memory(&mut buffer, 10, &mut flags, 0x60);

    assert_eq!(copied, 246 + 256);
    assert_eq!(buffer[0], 0x0a0a);
    assert_eq!(buffer[246], 0x0b0b);
    assert_eq!(flags, [MapFlags::empty(), MapFlags::DIRTY, MapFlags::VACANT]);
    // inspection leaves the flags alone
    assert_eq!(memory.read_map(0x60).unwrap().0, MapFlags::empty());
}

#[test]
fn two_page_machine_round_trip() {
    let mut memory = Memory::new(2, 1, 0);
    memory.set_map(1, 0, MapFlags::empty()).unwrap();
    memory.store(0x0100, 0x1234).unwrap();
    assert_eq!(memory.fetch(0x0100).unwrap(), 0x1234);
    assert_eq!(
        memory.read_map(1).unwrap(),
        (MapFlags::REFERENCED | MapFlags::DIRTY, 0)
    );
}

proptest! {
    #[test]
    fn stored_words_read_back_through_any_mapping(
        page in 1u32..0x100,
        real_page in 0u32..16,
        offset in 0u32..256,
        value: u16,
    ) {
        let mut memory = Memory::new(0x100, 16, 0);
        memory.set_map(page, real_page, MapFlags::empty()).unwrap();
        let address = page << 8 | offset;
        memory.store(address, value).unwrap();
        prop_assert_eq!(memory.fetch(address).unwrap(), value);
        prop_assert_eq!(memory.read_real((real_page * 256 + offset) as usize).unwrap(), value);
        prop_assert_eq!(memory.read_map(page).unwrap().0, MapFlags::REFERENCED | MapFlags::DIRTY);
    }
}
