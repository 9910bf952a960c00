//! Property tests over the memory and stack contracts.

use glulx_vm::prelude::*;
use glulx_vm::stack::LocalsLayout;
use quickcheck_macros::quickcheck;

/// 256 bytes of ROM, 256 bytes of RAM seeded from `data`.
fn map_with(data: &[u8]) -> MemoryMap {
    let mut image = vec![0u8; 512];
    for (i, &b) in data.iter().take(256).enumerate() {
        image[256 + i] = b;
    }
    MemoryMap::new(&image, 256, 512, 512)
}

fn ram_snapshot(mem: &MemoryMap) -> Vec<u8> {
    mem.slice(256, 256).unwrap().to_vec()
}

#[quickcheck]
fn mcopy_onto_itself_changes_nothing(data: Vec<u8>, addr: u8, len: u8) -> bool {
    let mut mem = map_with(&data);
    let addr = 256 + (addr as u32 % 128);
    let len = len as u32 % 128;
    let before = ram_snapshot(&mem);
    mem.mcopy(len, addr, addr).unwrap();
    ram_snapshot(&mem) == before
}

#[quickcheck]
fn mcopy_pairs_restore_disjoint_sources(data: Vec<u8>, len: u8) -> bool {
    let mut mem = map_with(&data);
    // two disjoint 64-byte-max windows
    let len = len as u32 % 64;
    let a = 256u32;
    let b = 384u32;
    let a_before = mem.slice(a, len).unwrap().to_vec();
    mem.mcopy(len, a, b).unwrap();
    mem.mcopy(len, b, a).unwrap();
    mem.slice(a, len).unwrap() == a_before
}

#[quickcheck]
fn mcopy_forward_equals_snapshot_copy(data: Vec<u8>, src_off: u8, dst_off: u8, len: u8) -> bool {
    let mut mem = map_with(&data);
    let src = 256 + (src_off as u32 % 128);
    let dst = 256 + (dst_off as u32 % 128);
    let len = len as u32 % 128;
    let snapshot = mem.slice(src, len).unwrap().to_vec();
    mem.mcopy(len, src, dst).unwrap();
    mem.slice(dst, len).unwrap() == snapshot
}

#[quickcheck]
fn setmemsize_to_the_current_size_is_a_noop(data: Vec<u8>) -> bool {
    let mut mem = map_with(&data);
    let before = ram_snapshot(&mem);
    mem.set_memsize(mem.endmem()).unwrap();
    mem.endmem() == 512 && ram_snapshot(&mem) == before
}

#[quickcheck]
fn setmemsize_round_trip_preserves_the_low_bytes(data: Vec<u8>, grow: u8) -> bool {
    let mut mem = map_with(&data);
    let before = ram_snapshot(&mem);
    let target = 512 + 256 * (1 + grow as u32 % 4);
    mem.set_memsize(target).unwrap();
    mem.set_memsize(512).unwrap();
    ram_snapshot(&mem) == before
}

#[quickcheck]
fn push_pop_round_trips_the_stack_pointer(values: Vec<u32>) -> bool {
    let mut stack = Stack::new(8192);
    let layout = LocalsLayout::from_pairs(&[]).unwrap();
    stack.push_frame(&layout).unwrap();
    let values: Vec<u32> = values.into_iter().take(512).collect();
    let sp = stack.sp();
    for &v in &values {
        stack.push32(v).unwrap();
    }
    for &v in values.iter().rev() {
        if stack.pop32() != Ok(v) {
            return false;
        }
    }
    stack.sp() == sp
}

#[quickcheck]
fn frame_round_trips_bit_for_bit(pairs: Vec<(u8, u8)>) -> bool {
    // constrain sizes to the legal set and keep the frame modest
    let pairs: Vec<(u8, u8)> = pairs
        .into_iter()
        .take(6)
        .map(|(size, count)| ([1u8, 2, 4][size as usize % 3], count % 8))
        .collect();
    let mut stack = Stack::new(8192);
    let outer = LocalsLayout::from_pairs(&[(4, 2)]).unwrap();
    stack.push_frame(&outer).unwrap();
    stack.push32(0xAAAA_5555).unwrap();
    let snapshot = (
        stack.sp(),
        stack.fp(),
        stack.localsbase(),
        stack.valstackbase(),
    );

    stack.push_call_stub(0, 0, 0x1234).unwrap();
    let inner = LocalsLayout::from_pairs(&pairs).unwrap();
    stack.push_frame(&inner).unwrap();
    stack.discard_frame();
    let stub = stack.pop_call_stub().unwrap();
    stack.restore_frame(stub.fp).unwrap();

    snapshot
        == (
            stack.sp(),
            stack.fp(),
            stack.localsbase(),
            stack.valstackbase(),
        )
}

#[quickcheck]
fn stkroll_by_the_count_is_identity(values: Vec<u32>) -> bool {
    let values: Vec<u32> = values.into_iter().take(64).collect();
    let mut stack = Stack::new(8192);
    let layout = LocalsLayout::from_pairs(&[]).unwrap();
    stack.push_frame(&layout).unwrap();
    for &v in &values {
        stack.push32(v).unwrap();
    }
    let n = values.len() as u32;
    stack.stkroll(n, n).unwrap();
    values
        .iter()
        .rev()
        .enumerate()
        .all(|(i, &v)| stack.peek32(i as u32) == Ok(v))
}
