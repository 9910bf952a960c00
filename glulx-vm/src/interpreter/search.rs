//! The three table-search instructions.
//!
//! Keys compare as big-endian byte strings, which for the fixed sizes 1,
//! 2 and 4 coincides with unsigned numeric comparison.

use glulx_isa::{Fault, SearchOptions};

use crate::error::SimpleResult;
use crate::memory::MemoryMap;

/// Materialize the key operand: either the value itself (sizes 1, 2, 4)
/// or, with `KEY_INDIRECT`, the bytes at its address.
pub(crate) fn fetch_key(
    mem: &MemoryMap,
    key: u32,
    key_size: u32,
    options: SearchOptions,
) -> SimpleResult<Vec<u8>> {
    if options.contains(SearchOptions::KEY_INDIRECT) {
        return Ok(mem.slice(key, key_size)?.to_vec());
    }
    match key_size {
        1 => Ok(vec![key as u8]),
        2 => Ok((key as u16).to_be_bytes().to_vec()),
        4 => Ok(key.to_be_bytes().to_vec()),
        _ => Err(Fault::BadSearchKey),
    }
}

fn key_at(mem: &MemoryMap, addr: u32, key_offset: u32, key_size: u32) -> SimpleResult<&[u8]> {
    let at = addr.checked_add(key_offset).ok_or(Fault::OutOfBounds)?;
    mem.slice(at, key_size)
}

fn missing(options: SearchOptions) -> u32 {
    if options.contains(SearchOptions::RETURN_INDEX) {
        u32::MAX
    } else {
        0
    }
}

/// Scan `num_structs` records (`0xFFFFFFFF` for unbounded) of
/// `struct_size` bytes from `start`.
pub(crate) fn linear(
    mem: &MemoryMap,
    key: &[u8],
    start: u32,
    struct_size: u32,
    num_structs: u32,
    key_offset: u32,
    options: SearchOptions,
) -> SimpleResult<u32> {
    let mut index = 0u32;
    while num_structs == u32::MAX || index < num_structs {
        let addr = start
            .checked_add(index.wrapping_mul(struct_size))
            .ok_or(Fault::OutOfBounds)?;
        let found = key_at(mem, addr, key_offset, key.len() as u32)?;
        if found == key {
            return Ok(if options.contains(SearchOptions::RETURN_INDEX) {
                index
            } else {
                addr
            });
        }
        if options.contains(SearchOptions::ZERO_KEY_TERMINATES) && found.iter().all(|&b| b == 0) {
            break;
        }
        index += 1;
    }
    Ok(missing(options))
}

/// Search `num_structs` records sorted ascending by key.
pub(crate) fn binary(
    mem: &MemoryMap,
    key: &[u8],
    start: u32,
    struct_size: u32,
    num_structs: u32,
    key_offset: u32,
    options: SearchOptions,
) -> SimpleResult<u32> {
    let mut lo = 0u32;
    let mut hi = num_structs;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let addr = start
            .checked_add(mid.wrapping_mul(struct_size))
            .ok_or(Fault::OutOfBounds)?;
        let found = key_at(mem, addr, key_offset, key.len() as u32)?;
        match found.cmp(key) {
            std::cmp::Ordering::Equal => {
                return Ok(if options.contains(SearchOptions::RETURN_INDEX) {
                    mid
                } else {
                    addr
                });
            }
            std::cmp::Ordering::Greater => hi = mid,
            std::cmp::Ordering::Less => lo = mid + 1,
        }
    }
    Ok(missing(options))
}

/// Follow a chain of records linked by the word at `next_offset`; a null
/// link ends the chain. Results are always addresses.
pub(crate) fn linked(
    mem: &MemoryMap,
    key: &[u8],
    start: u32,
    key_offset: u32,
    next_offset: u32,
    options: SearchOptions,
) -> SimpleResult<u32> {
    let mut addr = start;
    while addr != 0 {
        let found = key_at(mem, addr, key_offset, key.len() as u32)?;
        if found == key {
            return Ok(addr);
        }
        if options.contains(SearchOptions::ZERO_KEY_TERMINATES) && found.iter().all(|&b| b == 0) {
            return Ok(0);
        }
        let next = addr.checked_add(next_offset).ok_or(Fault::OutOfBounds)?;
        addr = mem.read_word(next)?;
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(records: &[(u16, u32)]) -> MemoryMap {
        // records of 6 bytes: u16 key, u32 payload, based at 0x100
        let mut image = vec![0u8; 512];
        for (i, &(key, payload)) in records.iter().enumerate() {
            let at = 0x100 + i * 6;
            image[at..at + 2].copy_from_slice(&key.to_be_bytes());
            image[at + 2..at + 6].copy_from_slice(&payload.to_be_bytes());
        }
        MemoryMap::new(&image, 256, 512, 512)
    }

    #[test]
    fn linear_finds_by_address_and_by_index() {
        let mem = table(&[(5, 0), (9, 0), (12, 0)]);
        let key = fetch_key(&mem, 9, 2, SearchOptions::empty()).unwrap();
        assert_eq!(
            linear(&mem, &key, 0x100, 6, 3, 0, SearchOptions::empty()),
            Ok(0x106)
        );
        assert_eq!(
            linear(&mem, &key, 0x100, 6, 3, 0, SearchOptions::RETURN_INDEX),
            Ok(1)
        );
    }

    #[test]
    fn linear_misses_give_zero_or_all_ones() {
        let mem = table(&[(5, 0), (9, 0)]);
        let key = fetch_key(&mem, 6, 2, SearchOptions::empty()).unwrap();
        assert_eq!(
            linear(&mem, &key, 0x100, 6, 2, 0, SearchOptions::empty()),
            Ok(0)
        );
        assert_eq!(
            linear(&mem, &key, 0x100, 6, 2, 0, SearchOptions::RETURN_INDEX),
            Ok(u32::MAX)
        );
    }

    #[test]
    fn linear_zero_key_ends_an_unbounded_scan() {
        let mem = table(&[(5, 0), (0, 0), (9, 0)]);
        let key = fetch_key(&mem, 9, 2, SearchOptions::empty()).unwrap();
        assert_eq!(
            linear(
                &mem,
                &key,
                0x100,
                6,
                u32::MAX,
                0,
                SearchOptions::ZERO_KEY_TERMINATES
            ),
            Ok(0)
        );
    }

    #[test]
    fn binary_search_agrees_with_linear() {
        let records: Vec<(u16, u32)> = (0..32).map(|i| (i * 3 + 1, i as u32)).collect();
        let mem = table(&records);
        for probe in 0..100u32 {
            let key = fetch_key(&mem, probe, 2, SearchOptions::empty()).unwrap();
            let expect = linear(&mem, &key, 0x100, 6, 32, 0, SearchOptions::empty()).unwrap();
            let got = binary(&mem, &key, 0x100, 6, 32, 0, SearchOptions::empty()).unwrap();
            assert_eq!(got, expect, "probe {probe}");
        }
    }

    #[test]
    fn linked_search_follows_the_chain() {
        let mut image = vec![0u8; 512];
        // nodes: u16 key, u16 pad, u32 next
        let mut node = |image: &mut Vec<u8>, at: usize, key: u16, next: u32| {
            image[at..at + 2].copy_from_slice(&key.to_be_bytes());
            image[at + 4..at + 8].copy_from_slice(&next.to_be_bytes());
        };
        node(&mut image, 0x100, 3, 0x140);
        node(&mut image, 0x140, 7, 0x180);
        node(&mut image, 0x180, 11, 0);
        let mem = MemoryMap::new(&image, 256, 512, 512);
        let key = fetch_key(&mem, 7, 2, SearchOptions::empty()).unwrap();
        assert_eq!(
            linked(&mem, &key, 0x100, 0, 4, SearchOptions::empty()),
            Ok(0x140)
        );
        let key = fetch_key(&mem, 8, 2, SearchOptions::empty()).unwrap();
        assert_eq!(
            linked(&mem, &key, 0x100, 0, 4, SearchOptions::empty()),
            Ok(0)
        );
    }

    #[test]
    fn direct_keys_wider_than_a_word_are_rejected() {
        let mem = table(&[]);
        assert_eq!(
            fetch_key(&mem, 1, 8, SearchOptions::empty()),
            Err(Fault::BadSearchKey)
        );
    }
}
