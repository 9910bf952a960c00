//! The `malloc`/`mfree` heap, layered above memory resizing.

use std::collections::BTreeMap;

use crate::consts::MEM_ALIGN;
use crate::error::SimpleResult;
use crate::glk::GlkDispatch;

use super::Interpreter;

/// Allocation state: the address where the heap began (the end of memory
/// at first allocation) and the live blocks, keyed by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Heap {
    start: u32,
    blocks: BTreeMap<u32, u32>,
}

impl Heap {
    /// Heap start address, zero while inactive.
    pub(crate) const fn start(&self) -> u32 {
        self.start
    }

    pub(crate) const fn active(&self) -> bool {
        self.start != 0
    }

    /// Live blocks in address order.
    pub(crate) fn blocks(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.blocks.iter().map(|(&a, &l)| (a, l))
    }

    /// Reinstate heap state from a snapshot.
    pub(crate) fn restore(&mut self, start: u32, blocks: &[(u32, u32)]) {
        self.start = start;
        self.blocks = blocks.iter().copied().collect();
    }

    /// First gap of at least `len` bytes, or the address just past the
    /// last block.
    fn find_gap(&self, len: u32) -> Option<u32> {
        let mut cursor = self.start;
        for (&addr, &block_len) in &self.blocks {
            if addr.checked_sub(cursor)? >= len {
                return Some(cursor);
            }
            cursor = addr.checked_add(block_len)?;
        }
        Some(cursor)
    }
}

impl<G: GlkDispatch> Interpreter<G> {
    /// `malloc`: reserve `len` bytes on the heap, growing memory when no
    /// gap fits. Returns zero on failure.
    pub(crate) fn op_malloc(&mut self, len: u32) -> SimpleResult<u32> {
        if len == 0 {
            return Ok(0);
        }
        if !self.heap.active() {
            self.heap.start = self.mem.endmem();
        }
        let Some(addr) = self.heap.find_gap(len) else {
            return Ok(0);
        };
        let Some(end) = addr.checked_add(len) else {
            return Ok(0);
        };
        if end > self.mem.endmem() {
            let target = end.next_multiple_of(MEM_ALIGN);
            if self.mem.set_memsize(target).is_err() {
                if self.heap.blocks.is_empty() {
                    self.heap.start = 0;
                }
                return Ok(0);
            }
        }
        self.heap.blocks.insert(addr, len);
        Ok(addr)
    }

    /// `mfree`: release the block at `addr`. Freeing the last block
    /// deactivates the heap and gives the memory back.
    pub(crate) fn op_mfree(&mut self, addr: u32) -> SimpleResult<()> {
        if self.heap.blocks.remove(&addr).is_none() {
            tracing::warn!(addr = format_args!("{addr:#x}"), "mfree of unallocated block");
            return Ok(());
        }
        if self.heap.blocks.is_empty() {
            let start = self.heap.start;
            self.heap.start = 0;
            self.mem.set_memsize(start.max(self.mem.extstart()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Interpreter;
    use crate::glk::NullGlk;
    use crate::params::VmParams;
    use crate::util::ImageBuilder;

    fn vm() -> Interpreter<NullGlk> {
        let mut b = ImageBuilder::new();
        let f = b.func_stack_args(&[], &[0x81, 0x20]); // quit
        b.set_start(f);
        Interpreter::new(b.finish(), NullGlk, VmParams::default()).unwrap()
    }

    #[test]
    fn the_heap_starts_at_the_end_of_memory() {
        let mut vm = vm();
        let original = vm.memory().endmem();
        assert!(!vm.heap.active());
        let addr = vm.op_malloc(64).unwrap();
        assert_eq!(addr, original);
        assert_eq!(vm.heap.start(), original);
        assert!(vm.memory().endmem() > original);
    }

    #[test]
    fn freeing_the_last_block_deactivates_and_shrinks() {
        let mut vm = vm();
        let original = vm.memory().endmem();
        let a = vm.op_malloc(64).unwrap();
        let b = vm.op_malloc(64).unwrap();
        vm.op_mfree(a).unwrap();
        assert!(vm.heap.active());
        vm.op_mfree(b).unwrap();
        assert!(!vm.heap.active());
        assert_eq!(vm.memory().endmem(), original);
    }

    #[test]
    fn a_freed_gap_is_reused_first_fit() {
        let mut vm = vm();
        let a = vm.op_malloc(64).unwrap();
        let b = vm.op_malloc(64).unwrap();
        let c = vm.op_malloc(64).unwrap();
        assert_eq!(b, a + 64);
        assert_eq!(c, b + 64);
        vm.op_mfree(b).unwrap();
        // too wide for the gap: placed past the last block
        assert_eq!(vm.op_malloc(100).unwrap(), c + 64);
        // fits: lands at the start of the freed gap
        assert_eq!(vm.op_malloc(48).unwrap(), b);
    }

    #[test]
    fn freeing_an_unallocated_address_changes_nothing() {
        let mut vm = vm();
        let a = vm.op_malloc(16).unwrap();
        let grown = vm.memory().endmem();
        vm.op_mfree(a + 4).unwrap();
        assert!(vm.heap.active());
        assert_eq!(vm.memory().endmem(), grown);
        vm.op_mfree(a).unwrap();
        assert!(!vm.heap.active());
    }

    #[test]
    fn zero_length_allocations_fail() {
        let mut vm = vm();
        assert_eq!(vm.op_malloc(0).unwrap(), 0);
        assert!(!vm.heap.active());
    }
}
