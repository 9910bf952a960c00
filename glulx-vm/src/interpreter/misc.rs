//! Gestalt, randomness, verification, protection, restart, and the
//! save/undo instructions.

use glulx_isa::{gestalt, Fault};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use super::decode::Dest;
use super::Interpreter;
use crate::consts::TERP_VERSION;
use crate::error::SimpleResult;
use crate::glk::GlkDispatch;
use crate::header::Header;
use crate::memory::MemoryMap;
use crate::save::{self, Snapshot};

/// The machine's random stream: seeded deterministically or from
/// entropy. The seed is remembered so serialized state can reproduce the
/// stream's origin.
#[derive(Debug, Clone)]
pub(crate) struct VmRng {
    rng: StdRng,
    seed: u32,
}

impl Default for VmRng {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: 0,
        }
    }
}

impl VmRng {
    /// Reseed: zero switches back to entropy.
    pub(crate) fn reseed(&mut self, seed: u32) {
        self.seed = seed;
        self.rng = if seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(seed as u64)
        };
    }

    /// The last explicit seed, zero for entropy.
    pub(crate) const fn seed(&self) -> u32 {
        self.seed
    }

    /// `random L1`: full range for zero, `[0, L1)` for positive,
    /// `(L1, 0]` for negative.
    pub(crate) fn next(&mut self, range: u32) -> u32 {
        let range = range as i32;
        match range {
            0 => self.rng.next_u32(),
            r if r > 0 => self.rng.gen_range(0..r) as u32,
            r => {
                let magnitude = self.rng.gen_range(0..-(r as i64)) as i32;
                (-magnitude) as u32
            }
        }
    }
}

impl<G: GlkDispatch> Interpreter<G> {
    /// `gestalt`: report a machine capability.
    pub(crate) fn op_gestalt(&mut self, selector: u32, extra: u32) -> u32 {
        match selector {
            gestalt::GLULX_VERSION => glulx_isa::SPEC_VERSION,
            gestalt::TERP_VERSION => TERP_VERSION,
            gestalt::RESIZE_MEM
            | gestalt::UNDO
            | gestalt::UNICODE
            | gestalt::MEM_COPY
            | gestalt::MALLOC
            | gestalt::ACCELERATION
            | gestalt::FLOAT
            | gestalt::EXT_UNDO
            | gestalt::DOUBLE => 1,
            gestalt::IO_SYSTEM => matches!(extra, 0 | 1 | 2) as u32,
            gestalt::MALLOC_HEAP => self.heap.start(),
            gestalt::ACCEL_FUNC => super::accel::Accel::supported(extra) as u32,
            _ => 0,
        }
    }

    /// `verify`: recompute the checksum over the pristine image.
    pub(crate) fn op_verify(&self) -> u32 {
        let sum = Header::compute_checksum(&self.pristine);
        (sum != self.header.checksum()) as u32
    }

    /// `protect`: exempt a range from restore and restart. A zero length
    /// clears the protection.
    pub(crate) fn op_protect(&mut self, addr: u32, len: u32) {
        self.protect = if len == 0 { None } else { Some((addr, len)) };
    }

    /// `debugtrap` is fatal, carrying its argument.
    pub(crate) fn op_debugtrap(&self, arg: u32) -> Fault {
        Fault::UserDebugTrap(arg)
    }

    /// `restart`: rebuild memory from the pristine image (outside any
    /// protected range), clear the stack and heap, and re-enter the start
    /// function. The I/O system, undo ring and acceleration survive.
    pub(crate) fn op_restart(&mut self) -> SimpleResult<()> {
        let protected = self.protected_bytes();
        self.mem = MemoryMap::new(
            &self.pristine,
            self.header.ramstart(),
            self.header.extstart(),
            self.header.endmem(),
        );
        self.restore_protected(protected);
        self.heap = Default::default();
        self.string_table
            .select(&self.mem, self.header.string_table())?;
        self.stack.clear();
        self.enter_function(self.header.start_func(), &[])
    }

    fn protected_bytes(&self) -> Option<(u32, Vec<u8>)> {
        let (addr, len) = self.protect?;
        let bytes = self.mem.slice(addr, len).ok()?.to_vec();
        Some((addr, bytes))
    }

    fn restore_protected(&mut self, saved: Option<(u32, Vec<u8>)>) {
        if let Some((addr, bytes)) = saved {
            // best effort: the range may no longer fit the resized map
            let _ = self.mem.write_slice(addr, &bytes);
        }
    }

    fn take_snapshot(&self) -> Snapshot {
        Snapshot {
            endmem: self.mem.endmem(),
            ram: self
                .mem
                .slice(self.mem.ramstart(), self.mem.endmem() - self.mem.ramstart())
                .expect("ram range is always readable")
                .to_vec(),
            stack: self.stack.contents().to_vec(),
            heap: if self.heap.active() {
                Some((self.heap.start(), self.heap.blocks().collect()))
            } else {
                None
            },
            iosys: (self.iosys.mode(), self.iosys.rock()),
            string_table: self.string_table.addr(),
            rng_seed: self.rng.seed(),
        }
    }

    /// Replace machine state with a snapshot, honoring the protect range,
    /// and deliver `result` through the stub on top of the restored
    /// stack.
    fn apply_snapshot(&mut self, snap: Snapshot, result: u32) -> SimpleResult<()> {
        let expected = snap
            .endmem
            .checked_sub(self.mem.ramstart())
            .ok_or(Fault::BadSaveData)?;
        if snap.ram.len() as u32 != expected {
            return Err(Fault::BadSaveData);
        }
        let protected = self.protected_bytes();
        self.mem.set_memsize(snap.endmem)?;
        self.mem.write_slice(self.mem.ramstart(), &snap.ram)?;
        self.restore_protected(protected);
        self.stack.restore_contents(&snap.stack)?;
        match snap.heap {
            Some((start, ref blocks)) => self.heap.restore(start, blocks),
            None => self.heap = Default::default(),
        }
        self.set_iosys(snap.iosys.0, snap.iosys.1);
        self.string_table.select(&self.mem, snap.string_table)?;
        if snap.rng_seed != 0 {
            self.rng.reseed(snap.rng_seed);
        }
        let stub = self.stack.pop_call_stub()?;
        self.apply_return_stub(stub, result)
    }

    /// `save`: serialize through the provider's stream, one byte per
    /// dispatch call so the boundary stays the only interface.
    pub(crate) fn op_save(&mut self, stream: u32, dest: Dest) -> SimpleResult<()> {
        let (dest_type, dest_addr) = dest.stub_parts();
        self.stack.push_call_stub(dest_type, dest_addr, self.pc)?;
        let data = save::write_quetzal(&self.take_snapshot(), &self.pristine, &self.header);
        for byte in data {
            self.dispatch_glk(glulx_isa::glk::PUT_CHAR_STREAM, &[stream, byte as u32]);
        }
        let stub = self.stack.pop_call_stub()?;
        self.apply_return_stub(stub, 0)
    }

    /// `restore`: read the provider's stream to exhaustion and apply it.
    /// Failure stores 1 and execution continues here; success resumes at
    /// the save point with -1.
    pub(crate) fn op_restore(&mut self, stream: u32, dest: Dest) -> SimpleResult<()> {
        let mut data = Vec::new();
        loop {
            let ch = self.dispatch_glk(glulx_isa::glk::GET_CHAR_STREAM, &[stream]);
            if ch == u32::MAX {
                break;
            }
            data.push(ch as u8);
        }
        match save::read_quetzal(&data, &self.pristine, &self.header) {
            Ok(snap) => self.apply_snapshot(snap, u32::MAX),
            Err(fault) => {
                tracing::debug!(%fault, "restore rejected");
                self.store(dest, 1)
            }
        }
    }

    /// `saveundo`.
    pub(crate) fn op_saveundo(&mut self, dest: Dest) -> SimpleResult<()> {
        let (dest_type, dest_addr) = dest.stub_parts();
        self.stack.push_call_stub(dest_type, dest_addr, self.pc)?;
        let snap = self.take_snapshot();
        self.undo.push(snap);
        let stub = self.stack.pop_call_stub()?;
        self.apply_return_stub(stub, 0)
    }

    /// `restoreundo`.
    pub(crate) fn op_restoreundo(&mut self, dest: Dest) -> SimpleResult<()> {
        match self.undo.pop() {
            Some(snap) => self.apply_snapshot(snap, u32::MAX),
            None => self.store(dest, 1),
        }
    }

    /// `hasundo`: zero when a snapshot is available.
    pub(crate) fn op_hasundo(&self) -> u32 {
        u32::from(self.undo.is_empty())
    }

    /// `discardundo`.
    pub(crate) fn op_discardundo(&mut self) {
        self.undo.pop();
    }

    /// `setstringtbl`.
    pub(crate) fn op_setstringtbl(&mut self, addr: u32) -> SimpleResult<()> {
        self.string_table.select(&self.mem, addr)
    }

    /// `getstringtbl`.
    pub(crate) fn op_getstringtbl(&self) -> u32 {
        self.string_table.addr()
    }

    /// `random` / `setrandom`.
    pub(crate) fn op_random(&mut self, range: u32) -> u32 {
        self.rng.next(range)
    }

    pub(crate) fn op_setrandom(&mut self, seed: u32) {
        self.rng.reseed(seed);
    }
}
