//! Serialized machine state: a Quetzal-flavoured IFF container, plus the
//! in-memory undo ring.
//!
//! Layout: `FORM`/`IFZS` holding `IFhd` (game identity, the first 128
//! bytes of the image), `CMem` (RAM delta against the pristine image,
//! XOR-RLE compressed, prefixed by the memory size) or `UMem` (raw),
//! `Stks` (the raw stack), `MAll` (heap state, when active), and the
//! extension chunks `XIos` (I/O system, rock, string table) and `XRnd`
//! (random seed). Writers always emit `CMem`; readers accept both memory
//! chunk forms. A reader missing the extension chunks falls back to
//! defaults.

use std::collections::VecDeque;

use glulx_isa::Fault;

use crate::consts::MEM_ALIGN;
use crate::error::SimpleResult;
use crate::header::Header;

const FORM: &[u8; 4] = b"FORM";
const IFZS: &[u8; 4] = b"IFZS";
const IFHD: &[u8; 4] = b"IFhd";
const CMEM: &[u8; 4] = b"CMem";
const UMEM: &[u8; 4] = b"UMem";
const STKS: &[u8; 4] = b"Stks";
const MALL: &[u8; 4] = b"MAll";
const XIOS: &[u8; 4] = b"XIos";
const XRND: &[u8; 4] = b"XRnd";

/// Length of the identity chunk.
const IFHD_LEN: usize = 128;

/// Everything needed to reconstruct a paused machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Memory size at capture time.
    pub(crate) endmem: u32,
    /// Raw RAM contents, `[ramstart, endmem)`.
    pub(crate) ram: Vec<u8>,
    /// Raw stack contents below the stack pointer.
    pub(crate) stack: Vec<u8>,
    /// Heap start and blocks, when the heap was active.
    pub(crate) heap: Option<(u32, Vec<(u32, u32)>)>,
    /// I/O system mode and rock.
    pub(crate) iosys: (u32, u32),
    /// Selected string-decoding table.
    pub(crate) string_table: u32,
    /// Explicit random seed, zero for entropy.
    pub(crate) rng_seed: u32,
}

fn put_chunk(out: &mut Vec<u8>, id: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
}

/// Pristine byte underlying RAM offset `i`: image data up to `extstart`,
/// zeros beyond.
fn pristine_ram_byte(pristine: &[u8], header: &Header, i: usize) -> u8 {
    let addr = header.ramstart() as usize + i;
    if addr < header.extstart() as usize {
        pristine[addr]
    } else {
        0
    }
}

fn compress_ram(snap: &Snapshot, pristine: &[u8], header: &Header) -> Vec<u8> {
    let mut out = snap.endmem.to_be_bytes().to_vec();
    let mut zero_run = 0u32;
    for (i, &byte) in snap.ram.iter().enumerate() {
        let delta = byte ^ pristine_ram_byte(pristine, header, i);
        if delta == 0 {
            zero_run += 1;
            continue;
        }
        while zero_run > 0 {
            let run = zero_run.min(256);
            out.push(0);
            out.push((run - 1) as u8);
            zero_run -= run;
        }
        out.push(delta);
    }
    // trailing zeros are implicit
    out
}

fn expand_ram(
    payload: &[u8],
    pristine: &[u8],
    header: &Header,
) -> SimpleResult<(u32, Vec<u8>)> {
    if payload.len() < 4 {
        return Err(Fault::BadSaveData);
    }
    let endmem = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    if endmem < header.extstart() || endmem % MEM_ALIGN != 0 {
        return Err(Fault::BadSaveData);
    }
    let ram_len = (endmem - header.ramstart()) as usize;
    let mut ram: Vec<u8> = (0..ram_len)
        .map(|i| pristine_ram_byte(pristine, header, i))
        .collect();
    let mut i = 0usize;
    let mut data = payload[4..].iter();
    while let Some(&byte) = data.next() {
        if byte == 0 {
            let run = *data.next().ok_or(Fault::BadSaveData)? as usize + 1;
            i += run;
            continue;
        }
        if i >= ram_len {
            return Err(Fault::BadSaveData);
        }
        ram[i] ^= byte;
        i += 1;
    }
    if i > ram_len {
        return Err(Fault::BadSaveData);
    }
    Ok((endmem, ram))
}

/// Serialize a snapshot.
pub fn write_quetzal(snap: &Snapshot, pristine: &[u8], header: &Header) -> Vec<u8> {
    let mut body = IFZS.to_vec();

    let mut ifhd = [0u8; IFHD_LEN];
    let id_len = pristine.len().min(IFHD_LEN);
    ifhd[..id_len].copy_from_slice(&pristine[..id_len]);
    put_chunk(&mut body, IFHD, &ifhd);

    put_chunk(&mut body, CMEM, &compress_ram(snap, pristine, header));
    put_chunk(&mut body, STKS, &snap.stack);

    if let Some((start, blocks)) = &snap.heap {
        let mut payload = start.to_be_bytes().to_vec();
        payload.extend_from_slice(&(blocks.len() as u32).to_be_bytes());
        for &(addr, len) in blocks {
            payload.extend_from_slice(&addr.to_be_bytes());
            payload.extend_from_slice(&len.to_be_bytes());
        }
        put_chunk(&mut body, MALL, &payload);
    }

    let mut xios = Vec::new();
    xios.extend_from_slice(&snap.iosys.0.to_be_bytes());
    xios.extend_from_slice(&snap.iosys.1.to_be_bytes());
    xios.extend_from_slice(&snap.string_table.to_be_bytes());
    put_chunk(&mut body, XIOS, &xios);
    put_chunk(&mut body, XRND, &snap.rng_seed.to_be_bytes());

    let mut out = FORM.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// Parse serialized state, rejecting containers for a different game.
pub fn read_quetzal(data: &[u8], pristine: &[u8], header: &Header) -> SimpleResult<Snapshot> {
    if data.len() < 12 || &data[0..4] != FORM || &data[8..12] != IFZS {
        return Err(Fault::BadSaveData);
    }
    let form_len = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
    if form_len + 8 > data.len() {
        return Err(Fault::BadSaveData);
    }

    let mut mem: Option<(u32, Vec<u8>)> = None;
    let mut stack: Option<Vec<u8>> = None;
    let mut heap = None;
    let mut iosys = (0, 0);
    let mut string_table = header.string_table();
    let mut rng_seed = 0;
    let mut identity_seen = false;

    let mut pos = 12usize;
    while pos + 8 <= form_len + 8 {
        let id: [u8; 4] = data[pos..pos + 4].try_into().map_err(|_| Fault::BadSaveData)?;
        let len =
            u32::from_be_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                as usize;
        pos += 8;
        if pos + len > data.len() {
            return Err(Fault::BadSaveData);
        }
        let payload = &data[pos..pos + len];
        pos += len + len % 2;

        match &id {
            id if id == IFHD => {
                let id_len = pristine.len().min(IFHD_LEN).min(payload.len());
                if payload[..id_len] != pristine[..id_len] {
                    return Err(Fault::BadSaveData);
                }
                identity_seen = true;
            }
            id if id == CMEM => mem = Some(expand_ram(payload, pristine, header)?),
            id if id == UMEM => {
                let endmem = header
                    .ramstart()
                    .checked_add(payload.len() as u32)
                    .ok_or(Fault::BadSaveData)?;
                if endmem < header.extstart() || endmem % MEM_ALIGN != 0 {
                    return Err(Fault::BadSaveData);
                }
                mem = Some((endmem, payload.to_vec()));
            }
            id if id == STKS => {
                if payload.len() % 4 != 0 {
                    return Err(Fault::BadSaveData);
                }
                stack = Some(payload.to_vec());
            }
            id if id == MALL => {
                if payload.len() < 8 {
                    return Err(Fault::BadSaveData);
                }
                let start =
                    u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let count =
                    u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]) as usize;
                if payload.len() != 8 + count * 8 {
                    return Err(Fault::BadSaveData);
                }
                let blocks = payload[8..]
                    .chunks_exact(8)
                    .map(|c| {
                        (
                            u32::from_be_bytes([c[0], c[1], c[2], c[3]]),
                            u32::from_be_bytes([c[4], c[5], c[6], c[7]]),
                        )
                    })
                    .collect();
                heap = Some((start, blocks));
            }
            id if id == XIOS => {
                if payload.len() != 12 {
                    return Err(Fault::BadSaveData);
                }
                iosys = (
                    u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
                    u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]),
                );
                string_table =
                    u32::from_be_bytes([payload[8], payload[9], payload[10], payload[11]]);
            }
            id if id == XRND => {
                if payload.len() != 4 {
                    return Err(Fault::BadSaveData);
                }
                rng_seed = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
            }
            _ => {} // unknown chunks are skipped
        }
    }

    let (endmem, ram) = mem.ok_or(Fault::BadSaveData)?;
    let stack = stack.ok_or(Fault::BadSaveData)?;
    if !identity_seen {
        return Err(Fault::BadSaveData);
    }
    Ok(Snapshot {
        endmem,
        ram,
        stack,
        heap,
        iosys,
        string_table,
        rng_seed,
    })
}

/// Bounded ring of undo snapshots, newest last.
#[derive(Debug, Clone, Default)]
pub(crate) struct UndoRing {
    capacity: usize,
    snapshots: VecDeque<Snapshot>,
}

impl UndoRing {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            snapshots: VecDeque::new(),
        }
    }

    pub(crate) fn push(&mut self, snap: Snapshot) {
        if self.capacity == 0 {
            return;
        }
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snap);
    }

    pub(crate) fn pop(&mut self) -> Option<Snapshot> {
        self.snapshots.pop_back()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
