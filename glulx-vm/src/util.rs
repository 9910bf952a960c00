//! Test helpers: a tiny image assembler and a recording provider.
//!
//! Tools in this module are only present when the `test-helpers` feature
//! is on.

use std::collections::HashMap;

use glulx_isa::glk as glksel;

use crate::consts::{HEADER_LEN, MEM_ALIGN};
use crate::glk::{GlkDispatch, GlkVm};
use crate::header::Header;

fn align(value: u32) -> u32 {
    value.next_multiple_of(MEM_ALIGN)
}

/// Assembles a minimal machine image: code into ROM, optional data into
/// RAM, header and checksum computed at the end.
#[derive(Debug, Default)]
pub struct ImageBuilder {
    rom: Vec<u8>,
    ram: Option<Vec<u8>>,
    ramstart: u32,
    start_func: u32,
    string_table: u32,
    stack_size: u32,
    extra_mem: u32,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            stack_size: 1024,
            ..Self::default()
        }
    }

    /// Append raw bytes to ROM, returning their address.
    pub fn code(&mut self, bytes: &[u8]) -> u32 {
        assert!(self.ram.is_none(), "ROM is sealed once RAM data is added");
        let addr = HEADER_LEN + self.rom.len() as u32;
        self.rom.extend_from_slice(bytes);
        addr
    }

    /// Zero-pad ROM so the next appended byte lands at `addr`.
    pub fn pad_to(&mut self, addr: u32) {
        assert!(self.ram.is_none(), "ROM is sealed once RAM data is added");
        let current = HEADER_LEN + self.rom.len() as u32;
        assert!(addr >= current, "cannot pad backwards to {addr:#x}");
        self.rom.resize((addr - HEADER_LEN) as usize, 0);
    }

    /// Append a stack-argument function: type byte, locals descriptor,
    /// body. Returns its address.
    pub fn func_stack_args(&mut self, locals: &[(u8, u8)], body: &[u8]) -> u32 {
        self.func(glulx_isa::TYPE_FUNC_STACK_ARGS, locals, body)
    }

    /// Append a local-argument function.
    pub fn func_local_args(&mut self, locals: &[(u8, u8)], body: &[u8]) -> u32 {
        self.func(glulx_isa::TYPE_FUNC_LOCAL_ARGS, locals, body)
    }

    fn func(&mut self, type_byte: u8, locals: &[(u8, u8)], body: &[u8]) -> u32 {
        let mut bytes = vec![type_byte];
        for &(size, count) in locals {
            bytes.push(size);
            bytes.push(count);
        }
        bytes.push(0);
        bytes.push(0);
        bytes.extend_from_slice(body);
        self.code(&bytes)
    }

    /// Append data bytes to RAM, returning their address. The first call
    /// seals ROM.
    pub fn ram_bytes(&mut self, bytes: &[u8]) -> u32 {
        if self.ram.is_none() {
            self.ramstart = align(HEADER_LEN + self.rom.len() as u32);
            self.ram = Some(Vec::new());
        }
        let ram = self.ram.as_mut().expect("just initialized");
        let addr = self.ramstart + ram.len() as u32;
        ram.extend_from_slice(bytes);
        addr
    }

    pub fn set_start(&mut self, addr: u32) {
        self.start_func = addr;
    }

    pub fn set_string_table(&mut self, addr: u32) {
        self.string_table = addr;
    }

    pub fn set_stack_size(&mut self, bytes: u32) {
        self.stack_size = bytes;
    }

    /// Reserve `bytes` of zeroed memory beyond the image.
    pub fn extra_memory(&mut self, bytes: u32) {
        self.extra_mem = bytes;
    }

    /// Lay out the final image with a valid header and checksum.
    pub fn finish(mut self) -> Vec<u8> {
        if self.ram.is_none() {
            self.ramstart = align(HEADER_LEN + self.rom.len() as u32);
            self.ram = Some(Vec::new());
        }
        let ram = self.ram.take().expect("just ensured");
        let extstart = align(self.ramstart + ram.len() as u32);
        let endmem = extstart + align(self.extra_mem);

        let mut image = vec![0u8; extstart as usize];
        image[HEADER_LEN as usize..HEADER_LEN as usize + self.rom.len()]
            .copy_from_slice(&self.rom);
        image[self.ramstart as usize..self.ramstart as usize + ram.len()]
            .copy_from_slice(&ram);

        let mut put = |off: usize, value: u32| {
            image[off..off + 4].copy_from_slice(&value.to_be_bytes());
        };
        put(0x00, glulx_isa::MAGIC);
        put(0x04, 0x0003_0102);
        put(0x08, self.ramstart);
        put(0x0C, extstart);
        put(0x10, endmem);
        put(0x14, self.stack_size);
        put(0x18, self.start_func);
        put(0x1C, self.string_table);

        let sum = Header::compute_checksum(&image);
        image[0x20..0x24].copy_from_slice(&sum.to_be_bytes());
        image
    }
}

/// A provider that records printed characters and serves in-memory byte
/// streams, enough Glk for the test suites.
#[derive(Debug, Default)]
pub struct RecordingGlk {
    /// Every character put, in order.
    pub output: Vec<u32>,
    /// Byte streams keyed by stream id: contents and read cursor.
    pub streams: HashMap<u32, (Vec<u8>, usize)>,
}

impl RecordingGlk {
    /// The recorded output as a string, lossy outside Unicode range.
    pub fn output_string(&self) -> String {
        self.output
            .iter()
            .map(|&ch| char::from_u32(ch).unwrap_or('\u{FFFD}'))
            .collect()
    }
}

impl GlkDispatch for RecordingGlk {
    fn dispatch(&mut self, _vm: &mut GlkVm<'_>, selector: u32, args: &[u32]) -> u32 {
        match selector {
            glksel::PUT_CHAR | glksel::PUT_CHAR_UNI => {
                self.output.push(args[0]);
                0
            }
            glksel::PUT_CHAR_STREAM => {
                let entry = self.streams.entry(args[0]).or_default();
                entry.0.push(args[1] as u8);
                0
            }
            glksel::GET_CHAR_STREAM => {
                let entry = self.streams.entry(args[0]).or_default();
                match entry.0.get(entry.1) {
                    Some(&byte) => {
                        entry.1 += 1;
                        byte as u32
                    }
                    None => u32::MAX,
                }
            }
            _ => 0,
        }
    }
}
