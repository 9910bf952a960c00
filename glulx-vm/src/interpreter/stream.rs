//! Output streaming: the three I/O systems and the suspending string
//! printer.
//!
//! Printing a string is conceptually an iterator that can yield to
//! arbitrary machine code — a filter function per character, or a
//! function referenced from the decoding table — and resume exactly where
//! it stopped. The suspension state `(string address, bit number)` is
//! parked in a call stub; the return dispatcher in `flow` feeds it back
//! into [`Interpreter::stream_string`].

use glulx_isa::{glk as glksel, DestType, Fault, ObjectKind, TYPE_STRING_BYTES,
    TYPE_STRING_COMPRESSED, TYPE_STRING_UNICODE};

use super::Interpreter;
use crate::error::SimpleResult;
use crate::glk::GlkDispatch;
use crate::strings::{object_kind, StrNode};

/// The selected I/O system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoSys {
    /// Mode 0: printed characters vanish.
    #[default]
    Null,
    /// Mode 1: every character is handed to a machine function.
    Filter {
        /// Address of the filter function.
        func: u32,
    },
    /// Mode 2: characters flow to the presentation provider.
    Glk,
}

impl IoSys {
    /// Build from the `setiosys` operands. Unknown modes fall back to
    /// null; the Glk rock is pinned to zero.
    pub fn from_raw(mode: u32, rock: u32) -> Self {
        match mode {
            1 => Self::Filter { func: rock },
            2 => Self::Glk,
            _ => Self::Null,
        }
    }

    /// The numeric mode, as `getiosys` reports it.
    pub const fn mode(self) -> u32 {
        match self {
            Self::Null => 0,
            Self::Filter { .. } => 1,
            Self::Glk => 2,
        }
    }

    /// The rock, as `getiosys` reports it.
    pub const fn rock(self) -> u32 {
        match self {
            Self::Filter { func } => func,
            _ => 0,
        }
    }
}

/// How [`Interpreter::stream_string`] is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StrResume {
    /// A fresh print: the address carries the type byte.
    Fresh,
    /// Resuming an unencoded byte string at the next character.
    Bytes,
    /// Resuming an unencoded unicode string at the next code point.
    Unicode,
    /// Resuming a compressed string mid-byte.
    Compressed {
        /// Bit position within the addressed byte.
        bit: u8,
    },
}

/// Outcome of printing one string segment.
enum Segment {
    /// The segment reached its terminator.
    Done,
    /// A machine function was entered; the execute loop takes over and
    /// the return dispatcher will resume the print.
    Suspended,
    /// The segment handed off to another string object.
    Redirect { ty: u8, addr: u32, bit: u8 },
}

impl<G: GlkDispatch> Interpreter<G> {
    /// `setiosys`.
    pub(crate) fn set_iosys(&mut self, mode: u32, rock: u32) {
        self.iosys = IoSys::from_raw(mode, rock);
    }

    /// Print one character through the selected I/O system.
    pub(crate) fn op_streamchar(&mut self, ch: u32, unicode: bool) -> SimpleResult<()> {
        let ch = if unicode { ch } else { ch & 0xFF };
        if let IoSys::Filter { func } = self.iosys {
            self.stack.push_call_stub(DestType::Discard as u32, 0, self.pc)?;
            return self.enter_function(func, &[ch]);
        }
        self.emit_char(ch, unicode);
        Ok(())
    }

    /// Print a signed number in decimal.
    pub(crate) fn op_streamnum(&mut self, value: u32) -> SimpleResult<()> {
        self.stream_num(value as i32, false, 0)
    }

    /// Print the string object at `addr`.
    pub(crate) fn op_streamstr(&mut self, addr: u32) -> SimpleResult<()> {
        self.stream_string(addr, StrResume::Fresh)
    }

    /// Emit a character to the null or Glk system. Filter suspension is
    /// handled by the callers; by the time a character reaches here it
    /// just goes out or disappears.
    fn emit_char(&mut self, ch: u32, unicode: bool) {
        if self.iosys == IoSys::Glk {
            let selector = if unicode {
                glksel::PUT_CHAR_UNI
            } else {
                glksel::PUT_CHAR
            };
            self.dispatch_glk(selector, &[ch]);
        }
    }

    fn push_terminator_stub(&mut self) -> SimpleResult<()> {
        self.stack
            .push_call_stub(DestType::StringTerminator as u32, 0, self.pc)
    }

    /// Pop the stub that ends a print and restore the interrupted
    /// instruction stream.
    fn pop_terminator_stub(&mut self) -> SimpleResult<()> {
        let stub = self.stack.pop_call_stub()?;
        if DestType::try_from(stub.dest_type)? != DestType::StringTerminator {
            return Err(Fault::BadCallStub);
        }
        self.stack.restore_frame(stub.fp)?;
        self.pc = stub.pc;
        Ok(())
    }

    /// Print a decimal number, suspending per character under the filter
    /// system. The number itself rides in the stub's `pc` field and the
    /// digit position in `dest_addr`.
    pub(crate) fn stream_num(&mut self, value: i32, in_middle: bool, pos: u32) -> SimpleResult<()> {
        let digits = value.to_string();
        let bytes = digits.as_bytes();
        let mut i = pos as usize;
        if let IoSys::Filter { func } = self.iosys {
            if i < bytes.len() {
                if !in_middle {
                    self.push_terminator_stub()?;
                }
                self.stack.push_call_stub(
                    DestType::ResumeNumber as u32,
                    (i + 1) as u32,
                    value as u32,
                )?;
                return self.enter_function(func, &[bytes[i] as u32]);
            }
        } else {
            while i < bytes.len() {
                self.emit_char(bytes[i] as u32, false);
                i += 1;
            }
        }
        if in_middle {
            self.pop_terminator_stub()?;
        }
        Ok(())
    }

    /// Print a string object, resuming at `resume` when re-entered from a
    /// call stub. Nested indirect strings chain through resume stubs
    /// rather than recursion, so arbitrarily deep trees cost constant
    /// Rust stack.
    pub(crate) fn stream_string(&mut self, start: u32, resume: StrResume) -> SimpleResult<()> {
        let mut substring = !matches!(resume, StrResume::Fresh);
        let (mut ty, mut addr, mut bit) = match resume {
            StrResume::Fresh => {
                let tb = self.mem.read_byte(start)?;
                match tb {
                    TYPE_STRING_BYTES | TYPE_STRING_COMPRESSED => (tb, start + 1, 0u8),
                    TYPE_STRING_UNICODE => (tb, start + 4, 0),
                    _ => return Err(Fault::BadString),
                }
            }
            StrResume::Bytes => (TYPE_STRING_BYTES, start, 0),
            StrResume::Unicode => (TYPE_STRING_UNICODE, start, 0),
            StrResume::Compressed { bit } => (TYPE_STRING_COMPRESSED, start, bit),
        };

        loop {
            let outcome = match ty {
                TYPE_STRING_BYTES => self.stream_bytes_segment(&mut addr, &mut substring)?,
                TYPE_STRING_UNICODE => self.stream_unicode_segment(&mut addr, &mut substring)?,
                _ => self.stream_compressed_segment(&mut addr, &mut bit, &mut substring)?,
            };
            match outcome {
                Segment::Suspended => return Ok(()),
                Segment::Redirect {
                    ty: new_ty,
                    addr: new_addr,
                    bit: new_bit,
                } => {
                    ty = new_ty;
                    addr = new_addr;
                    bit = new_bit;
                }
                Segment::Done => {
                    if !substring {
                        return Ok(());
                    }
                    let stub = self.stack.pop_call_stub()?;
                    match DestType::try_from(stub.dest_type)? {
                        DestType::StringTerminator => {
                            self.stack.restore_frame(stub.fp)?;
                            self.pc = stub.pc;
                            return Ok(());
                        }
                        DestType::ResumeCompressed => {
                            ty = TYPE_STRING_COMPRESSED;
                            addr = stub.pc;
                            bit = stub.dest_addr as u8;
                        }
                        DestType::ResumeBytes => {
                            ty = TYPE_STRING_BYTES;
                            addr = stub.pc;
                            bit = 0;
                        }
                        DestType::ResumeUnicode => {
                            ty = TYPE_STRING_UNICODE;
                            addr = stub.pc;
                            bit = 0;
                        }
                        _ => return Err(Fault::BadCallStub),
                    }
                }
            }
        }
    }

    fn stream_bytes_segment(
        &mut self,
        addr: &mut u32,
        substring: &mut bool,
    ) -> SimpleResult<Segment> {
        loop {
            let ch = self.mem.read_byte(*addr)?;
            if ch == 0 {
                return Ok(Segment::Done);
            }
            if let IoSys::Filter { func } = self.iosys {
                if !*substring {
                    self.push_terminator_stub()?;
                    *substring = true;
                }
                self.stack
                    .push_call_stub(DestType::ResumeBytes as u32, 0, *addr + 1)?;
                self.enter_function(func, &[ch as u32])?;
                return Ok(Segment::Suspended);
            }
            self.emit_char(ch as u32, false);
            *addr += 1;
        }
    }

    fn stream_unicode_segment(
        &mut self,
        addr: &mut u32,
        substring: &mut bool,
    ) -> SimpleResult<Segment> {
        loop {
            let ch = self.mem.read_word(*addr)?;
            if ch == 0 {
                return Ok(Segment::Done);
            }
            if let IoSys::Filter { func } = self.iosys {
                if !*substring {
                    self.push_terminator_stub()?;
                    *substring = true;
                }
                self.stack
                    .push_call_stub(DestType::ResumeUnicode as u32, 0, *addr + 4)?;
                self.enter_function(func, &[ch])?;
                return Ok(Segment::Suspended);
            }
            self.emit_char(ch, true);
            *addr += 4;
        }
    }

    fn next_bit(&self, addr: &mut u32, bit: &mut u8) -> SimpleResult<bool> {
        let byte = self.mem.read_byte(*addr)?;
        let value = (byte >> *bit) & 1;
        *bit += 1;
        if *bit == 8 {
            *bit = 0;
            *addr += 1;
        }
        Ok(value == 1)
    }

    fn stream_compressed_segment(
        &mut self,
        addr: &mut u32,
        bit: &mut u8,
        substring: &mut bool,
    ) -> SimpleResult<Segment> {
        loop {
            let root = self.string_table.root(&self.mem)?;
            let mut node_addr = root;
            let node = loop {
                let node = self.string_table.node(&self.mem, node_addr)?;
                if let StrNode::Branch { left, right } = node {
                    node_addr = if self.next_bit(addr, bit)? { right } else { left };
                } else {
                    break node;
                }
            };
            match node {
                StrNode::Branch { .. } => unreachable!("loop breaks on leaves"),
                StrNode::Terminator => return Ok(Segment::Done),
                StrNode::Char(ch) => {
                    if let IoSys::Filter { func } = self.iosys {
                        if !*substring {
                            self.push_terminator_stub()?;
                            *substring = true;
                        }
                        self.stack.push_call_stub(
                            DestType::ResumeCompressed as u32,
                            *bit as u32,
                            *addr,
                        )?;
                        self.enter_function(func, &[ch as u32])?;
                        return Ok(Segment::Suspended);
                    }
                    self.emit_char(ch as u32, false);
                }
                StrNode::Unichar(ch) => {
                    if let IoSys::Filter { func } = self.iosys {
                        if !*substring {
                            self.push_terminator_stub()?;
                            *substring = true;
                        }
                        self.stack.push_call_stub(
                            DestType::ResumeCompressed as u32,
                            *bit as u32,
                            *addr,
                        )?;
                        self.enter_function(func, &[ch])?;
                        return Ok(Segment::Suspended);
                    }
                    self.emit_char(ch, true);
                }
                StrNode::CString { data } => {
                    let first = self.mem.read_byte(data)?;
                    if first == 0 {
                        continue;
                    }
                    if let IoSys::Filter { func } = self.iosys {
                        if !*substring {
                            self.push_terminator_stub()?;
                            *substring = true;
                        }
                        // park the compressed position, then treat the rest
                        // of the node as a byte-string resumption
                        self.stack.push_call_stub(
                            DestType::ResumeCompressed as u32,
                            *bit as u32,
                            *addr,
                        )?;
                        self.stack
                            .push_call_stub(DestType::ResumeBytes as u32, 0, data + 1)?;
                        self.enter_function(func, &[first as u32])?;
                        return Ok(Segment::Suspended);
                    }
                    let mut p = data;
                    loop {
                        let ch = self.mem.read_byte(p)?;
                        if ch == 0 {
                            break;
                        }
                        self.emit_char(ch as u32, false);
                        p += 1;
                    }
                }
                StrNode::UnicodeCString { data } => {
                    let first = self.mem.read_word(data)?;
                    if first == 0 {
                        continue;
                    }
                    if let IoSys::Filter { func } = self.iosys {
                        if !*substring {
                            self.push_terminator_stub()?;
                            *substring = true;
                        }
                        self.stack.push_call_stub(
                            DestType::ResumeCompressed as u32,
                            *bit as u32,
                            *addr,
                        )?;
                        self.stack
                            .push_call_stub(DestType::ResumeUnicode as u32, 0, data + 4)?;
                        self.enter_function(func, &[first])?;
                        return Ok(Segment::Suspended);
                    }
                    let mut p = data;
                    loop {
                        let ch = self.mem.read_word(p)?;
                        if ch == 0 {
                            break;
                        }
                        self.emit_char(ch, true);
                        p += 4;
                    }
                }
                StrNode::Indirect {
                    addr: target,
                    double,
                    args,
                } => {
                    let target = if double {
                        self.mem.read_word(target)?
                    } else {
                        target
                    };
                    let kind = object_kind(&self.mem, target)?;
                    if !*substring {
                        self.push_terminator_stub()?;
                        *substring = true;
                    }
                    if kind.is_function() {
                        self.stack.push_call_stub(
                            DestType::ResumeCompressed as u32,
                            *bit as u32,
                            *addr,
                        )?;
                        self.enter_function(target, &args)?;
                        return Ok(Segment::Suspended);
                    }
                    let redirect = match kind {
                        ObjectKind::BytesString => Segment::Redirect {
                            ty: TYPE_STRING_BYTES,
                            addr: target + 1,
                            bit: 0,
                        },
                        ObjectKind::CompressedString => Segment::Redirect {
                            ty: TYPE_STRING_COMPRESSED,
                            addr: target + 1,
                            bit: 0,
                        },
                        ObjectKind::UnicodeString => Segment::Redirect {
                            ty: TYPE_STRING_UNICODE,
                            addr: target + 4,
                            bit: 0,
                        },
                        _ => return Err(Fault::BadString),
                    };
                    self.stack.push_call_stub(
                        DestType::ResumeCompressed as u32,
                        *bit as u32,
                        *addr,
                    )?;
                    return Ok(redirect);
                }
            }
        }
    }
}
