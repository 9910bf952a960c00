//! Function calls, returns, branches, catch and throw.

use glulx_isa::{DestType, Fault, ObjectKind};

use super::decode::Dest;
use super::stream::StrResume;
use super::Interpreter;
use crate::error::SimpleResult;
use crate::glk::GlkDispatch;
use crate::stack::{CallStub, LocalsLayout};
use crate::strings::object_kind;

impl<G: GlkDispatch> Interpreter<G> {
    /// Take a branch. The offset is relative to the address after the
    /// operands, minus two; offsets 0 and 1 return from the current
    /// function with that value instead.
    pub(crate) fn take_branch(&mut self, offset: u32) -> SimpleResult<()> {
        match offset {
            0 | 1 => self.leave_function(offset),
            _ => {
                self.pc = self.pc.wrapping_add(offset).wrapping_sub(2);
                Ok(())
            }
        }
    }

    /// Call the function at `addr`, delivering its eventual result to
    /// `dest`. Accelerated addresses run natively instead.
    pub(crate) fn call_function(&mut self, addr: u32, args: &[u32], dest: Dest) -> SimpleResult<()> {
        if let Some(id) = self.accel.func_at(addr) {
            let value = self.run_accel(id, args)?;
            return self.store(dest, value);
        }
        let (dest_type, dest_addr) = dest.stub_parts();
        self.stack.push_call_stub(dest_type, dest_addr, self.pc)?;
        self.enter_function(addr, args)
    }

    /// Replace the current frame with a call to `addr`; the callee
    /// returns through the caller's own stub.
    pub(crate) fn tail_call(&mut self, addr: u32, args: &[u32]) -> SimpleResult<()> {
        if let Some(id) = self.accel.func_at(addr) {
            let value = self.run_accel(id, args)?;
            return self.leave_function(value);
        }
        self.stack.discard_frame();
        self.enter_function(addr, args)
    }

    /// Build a frame for the function at `addr` and position the program
    /// counter at its first instruction.
    pub(crate) fn enter_function(&mut self, addr: u32, args: &[u32]) -> SimpleResult<()> {
        let kind = object_kind(&self.mem, addr)?;
        if !kind.is_function() {
            return Err(Fault::NotAFunction);
        }

        let mut pairs = Vec::new();
        let mut p = addr + 1;
        loop {
            let size = self.mem.read_byte(p)?;
            let count = self.mem.read_byte(p + 1)?;
            p += 2;
            if size == 0 && count == 0 {
                break;
            }
            pairs.push((size, count));
        }
        let layout = LocalsLayout::from_pairs(&pairs)?;
        self.stack.push_frame(&layout)?;
        self.pc = p;

        match kind {
            ObjectKind::LocalArgFunction => self.stack.set_arguments(args, &layout),
            _ => {
                // stack-argument convention: count at the bottom, then the
                // arguments pushed last-to-first so the first ends topmost
                self.stack.push32(args.len() as u32)?;
                for &arg in args.iter().rev() {
                    self.stack.push32(arg)?;
                }
                Ok(())
            }
        }
    }

    /// Return `value` from the current function. With nothing beneath the
    /// frame the machine is done; otherwise the call stub below decides
    /// where the value lands or which stream operation resumes.
    pub(crate) fn leave_function(&mut self, value: u32) -> SimpleResult<()> {
        self.stack.discard_frame();
        if self.stack.sp() == 0 {
            self.running = false;
            return Ok(());
        }
        let stub = self.stack.pop_call_stub()?;
        self.apply_return_stub(stub, value)
    }

    /// Dispatch a popped call stub with the value being delivered.
    pub(crate) fn apply_return_stub(&mut self, stub: CallStub, value: u32) -> SimpleResult<()> {
        let dest_type = DestType::try_from(stub.dest_type)?;
        if dest_type == DestType::StringTerminator {
            return Err(Fault::StringTerminatorAsReturn);
        }
        self.stack.restore_frame(stub.fp)?;
        match dest_type {
            DestType::Discard => {
                self.pc = stub.pc;
                Ok(())
            }
            DestType::Memory => {
                self.pc = stub.pc;
                self.mem.write_word(stub.dest_addr, value)
            }
            DestType::Local => {
                self.pc = stub.pc;
                self.stack.write_local32(stub.dest_addr, value)
            }
            DestType::Push => {
                self.pc = stub.pc;
                self.stack.push32(value)
            }
            DestType::ResumeCompressed => self.stream_string(
                stub.pc,
                StrResume::Compressed {
                    bit: stub.dest_addr as u8,
                },
            ),
            DestType::ResumeNumber => {
                self.stream_num(stub.pc as i32, true, stub.dest_addr)
            }
            DestType::ResumeBytes => self.stream_string(stub.pc, StrResume::Bytes),
            DestType::ResumeUnicode => self.stream_string(stub.pc, StrResume::Unicode),
            DestType::StringTerminator => unreachable!("rejected above"),
        }
    }

    /// `catch`: push a continuation stub, hand its token to the store
    /// operand, and branch.
    pub(crate) fn op_catch(&mut self, dest: Dest, branch: u32) -> SimpleResult<()> {
        let (dest_type, dest_addr) = dest.stub_parts();
        self.stack.push_call_stub(dest_type, dest_addr, self.pc)?;
        let token = self.stack.sp();
        self.store(dest, token)?;
        self.take_branch(branch)
    }

    /// `throw`: unwind to a catch token and deliver the value through the
    /// stub recorded there.
    pub(crate) fn op_throw(&mut self, value: u32, token: u32) -> SimpleResult<()> {
        self.stack.unwind_to(token)?;
        let stub = self.stack.pop_call_stub()?;
        self.apply_return_stub(stub, value)
    }
}
