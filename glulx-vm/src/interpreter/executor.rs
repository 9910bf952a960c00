//! The fetch-decode-execute step.

use glulx_isa::{Opcode, SearchOptions};

use super::{alu, double, float, search};
use super::Interpreter;
use crate::error::SimpleResult;
use crate::glk::GlkDispatch;

/// Byte and bit addressed by bit `index` (signed) relative to the bit
/// array starting at `base`; negative indices address bits before it.
fn bit_location(base: u32, index: u32) -> (u32, u8) {
    let index = index as i32;
    let byte = index.div_euclid(8);
    let bit = index.rem_euclid(8) as u8;
    (base.wrapping_add(byte as u32), bit)
}

impl<G: GlkDispatch> Interpreter<G> {
    /// Pop `count` call arguments in standard order.
    fn pop_args(&mut self, count: u32) -> SimpleResult<Vec<u32>> {
        let mut args = Vec::with_capacity(count.min(64) as usize);
        for _ in 0..count {
            args.push(self.stack.pop32()?);
        }
        Ok(args)
    }

    /// Execute the instruction at the program counter.
    pub(super) fn step_inner(&mut self, opcode_out: &mut u32) -> SimpleResult<()> {
        let pc_start = self.pc;
        let number = self.fetch_opcode_number()?;
        *opcode_out = number;
        let opcode = Opcode::try_from(number)?;
        tracing::trace!(
            pc = format_args!("{pc_start:#x}"),
            op = opcode.mnemonic(),
            "execute"
        );
        let ops = self.fetch_operands(opcode)?;
        let l = |i: usize| ops.l(i);

        use Opcode as Op;
        match opcode {
            Op::NOP => {}

            Op::ADD => self.store(ops.d(0), l(0).wrapping_add(l(1)))?,
            Op::SUB => self.store(ops.d(0), l(0).wrapping_sub(l(1)))?,
            Op::MUL => self.store(ops.d(0), l(0).wrapping_mul(l(1)))?,
            Op::DIV => self.store(ops.d(0), alu::div32(l(0), l(1))?)?,
            Op::MOD => self.store(ops.d(0), alu::mod32(l(0), l(1))?)?,
            Op::NEG => self.store(ops.d(0), 0u32.wrapping_sub(l(0)))?,
            Op::BITAND => self.store(ops.d(0), l(0) & l(1))?,
            Op::BITOR => self.store(ops.d(0), l(0) | l(1))?,
            Op::BITXOR => self.store(ops.d(0), l(0) ^ l(1))?,
            Op::BITNOT => self.store(ops.d(0), !l(0))?,
            Op::SHIFTL => self.store(ops.d(0), alu::shiftl(l(0), l(1)))?,
            Op::SSHIFTR => self.store(ops.d(0), alu::sshiftr(l(0), l(1)))?,
            Op::USHIFTR => self.store(ops.d(0), alu::ushiftr(l(0), l(1)))?,

            Op::JUMP => self.take_branch(l(0))?,
            Op::JZ => self.branch_if(l(0) == 0, l(1))?,
            Op::JNZ => self.branch_if(l(0) != 0, l(1))?,
            Op::JEQ => self.branch_if(l(0) == l(1), l(2))?,
            Op::JNE => self.branch_if(l(0) != l(1), l(2))?,
            Op::JLT => self.branch_if((l(0) as i32) < l(1) as i32, l(2))?,
            Op::JGE => self.branch_if(l(0) as i32 >= l(1) as i32, l(2))?,
            Op::JGT => self.branch_if(l(0) as i32 > l(1) as i32, l(2))?,
            Op::JLE => self.branch_if(l(0) as i32 <= l(1) as i32, l(2))?,
            Op::JLTU => self.branch_if(l(0) < l(1), l(2))?,
            Op::JGEU => self.branch_if(l(0) >= l(1), l(2))?,
            Op::JGTU => self.branch_if(l(0) > l(1), l(2))?,
            Op::JLEU => self.branch_if(l(0) <= l(1), l(2))?,
            Op::JUMPABS => self.pc = l(0),

            Op::CALL => {
                let args = self.pop_args(l(1))?;
                self.call_function(l(0), &args, ops.d(0))?;
            }
            Op::RETURN => self.leave_function(l(0))?,
            Op::CATCH => self.op_catch(ops.d(0), l(0))?,
            Op::THROW => self.op_throw(l(0), l(1))?,
            Op::TAILCALL => {
                let args = self.pop_args(l(1))?;
                self.tail_call(l(0), &args)?;
            }
            Op::CALLF => self.call_function(l(0), &[], ops.d(0))?,
            Op::CALLFI => self.call_function(l(0), &[l(1)], ops.d(0))?,
            Op::CALLFII => self.call_function(l(0), &[l(1), l(2)], ops.d(0))?,
            Op::CALLFIII => self.call_function(l(0), &[l(1), l(2), l(3)], ops.d(0))?,

            Op::COPY => self.store(ops.d(0), l(0))?,
            Op::COPYS => self.store_w(ops.d(0), l(0), 2)?,
            Op::COPYB => self.store_w(ops.d(0), l(0), 1)?,
            Op::SEXS => self.store(ops.d(0), l(0) as u16 as i16 as i32 as u32)?,
            Op::SEXB => self.store(ops.d(0), l(0) as u8 as i8 as i32 as u32)?,

            Op::ALOAD => {
                let addr = l(0).wrapping_add(l(1).wrapping_mul(4));
                let value = self.mem.read_word(addr)?;
                self.store(ops.d(0), value)?;
            }
            Op::ALOADS => {
                let addr = l(0).wrapping_add(l(1).wrapping_mul(2));
                let value = self.mem.read_short(addr)? as u32;
                self.store(ops.d(0), value)?;
            }
            Op::ALOADB => {
                let addr = l(0).wrapping_add(l(1));
                let value = self.mem.read_byte(addr)? as u32;
                self.store(ops.d(0), value)?;
            }
            Op::ALOADBIT => {
                let (addr, bit) = bit_location(l(0), l(1));
                let value = (self.mem.read_byte(addr)? >> bit) & 1;
                self.store(ops.d(0), value as u32)?;
            }
            Op::ASTORE => {
                let addr = l(0).wrapping_add(l(1).wrapping_mul(4));
                self.mem.write_word(addr, l(2))?;
            }
            Op::ASTORES => {
                let addr = l(0).wrapping_add(l(1).wrapping_mul(2));
                self.mem.write_short(addr, l(2) as u16)?;
            }
            Op::ASTOREB => {
                let addr = l(0).wrapping_add(l(1));
                self.mem.write_byte(addr, l(2) as u8)?;
            }
            Op::ASTOREBIT => {
                let (addr, bit) = bit_location(l(0), l(1));
                let mut byte = self.mem.read_byte(addr)?;
                if l(2) != 0 {
                    byte |= 1 << bit;
                } else {
                    byte &= !(1 << bit);
                }
                self.mem.write_byte(addr, byte)?;
            }

            Op::STKCOUNT => self.store(ops.d(0), self.stack.stkcount())?,
            Op::STKPEEK => {
                let value = self.stack.peek32(l(0))?;
                self.store(ops.d(0), value)?;
            }
            Op::STKSWAP => self.stack.stkswap()?,
            Op::STKROLL => self.stack.stkroll(l(0), l(1))?,
            Op::STKCOPY => self.stack.stkcopy(l(0))?,

            Op::STREAMCHAR => self.op_streamchar(l(0), false)?,
            Op::STREAMUNICHAR => self.op_streamchar(l(0), true)?,
            Op::STREAMNUM => self.op_streamnum(l(0))?,
            Op::STREAMSTR => self.op_streamstr(l(0))?,

            Op::GESTALT => {
                let value = self.op_gestalt(l(0), l(1));
                self.store(ops.d(0), value)?;
            }
            Op::DEBUGTRAP => return Err(self.op_debugtrap(l(0))),
            Op::GETMEMSIZE => self.store(ops.d(0), self.mem.endmem())?,
            Op::SETMEMSIZE => {
                let result = if self.heap.active() || self.mem.set_memsize(l(0)).is_err() {
                    1
                } else {
                    0
                };
                self.store(ops.d(0), result)?;
            }
            Op::MZERO => self.mem.mzero(l(0), l(1))?,
            Op::MCOPY => self.mem.mcopy(l(0), l(1), l(2))?,
            Op::MALLOC => {
                let addr = self.op_malloc(l(0))?;
                self.store(ops.d(0), addr)?;
            }
            Op::MFREE => self.op_mfree(l(0))?,

            Op::RANDOM => {
                let value = self.op_random(l(0));
                self.store(ops.d(0), value)?;
            }
            Op::SETRANDOM => self.op_setrandom(l(0)),

            Op::QUIT => self.running = false,
            Op::VERIFY => self.store(ops.d(0), self.op_verify())?,
            Op::RESTART => self.op_restart()?,
            Op::SAVE => self.op_save(l(0), ops.d(0))?,
            Op::RESTORE => self.op_restore(l(0), ops.d(0))?,
            Op::SAVEUNDO => self.op_saveundo(ops.d(0))?,
            Op::RESTOREUNDO => self.op_restoreundo(ops.d(0))?,
            Op::PROTECT => self.op_protect(l(0), l(1)),
            Op::HASUNDO => self.store(ops.d(0), self.op_hasundo())?,
            Op::DISCARDUNDO => self.op_discardundo(),

            Op::GLK => {
                let args = self.pop_args(l(1))?;
                let result = self.dispatch_glk(l(0), &args);
                self.store(ops.d(0), result)?;
            }

            Op::GETSTRINGTBL => self.store(ops.d(0), self.op_getstringtbl())?,
            Op::SETSTRINGTBL => self.op_setstringtbl(l(0))?,
            Op::GETIOSYS => {
                self.store(ops.d(0), self.iosys.mode())?;
                self.store(ops.d(1), self.iosys.rock())?;
            }
            Op::SETIOSYS => self.set_iosys(l(0), l(1)),

            Op::LINEARSEARCH => {
                let options = SearchOptions::from_bits_truncate(l(6));
                let key = search::fetch_key(&self.mem, l(0), l(1), options)?;
                let result =
                    search::linear(&self.mem, &key, l(2), l(3), l(4), l(5), options)?;
                self.store(ops.d(0), result)?;
            }
            Op::BINARYSEARCH => {
                let options = SearchOptions::from_bits_truncate(l(6));
                let key = search::fetch_key(&self.mem, l(0), l(1), options)?;
                let result =
                    search::binary(&self.mem, &key, l(2), l(3), l(4), l(5), options)?;
                self.store(ops.d(0), result)?;
            }
            Op::LINKEDSEARCH => {
                let options = SearchOptions::from_bits_truncate(l(5));
                let key = search::fetch_key(&self.mem, l(0), l(1), options)?;
                let result = search::linked(&self.mem, &key, l(2), l(3), l(4), options)?;
                self.store(ops.d(0), result)?;
            }

            Op::ACCELFUNC => self.op_accelfunc(l(0), l(1))?,
            Op::ACCELPARAM => self.op_accelparam(l(0), l(1)),

            Op::NUMTOF => self.store(ops.d(0), float::encode(l(0) as i32 as f32))?,
            Op::FTONUMZ => self.store(ops.d(0), float::ftonumz(l(0)))?,
            Op::FTONUMN => self.store(ops.d(0), float::ftonumn(l(0)))?,
            Op::CEIL => self.store(ops.d(0), float::encode(float::decode(l(0)).ceil()))?,
            Op::FLOOR => self.store(ops.d(0), float::encode(float::decode(l(0)).floor()))?,
            Op::SQRT => self.store(ops.d(0), float::encode(float::decode(l(0)).sqrt()))?,
            Op::EXP => self.store(ops.d(0), float::encode(float::decode(l(0)).exp()))?,
            Op::LOG => self.store(ops.d(0), float::encode(float::decode(l(0)).ln()))?,
            Op::FADD => self.fbinop(&ops, |a, b| a + b)?,
            Op::FSUB => self.fbinop(&ops, |a, b| a - b)?,
            Op::FMUL => self.fbinop(&ops, |a, b| a * b)?,
            Op::FDIV => self.fbinop(&ops, |a, b| a / b)?,
            Op::POW => self.fbinop(&ops, f32::powf)?,
            Op::ATAN2 => self.fbinop(&ops, f32::atan2)?,
            Op::SIN => self.store(ops.d(0), float::encode(float::decode(l(0)).sin()))?,
            Op::COS => self.store(ops.d(0), float::encode(float::decode(l(0)).cos()))?,
            Op::TAN => self.store(ops.d(0), float::encode(float::decode(l(0)).tan()))?,
            Op::ASIN => self.store(ops.d(0), float::encode(float::decode(l(0)).asin()))?,
            Op::ACOS => self.store(ops.d(0), float::encode(float::decode(l(0)).acos()))?,
            Op::ATAN => self.store(ops.d(0), float::encode(float::decode(l(0)).atan()))?,
            Op::FMOD => {
                let (rem, quot) = float::fmod_pair(float::decode(l(0)), float::decode(l(1)));
                self.store(ops.d(0), float::encode(rem))?;
                self.store(ops.d(1), float::encode(quot))?;
            }
            Op::JFEQ => {
                let taken =
                    float::feq(float::decode(l(0)), float::decode(l(1)), float::decode(l(2)));
                self.branch_if(taken, l(3))?;
            }
            Op::JFNE => {
                let taken =
                    float::feq(float::decode(l(0)), float::decode(l(1)), float::decode(l(2)));
                self.branch_if(!taken, l(3))?;
            }
            Op::JFLT => self.branch_if(float::decode(l(0)) < float::decode(l(1)), l(2))?,
            Op::JFLE => self.branch_if(float::decode(l(0)) <= float::decode(l(1)), l(2))?,
            Op::JFGT => self.branch_if(float::decode(l(0)) > float::decode(l(1)), l(2))?,
            Op::JFGE => self.branch_if(float::decode(l(0)) >= float::decode(l(1)), l(2))?,
            Op::JISNAN => self.branch_if(float::decode(l(0)).is_nan(), l(1))?,
            Op::JISINF => self.branch_if(float::decode(l(0)).is_infinite(), l(1))?,

            Op::NUMTOD => self.store_double(&ops, l(0) as i32 as f64)?,
            Op::DTONUMZ => self.store(ops.d(0), double::dtonumz(l(0), l(1)))?,
            Op::DTONUMN => self.store(ops.d(0), double::dtonumn(l(0), l(1)))?,
            Op::FTOD => self.store_double(&ops, float::decode(l(0)) as f64)?,
            Op::DTOF => {
                self.store(ops.d(0), float::encode(double::join(l(0), l(1)) as f32))?;
            }
            Op::DCEIL => self.store_double(&ops, double::join(l(0), l(1)).ceil())?,
            Op::DFLOOR => self.store_double(&ops, double::join(l(0), l(1)).floor())?,
            Op::DSQRT => self.store_double(&ops, double::join(l(0), l(1)).sqrt())?,
            Op::DEXP => self.store_double(&ops, double::join(l(0), l(1)).exp())?,
            Op::DLOG => self.store_double(&ops, double::join(l(0), l(1)).ln())?,
            Op::DSIN => self.store_double(&ops, double::join(l(0), l(1)).sin())?,
            Op::DCOS => self.store_double(&ops, double::join(l(0), l(1)).cos())?,
            Op::DTAN => self.store_double(&ops, double::join(l(0), l(1)).tan())?,
            Op::DASIN => self.store_double(&ops, double::join(l(0), l(1)).asin())?,
            Op::DACOS => self.store_double(&ops, double::join(l(0), l(1)).acos())?,
            Op::DATAN => self.store_double(&ops, double::join(l(0), l(1)).atan())?,
            Op::DADD => {
                let value = double::join(l(0), l(1)) + double::join(l(2), l(3));
                self.store_double(&ops, value)?;
            }
            Op::DSUB => {
                let value = double::join(l(0), l(1)) - double::join(l(2), l(3));
                self.store_double(&ops, value)?;
            }
            Op::DMUL => {
                let value = double::join(l(0), l(1)) * double::join(l(2), l(3));
                self.store_double(&ops, value)?;
            }
            Op::DDIV => {
                let value = double::join(l(0), l(1)) / double::join(l(2), l(3));
                self.store_double(&ops, value)?;
            }
            Op::DPOW => {
                let value = double::join(l(0), l(1)).powf(double::join(l(2), l(3)));
                self.store_double(&ops, value)?;
            }
            Op::DATAN2 => {
                let value = double::join(l(0), l(1)).atan2(double::join(l(2), l(3)));
                self.store_double(&ops, value)?;
            }
            Op::DMODR => {
                let (rem, _) = double::dmod_pair(double::join(l(0), l(1)), double::join(l(2), l(3)));
                self.store_double(&ops, rem)?;
            }
            Op::DMODQ => {
                let (_, quot) =
                    double::dmod_pair(double::join(l(0), l(1)), double::join(l(2), l(3)));
                self.store_double(&ops, quot)?;
            }
            Op::JDEQ => {
                let taken = double::deq(
                    double::join(l(0), l(1)),
                    double::join(l(2), l(3)),
                    double::join(l(4), l(5)),
                );
                self.branch_if(taken, l(6))?;
            }
            Op::JDNE => {
                let taken = double::deq(
                    double::join(l(0), l(1)),
                    double::join(l(2), l(3)),
                    double::join(l(4), l(5)),
                );
                self.branch_if(!taken, l(6))?;
            }
            Op::JDLT => {
                self.branch_if(double::join(l(0), l(1)) < double::join(l(2), l(3)), l(4))?;
            }
            Op::JDLE => {
                self.branch_if(double::join(l(0), l(1)) <= double::join(l(2), l(3)), l(4))?;
            }
            Op::JDGT => {
                self.branch_if(double::join(l(0), l(1)) > double::join(l(2), l(3)), l(4))?;
            }
            Op::JDGE => {
                self.branch_if(double::join(l(0), l(1)) >= double::join(l(2), l(3)), l(4))?;
            }
            Op::JDISNAN => self.branch_if(double::join(l(0), l(1)).is_nan(), l(2))?,
            Op::JDISINF => self.branch_if(double::join(l(0), l(1)).is_infinite(), l(2))?,

            _ => return Err(glulx_isa::Fault::UnknownOpcode),
        }
        Ok(())
    }

    fn branch_if(&mut self, condition: bool, offset: u32) -> SimpleResult<()> {
        if condition {
            self.take_branch(offset)?;
        }
        Ok(())
    }

    fn fbinop(
        &mut self,
        ops: &super::decode::Operands,
        f: impl FnOnce(f32, f32) -> f32,
    ) -> SimpleResult<()> {
        let value = f(float::decode(ops.l(0)), float::decode(ops.l(1)));
        self.store(ops.d(0), float::encode(value))
    }

    fn store_double(&mut self, ops: &super::decode::Operands, value: f64) -> SimpleResult<()> {
        let (hi, lo) = double::split(value);
        self.store(ops.d(0), hi)?;
        self.store(ops.d(1), lo)
    }
}
