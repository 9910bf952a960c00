use crate::Fault;

/// Most operands any instruction takes (the search family).
pub const MAX_OPERANDS: usize = 8;

/// Role of one operand slot, in encoding order.
///
/// The machine specification writes instruction signatures as `L1 L2 S1`:
/// `L` operands are fetched, `S` operands receive results. `catch` is the
/// one instruction whose store operand precedes its load operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arg {
    /// Value fetched through the operand's addressing mode.
    L,
    /// Result stored through the operand's addressing mode.
    S,
}

macro_rules! impl_opcodes {
    ($($value:literal => $name:ident, $mnemonic:literal, [$($arg:ident)*];)*) => {
        /// Opcode of a Glulx instruction.
        ///
        /// Discriminants are the opcode numbers as they appear in the
        /// instruction stream, before length encoding.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
        #[repr(u32)]
        #[non_exhaustive]
        pub enum Opcode {
            $(
                #[doc = concat!("The `", $mnemonic, "` instruction.")]
                $name = $value,
            )*
        }

        impl Opcode {
            /// Operand signature, one entry per operand in encoding order.
            pub const fn operands(self) -> &'static [Arg] {
                match self {
                    $(Self::$name => &[$(Arg::$arg),*],)*
                }
            }

            /// Mnemonic as written in the machine specification.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Self::$name => $mnemonic,)*
                }
            }

            /// Opcode number as encoded in the instruction stream.
            pub const fn number(self) -> u32 {
                self as u32
            }
        }

        impl TryFrom<u32> for Opcode {
            type Error = Fault;

            fn try_from(value: u32) -> Result<Self, Fault> {
                match value {
                    $($value => Ok(Self::$name),)*
                    _ => Err(Fault::UnknownOpcode),
                }
            }
        }
    };
}

impl_opcodes! {
    0x00 => NOP, "nop", [];

    0x10 => ADD, "add", [L L S];
    0x11 => SUB, "sub", [L L S];
    0x12 => MUL, "mul", [L L S];
    0x13 => DIV, "div", [L L S];
    0x14 => MOD, "mod", [L L S];
    0x15 => NEG, "neg", [L S];
    0x18 => BITAND, "bitand", [L L S];
    0x19 => BITOR, "bitor", [L L S];
    0x1A => BITXOR, "bitxor", [L L S];
    0x1B => BITNOT, "bitnot", [L S];
    0x1C => SHIFTL, "shiftl", [L L S];
    0x1D => SSHIFTR, "sshiftr", [L L S];
    0x1E => USHIFTR, "ushiftr", [L L S];

    0x20 => JUMP, "jump", [L];
    0x22 => JZ, "jz", [L L];
    0x23 => JNZ, "jnz", [L L];
    0x24 => JEQ, "jeq", [L L L];
    0x25 => JNE, "jne", [L L L];
    0x26 => JLT, "jlt", [L L L];
    0x27 => JGE, "jge", [L L L];
    0x28 => JGT, "jgt", [L L L];
    0x29 => JLE, "jle", [L L L];
    0x2A => JLTU, "jltu", [L L L];
    0x2B => JGEU, "jgeu", [L L L];
    0x2C => JGTU, "jgtu", [L L L];
    0x2D => JLEU, "jleu", [L L L];

    0x30 => CALL, "call", [L L S];
    0x31 => RETURN, "return", [L];
    0x32 => CATCH, "catch", [S L];
    0x33 => THROW, "throw", [L L];
    0x34 => TAILCALL, "tailcall", [L L];

    0x40 => COPY, "copy", [L S];
    0x41 => COPYS, "copys", [L S];
    0x42 => COPYB, "copyb", [L S];
    0x44 => SEXS, "sexs", [L S];
    0x45 => SEXB, "sexb", [L S];

    0x48 => ALOAD, "aload", [L L S];
    0x49 => ALOADS, "aloads", [L L S];
    0x4A => ALOADB, "aloadb", [L L S];
    0x4B => ALOADBIT, "aloadbit", [L L S];
    0x4C => ASTORE, "astore", [L L L];
    0x4D => ASTORES, "astores", [L L L];
    0x4E => ASTOREB, "astoreb", [L L L];
    0x4F => ASTOREBIT, "astorebit", [L L L];

    0x50 => STKCOUNT, "stkcount", [S];
    0x51 => STKPEEK, "stkpeek", [L S];
    0x52 => STKSWAP, "stkswap", [];
    0x53 => STKROLL, "stkroll", [L L];
    0x54 => STKCOPY, "stkcopy", [L];

    0x70 => STREAMCHAR, "streamchar", [L];
    0x71 => STREAMNUM, "streamnum", [L];
    0x72 => STREAMSTR, "streamstr", [L];
    0x73 => STREAMUNICHAR, "streamunichar", [L];

    0x100 => GESTALT, "gestalt", [L L S];
    0x101 => DEBUGTRAP, "debugtrap", [L];
    0x102 => GETMEMSIZE, "getmemsize", [S];
    0x103 => SETMEMSIZE, "setmemsize", [L S];
    0x104 => JUMPABS, "jumpabs", [L];

    0x110 => RANDOM, "random", [L S];
    0x111 => SETRANDOM, "setrandom", [L];

    0x120 => QUIT, "quit", [];
    0x121 => VERIFY, "verify", [S];
    0x122 => RESTART, "restart", [];
    0x123 => SAVE, "save", [L S];
    0x124 => RESTORE, "restore", [L S];
    0x125 => SAVEUNDO, "saveundo", [S];
    0x126 => RESTOREUNDO, "restoreundo", [S];
    0x127 => PROTECT, "protect", [L L];
    0x128 => HASUNDO, "hasundo", [S];
    0x129 => DISCARDUNDO, "discardundo", [];

    0x130 => GLK, "glk", [L L S];

    0x140 => GETSTRINGTBL, "getstringtbl", [S];
    0x141 => SETSTRINGTBL, "setstringtbl", [L];
    0x148 => GETIOSYS, "getiosys", [S S];
    0x149 => SETIOSYS, "setiosys", [L L];

    0x150 => LINEARSEARCH, "linearsearch", [L L L L L L L S];
    0x151 => BINARYSEARCH, "binarysearch", [L L L L L L L S];
    0x152 => LINKEDSEARCH, "linkedsearch", [L L L L L L S];

    0x160 => CALLF, "callf", [L S];
    0x161 => CALLFI, "callfi", [L L S];
    0x162 => CALLFII, "callfii", [L L L S];
    0x163 => CALLFIII, "callfiii", [L L L L S];

    0x170 => MZERO, "mzero", [L L];
    0x171 => MCOPY, "mcopy", [L L L];
    0x178 => MALLOC, "malloc", [L S];
    0x179 => MFREE, "mfree", [L];

    0x180 => ACCELFUNC, "accelfunc", [L L];
    0x181 => ACCELPARAM, "accelparam", [L L];

    0x190 => NUMTOF, "numtof", [L S];
    0x191 => FTONUMZ, "ftonumz", [L S];
    0x192 => FTONUMN, "ftonumn", [L S];
    0x198 => CEIL, "ceil", [L S];
    0x199 => FLOOR, "floor", [L S];
    0x1A0 => FADD, "fadd", [L L S];
    0x1A1 => FSUB, "fsub", [L L S];
    0x1A2 => FMUL, "fmul", [L L S];
    0x1A3 => FDIV, "fdiv", [L L S];
    0x1A4 => FMOD, "fmod", [L L S S];
    0x1A8 => SQRT, "sqrt", [L S];
    0x1A9 => EXP, "exp", [L S];
    0x1AA => LOG, "log", [L S];
    0x1AB => POW, "pow", [L L S];
    0x1B0 => SIN, "sin", [L S];
    0x1B1 => COS, "cos", [L S];
    0x1B2 => TAN, "tan", [L S];
    0x1B3 => ASIN, "asin", [L S];
    0x1B4 => ACOS, "acos", [L S];
    0x1B5 => ATAN, "atan", [L S];
    0x1B6 => ATAN2, "atan2", [L L S];
    0x1C0 => JFEQ, "jfeq", [L L L L];
    0x1C1 => JFNE, "jfne", [L L L L];
    0x1C2 => JFLT, "jflt", [L L L];
    0x1C3 => JFLE, "jfle", [L L L];
    0x1C4 => JFGT, "jfgt", [L L L];
    0x1C5 => JFGE, "jfge", [L L L];
    0x1C8 => JISNAN, "jisnan", [L L];
    0x1C9 => JISINF, "jisinf", [L L];

    0x200 => NUMTOD, "numtod", [L S S];
    0x201 => DTONUMZ, "dtonumz", [L L S];
    0x202 => DTONUMN, "dtonumn", [L L S];
    0x203 => FTOD, "ftod", [L S S];
    0x204 => DTOF, "dtof", [L L S];
    0x208 => DCEIL, "dceil", [L L S S];
    0x209 => DFLOOR, "dfloor", [L L S S];
    0x210 => DADD, "dadd", [L L L L S S];
    0x211 => DSUB, "dsub", [L L L L S S];
    0x212 => DMUL, "dmul", [L L L L S S];
    0x213 => DDIV, "ddiv", [L L L L S S];
    0x214 => DMODR, "dmodr", [L L L L S S];
    0x215 => DMODQ, "dmodq", [L L L L S S];
    0x218 => DSQRT, "dsqrt", [L L S S];
    0x219 => DEXP, "dexp", [L L S S];
    0x21A => DLOG, "dlog", [L L S S];
    0x21B => DPOW, "dpow", [L L L L S S];
    0x220 => DSIN, "dsin", [L L S S];
    0x221 => DCOS, "dcos", [L L S S];
    0x222 => DTAN, "dtan", [L L S S];
    0x223 => DASIN, "dasin", [L L S S];
    0x224 => DACOS, "dacos", [L L S S];
    0x225 => DATAN, "datan", [L L S S];
    0x226 => DATAN2, "datan2", [L L L L S S];
    0x230 => JDEQ, "jdeq", [L L L L L L L];
    0x231 => JDNE, "jdne", [L L L L L L L];
    0x232 => JDLT, "jdlt", [L L L L L];
    0x233 => JDLE, "jdle", [L L L L L];
    0x234 => JDGT, "jdgt", [L L L L L];
    0x235 => JDGE, "jdge", [L L L L L];
    0x238 => JDISNAN, "jdisnan", [L L L];
    0x239 => JDISINF, "jdisinf", [L L L];
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn number_round_trips_for_every_opcode() {
        for op in Opcode::iter() {
            assert_eq!(Opcode::try_from(op.number()), Ok(op));
        }
    }

    #[test]
    fn no_signature_exceeds_the_operand_limit() {
        for op in Opcode::iter() {
            assert!(op.operands().len() <= MAX_OPERANDS, "{}", op.mnemonic());
        }
    }

    #[test]
    fn unknown_numbers_are_rejected() {
        for value in [0x01, 0x7F, 0x105, 0x1000, 0xDEAD_BEEF] {
            assert_eq!(Opcode::try_from(value), Err(Fault::UnknownOpcode));
        }
    }

    #[test]
    fn catch_stores_before_it_loads() {
        assert_eq!(Opcode::CATCH.operands(), &[Arg::S, Arg::L]);
    }
}
