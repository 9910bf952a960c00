use core::fmt;

/// Runtime fault representation for the interpreter.
///
/// Every variant except [`Fault::UserDebugTrap`] corresponds to an integrity
/// violation that halts the machine; the interpreter wraps the fault with
/// the faulting program counter and opcode before surfacing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[non_exhaustive]
pub enum Fault {
    /// Attempt to write below `RAMSTART`.
    WriteToRom,
    /// Memory access outside `[0, ENDMEM)`.
    OutOfBounds,
    /// Memory resize target below `EXTSTART` or not a multiple of 256.
    UnalignedMemSize,
    /// Pop or peek below the base of the current value stack.
    StackUnderflow,
    /// Push past the configured stack size.
    StackOverflow,
    /// Call stub with an unknown destination type.
    BadCallStub,
    /// String-terminator call stub reached through a function return.
    StringTerminatorAsReturn,
    /// Integer division or modulo by zero.
    DivideByZero,
    /// `-0x80000000` divided by `-1`.
    InvalidDivision,
    /// The opcode number maps to no known instruction.
    UnknownOpcode,
    /// Operand encoded with one of the reserved addressing modes (4, C).
    ReservedAddressingMode,
    /// Operand mode nibble outside the encodable range.
    BadOperandMode,
    /// Call target whose type byte is not `C0` or `C1`.
    NotAFunction,
    /// Function header with a locals size other than 1, 2 or 4.
    BadLocalsFormat,
    /// Direct search key wider than four bytes.
    BadSearchKey,
    /// Acceleration requested for an address that is not a function.
    AccelNotAFunction,
    /// Stream target whose type byte is not a string.
    BadString,
    /// Malformed or unreadable string-decoding table.
    BadDecodingTable,
    /// `throw` with a token above the current stack top.
    ThrowTokenNotFound,
    /// Rejected or corrupt serialized state.
    BadSaveData,
    /// `debugtrap` executed; carries the trap argument.
    UserDebugTrap(u32),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteToRom => write!(f, "write into read-only memory"),
            Self::OutOfBounds => write!(f, "memory access out of bounds"),
            Self::UnalignedMemSize => write!(f, "invalid memory size"),
            Self::StackUnderflow => write!(f, "stack underflow"),
            Self::StackOverflow => write!(f, "stack overflow"),
            Self::BadCallStub => write!(f, "unrecognized call stub"),
            Self::StringTerminatorAsReturn => {
                write!(f, "string-terminator stub used as function return")
            }
            Self::DivideByZero => write!(f, "integer division by zero"),
            Self::InvalidDivision => write!(f, "division overflow"),
            Self::UnknownOpcode => write!(f, "unknown opcode"),
            Self::ReservedAddressingMode => write!(f, "reserved addressing mode"),
            Self::BadOperandMode => write!(f, "invalid operand mode"),
            Self::NotAFunction => write!(f, "call target is not a function"),
            Self::BadLocalsFormat => write!(f, "invalid locals format"),
            Self::BadSearchKey => write!(f, "direct search key must be 1, 2 or 4 bytes"),
            Self::AccelNotAFunction => {
                write!(f, "accelerated address is not a function")
            }
            Self::BadString => write!(f, "stream target is not a string"),
            Self::BadDecodingTable => write!(f, "malformed string-decoding table"),
            Self::ThrowTokenNotFound => write!(f, "throw token not found on stack"),
            Self::BadSaveData => write!(f, "malformed save data"),
            Self::UserDebugTrap(arg) => write!(f, "user debug trap ({arg:#x})"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Fault {}
