//! Runtime interpreter error implementation.

use glulx_isa::Fault;

/// Result of an operation that can only fail with a machine fault.
pub type SimpleResult<T> = Result<T, Fault>;

/// Error rejecting an image at load time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The image does not begin with `'Glul'`.
    #[error("bad magic number {0:#010x}")]
    InvalidMagic(u32),
    /// The image requires a machine version this interpreter does not
    /// implement.
    #[error("unsupported machine version {0:#010x}")]
    UnsupportedVersion(u32),
    /// The image is shorter than its header claims.
    #[error("image truncated: {actual} bytes, header claims {expected}")]
    TruncatedImage {
        /// Byte count the header declares as `EXTSTART`.
        expected: u32,
        /// Byte count actually supplied.
        actual: u32,
    },
    /// A header field violates the layout invariants.
    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),
}

/// Interpreter error variants.
///
/// A fault is wrapped together with the program counter of the faulting
/// instruction, its opcode number, and the operand values that were
/// resolved before the fault.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InterpreterError {
    /// Execution hit a machine fault.
    #[error("fault at pc {pc:#x}, opcode {opcode:#x} {operands:x?}: {fault}")]
    Fault {
        /// The fault itself.
        #[source]
        fault: Fault,
        /// Address of the faulting instruction.
        pc: u32,
        /// Decoded opcode number, or `0` when the fault struck during
        /// opcode fetch.
        opcode: u32,
        /// Load operands resolved before the fault.
        operands: Vec<u32>,
    },
    /// The image was rejected before execution started.
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl InterpreterError {
    /// The underlying fault, if execution had started.
    pub const fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault { fault, .. } => Some(fault),
            _ => None,
        }
    }
}
