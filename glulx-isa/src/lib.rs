//! Atomic types of the Glulx virtual machine.
//!
//! This crate defines the instruction-set surface shared by the interpreter
//! and its tooling: opcode numbers and operand signatures, operand
//! addressing modes, call-stub destination types, typable-object kind
//! bytes, gestalt selectors, and Glk dispatch selectors. It holds no
//! interpreter state and performs no I/O.

#![cfg_attr(not(feature = "std"), no_std)]

mod fault;
mod mode;
mod object;
mod opcode;
mod search;
mod stub;

pub mod gestalt;
pub mod glk;

pub use fault::Fault;
pub use mode::OperandMode;
pub use object::{
    ObjectKind, TYPE_FUNC_LOCAL_ARGS, TYPE_FUNC_STACK_ARGS, TYPE_STRING_BYTES,
    TYPE_STRING_COMPRESSED, TYPE_STRING_UNICODE,
};
pub use opcode::{Arg, Opcode, MAX_OPERANDS};
pub use search::SearchOptions;
pub use stub::{DestType, CALL_STUB_LEN};

/// Magic number at offset 0 of every Glulx image: `'Glul'`.
pub const MAGIC: u32 = 0x476C_756C;

/// Highest Glulx specification version this instruction set covers.
pub const SPEC_VERSION: u32 = 0x0003_0103;
