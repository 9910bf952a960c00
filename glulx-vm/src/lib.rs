//! Glulx virtual machine interpreter.
//!
//! The crate owns every piece of mutable machine state — memory map,
//! stack, program counter, string-decoding cache, heap, undo ring — inside
//! an [`interpreter::Interpreter`] instance. The presentation provider is
//! an external collaborator reached only through the numeric-selector
//! dispatch trait in [`glk`]; it is handed borrowed access to machine
//! memory and stack for the duration of a single call and nothing else.

pub mod consts;
pub mod error;
pub mod glk;
pub mod header;
pub mod interpreter;
pub mod memory;
pub mod params;
pub mod save;
pub mod stack;
pub mod strings;

#[cfg(any(test, feature = "test-helpers"))]
pub mod util;

pub mod prelude {
    //! Re-exports of the types most callers need.

    pub use glulx_isa::{
        DestType, Fault, ObjectKind, Opcode, OperandMode, SearchOptions,
    };

    pub use crate::error::{InterpreterError, LoadError, SimpleResult};
    pub use crate::glk::{GlkDispatch, GlkVm, NullGlk};
    pub use crate::header::Header;
    pub use crate::interpreter::{Interpreter, IoSys};
    pub use crate::memory::MemoryMap;
    pub use crate::params::VmParams;
    pub use crate::stack::{CallStub, Stack};
}
