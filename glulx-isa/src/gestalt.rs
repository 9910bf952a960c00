//! Selectors of the `gestalt` instruction.

/// Version of the machine specification, encoded `major << 16 | minor << 8
/// | subminor`.
pub const GLULX_VERSION: u32 = 0;
/// Version of this interpreter.
pub const TERP_VERSION: u32 = 1;
/// Whether `setmemsize` is supported.
pub const RESIZE_MEM: u32 = 2;
/// Whether `saveundo`/`restoreundo` are supported.
pub const UNDO: u32 = 3;
/// Whether the I/O system given as the extra argument is supported.
pub const IO_SYSTEM: u32 = 4;
/// Whether `streamunichar` and unicode strings are supported.
pub const UNICODE: u32 = 5;
/// Whether `mzero`/`mcopy` are supported.
pub const MEM_COPY: u32 = 6;
/// Whether `malloc`/`mfree` are supported.
pub const MALLOC: u32 = 7;
/// Start of the heap, or zero if the heap is inactive.
pub const MALLOC_HEAP: u32 = 8;
/// Whether `accelfunc`/`accelparam` are supported.
pub const ACCELERATION: u32 = 9;
/// Whether the accelerated function given as the extra argument is known.
pub const ACCEL_FUNC: u32 = 10;
/// Whether the single-precision float instructions are supported.
pub const FLOAT: u32 = 11;
/// Whether `hasundo`/`discardundo` are supported.
pub const EXT_UNDO: u32 = 12;
/// Whether the double-precision float instructions are supported.
pub const DOUBLE: u32 = 13;
