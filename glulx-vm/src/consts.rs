//! Machine parameters and layout constants.

/// Length of the image header, in bytes.
pub const HEADER_LEN: u32 = 36;

/// Header offset of the magic number.
pub const OFF_MAGIC: u32 = 0x00;
/// Header offset of the machine version word.
pub const OFF_VERSION: u32 = 0x04;
/// Header offset of `RAMSTART`.
pub const OFF_RAMSTART: u32 = 0x08;
/// Header offset of `EXTSTART`.
pub const OFF_EXTSTART: u32 = 0x0C;
/// Header offset of `ENDMEM`.
pub const OFF_ENDMEM: u32 = 0x10;
/// Header offset of the stack size.
pub const OFF_STACKSIZE: u32 = 0x14;
/// Header offset of the start-function address.
pub const OFF_STARTFUNC: u32 = 0x18;
/// Header offset of the string-decoding-table address.
pub const OFF_STRINGTBL: u32 = 0x1C;
/// Header offset of the checksum.
pub const OFF_CHECKSUM: u32 = 0x20;

/// Alignment of `RAMSTART`, `EXTSTART`, `ENDMEM` and the stack size.
pub const MEM_ALIGN: u32 = 256;

/// Version word reported for gestalt selector `TerpVersion`.
pub const TERP_VERSION: u32 = 0x0000_0100;

/// Lowest and highest machine versions this interpreter executes.
pub const MIN_VERSION: u32 = 0x0002_0000;
pub const MAX_VERSION: u32 = 0x0003_01FF;
