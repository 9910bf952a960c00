use crate::Fault;

/// Size of a call stub on the stack, in bytes: four 32-bit fields
/// `(dest_type, dest_addr, pc, fp)`.
pub const CALL_STUB_LEN: u32 = 16;

/// Destination type of a call stub.
///
/// Types `0x00..=0x03` tell a function return where to deposit its value.
/// Types `0x10..=0x14` resume an interrupted stream operation instead; the
/// stub's `dest_addr` and `pc` fields then carry stream position rather
/// than a storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DestType {
    /// Discard the value.
    Discard = 0x00,
    /// Write the value to main memory at `dest_addr`.
    Memory = 0x01,
    /// Write the value to the local at offset `dest_addr`.
    Local = 0x02,
    /// Push the value on the stack.
    Push = 0x03,
    /// Resume printing a compressed string; `pc` is the string position,
    /// `dest_addr` the bit number within that byte.
    ResumeCompressed = 0x10,
    /// Marks the end of string printing; `pc` is the resumption address of
    /// the interrupted instruction stream. Illegal as a function return.
    StringTerminator = 0x11,
    /// Resume printing a decimal number; `pc` is the number itself,
    /// `dest_addr` the count of digits already printed.
    ResumeNumber = 0x12,
    /// Resume printing an unencoded byte string; `pc` is the position.
    ResumeBytes = 0x13,
    /// Resume printing an unencoded unicode string; `pc` is the position.
    ResumeUnicode = 0x14,
}

impl DestType {
    /// Whether this stub resumes a stream operation rather than storing a
    /// function result.
    pub const fn is_stream_resume(self) -> bool {
        matches!(
            self,
            Self::ResumeCompressed | Self::ResumeNumber | Self::ResumeBytes | Self::ResumeUnicode
        )
    }
}

impl TryFrom<u32> for DestType {
    type Error = Fault;

    fn try_from(value: u32) -> Result<Self, Fault> {
        match value {
            0x00 => Ok(Self::Discard),
            0x01 => Ok(Self::Memory),
            0x02 => Ok(Self::Local),
            0x03 => Ok(Self::Push),
            0x10 => Ok(Self::ResumeCompressed),
            0x11 => Ok(Self::StringTerminator),
            0x12 => Ok(Self::ResumeNumber),
            0x13 => Ok(Self::ResumeBytes),
            0x14 => Ok(Self::ResumeUnicode),
            _ => Err(Fault::BadCallStub),
        }
    }
}
