use bitflags::bitflags;

bitflags! {
    /// Option bits of the search instructions.
    pub struct SearchOptions: u32 {
        /// The key operand is the address of the key rather than the key
        /// itself.
        const KEY_INDIRECT = 0x01;
        /// An all-zero key in a structure ends the search (linear and
        /// linked searches only).
        const ZERO_KEY_TERMINATES = 0x02;
        /// Return the structure index instead of its address; failure is
        /// then `0xFFFFFFFF` instead of 0.
        const RETURN_INDEX = 0x04;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bits_are_dropped() {
        let opts = SearchOptions::from_bits_truncate(0xFF);
        assert_eq!(
            opts,
            SearchOptions::KEY_INDIRECT
                | SearchOptions::ZERO_KEY_TERMINATES
                | SearchOptions::RETURN_INDEX
        );
    }
}
