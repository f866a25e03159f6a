//! Process-wide format constants.
//!
//! Every multi-byte value below is written little-endian on disk.

/// File identity stored in the first eight bytes (`"alt\0"` read as a big-endian word).
pub const MAGIC_ALT: u64 = 0x616C_7400;

/// Section kind markers.
pub const MAGIC_GENERAL: u64 = 0xCAFE_BABE;
pub const MAGIC_PARAMETERS: u64 = 0xDEAD_BEEF;
pub const MAGIC_TOKENIZER: u64 = 0xBADD_CAFE;
pub const MAGIC_TENSORS: u64 = 0xFACE_FEED;

/// End sentinel. Written as a 4-byte value; nothing follows it.
pub const MAGIC_END: u32 = 0x0FFF_FFFF;

/// The only format version this implementation reads or writes.
pub const MAGIC_VERSION: i32 = 2;

/// Default section alignment in bytes.
pub const MAGIC_ALIGNMENT: i32 = 32;

/// Accepted alignment bounds (inclusive); the value must also be a power of two.
pub const MIN_ALIGNMENT: i32 = 8;
pub const MAX_ALIGNMENT: i32 = 4096;

/// Size in bytes of the StartMarker record: identity + declared size + version + alignment.
pub const START_MARKER_LEN: u64 = 8 + 8 + 4 + 4;

/// Size in bytes of a section header: kind + payload length.
pub const SECTION_HEADER_LEN: u64 = 8 + 8;

/// Size in bytes of the end sentinel.
pub const END_MARKER_LEN: u64 = 4;

/// Default number of samples sharing one quantization scale.
pub const QUANT_BLOCK_SIZE: usize = 32;

/// Upper bound on a single length-prefixed string, guarding allocations on corrupt input.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Returns `true` if `alignment` is one this implementation accepts.
pub const fn is_supported_alignment(alignment: i32) -> bool {
    alignment >= MIN_ALIGNMENT
        && alignment <= MAX_ALIGNMENT
        && (alignment as u32).is_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_marker_is_24_bytes() {
        assert_eq!(START_MARKER_LEN, 24);
        assert_eq!(SECTION_HEADER_LEN, 16);
    }

    #[test]
    fn default_alignment_is_supported() {
        assert!(is_supported_alignment(MAGIC_ALIGNMENT));
        assert!(is_supported_alignment(MIN_ALIGNMENT));
        assert!(is_supported_alignment(MAX_ALIGNMENT));
    }

    #[test]
    fn odd_or_out_of_range_alignment_rejected() {
        assert!(!is_supported_alignment(0));
        assert!(!is_supported_alignment(-32));
        assert!(!is_supported_alignment(24));
        assert!(!is_supported_alignment(4));
        assert!(!is_supported_alignment(8192));
    }

    #[test]
    fn end_sentinel_differs_from_every_kind_low_word() {
        for kind in [MAGIC_GENERAL, MAGIC_PARAMETERS, MAGIC_TOKENIZER, MAGIC_TENSORS] {
            assert_ne!(kind as u32, MAGIC_END);
        }
    }
}
