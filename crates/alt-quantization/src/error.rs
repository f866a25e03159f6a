use thiserror::Error;

/// Precondition violations in the row and tensor codecs.
///
/// These indicate a caller bug (wrong buffer sizes, unusable block size), not
/// corrupt input data; the block codecs themselves never fail.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantError {
    #[error("block size must be non-zero")]
    ZeroBlockSize,
    #[error("4-bit block size must be even, got {0}")]
    OddBlockSize(usize),
    #[error("length {len} is not a multiple of block size {block_size}")]
    BlockLength { len: usize, block_size: usize },
    #[error("buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("shape {shape:?} holds {expected} elements but {actual} values were given")]
    ShapeMismatch { shape: Vec<usize>, expected: usize, actual: usize },
    #[error("element count of shape {0:?} overflows")]
    ShapeOverflow(Vec<usize>),
    #[error("payload size for {numel} elements overflows")]
    Overflow { numel: usize },
    #[error("payload is {actual} bytes, expected {expected}")]
    PayloadLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, QuantError>;

/// Checks shared by every blocked codec.
pub(crate) fn check_blocking(len: usize, block_size: usize, packed: bool) -> Result<()> {
    if block_size == 0 {
        return Err(QuantError::ZeroBlockSize);
    }
    if packed && block_size % 2 != 0 {
        return Err(QuantError::OddBlockSize(block_size));
    }
    if len % block_size != 0 {
        return Err(QuantError::BlockLength { len, block_size });
    }
    Ok(())
}

pub(crate) fn check_block_count(expected: usize, scales: usize) -> Result<()> {
    if expected != scales {
        return Err(QuantError::LengthMismatch { expected, actual: scales });
    }
    Ok(())
}
