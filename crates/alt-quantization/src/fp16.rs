//! IEEE-754 half precision by bit manipulation.
//!
//! Encoding rounds to nearest even, produces correctly rounded subnormals,
//! saturates out-of-range magnitudes to infinity, and maps every NaN to the
//! quiet NaN `0x7E00` with the input's sign. Decoding is exact.

/// 2^112: pushes values past the half range toward infinity.
const SCALE_TO_INF: f32 = f32::from_bits(0x7780_0000);
/// 2^-110: brings them back so only true overflows stay infinite.
const SCALE_TO_ZERO: f32 = f32::from_bits(0x0880_0000);
/// 2^-112: rebias factor applied after the exponent shift on decode.
const EXP_SCALE: f32 = f32::from_bits(0x0780_0000);

const HALF_QUIET_NAN: u32 = 0x7E00;

/// Convert an f32 to its half-precision bit pattern. Total over all inputs.
pub fn encode_fp16(value: f32) -> u16 {
    let base = (value.abs() * SCALE_TO_INF) * SCALE_TO_ZERO;

    let w = value.to_bits();
    let shl1_w = w.wrapping_add(w);
    let sign = w & 0x8000_0000;
    let bias = (shl1_w & 0xFF00_0000).max(0x7100_0000);

    // Adding a power of two aligned to the target exponent makes the FPU
    // perform the mantissa rounding for us.
    let base = f32::from_bits((bias >> 1) + 0x0780_0000) + base;
    let bits = base.to_bits();
    let exp_bits = (bits >> 13) & 0x0000_7C00;
    let mantissa_bits = bits & 0x0000_0FFF;
    let nonsign = exp_bits + mantissa_bits;

    let magnitude = if shl1_w > 0xFF00_0000 { HALF_QUIET_NAN } else { nonsign };
    ((sign >> 16) | magnitude) as u16
}

/// Convert a half-precision bit pattern to f32. Exact for every input.
pub fn decode_fp16(bits: u16) -> f32 {
    let w = u32::from(bits) << 16;
    let sign = w & 0x8000_0000;
    let two_w = w.wrapping_add(w);

    let exp_offset = 0xE0u32 << 23;
    let normalized = f32::from_bits((two_w >> 4) + exp_offset) * EXP_SCALE;

    // Subnormals: place the mantissa under 0.5 and subtract it back out.
    let magic_mask = 126u32 << 23;
    let denormalized = f32::from_bits((two_w >> 17) | magic_mask) - 0.5;

    let denorm_cutoff = 1u32 << 27;
    let magnitude =
        if two_w < denorm_cutoff { denormalized.to_bits() } else { normalized.to_bits() };
    f32::from_bits(sign | magnitude)
}

pub fn encode_fp16_row(values: &[f32]) -> Vec<u16> {
    values.iter().map(|&v| encode_fp16(v)).collect()
}

pub fn decode_fp16_row(bits: &[u16]) -> Vec<f32> {
    bits.iter().map(|&b| decode_fp16(b)).collect()
}
