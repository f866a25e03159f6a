//! Edge-case tests for the quantization codecs.
//!
//! Tests cover:
//! - Documented block scenarios (all zeros, full-range pair)
//! - Constant blocks, single outlier blocks, NaN and infinity inputs
//! - Row precondition failures
//! - Tensor-level quantize/dequantize error statistics

use alt_quantization::utils::{max_abs_error, mse, snr_db};
use alt_quantization::{
    BlockQ4, BlockQ8, DataType, QuantError, QuantizedTensor, dequantize_row_q4, encode_fp16,
    quantize_row_q4, quantize_row_q8,
};

// ---------------------------------------------------------------------------
// Block scenarios
// ---------------------------------------------------------------------------

#[test]
fn all_zero_block_round_trips_exactly() {
    let zeros = [0.0f32; 32];
    let q8 = BlockQ8::quantize(&zeros);
    assert_eq!(q8.scale, 0.0);
    assert_eq!(q8.codes, [0i8; 32]);
    assert_eq!(q8.dequantize(), zeros);

    let q4 = BlockQ4::quantize(&zeros);
    assert_eq!(q4.scale, 0.0);
    assert_eq!(q4.dequantize(), zeros);
}

#[test]
fn full_range_pair_block() {
    let mut block = [0.0f32; 32];
    block[0] = 127.0;
    block[1] = -127.0;
    let q = BlockQ8::quantize(&block);
    assert_eq!(q.scale, 1.0);
    let mut expected = [0i8; 32];
    expected[0] = 127;
    expected[1] = -127;
    assert_eq!(q.codes, expected);
    assert_eq!(q.dequantize(), block);
}

#[test]
fn identical_magnitudes_map_to_extreme_codes() {
    let block: [f32; 32] = std::array::from_fn(|i| if i % 2 == 0 { 0.75 } else { -0.75 });
    let q = BlockQ8::quantize(&block);
    for (i, &c) in q.codes.iter().enumerate() {
        assert_eq!(c, if i % 2 == 0 { 127 } else { -127 });
    }
    for (y, x) in q.dequantize().iter().zip(&block) {
        assert!((y - x).abs() < 1e-6);
    }
}

#[test]
fn q4_codes_clamped_to_range() {
    let block: [f32; 32] = std::array::from_fn(|i| i as f32 - 16.0);
    let q = BlockQ4::quantize(&block);
    assert!(q.codes().iter().all(|&c| (-8..=7).contains(&c)));
    assert_eq!(q.codes()[0], -7, "-16 / (16/7) rounds to -7");
}

#[test]
fn single_outlier_dominates_scale() {
    let mut block = [0.01f32; 32];
    block[31] = 1000.0;
    let q = BlockQ8::quantize(&block);
    assert!(q.codes[..31].iter().all(|&c| c == 0), "small values collapse to zero");
    assert_eq!(q.codes[31], 127);
}

#[test]
fn non_finite_inputs_do_not_panic() {
    let mut block = [1.0f32; 32];
    block[3] = f32::NAN;
    let q = BlockQ8::quantize(&block);
    assert_eq!(q.scale, 1.0 / 127.0);
    assert_eq!(q.codes[3], 0);

    block[3] = f32::INFINITY;
    let q = BlockQ8::quantize(&block);
    assert_eq!(q.scale, 1.0 / 127.0);
    assert_eq!(q.codes[3], 127);
    assert!(q.dequantize().iter().all(|y| y.is_finite()));
    assert_eq!(encode_fp16(f32::NEG_INFINITY), 0xFC00);
}

// ---------------------------------------------------------------------------
// Row preconditions
// ---------------------------------------------------------------------------

#[test]
fn row_length_must_be_block_multiple() {
    assert_eq!(
        quantize_row_q8(&[0.0; 40], 32).unwrap_err(),
        QuantError::BlockLength { len: 40, block_size: 32 }
    );
    assert_eq!(
        quantize_row_q4(&[0.0; 40], 32).unwrap_err(),
        QuantError::BlockLength { len: 40, block_size: 32 }
    );
}

#[test]
fn empty_row_is_fine() {
    let (scales, codes) = quantize_row_q8(&[], 32).unwrap();
    assert!(scales.is_empty() && codes.is_empty());
}

#[test]
fn q4_scale_count_checked() {
    let err = dequantize_row_q4(&[1.0, 2.0, 3.0], &[0; 32], 32).unwrap_err();
    assert_eq!(err, QuantError::LengthMismatch { expected: 2, actual: 3 });
}

// ---------------------------------------------------------------------------
// Tensor statistics
// ---------------------------------------------------------------------------

#[test]
fn tensor_error_statistics_ordering() {
    let values: Vec<f32> = (0..1024).map(|i| ((i as f32) * 0.37).sin()).collect();
    let mut errors = Vec::new();
    for dt in [DataType::Float32, DataType::Float16, DataType::QInt8, DataType::QInt4] {
        let t = QuantizedTensor::quantize(&values, &[32, 32], dt, 32).unwrap();
        let back = t.dequantize().unwrap();
        assert_eq!(back.len(), values.len());
        errors.push(mse(&values, &back).unwrap());
    }
    assert_eq!(errors[0], 0.0);
    assert!(errors[1] <= errors[2], "f16 at least as accurate as q8");
    assert!(errors[2] < errors[3], "q8 more accurate than q4");

    let t = QuantizedTensor::quantize(&values, &[1024], DataType::QInt8, 32).unwrap();
    let back = t.dequantize().unwrap();
    assert!(snr_db(&values, &back).unwrap() > 30.0);
    assert!(max_abs_error(&values, &back).unwrap() <= 1.0 / 127.0 / 2.0 + 1e-6);
}

#[test]
fn odd_block_rejected_for_qint4_tensor() {
    let err = QuantizedTensor::quantize(&[0.0; 30], &[30], DataType::QInt4, 15).unwrap_err();
    assert_eq!(err, QuantError::OddBlockSize(15));
}
