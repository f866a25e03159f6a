//! Whole-model save/load tests.
//!
//! Tests cover:
//! - Save then load for every storage type and several alignments
//! - Catalogue scan of a saved model
//! - Section order, section length and end-marker corruption
//! - Arbitrary corruption never panics

use std::io::Cursor;

use alt_common::{AltConfig, DataType};
use alt_format::{ErrorKind, FormatError, MagicFile, Mode, SectionKind, scan};
use alt_models::{
    AltModel, General, ModelError, Parameters, RawTensor, Section, SpecialTokens, Token,
    TokenType, Tokenizer, Tensors,
};
use proptest::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn general() -> General {
    General {
        model_type: "mistral".into(),
        model_base: "mistralai/Mistral-7B-v0.1".into(),
        author: "Mistral AI".into(),
        created_at: "2023-09-27".into(),
        last_modified: "2024-01-10".into(),
        license: "Apache-2.0".into(),
        uuid: "0b4e6f52-71a4-4d7c-8a36-54c1f1d0c9e2".into(),
    }
}

fn parameters() -> Parameters {
    Parameters {
        hidden_size: 64,
        intermediate_size: 256,
        max_position_embeddings: 128,
        num_attention_heads: 4,
        num_hidden_layers: 2,
        num_key_value_heads: 2,
        sliding_window: 64,
        head_size: 16,
        ..Parameters::default()
    }
}

fn tokenizer() -> Tokenizer {
    let mut tokens = vec![
        Token::new("<unk>", 0.0, TokenType::Unknown),
        Token::new("<s>", 0.0, TokenType::Control),
        Token::new("</s>", 0.0, TokenType::Control),
    ];
    for (i, word) in ["▁the", "▁a", "▁model", "ing", "s"].iter().enumerate() {
        tokens.push(Token::new(*word, -(i as f32), TokenType::Normal));
    }
    Tokenizer::new(tokens, SpecialTokens { bos: 1, eos: 2, pad: -1, unk: 0 }).unwrap()
}

fn raw_tensors() -> Vec<RawTensor> {
    let wave = |n: usize, k: f32| (0..n).map(|i| (i as f32 * k).sin()).collect::<Vec<f32>>();
    vec![
        RawTensor::new("tok_embeddings.weight", &[8, 64], wave(512, 0.1)),
        RawTensor::new("layers.0.attention.wq.weight", &[64, 64], wave(4096, 0.37)),
        RawTensor::new("norm.weight", &[64], vec![1.0; 64]),
    ]
}

fn model(data_type: DataType) -> AltModel {
    let tensors = Tensors::quantize_all(&raw_tensors(), data_type, 32).unwrap();
    AltModel::new(general(), parameters(), tokenizer(), tensors)
}

fn model_bytes(m: &AltModel) -> Vec<u8> {
    let mut w = MagicFile::from_stream(Cursor::new(Vec::new()), Mode::Write);
    m.write_to(&mut w).unwrap();
    w.into_inner().into_inner()
}

fn read_bytes(bytes: Vec<u8>) -> Result<AltModel, ModelError> {
    let mut r = MagicFile::from_stream(Cursor::new(bytes), Mode::Read);
    AltModel::read_from(&mut r)
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn save_and_load_every_data_type() {
    let dir = TempDir::new().unwrap();
    for dt in DataType::ALL {
        let path = dir.path().join(format!("model-{dt}.alt"));
        let m = model(dt);
        m.save(&path).unwrap();
        let loaded = AltModel::load(&path).unwrap();
        assert_eq!(loaded, m, "{dt}");
        assert_eq!(loaded.tokenizer.id_of("▁model"), Some(5));
    }
}

#[test]
fn dequantized_weights_stay_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("q8.alt");
    model(DataType::QInt8).save(&path).unwrap();

    let loaded = AltModel::load(&path).unwrap();
    let raw = raw_tensors();
    for r in &raw {
        let back = loaded.tensors.get(&r.name).unwrap().dequantize().unwrap();
        for (x, y) in r.values.iter().zip(&back) {
            assert!((x - y).abs() <= 1.0 / 127.0, "{}: {x} vs {y}", r.name);
        }
    }
}

#[test]
fn alignment_from_config() {
    for alignment in [8, 64, 256] {
        let config = AltConfig::builder().alignment(alignment).build().unwrap();
        let m = model(DataType::QInt4).with_config(&config);
        let loaded = read_bytes(model_bytes(&m)).unwrap();
        assert_eq!(loaded.alignment, alignment);
        assert_eq!(loaded, m);
    }
}

#[test]
fn scan_reports_sections_in_catalogue_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scan.alt");
    let m = model(DataType::Float16);
    m.save(&path).unwrap();

    let catalog = scan(&path).unwrap();
    let kinds: Vec<_> = catalog.sections.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, SectionKind::ALL.to_vec());
    assert_eq!(catalog.sections[0].length, m.general.encoded_len());
    assert_eq!(catalog.sections[3].length, m.tensors.encoded_len());
    assert_eq!(catalog.file_len(), std::fs::metadata(&path).unwrap().len());
    for s in &catalog.sections {
        assert_eq!(s.offset % 32, 0);
    }
}

#[test]
fn tensor_infos_serialize() {
    let m = model(DataType::QInt8);
    let json = serde_json::to_value(m.tensors.infos()).unwrap();
    assert_eq!(json[0]["name"], "tok_embeddings.weight");
    assert_eq!(json[0]["data_type"], "QInt8");
    assert_eq!(json[0]["shape"], serde_json::json!([8, 64]));
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[test]
fn wrong_section_order_rejected() {
    let m = model(DataType::Float32);
    let mut w = MagicFile::from_stream(Cursor::new(Vec::new()), Mode::Write);
    w.write_start_marker(2, 32).unwrap();
    m.parameters.write_to(&mut w).unwrap();
    m.general.write_to(&mut w).unwrap();
    w.write_end_marker().unwrap();

    let err = read_bytes(w.into_inner().into_inner()).unwrap_err();
    let format = err.as_format().unwrap();
    assert!(matches!(
        format,
        FormatError::UnexpectedSection { expected: SectionKind::General, found: SectionKind::Parameters }
    ));
    assert_eq!(format.kind(), ErrorKind::InvalidMarker);
}

#[test]
fn declared_length_must_match_payload() {
    let m = model(DataType::Float32);
    let mut bytes = model_bytes(&m);
    let declared = m.general.encoded_len() + 1;
    bytes[40..48].copy_from_slice(&declared.to_le_bytes());

    let err = read_bytes(bytes).unwrap_err();
    assert!(matches!(
        err.as_format(),
        Some(FormatError::SectionLength { kind: SectionKind::General, .. })
    ));
}

#[test]
fn missing_end_marker_is_file_error() {
    let mut bytes = model_bytes(&model(DataType::QInt8));
    bytes.truncate(bytes.len() - 4);
    let err = read_bytes(bytes).unwrap_err();
    assert_eq!(err.as_format().map(FormatError::kind), Some(ErrorKind::File));
}

#[test]
fn load_rejects_foreign_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("foreign.bin");
    std::fs::write(&path, b"GGUF\x03\x00\x00\x00 not an alt file at all").unwrap();
    let err = AltModel::load(&path).unwrap_err();
    assert_eq!(err.as_format().map(FormatError::kind), Some(ErrorKind::InvalidMarker));
}

#[test]
fn invalid_tokenizer_rejected_on_read() {
    let m = model(DataType::Float32);
    let mut bytes = model_bytes(&m);
    // Tokenizer payload starts with vocab_size, then bos_id.
    let tok = section_offset(&bytes, SectionKind::Tokenizer);
    bytes[tok + 20..tok + 24].copy_from_slice(&99i32.to_le_bytes());
    assert!(matches!(read_bytes(bytes), Err(ModelError::Tokenizer(_))));
}

fn section_offset(bytes: &[u8], kind: SectionKind) -> usize {
    let mut r = MagicFile::from_stream(Cursor::new(bytes.to_vec()), Mode::Read);
    let catalog = alt_format::scan_stream(&mut r).unwrap();
    catalog.find(kind).unwrap().offset as usize
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Flipping bytes anywhere may fail the read but must never panic.
    #[test]
    fn corrupted_files_never_panic(flips in prop::collection::vec((any::<prop::sample::Index>(), 1u8..=255), 1..8)) {
        let mut bytes = model_bytes(&model(DataType::QInt4));
        for (idx, x) in flips {
            let i = idx.index(bytes.len());
            bytes[i] ^= x;
        }
        let _ = read_bytes(bytes);
    }

    #[test]
    fn truncated_files_fail_cleanly(cut in 0usize..2000) {
        let bytes = model_bytes(&model(DataType::QInt8));
        let cut = cut.min(bytes.len() - 1);
        prop_assert!(read_bytes(bytes[..cut].to_vec()).is_err());
    }
}
