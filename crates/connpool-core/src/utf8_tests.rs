use super::*;

#[test]
fn ascii_is_valid() {
    assert!(is_valid(b"hello world 123 !@#"));
    assert_eq!(char_length(b'a'), Some(1));
}

#[test]
fn two_three_four_byte_sequences_are_valid() {
    assert!(is_valid("café".as_bytes())); // 2-byte
    assert!(is_valid("日本語".as_bytes())); // 3-byte
    assert!(is_valid("🦀".as_bytes())); // 4-byte
    assert!(is_valid("mix: café 日本語 🦀".as_bytes()));
}

#[test]
fn truncated_multibyte_sequence_is_rejected() {
    let bytes = [0xe4u8, 0xb8]; // first two bytes of a 3-byte sequence only
    let err = validate_bytes(&bytes).unwrap_err();
    assert_eq!(err.offset, 0);
    assert!(validate(&bytes, "test").is_none());
}

#[test]
fn lone_continuation_byte_is_rejected() {
    let bytes = [0x80u8];
    assert!(validate_bytes(&bytes).is_err());
}

#[test]
fn overlong_encoding_is_rejected() {
    // U+002F ('/') overlong-encoded as two bytes instead of one.
    let bytes = [0xc0u8, 0xaf];
    assert!(validate_bytes(&bytes).is_err());
}

#[test]
fn surrogate_half_is_rejected() {
    // U+D800, a UTF-16 surrogate half with no valid UTF-8 encoding.
    let bytes = [0xedu8, 0xa0, 0x80];
    assert!(validate_bytes(&bytes).is_err());
}

#[test]
fn code_point_above_max_is_rejected() {
    // 0xf4 0x90 ... encodes above U+10FFFF.
    let bytes = [0xf4u8, 0x90, 0x80, 0x80];
    assert!(validate_bytes(&bytes).is_err());
}

#[test]
fn error_offset_points_at_the_failing_byte_not_the_start() {
    let mut bytes = b"valid-prefix-".to_vec();
    bytes.push(0xff); // invalid leading byte
    let err = validate_bytes(&bytes).unwrap_err();
    assert_eq!(err.offset, b"valid-prefix-".len());
}

#[test]
fn empty_input_is_valid() {
    assert!(is_valid(b""));
}

#[test]
fn validate_returns_a_heap_copy_of_the_accepted_string() {
    let accepted = validate("café".as_bytes(), "test").expect("well-formed input should be accepted");
    assert_eq!(accepted, "café");
}

use yare::parameterized;

#[parameterized(
    truncated_two_byte = { &[0xc2] },
    truncated_three_byte = { &[0xe2, 0x82] },
    truncated_four_byte = { &[0xf0, 0x9f, 0x98] },
    bad_lead_byte = { &[0xff] },
    overlong_two_byte = { &[0xc1, 0xbf] },
    surrogate_low = { &[0xed, 0xbf, 0xbf] },
)]
fn rejects_malformed_sequences(bytes: &[u8]) {
    assert!(validate(bytes, "test").is_none());
}
