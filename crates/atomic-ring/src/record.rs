//! Record framing: the fixed length+type header every ring record carries.
//!
//! ```text
//! +0  i32  length    (total bytes including header; negated while claimed)
//! +4  i32  type      (>=1 for user messages; PADDING_TYPE = -1)
//! +8  ..   payload
//! ```
//!
//! Free functions here mirror the Aeron Rust port's `record_descriptor`
//! module (`length_offset`, `type_offset`, `encoded_msg_offset`) rather than
//! methods on a `Record` struct, since a record is never materialized as a
//! Rust value — it only ever exists as bytes at an offset inside a ring's
//! [`AtomicBuffer`](crate::buffer::AtomicBuffer).

/// Size of the length+type header, in bytes.
pub const HEADER_LENGTH: usize = 8;

/// Alignment every record is padded to (equal to the header length).
pub const RECORD_ALIGNMENT: usize = HEADER_LENGTH;

/// Reserved message type marking a record as padding to be skipped by readers.
pub const PADDING_TYPE: i32 = -1;

/// Sentinel returned by a claim when the ring cannot satisfy the request.
pub const INSUFFICIENT_CAPACITY: isize = -2;

/// Offset of the `length` field within a record starting at `record_offset`.
#[inline]
#[must_use]
pub const fn length_offset(record_offset: usize) -> usize {
    record_offset
}

/// Offset of the `type` field within a record starting at `record_offset`.
#[inline]
#[must_use]
pub const fn type_offset(record_offset: usize) -> usize {
    record_offset + 4
}

/// Offset of the payload within a record starting at `record_offset`.
#[inline]
#[must_use]
pub const fn payload_offset(record_offset: usize) -> usize {
    record_offset + HEADER_LENGTH
}

/// Rounds `n` up to the next multiple of [`RECORD_ALIGNMENT`].
#[inline]
#[must_use]
pub const fn aligned(n: usize) -> usize {
    (n + (RECORD_ALIGNMENT - 1)) & !(RECORD_ALIGNMENT - 1)
}

/// Returns `true` if `type_id` is a valid user message type (`>= 1`).
#[inline]
#[must_use]
pub const fn is_valid_user_type(type_id: i32) -> bool {
    type_id >= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_correct() {
        assert_eq!(length_offset(100), 100);
        assert_eq!(type_offset(100), 104);
        assert_eq!(payload_offset(100), 108);
    }

    #[test]
    fn aligned_rounds_up_to_multiple_of_eight() {
        assert_eq!(aligned(0), 0);
        assert_eq!(aligned(1), 8);
        assert_eq!(aligned(8), 8);
        assert_eq!(aligned(9), 16);
        assert_eq!(aligned(15), 16);
        assert_eq!(aligned(16), 16);
    }

    #[test]
    fn user_type_validity() {
        assert!(!is_valid_user_type(0));
        assert!(!is_valid_user_type(PADDING_TYPE));
        assert!(is_valid_user_type(1));
    }
}
