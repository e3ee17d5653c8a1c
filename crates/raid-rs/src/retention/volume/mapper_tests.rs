use super::mapper::{end_offset, locate_byte};

#[test]
fn locate_byte_splits_offset_into_block_and_remainder() {
    assert_eq!(locate_byte(0, 0, 512), Some((0, 0)));
    assert_eq!(locate_byte(511, 0, 512), Some((0, 511)));
    assert_eq!(locate_byte(500, 12, 512), Some((1, 0)));
    assert_eq!(locate_byte(1030, 3, 512), Some((2, 9)));
}

#[test]
fn overflow_is_reported() {
    assert_eq!(locate_byte(u64::MAX, 1, 512), None);
    assert_eq!(end_offset(u64::MAX - 1, 2), None);
    assert_eq!(end_offset(10, 5), Some(15));
}
