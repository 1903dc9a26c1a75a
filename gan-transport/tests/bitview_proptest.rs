use gan_transport::BitView;
use proptest::prelude::*;

fn reference_bits(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut value: u64 = 0;
    for i in 0..length {
        let bit_index = start_bit + i;
        let byte_index = bit_index / 8;
        let bit_in_byte = bit_index % 8;
        let bit = match data.get(byte_index) {
            Some(byte) => (byte >> (7 - bit_in_byte)) & 1,
            None => 0,
        };
        value = (value << 1) | bit as u64;
    }
    value
}

proptest! {
    #[test]
    fn bit_word_matches_reference_for_narrow_fields(
        data in prop::collection::vec(any::<u8>(), 1..16),
        start in 0usize..64,
        length in 1u32..=8,
    ) {
        let view = BitView::new(&data);
        let expected = reference_bits(&data, start, length as usize);
        prop_assert_eq!(view.bit_word(start, length) as u64, expected);
    }

    #[test]
    fn bit_word_16_big_endian_matches_reference(
        data in prop::collection::vec(any::<u8>(), 4..16),
        start in 0usize..16,
    ) {
        let view = BitView::new(&data);
        let hi = reference_bits(&data, start, 8);
        let lo = reference_bits(&data, start + 8, 8);
        let expected = (hi << 8) | lo;
        prop_assert_eq!(view.bit_word(start, 16) as u64, expected);
    }

    #[test]
    fn out_of_range_reads_never_panic(
        start in 0usize..200,
        length in prop_oneof![Just(1u32), Just(4), Just(8), Just(16), Just(32)],
    ) {
        let view = BitView::new(&[0xAAu8; 2]);
        let _ = view.bit_word(start, length);
    }
}
