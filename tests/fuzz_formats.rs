// Fuzz tests for the format decoders and codec round trips
//
// These tests use property-based testing via proptest to feed the
// decoders arbitrary data and to check encode/decode round trips over
// generated stitch sequences.
//
// Run with: cargo test --test fuzz_formats

use peslib::prelude::*;
use proptest::prelude::*;

// Helper to create random bytes
fn random_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..4096)
}

// Helper to create bytes that pass the PES magic check
fn pes_like_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 16..4096).prop_map(|mut data| {
        data[..8].copy_from_slice(b"#PES0001");
        data
    })
}

// Coordinates kept within +-102.0mm so every consecutive delta and the
// seed delta from the bounds corner stay within the signed 12-bit range.
fn stitch_coordinates() -> impl Strategy<Value = Vec<(f32, f32)>> {
    prop::collection::vec((-1020i32..=1020, -1020i32..=1020), 1..200)
        .prop_map(|raw| raw.into_iter().map(|(x, y)| (x as f32 / 10.0, y as f32 / 10.0)).collect())
}

proptest! {
    #[test]
    fn fuzz_pec_decoder_random(data in random_bytes()) {
        // Should not panic, even with random data
        if let Ok(decoder) = PecDecoder::new(&data) {
            let _ = decoder.label();
            let _ = decoder.thread_count();
            let _ = decoder.stitch_count();
            let _ = decoder.thumbnail_pixel(0, 0, 0);
        }
    }

    #[test]
    fn fuzz_pes_decoder_random(data in random_bytes()) {
        // Should not panic, may return error
        let _ = PesDecoder::new(&data);
    }

    #[test]
    fn fuzz_pes_decoder_semi_valid(data in pes_like_bytes()) {
        // Should not panic with a valid magic and random remainder
        if let Ok(decoder) = PesDecoder::new(&data) {
            let _ = decoder.stitch_count();
            let _ = decoder.for_each_stitch(|_| true);
        }
    }

    #[test]
    fn fuzz_svg_decoder_random(text in "\\PC*") {
        // Should not panic with arbitrary text
        if let Ok(decoder) = SvgEmbDecoder::new(&text) {
            let _ = decoder.for_each_stitch(|_| true);
        }
    }

    #[test]
    fn fuzz_pec_round_trip(coordinates in stitch_coordinates()) {
        let mut encoder = PecEncoder::new();
        encoder.append_thread(20).unwrap();
        for &(x, y) in &coordinates {
            encoder.append_stitch(x, y).unwrap();
        }

        let mut data = Vec::new();
        encoder.emit(|chunk| { data.extend_from_slice(chunk); true }).unwrap();
        prop_assert_eq!(encoder.size().unwrap(), data.len());

        let decoder = PecDecoder::new(&data).unwrap();
        prop_assert_eq!(decoder.stitch_count(), coordinates.len());

        let mut decoded = Vec::new();
        decoder.for_each_stitch(|_, x, y, kind| {
            decoded.push((mm_to_raw(x), mm_to_raw(y), kind));
            true
        }).unwrap();

        let expected: Vec<(i32, i32, StitchKind)> = coordinates
            .iter()
            .map(|&(x, y)| (mm_to_raw(x), mm_to_raw(y), StitchKind::Normal))
            .collect();
        prop_assert_eq!(decoded, expected);
    }

    #[test]
    fn fuzz_pes_scalar_round_trip(coordinates in stitch_coordinates()) {
        let mut encoder = PesEncoder::new();
        encoder.append_thread(palette_thread_by_index(35)).unwrap();
        for &(x, y) in &coordinates {
            encoder.append_stitch(0, x, y).unwrap();
        }

        let mut data = Vec::new();
        encoder.emit1(|chunk| { data.extend_from_slice(chunk); true }).unwrap();
        prop_assert_eq!(encoder.size_1().unwrap(), data.len());

        let decoder = PesDecoder::new(&data).unwrap();
        prop_assert_eq!(decoder.version(), "0001");
        prop_assert_eq!(decoder.thread_count(), 1);
        prop_assert_eq!(decoder.thread(0).rgb, Rgb::new(254, 202, 21));
        prop_assert_eq!(decoder.stitch_count(), coordinates.len());
    }
}
