//! Property-based tests for the codec and the dictionary.
//! Invariants must hold for all inputs, not just the fixed cases in the other suites.

use lzss_toolbox::{Compress, CompressConfig, KeysDict, MemoryStream};
use proptest::collection::vec;
use proptest::prelude::*;

/// Byte vectors biased towards repetition so both frame kinds get exercised.
fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        vec(any::<u8>(), 1..600),
        vec(0u8..4, 1..2000),
        (vec(any::<u8>(), 1..24), 1usize..80)
            .prop_map(|(unit, reps)| unit.repeat(reps)),
    ]
}

proptest::proptest! {
    /// decode(encode(x)) == x, and the frame never grows past `len + 1`.
    #[test]
    fn block_round_trip(data in payload()) {
        let mut compress = Compress::default();
        let mut frame = vec![0u8; data.len() + 1];
        let size = compress.encode(&data, &mut frame).unwrap();
        prop_assert!(size <= data.len() + 1);

        let mut out = vec![0u8; data.len()];
        prop_assert_eq!(compress.decode(&frame[..size], &mut out), Ok(data.len()));
        prop_assert_eq!(out, data);
    }

    /// Any window/lookahead pair round-trips through the streaming paths, whatever
    /// the callback granularity.
    #[test]
    fn streamed_round_trip(
        data in payload(),
        window in 4u8..=12,
        lookahead_offset in 1u8..=8,
        read_max in 1usize..40,
    ) {
        let lookahead = window.saturating_sub(lookahead_offset).max(3);
        prop_assume!(lookahead < window);
        let config = CompressConfig::new(window, lookahead, 16).unwrap();
        let mut compress = Compress::new(config);

        let mut compressed = Vec::new();
        let mut offset = 0;
        compress.encode_streamed(
            |buf: &mut [u8]| {
                let n = buf.len().min(read_max).min(data.len() - offset);
                buf[..n].copy_from_slice(&data[offset..offset + n]);
                offset += n;
                n
            },
            |buf: &[u8]| {
                compressed.extend_from_slice(buf);
                buf.len()
            },
        ).unwrap();

        let mut restored = Vec::new();
        let mut offset = 0;
        compress.decode_streamed(
            |buf: &mut [u8]| {
                let n = buf.len().min(read_max).min(compressed.len() - offset);
                buf[..n].copy_from_slice(&compressed[offset..offset + n]);
                offset += n;
                n
            },
            |buf: &[u8]| {
                restored.extend_from_slice(buf);
                buf.len()
            },
        ).unwrap();
        prop_assert_eq!(restored, data);
    }

    /// Arbitrary frames never panic the decoder.
    #[test]
    fn decode_never_panics(frame in vec(any::<u8>(), 0..256), out_len in 0usize..512) {
        let mut out = vec![0u8; out_len];
        let _ = Compress::default().decode(&frame, &mut out);
    }

    /// The cached key count always equals the number of keys actually stored.
    #[test]
    fn dict_count_tracks_contents(
        adds in vec(any::<[u8; 2]>(), 0..40),
        deletes in vec(any::<[u8; 2]>(), 0..40),
    ) {
        let mut dict = KeysDict::from_stream(MemoryStream::new(), 2).unwrap();
        let mut model: Vec<[u8; 2]> = Vec::new();
        for key in &adds {
            dict.add_key(key).unwrap();
            model.push(*key);
        }
        for key in &deletes {
            let expected = model.iter().position(|k| k == key);
            prop_assert_eq!(dict.delete_key(key).unwrap(), expected.is_some());
            if let Some(i) = expected {
                model.remove(i);
            }
        }
        prop_assert_eq!(dict.total_keys(), model.len());

        let reopened = KeysDict::from_stream(dict.into_inner(), 2).unwrap();
        prop_assert_eq!(reopened.total_keys(), model.len());
    }
}
