#![no_main]

use libfuzzer_sys::fuzz_target;
use lzss_toolbox::{Compress, CompressIcon, KeysDict, MemoryStream};

/// Feeds arbitrary, potentially malformed frames to the block and icon decoders.
///
/// # Invariant
/// Decoding returns `Ok(_)` or `Err(_)`. It must never panic, whatever the frame says
/// about its own size.
fn verify_decode_robustness(data: &[u8]) {
    let mut output = vec![0u8; 1024];
    let _ = Compress::default().decode(data, &mut output);
    let _ = CompressIcon::new(256).decode(data);

    // The same bytes as a raw stream.
    let mut offset = 0;
    let _ = Compress::default().decode_streamed(
        |buf: &mut [u8]| {
            let n = buf.len().min(data.len() - offset);
            buf[..n].copy_from_slice(&data[offset..offset + n]);
            offset += n;
            n
        },
        |buf: &[u8]| buf.len(),
    );
}

/// # Invariant
/// `decode(encode(data)) == data`, with the frame never longer than `data.len() + 1`.
///
/// # Panics
/// On any mismatch or on an error while decoding a frame the encoder produced.
fn verify_round_trip(data: &[u8]) {
    if data.is_empty() {
        return;
    }
    let mut compress = Compress::default();
    let mut frame = vec![0u8; data.len() + 1];
    let size = match compress.encode(data, &mut frame) {
        Ok(size) => size,
        Err(e) => panic!("Encode rejected a correctly sized buffer: {e:?}"),
    };

    let mut decoded = vec![0u8; data.len()];
    match compress.decode(&frame[..size], &mut decoded) {
        Ok(n) if n == data.len() && decoded == data => {}
        Ok(n) => panic!(
            "Round-trip mismatch!\nInput len: {}\nFrame len: {}\nDecoded len: {}",
            data.len(),
            size,
            n
        ),
        Err(e) => panic!("Decoder rejected its own frame: {e:?}\nInput len: {}", data.len()),
    }
}

/// Arbitrary dictionary text must open, count and iterate without panicking.
fn verify_dict_robustness(data: &[u8]) {
    let Ok(mut dict) = KeysDict::from_stream(MemoryStream::from(data), 6) else {
        return;
    };
    let mut key = [0u8; 6];
    let mut seen = 0;
    while let Ok(true) = dict.get_next_key(&mut key) {
        seen += 1;
    }
    assert_eq!(seen, dict.total_keys());
}

fuzz_target!(|data: &[u8]| {
    verify_decode_robustness(data);
    verify_round_trip(data);
    verify_dict_robustness(data);
});
