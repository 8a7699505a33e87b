//! Binary sniffing and encoding-aware file reads

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Bytes inspected when deciding whether a file is binary.
const SNIFF_BYTES: usize = 8192;

/// Share of control bytes above which a sample is treated as binary.
const CONTROL_RATIO_LIMIT: f64 = 0.30;

/// Heuristic binary check on the head of a file.
///
/// A NUL byte is conclusive. Otherwise valid UTF-8 is text, and anything else
/// is text only if it is mostly printable once decoded with the detected encoding.
pub fn is_binary_file(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buf = Vec::with_capacity(SNIFF_BYTES);
    file.by_ref().take(SNIFF_BYTES as u64).read_to_end(&mut buf)?;
    Ok(is_binary_sample(&buf))
}

fn is_binary_sample(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => return false,
        // The sample may end in the middle of a multi-byte sequence.
        Err(err) if err.error_len().is_none() => return false,
        Err(_) => {}
    }

    let control = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b))
        .count();
    if control as f64 / sample.len() as f64 > CONTROL_RATIO_LIMIT {
        return true;
    }

    let (_, _, had_errors) = detect_encoding(sample).decode(sample);
    had_errors
}

fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Read a text file, decoding non-UTF-8 content with the detected encoding.
///
/// Returns the decoded text and the name of the encoding used. A UTF-8 BOM is stripped.
pub fn read_file_safe(path: &Path) -> io::Result<(String, &'static str)> {
    let bytes = std::fs::read(path)?;
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);

    match std::str::from_utf8(body) {
        Ok(text) => Ok((text.to_string(), UTF_8.name())),
        Err(_) => {
            let encoding = detect_encoding(body);
            let (text, _, _) = encoding.decode(body);
            Ok((text.into_owned(), encoding.name()))
        }
    }
}
