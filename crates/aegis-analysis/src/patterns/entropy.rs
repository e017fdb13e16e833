//! Entropy check for hard-coded secrets.
//!
//! A literal is reported as an encoded secret only when its character set
//! matches hex or base64 and its byte entropy clears the floor for that
//! alphabet. Identifiers, paths and prose fail one of the two tests.

/// Minimum length (exclusive) of a literal considered as an encoded secret.
pub const MIN_SECRET_LENGTH: usize = 16;

/// Entropy floor for base64-like literals.
pub const BASE64_ENTROPY_THRESHOLD: f64 = 4.0;

/// Entropy floor for hex literals (alphabet of 16 caps entropy at 4.0).
pub const HEX_ENTROPY_THRESHOLD: f64 = 3.0;

/// Bits of information per byte of `s`, from its byte histogram. Zero for
/// the empty string.
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let len = s.len() as f64;
    let mut freq = [0usize; 256];
    for &byte in s.as_bytes() {
        freq[byte as usize] += 1;
    }

    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Encoding a literal's character set is consistent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Hex,
    Base64,
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Base64 => "base64",
        }
    }
}

fn classify_charset(s: &str) -> Option<Encoding> {
    let bytes = s.as_bytes();
    let has_digit = bytes.iter().any(u8::is_ascii_digit);
    let has_alpha = bytes.iter().any(u8::is_ascii_alphabetic);
    if !has_digit || !has_alpha {
        return None;
    }
    if bytes.iter().all(u8::is_ascii_hexdigit) {
        return Some(Encoding::Hex);
    }
    let body = s.trim_end_matches('=');
    if body
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'-' | b'_'))
    {
        return Some(Encoding::Base64);
    }
    None
}

/// Whether `s` looks like an encoded secret: longer than 16 characters, a
/// hex or base64 character set with both letters and digits, and entropy
/// above the threshold for that encoding.
pub fn looks_encoded(s: &str) -> Option<Encoding> {
    if s.len() <= MIN_SECRET_LENGTH {
        return None;
    }
    let encoding = classify_charset(s)?;
    let threshold = match encoding {
        Encoding::Hex => HEX_ENTROPY_THRESHOLD,
        Encoding::Base64 => BASE64_ENTROPY_THRESHOLD,
    };
    (shannon_entropy(s) > threshold).then_some(encoding)
}
