//! Byte-level primitives shared by every beacon.
//!
//! - `random32`: per-request nonce and unique-id seed
//! - `generate_hash`: the ga.js string hash (domain hash, visitor fingerprint)
//! - `encode_uri_component`: JavaScript `encodeURIComponent()` escaping
//!
//! The query string is form-encoded by `url::form_urlencoded` first and then
//! rewritten by `convert_to_uri_component_encoding`, so the bytes on the wire
//! are the ones the browser script would produce.

use url::form_urlencoded;

/// Escapes `form_urlencoded` applies that `encodeURIComponent()` leaves alone.
const URI_COMPONENT_RESTORE: &[(&str, &str)] = &[
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
    ("%7E", "~"),
];

/// Uniformly distributed 32-bit random number.
pub fn random32() -> u32 {
    rand::random::<u32>()
}

/// The ga.js string hash.
///
/// Bytes are folded from last to first, keeping the running value inside 28
/// bits and mixing the top 7 of them back into the low bits. An empty string
/// hashes to `1`.
pub fn generate_hash(input: &str) -> i32 {
    if input.is_empty() {
        return 1;
    }

    let mut hash: i64 = 0;
    for &byte in input.as_bytes().iter().rev() {
        let current = byte as i64;
        hash = ((hash << 6) & 0x0fff_ffff) + current + (current << 14);
        let left_most_7 = hash & 0x0fe0_0000;
        if left_most_7 != 0 {
            hash ^= left_most_7 >> 21;
        }
    }

    // At most 0x0fffffff + 0xff + (0xff << 14), always inside i32.
    hash as i32
}

/// Percent-encode a single value the way `encodeURIComponent()` does.
pub fn encode_uri_component(value: &str) -> String {
    let form_encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    convert_to_uri_component_encoding(&form_encoded)
}

/// Rewrite form-encoded text (`+` for space, punctuation escaped) into
/// `encodeURIComponent()` form.
pub fn convert_to_uri_component_encoding(encoded: &str) -> String {
    let mut out = encoded.replace('+', "%20");
    for (escaped, raw) in URI_COMPONENT_RESTORE {
        if out.contains(escaped) {
            out = out.replace(escaped, raw);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_values() {
        assert_eq!(generate_hash("example.com"), 60493049);
        assert_eq!(generate_hash("www.example.com"), 217344784);
        assert_eq!(generate_hash("a"), 1589345);
    }

    #[test]
    fn test_hash_empty_is_one() {
        assert_eq!(generate_hash(""), 1);
    }

    #[test]
    fn test_hash_deterministic() {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/118.0";
        let first = generate_hash(ua);
        for _ in 0..10 {
            assert_eq!(generate_hash(ua), first);
        }
        assert!(first >= 0);
    }

    #[test]
    fn test_encode_space_as_percent_20() {
        assert_eq!(encode_uri_component("hello world"), "hello%20world");
    }

    #[test]
    fn test_encode_unreserved_set() {
        let unreserved = "AZaz09-_.!~*'()";
        assert_eq!(encode_uri_component(unreserved), unreserved);
    }

    #[test]
    fn test_encode_reserved_punctuation() {
        assert_eq!(
            encode_uri_component("a b*!'()~+/=;|"),
            "a%20b*!'()~%2B%2F%3D%3B%7C"
        );
        assert_eq!(encode_uri_component("ü"), "%C3%BC");
    }

    #[test]
    fn test_diverges_from_form_encoding() {
        for ch in ["*", "!", "'", "(", ")"] {
            let form: String = form_urlencoded::byte_serialize(ch.as_bytes()).collect();
            assert_eq!(encode_uri_component(ch), ch);
            // `*` is the one byte form encoding already leaves bare
            if ch != "*" {
                assert_ne!(form, ch);
            }
        }
    }

    #[test]
    fn test_convert_query_string() {
        let form = "utmdt=Caf%C3%A9+%28beta%29%21&utmp=%2Fa%2Ab";
        assert_eq!(
            convert_to_uri_component_encoding(form),
            "utmdt=Caf%C3%A9%20(beta)!&utmp=%2Fa*b"
        );
    }

    #[test]
    fn test_random32_varies() {
        let samples: Vec<u32> = (0..8).map(|_| random32()).collect();
        assert!(samples.windows(2).any(|w| w[0] != w[1]));
    }
}
