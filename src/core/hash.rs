//! Torrent info-hash recognition.
//!
//! Library apps report whatever the download client handed them as
//! `downloadId`; for usenet grabs or failed lookups that is not a torrent
//! hash at all. Only the two info-hash encodings below are ever acted on.

/// Length of a hex-encoded SHA-1 info hash
pub const HEX_HASH_LEN: usize = 40;

/// Length of a base32-encoded SHA-1 info hash
pub const BASE32_HASH_LEN: usize = 32;

/// Check whether `id` is a torrent info hash.
///
/// Accepts 40 hex characters (any case) or 32 base32 characters from the
/// upper-case alphabet `A-Z2-7`.
pub fn is_valid_download_id(id: &str) -> bool {
    match id.len() {
        HEX_HASH_LEN => id.bytes().all(|b| b.is_ascii_hexdigit()),
        BASE32_HASH_LEN => id
            .bytes()
            .all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_hashes() {
        assert!(is_valid_download_id(
            "BBBBB4F4132C4AC7031F5692F36AC77A2ECBCCBB"
        ));
        assert!(is_valid_download_id(
            "bbbbb4f4132c4ac7031f5692f36ac77a2ecbccbb"
        ));
        assert!(is_valid_download_id(
            "BbBbB4f4132C4aC7031f5692F36aC77a2EcBcCbB"
        ));
    }

    #[test]
    fn test_base32_hashes() {
        assert!(is_valid_download_id("ABCDEFGHIJKLMNOPQRSTUVWXYZ234567"));
        assert!(!is_valid_download_id("abcdefghijklmnopqrstuvwxyz234567"));
        // 0, 1, 8 and 9 are not in the base32 alphabet
        assert!(!is_valid_download_id("ABCDEFGHIJKLMNOPQRSTUVWXYZ234501"));
        assert!(!is_valid_download_id("ABCDEFGHIJKLMNOPQRSTUVWXYZ234589"));
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(!is_valid_download_id(""));
        assert!(!is_valid_download_id("SABnzbd_nzo_abc123"));
        assert!(!is_valid_download_id(
            "BBBBB4F4132C4AC7031F5692F36AC77A2ECBCCB"
        ));
        assert!(!is_valid_download_id(
            "BBBBB4F4132C4AC7031F5692F36AC77A2ECBCCBBB"
        ));
        assert!(!is_valid_download_id(
            "GGGGG4F4132C4AC7031F5692F36AC77A2ECBCCBB"
        ));
        // 32 bytes, but not 32 base32 characters
        assert!(!is_valid_download_id(&"é".repeat(16)));
    }
}
