//! Utility functions and helpers.

pub mod http;

use sha2::{Digest, Sha256};
use url::Url;

const CHANNEL_BASE: &str = "https://youtube.com";

/// Turn operator input (`@handle`, bare name or full URL) into a channel URL.
pub fn normalize_channel_url(input: &str) -> String {
    let input = input.trim();
    if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else if input.starts_with('@') {
        format!("{CHANNEL_BASE}/{input}")
    } else {
        format!("{CHANNEL_BASE}/@{input}")
    }
}

/// Derive a channel identifier from the shape of a channel URL.
///
/// - `/channel/<id>` → `<id>`
/// - `/@<handle>` → `@<handle>`
/// - `/c/<name>` → `c_<name>`
pub fn channel_id_from_url(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["channel", id, ..] => Some((*id).to_string()),
        ["c", name, ..] => Some(format!("c_{name}")),
        [first, ..] if first.len() > 1 && first.starts_with('@') => Some((*first).to_string()),
        _ => None,
    }
}

/// Stable short hash of a string, as lowercase hex.
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_channel_url() {
        assert_eq!(
            normalize_channel_url("@somebody"),
            "https://youtube.com/@somebody"
        );
        assert_eq!(
            normalize_channel_url("somebody"),
            "https://youtube.com/@somebody"
        );
        assert_eq!(
            normalize_channel_url(" https://www.youtube.com/channel/UCabc "),
            "https://www.youtube.com/channel/UCabc"
        );
    }

    #[test]
    fn test_channel_id_from_url() {
        assert_eq!(
            channel_id_from_url("https://www.youtube.com/channel/UC123/videos"),
            Some("UC123".to_string())
        );
        assert_eq!(
            channel_id_from_url("https://youtube.com/@handle?si=x"),
            Some("@handle".to_string())
        );
        assert_eq!(
            channel_id_from_url("https://youtube.com/c/Name"),
            Some("c_Name".to_string())
        );
        assert_eq!(channel_id_from_url("https://youtube.com/watch?v=x"), None);
        assert_eq!(channel_id_from_url("not a url"), None);
    }

    #[test]
    fn test_short_hash_is_stable() {
        assert_eq!(short_hash("abc"), short_hash("abc"));
        assert_eq!(short_hash("abc").len(), 8);
        assert_ne!(short_hash("abc"), short_hash("abd"));
    }
}
