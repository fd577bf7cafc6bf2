use anyhow::Result;
use sha2::{Digest, Sha256};

use super::ChannelView;

/// Digest of the channel list in output order. Unlike a station catalog,
/// the order is part of what the UI shows, so it is not normalized.
pub fn build_channels_fingerprint(channels: &[ChannelView]) -> Result<String> {
    let mut hasher = Sha256::new();
    for channel in channels {
        let serialized = serde_json::to_vec(channel)?;
        hasher.update(serialized);
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: &str) -> ChannelView {
        ChannelView {
            id: id.into(),
            name: id.to_uppercase(),
            url: format!("https://cdn/{id}.m3u8"),
            logo: None,
            referrer: None,
            user_agent: None,
            stream_title: None,
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let channels = vec![view("a"), view("b")];
        let fp1 = build_channels_fingerprint(&channels).unwrap();
        let fp2 = build_channels_fingerprint(&channels.clone()).unwrap();
        assert_eq!(fp1, fp2);
        assert_eq!(fp1.len(), 64);
    }

    #[test]
    fn fingerprint_depends_on_order() {
        let forward = build_channels_fingerprint(&[view("a"), view("b")]).unwrap();
        let reverse = build_channels_fingerprint(&[view("b"), view("a")]).unwrap();
        assert_ne!(forward, reverse);
    }
}
