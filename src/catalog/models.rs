use std::fmt;

use serde::{Deserialize, Deserializer};

/// Row of `channels.json`. Only the fields the browser needs are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
}

/// Row of `streams.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub feed: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

/// Row of `logos.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogoRecord {
    pub channel: String,
    #[serde(default)]
    pub feed: Option<String>,
    #[serde(default)]
    pub format: Option<LogoFormat>,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl LogoRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }
}

/// Row of `blocklist.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockEntry {
    pub channel: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogoFormat {
    Png,
    Jpeg,
    Svg,
    Gif,
    WebP,
    Avif,
    Apng,
    /// Any label iptv-org may add later.
    Other,
}

impl LogoFormat {
    pub fn from_label(label: &str) -> Self {
        match label {
            "PNG" => LogoFormat::Png,
            "JPEG" => LogoFormat::Jpeg,
            "SVG" => LogoFormat::Svg,
            "GIF" => LogoFormat::Gif,
            "WebP" => LogoFormat::WebP,
            "AVIF" => LogoFormat::Avif,
            "APNG" => LogoFormat::Apng,
            _ => LogoFormat::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogoFormat::Png => "PNG",
            LogoFormat::Jpeg => "JPEG",
            LogoFormat::Svg => "SVG",
            LogoFormat::Gif => "GIF",
            LogoFormat::WebP => "WebP",
            LogoFormat::Avif => "AVIF",
            LogoFormat::Apng => "APNG",
            LogoFormat::Other => "other",
        }
    }

    /// Formats the TV image widget renders without extra decoders.
    pub fn is_raster(&self) -> bool {
        matches!(
            self,
            LogoFormat::Png | LogoFormat::Jpeg | LogoFormat::WebP | LogoFormat::Gif | LogoFormat::Apng
        )
    }
}

impl fmt::Display for LogoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogoFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(LogoFormat::from_label(&raw))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The four collections of one fetch cycle.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub channels: Vec<ChannelRecord>,
    pub streams: Vec<StreamRecord>,
    pub logos: Vec<LogoRecord>,
    pub blocklist: Vec<BlockEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn stream_rows_use_iptv_org_field_names() {
        let row: StreamRecord = serde_json::from_value(json!({
            "channel": "BBCOne.uk",
            "feed": "HD",
            "title": "BBC One HD",
            "url": "https://x/live.m3u8",
            "referrer": null,
            "user_agent": "Mozilla/5.0",
            "quality": "1080p",
            "label": null
        }))
        .unwrap();

        assert_eq!(row.channel.as_deref(), Some("BBCOne.uk"));
        assert_eq!(row.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(row.referrer, None);
    }

    #[test]
    fn stream_rows_tolerate_missing_channel_and_url() {
        let row: StreamRecord = serde_json::from_value(json!({ "channel": null })).unwrap();
        assert_eq!(row, StreamRecord::default());
    }

    #[test]
    fn logo_tags_accept_null_and_unknown_formats() {
        let logo: LogoRecord = serde_json::from_value(json!({
            "channel": "c1",
            "feed": null,
            "tags": null,
            "width": 512,
            "height": 512,
            "format": "HEIC",
            "url": "https://logo/1.heic"
        }))
        .unwrap();

        assert!(logo.tags.is_empty());
        assert_eq!(logo.format, Some(LogoFormat::Other));
        assert!(!LogoFormat::Other.is_raster());
    }

    #[test]
    fn raster_set_excludes_vector_and_avif() {
        let raster: Vec<_> = ["PNG", "JPEG", "SVG", "GIF", "WebP", "AVIF", "APNG"]
            .iter()
            .map(|label| LogoFormat::from_label(label))
            .filter(LogoFormat::is_raster)
            .map(|format| format.to_string())
            .collect();
        assert_eq!(raster, vec!["PNG", "JPEG", "GIF", "WebP", "APNG"]);
    }

    #[test]
    fn format_labels_match_exactly() {
        for label in ["png", "jpg", "JPG", "webp", "WEBP", " PNG"] {
            let format = LogoFormat::from_label(label);
            assert_eq!(format, LogoFormat::Other, "{label}");
            assert!(!format.is_raster());
        }
        assert_eq!(LogoFormat::from_label("WebP"), LogoFormat::WebP);
    }
}
