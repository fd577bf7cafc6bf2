use std::collections::{HashMap, HashSet};

use crate::catalog::StreamRecord;

/// A usable stream URL is non-empty after trimming and starts with
/// `http://` or `https://`, compared case-insensitively.
pub fn is_valid_stream_url(url: Option<&str>) -> bool {
    let trimmed = url.unwrap_or_default().trim();
    if trimmed.is_empty() {
        return false;
    }
    has_prefix_ignore_case(trimmed, "http://") || has_prefix_ignore_case(trimmed, "https://")
}

fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// First stream of the group with a valid URL.
pub fn pick_best_stream<'a>(group: &[&'a StreamRecord]) -> Option<&'a StreamRecord> {
    group
        .iter()
        .copied()
        .find(|stream| is_valid_stream_url(stream.url.as_deref()))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkippedStreams {
    pub missing_fields: usize,
    pub blocked: usize,
    pub invalid_url: usize,
}

impl SkippedStreams {
    pub fn total(&self) -> usize {
        self.missing_fields + self.blocked + self.invalid_url
    }
}

/// Streams grouped by channel id, in first-seen channel order.
#[derive(Debug, Default)]
pub struct StreamGroups<'a> {
    groups: Vec<(&'a str, Vec<&'a StreamRecord>)>,
    positions: HashMap<&'a str, usize>,
    pub skipped: SkippedStreams,
}

impl<'a> StreamGroups<'a> {
    pub fn build(streams: &'a [StreamRecord], blocked: &HashSet<&str>) -> Self {
        let mut grouped = Self::default();

        for stream in streams {
            let (channel, url) = match (non_empty(&stream.channel), non_empty(&stream.url)) {
                (Some(channel), Some(url)) => (channel, url),
                _ => {
                    grouped.skipped.missing_fields += 1;
                    continue;
                }
            };
            if blocked.contains(channel) {
                grouped.skipped.blocked += 1;
                continue;
            }
            if !is_valid_stream_url(Some(url)) {
                grouped.skipped.invalid_url += 1;
                continue;
            }

            match grouped.positions.get(channel) {
                Some(&position) => grouped.groups[position].1.push(stream),
                None => {
                    grouped.positions.insert(channel, grouped.groups.len());
                    grouped.groups.push((channel, vec![stream]));
                }
            }
        }

        grouped
    }

    pub fn channel_count(&self) -> usize {
        self.groups.len()
    }

    pub fn iter<'s>(&'s self) -> impl Iterator<Item = (&'a str, &'s [&'a StreamRecord])> + 's {
        self.groups
            .iter()
            .map(|(channel, streams)| (*channel, streams.as_slice()))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
