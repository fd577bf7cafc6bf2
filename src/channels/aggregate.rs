use std::collections::{HashMap, HashSet};

use crate::catalog::{BlockEntry, Catalog, ChannelRecord, LogoRecord, StreamRecord};

use super::logos::{index_logos, pick_best_logo};
use super::streams::{pick_best_stream, SkippedStreams, StreamGroups};
use super::ChannelView;

pub const DEFAULT_LIMIT: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub channels: Vec<ChannelView>,
    pub skipped: SkippedStreams,
    /// Channels that had at least one eligible stream, before the cap.
    pub eligible: usize,
}

pub fn aggregate(
    channels: &[ChannelRecord],
    streams: &[StreamRecord],
    logos: &[LogoRecord],
    blocklist: &[BlockEntry],
    limit: usize,
) -> Vec<ChannelView> {
    aggregate_with_summary(channels, streams, logos, blocklist, limit).channels
}

pub fn aggregate_catalog(catalog: &Catalog, limit: usize) -> Aggregation {
    aggregate_with_summary(
        &catalog.channels,
        &catalog.streams,
        &catalog.logos,
        &catalog.blocklist,
        limit,
    )
}

pub fn aggregate_with_summary(
    channels: &[ChannelRecord],
    streams: &[StreamRecord],
    logos: &[LogoRecord],
    blocklist: &[BlockEntry],
    limit: usize,
) -> Aggregation {
    let blocked: HashSet<&str> = blocklist.iter().map(|entry| entry.channel.as_str()).collect();

    // Later duplicates overwrite earlier ones.
    let names: HashMap<&str, &str> = channels
        .iter()
        .map(|channel| (channel.id.as_str(), channel.name.as_str()))
        .collect();

    let logos_by_channel = index_logos(logos);
    let groups = StreamGroups::build(streams, &blocked);

    let mut result = Vec::with_capacity(limit.min(groups.channel_count()));
    for (channel_id, group) in groups.iter() {
        if result.len() >= limit {
            break;
        }
        let Some(best) = pick_best_stream(group) else {
            continue;
        };
        let Some(url) = best.url.clone() else {
            continue;
        };

        let channel_logos = logos_by_channel
            .get(channel_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let logo = pick_best_logo(channel_logos, best.feed.as_deref())
            .map(|(_tier, logo)| logo.url.clone());

        result.push(ChannelView {
            id: channel_id.to_string(),
            name: names.get(channel_id).copied().unwrap_or(channel_id).to_string(),
            url,
            logo,
            referrer: best.referrer.clone(),
            user_agent: best.user_agent.clone(),
            stream_title: best.title.clone(),
        });
    }

    Aggregation {
        channels: result,
        skipped: groups.skipped,
        eligible: groups.channel_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LogoFormat;
    use crate::channels::is_valid_stream_url;
    use pretty_assertions::assert_eq;

    fn channel(id: &str, name: &str) -> ChannelRecord {
        ChannelRecord {
            id: id.into(),
            name: name.into(),
        }
    }

    fn stream(channel: &str, url: &str, feed: Option<&str>) -> StreamRecord {
        StreamRecord {
            channel: Some(channel.into()),
            url: Some(url.into()),
            feed: feed.map(str::to_string),
            ..Default::default()
        }
    }

    fn logo(channel: &str, url: &str, feed: Option<&str>, tags: &[&str]) -> LogoRecord {
        LogoRecord {
            channel: channel.into(),
            feed: feed.map(str::to_string),
            format: Some(LogoFormat::Png),
            url: url.into(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    fn block(channel: &str) -> BlockEntry {
        BlockEntry {
            channel: channel.into(),
        }
    }

    fn many_channels(count: usize) -> Vec<StreamRecord> {
        (0..count)
            .map(|n| stream(&format!("ch{n:02}"), &format!("https://cdn/{n}.m3u8"), None))
            .collect()
    }

    #[test]
    fn single_channel_produces_view() {
        let result = aggregate(
            &[channel("bbc1", "BBC One")],
            &[stream("bbc1", "https://x/live.m3u8", None)],
            &[],
            &[],
            10,
        );

        assert_eq!(
            result,
            vec![ChannelView {
                id: "bbc1".into(),
                name: "BBC One".into(),
                url: "https://x/live.m3u8".into(),
                logo: None,
                referrer: None,
                user_agent: None,
                stream_title: None,
            }]
        );
    }

    #[test]
    fn blocked_channel_is_excluded() {
        let result = aggregate(
            &[channel("bbc1", "BBC One")],
            &[stream("bbc1", "https://x/live.m3u8", None)],
            &[],
            &[block("bbc1")],
            10,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn invalid_first_stream_and_feed_matched_logo() {
        let result = aggregate(
            &[],
            &[
                stream("c1", "not-a-url", None),
                stream("c1", "https://ok/", Some("f1")),
            ],
            &[
                logo("c1", "L1", Some("f1"), &[]),
                logo("c1", "L2", None, &["white"]),
            ],
            &[],
            10,
        );

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].url, "https://ok/");
        assert_eq!(result[0].logo.as_deref(), Some("L1"));
        assert_eq!(result[0].name, "c1");
    }

    #[test]
    fn cap_keeps_first_eligible_channels_in_order() {
        let streams = many_channels(40);
        let summary = aggregate_with_summary(&[], &streams, &[], &[], 30);

        assert_eq!(summary.channels.len(), 30);
        assert_eq!(summary.eligible, 40);
        let ids: Vec<String> = summary.channels.iter().map(|view| view.id.clone()).collect();
        let expected: Vec<String> = (0..30).map(|n| format!("ch{n:02}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn zero_limit_yields_nothing() {
        let streams = many_channels(3);
        assert!(aggregate(&[], &streams, &[], &[], 0).is_empty());
    }

    #[test]
    fn stream_fields_are_copied_from_best_stream() {
        let mut best = stream("c1", "https://ok/hd.m3u8", Some("HD"));
        best.referrer = Some("https://site/".into());
        best.user_agent = Some("Mozilla/5.0".into());
        best.title = Some("C1 HD".into());
        best.quality = Some("1080p".into());
        let streams = vec![best, stream("c1", "https://ok/sd.m3u8", Some("SD"))];

        let result = aggregate(&[channel("c1", "Channel One")], &streams, &[], &[], 5);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].url, "https://ok/hd.m3u8");
        assert_eq!(result[0].referrer.as_deref(), Some("https://site/"));
        assert_eq!(result[0].user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(result[0].stream_title.as_deref(), Some("C1 HD"));
    }

    #[test]
    fn channels_without_streams_or_with_only_bad_streams_are_dropped() {
        let result = aggregate(
            &[channel("logo-only", "Logo Only"), channel("bad", "Bad")],
            &[stream("bad", "udp://239.0.0.1:1234", None)],
            &[logo("logo-only", "L", None, &[]), logo("bad", "B", None, &[])],
            &[block("logo-only")],
            10,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn duplicate_channel_records_last_one_wins() {
        let result = aggregate(
            &[channel("c1", "Old Name"), channel("c1", "New Name")],
            &[stream("c1", "https://ok/", None)],
            &[],
            &[],
            10,
        );
        assert_eq!(result[0].name, "New Name");
    }

    #[test]
    fn output_respects_blocklist_and_url_invariants() {
        let streams = vec![
            stream("a", "https://a/1", None),
            stream("b", " http://b/1 ", None),
            stream("c", "https://c/1", None),
            stream("d", "mms://d/1", None),
            stream("a", "https://a/2", None),
        ];
        let blocklist = vec![block("c")];

        for limit in 0..6 {
            let result = aggregate(&[], &streams, &[], &blocklist, limit);
            assert!(result.len() <= limit);
            for view in &result {
                assert_ne!(view.id, "c");
                assert!(is_valid_stream_url(Some(view.url.as_str())));
                assert_eq!(view.name, view.id);
            }
        }
        let ids: Vec<String> = aggregate(&[], &streams, &[], &blocklist, 10)
            .into_iter()
            .map(|view| view.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let streams = many_channels(25);
        let logos: Vec<LogoRecord> = (0..25)
            .flat_map(|n| {
                let id = format!("ch{n:02}");
                vec![
                    logo(&id, &format!("plain-{n}"), None, &[]),
                    logo(&id, &format!("white-{n}"), None, &["white"]),
                ]
            })
            .collect();

        let first = aggregate(&[], &streams, &logos, &[], 20);
        let second = aggregate(&[], &streams, &logos, &[], 20);
        assert_eq!(first, second);
        assert_eq!(first[3].logo.as_deref(), Some("white-3"));
    }
}
