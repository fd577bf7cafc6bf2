use std::collections::HashMap;

use crate::catalog::LogoRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoTier {
    FeedMatch,
    Tagged,
    AnyRaster,
}

pub type TierPredicate = fn(&LogoRecord, Option<&str>) -> bool;

/// Logo preference, highest first. The first tier with a matching logo wins
/// and within a tier the earliest logo in input order wins.
pub const LOGO_TIERS: [(LogoTier, TierPredicate); 3] = [
    (LogoTier::FeedMatch, matches_stream_feed),
    (LogoTier::Tagged, has_preferred_tag),
    (LogoTier::AnyRaster, is_displayable),
];

const PREFERRED_TAGS: &[&str] = &["horizontal", "white"];

/// Unknown format is assumed displayable.
pub fn is_displayable(logo: &LogoRecord, _feed: Option<&str>) -> bool {
    logo.format.is_none_or(|format| format.is_raster())
}

pub fn matches_stream_feed(logo: &LogoRecord, feed: Option<&str>) -> bool {
    let logo_feed = logo.feed.as_deref().filter(|value| !value.is_empty());
    let stream_feed = feed.filter(|value| !value.is_empty());
    match (logo_feed, stream_feed) {
        (Some(logo_feed), Some(stream_feed)) => {
            logo_feed == stream_feed && is_displayable(logo, feed)
        }
        _ => false,
    }
}

pub fn has_preferred_tag(logo: &LogoRecord, feed: Option<&str>) -> bool {
    PREFERRED_TAGS.iter().any(|tag| logo.has_tag(tag)) && is_displayable(logo, feed)
}

pub fn pick_best_logo<'a>(
    logos: &[&'a LogoRecord],
    feed: Option<&str>,
) -> Option<(LogoTier, &'a LogoRecord)> {
    LOGO_TIERS.iter().find_map(|(tier, predicate)| {
        logos
            .iter()
            .copied()
            .find(|&logo| predicate(logo, feed))
            .map(|logo| (*tier, logo))
    })
}

/// Logos by channel id, each list in input order.
pub fn index_logos(logos: &[LogoRecord]) -> HashMap<&str, Vec<&LogoRecord>> {
    let mut index: HashMap<&str, Vec<&LogoRecord>> = HashMap::new();
    for logo in logos {
        index.entry(logo.channel.as_str()).or_default().push(logo);
    }
    index
}
