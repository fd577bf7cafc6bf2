mod aggregate;
mod fingerprint;
mod logos;
mod streams;
mod view;

pub use aggregate::{
    aggregate, aggregate_catalog, aggregate_with_summary, Aggregation, DEFAULT_LIMIT,
};
pub use fingerprint::build_channels_fingerprint;
pub use logos::{
    has_preferred_tag, index_logos, is_displayable, matches_stream_feed, pick_best_logo,
    LogoTier, TierPredicate, LOGO_TIERS,
};
pub use streams::{is_valid_stream_url, pick_best_stream, SkippedStreams, StreamGroups};
pub use view::ChannelView;
