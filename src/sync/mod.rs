//! Remote feed transport.
//!
//! The reconciliation layer only sees the `RemoteFeed` trait; this module
//! provides the WebSocket implementation used by the CLI.

mod ws_feed;

pub use ws_feed::WsFeed;
