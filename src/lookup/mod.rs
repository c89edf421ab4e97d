//! Map link lookup through the server directory.
//!
//! The game protocol carries no map information, so a registered address is
//! resolved in steps:
//!
//! 1. Search the directory (BattleMetrics) for `host:port`
//! 2. Keep only the listing with exactly that IP and port
//! 3. Use the listing's own map link when it has one
//! 4. Otherwise scrape the listing's web page for a map link

pub mod directory;
pub mod resolver;
pub mod scrape;

pub use resolver::{LookupResolver, MapLinkResult};
