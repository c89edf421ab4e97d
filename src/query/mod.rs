//! Game server status queries (A2S over UDP).

pub mod client;
pub mod codec;
pub mod packets;

pub use client::QueryClient;
