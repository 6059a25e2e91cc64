//! Site content API: transport, wire shapes and the cached content kinds.

pub mod api_types;
pub mod client;
pub mod kinds;
pub mod types;

pub use client::ApiClient;
pub use kinds::{all_keys, refresh_all, rehydrate_all, ArticleDetail, Kind, ServiceDetail};
