//! Content cache for the Orca Business Solutions site.
//!
//! Site content (theme, hero, services, FAQs, news, ...) is served from a
//! remote API and cached per content type. Cached content is shown
//! immediately, refreshed in the background on every mount, and replaced
//! only when the server's copy actually differs.

pub mod api;
pub mod cache;
pub mod config;
pub mod hooks;
pub mod icons;
pub mod logging;
pub mod theme;
