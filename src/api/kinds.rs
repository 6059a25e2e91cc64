//! Content kinds: one cached slice per API resource.

use futures::future::BoxFuture;
use serde_json::Value;

use super::api_types::{ApiStep, ApiTag};
use super::types::{
  Faq, HeroContent, HowWeWorkStep, Industry, NewsArticle, NewsTag, Service, Supplier, TeamMember,
  Testimonial, Theme, TrustCard,
};
use crate::cache::actions;
use crate::cache::{
  ContentContext, ContentKind, ContentStore, DetailKind, Envelope, FetchOutcome, Params, Persistor,
  SliceAction,
};
use crate::theme::generate_css_variables;

const ALL_CATEGORIES: &str = "All";
const NEWS_TAG_LIMIT: u32 = 20;

// ============================================================================
// Singletons
// ============================================================================

pub struct SiteTheme;

impl ContentKind for SiteTheme {
  type Payload = Theme;
  const KEY: &'static str = "theme";
  const ENDPOINT: &'static str = "/theme";

  fn default_payload() -> Theme {
    Theme::default()
  }

  fn from_data(data: Value) -> serde_json::Result<Theme> {
    let mut theme: Theme = serde_json::from_value(data)?;
    if theme.css_variables.is_none() {
      theme.css_variables = Some(generate_css_variables(&theme));
    }
    Ok(theme)
  }
}

pub struct Hero;

impl ContentKind for Hero {
  type Payload = HeroContent;
  const KEY: &'static str = "hero";
  const ENDPOINT: &'static str = "/hero/active";

  fn default_payload() -> HeroContent {
    HeroContent::default()
  }
}

// ============================================================================
// Plain collections
// ============================================================================

macro_rules! collection_kind {
  ($(#[$meta:meta])* $name:ident, $item:ty, $key:literal, $endpoint:literal) => {
    $(#[$meta])*
    pub struct $name;

    impl ContentKind for $name {
      type Payload = Vec<$item>;
      const KEY: &'static str = $key;
      const ENDPOINT: &'static str = $endpoint;

      fn default_payload() -> Vec<$item> {
        Vec::new()
      }

      fn is_empty(payload: &Vec<$item>) -> bool {
        payload.is_empty()
      }
    }
  };
}

collection_kind!(Services, Service, "services", "/services");
collection_kind!(Industries, Industry, "industries", "/industries");
collection_kind!(Suppliers, Supplier, "suppliers", "/suppliers");
collection_kind!(TeamMembers, TeamMember, "team_members", "/team-members");
collection_kind!(Testimonials, Testimonial, "testimonials", "/testimonials");

// ============================================================================
// FAQs
// ============================================================================

pub struct Faqs;

impl ContentKind for Faqs {
  type Payload = Vec<Faq>;
  const KEY: &'static str = "faqs";
  const ENDPOINT: &'static str = "/faqs";

  fn default_payload() -> Vec<Faq> {
    Vec::new()
  }

  fn is_empty(payload: &Vec<Faq>) -> bool {
    payload.is_empty()
  }

  /// FAQs first, then their categories, then clear the refresh marker.
  fn mount_effect(ctx: ContentContext, params: Params) -> BoxFuture<'static, FetchOutcome> {
    Box::pin(async move {
      let outcome = actions::fetch::<Faqs>(&ctx, &params).await;
      actions::fetch::<FaqCategories>(&ctx, &Params::new()).await;
      ctx.store.dispatch::<Faqs>(SliceAction::ResetNeedsRefresh);
      outcome
    })
  }
}

/// FAQ category names, always led by "All".
pub struct FaqCategories;

impl ContentKind for FaqCategories {
  type Payload = Vec<String>;
  const KEY: &'static str = "faq_categories";
  const ENDPOINT: &'static str = "/faqs/categories";

  fn default_payload() -> Vec<String> {
    vec![ALL_CATEGORIES.to_string()]
  }

  fn from_data(data: Value) -> serde_json::Result<Vec<String>> {
    let mut categories: Vec<String> = serde_json::from_value(data)?;
    if !categories.iter().any(|c| c == ALL_CATEGORIES) {
      categories.insert(0, ALL_CATEGORIES.to_string());
    }
    Ok(categories)
  }

  fn is_empty(payload: &Vec<String>) -> bool {
    payload.iter().all(|c| c == ALL_CATEGORIES)
  }
}

// ============================================================================
// Trust cards and process steps
// ============================================================================

pub struct TrustCards;

impl ContentKind for TrustCards {
  type Payload = Vec<TrustCard>;
  const KEY: &'static str = "trust_cards";
  const ENDPOINT: &'static str = "/why-trust-us";

  fn default_payload() -> Vec<TrustCard> {
    TrustCard::defaults()
  }

  fn from_data(data: Value) -> serde_json::Result<Vec<TrustCard>> {
    let cards: Vec<TrustCard> = serde_json::from_value(data)?;
    if cards.is_empty() {
      return Ok(TrustCard::defaults());
    }
    Ok(cards)
  }
}

pub struct HowWeWork;

impl ContentKind for HowWeWork {
  type Payload = Vec<HowWeWorkStep>;
  const KEY: &'static str = "how_we_work";
  const ENDPOINT: &'static str = "/how-we-work";

  fn default_payload() -> Vec<HowWeWorkStep> {
    HowWeWorkStep::defaults()
  }

  fn from_data(data: Value) -> serde_json::Result<Vec<HowWeWorkStep>> {
    let raw: Vec<ApiStep> = serde_json::from_value(data)?;
    if raw.is_empty() {
      return Ok(HowWeWorkStep::defaults());
    }
    Ok(
      raw
        .into_iter()
        .enumerate()
        .map(|(i, step)| step.into_step(i))
        .collect(),
    )
  }

  /// Steps are equal when what is drawn is equal; ids and ordering
  /// numbers are positional.
  fn same_content(current: &Vec<HowWeWorkStep>, incoming: &Vec<HowWeWorkStep>) -> bool {
    current.len() == incoming.len()
      && current.iter().zip(incoming).all(|(a, b)| {
        a.title == b.title
          && a.description == b.description
          && a.image == b.image
          && a.icon_name == b.icon_name
      })
  }
}

// ============================================================================
// News
// ============================================================================

pub struct News;

impl ContentKind for News {
  type Payload = Vec<NewsArticle>;
  const KEY: &'static str = "news";
  const ENDPOINT: &'static str = "/news";

  fn default_payload() -> Vec<NewsArticle> {
    Vec::new()
  }

  fn is_empty(payload: &Vec<NewsArticle>) -> bool {
    payload.is_empty()
  }

  /// Articles plus the category and tag lists, fetched side by side.
  fn mount_effect(ctx: ContentContext, params: Params) -> BoxFuture<'static, FetchOutcome> {
    Box::pin(async move {
      let no_params = Params::new();
      let tag_params = Params::new().with("limit", NEWS_TAG_LIMIT);
      let (outcome, _, _) = futures::join!(
        actions::fetch_and_reset::<News>(&ctx, &params),
        actions::fetch::<NewsCategories>(&ctx, &no_params),
        actions::fetch::<NewsTags>(&ctx, &tag_params),
      );
      outcome
    })
  }
}

pub struct NewsCategories;

impl ContentKind for NewsCategories {
  type Payload = Vec<String>;
  const KEY: &'static str = "news_categories";
  const ENDPOINT: &'static str = "/news/categories";

  fn default_payload() -> Vec<String> {
    Vec::new()
  }

  fn from_data(data: Value) -> serde_json::Result<Vec<String>> {
    let tags: Vec<ApiTag> = serde_json::from_value(data)?;
    Ok(tags.into_iter().map(|t| NewsTag::from(t).name).collect())
  }

  fn is_empty(payload: &Vec<String>) -> bool {
    payload.is_empty()
  }
}

pub struct NewsTags;

impl ContentKind for NewsTags {
  type Payload = Vec<NewsTag>;
  const KEY: &'static str = "news_tags";
  const ENDPOINT: &'static str = "/news/tags";

  fn default_payload() -> Vec<NewsTag> {
    Vec::new()
  }

  fn from_data(data: Value) -> serde_json::Result<Vec<NewsTag>> {
    let tags: Vec<ApiTag> = serde_json::from_value(data)?;
    Ok(tags.into_iter().map(NewsTag::from).collect())
  }

  fn is_empty(payload: &Vec<NewsTag>) -> bool {
    payload.is_empty()
  }
}

// ============================================================================
// Detail lookups
// ============================================================================

/// A single news article with its related articles.
pub struct ArticleDetail;

impl DetailKind for ArticleDetail {
  type Item = NewsArticle;
  type Related = NewsArticle;
  const KEY: &'static str = "news_article";
  const NOT_FOUND: &'static str = "Article not found";
  const PATH: &'static str = "/news/slug";

  fn related(envelope: &Envelope) -> Vec<Value> {
    envelope.related_news.clone()
  }
}

pub struct ServiceDetail;

impl DetailKind for ServiceDetail {
  type Item = Service;
  type Related = Service;
  const KEY: &'static str = "service";
  const NOT_FOUND: &'static str = "Service not found";
  const PATH: &'static str = "/services/slug";
}

// ============================================================================
// Runtime selection
// ============================================================================

/// Content kinds addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Kind {
  Theme,
  Hero,
  Services,
  Industries,
  Suppliers,
  TeamMembers,
  Testimonials,
  Faqs,
  FaqCategories,
  TrustCards,
  HowWeWork,
  News,
  NewsCategories,
  NewsTags,
}

/// Run `$body` with `$k` bound to the marker type for `$kind`.
macro_rules! with_kind {
  ($kind:expr, $k:ident => $body:expr) => {
    match $kind {
      Kind::Theme => {
        type $k = SiteTheme;
        $body
      }
      Kind::Hero => {
        type $k = Hero;
        $body
      }
      Kind::Services => {
        type $k = Services;
        $body
      }
      Kind::Industries => {
        type $k = Industries;
        $body
      }
      Kind::Suppliers => {
        type $k = Suppliers;
        $body
      }
      Kind::TeamMembers => {
        type $k = TeamMembers;
        $body
      }
      Kind::Testimonials => {
        type $k = Testimonials;
        $body
      }
      Kind::Faqs => {
        type $k = Faqs;
        $body
      }
      Kind::FaqCategories => {
        type $k = FaqCategories;
        $body
      }
      Kind::TrustCards => {
        type $k = TrustCards;
        $body
      }
      Kind::HowWeWork => {
        type $k = HowWeWork;
        $body
      }
      Kind::News => {
        type $k = News;
        $body
      }
      Kind::NewsCategories => {
        type $k = NewsCategories;
        $body
      }
      Kind::NewsTags => {
        type $k = NewsTags;
        $body
      }
    }
  };
}

impl Kind {
  pub const ALL: [Kind; 14] = [
    Kind::Theme,
    Kind::Hero,
    Kind::Services,
    Kind::Industries,
    Kind::Suppliers,
    Kind::TeamMembers,
    Kind::Testimonials,
    Kind::Faqs,
    Kind::FaqCategories,
    Kind::TrustCards,
    Kind::HowWeWork,
    Kind::News,
    Kind::NewsCategories,
    Kind::NewsTags,
  ];

  pub fn key(self) -> &'static str {
    with_kind!(self, K => K::KEY)
  }

  /// Refresh this kind the way a freshly mounted hook would.
  pub async fn refresh(self, ctx: &ContentContext) -> FetchOutcome {
    let params = Params::new();
    with_kind!(self, K => actions::fetch_and_reset::<K>(ctx, &params).await)
  }

  pub fn rehydrate(self, store: &ContentStore, persistor: &Persistor) -> bool {
    with_kind!(self, K => persistor.rehydrate::<K>(store))
  }

  pub fn clear(self, ctx: &ContentContext) {
    with_kind!(self, K => actions::clear::<K>(ctx))
  }

  /// Cached slice as JSON, for display.
  pub fn snapshot(self, store: &ContentStore) -> serde_json::Result<Value> {
    with_kind!(self, K => {
      let slice = store.select::<K>();
      Ok(serde_json::json!({
        "key": K::KEY,
        "items": serde_json::to_value(slice.items().as_ref())?,
        "lastFetchedAt": slice.last_fetched_at(),
        "error": slice.error(),
        "page": {
          "total": slice.page().total,
          "totalPages": slice.page().total_pages,
          "currentPage": slice.page().current_page,
        },
      }))
    })
  }
}

/// Keys of every content kind; the default persistence whitelist.
pub fn all_keys() -> Vec<&'static str> {
  Kind::ALL.iter().map(|k| k.key()).collect()
}

/// Seed every whitelisted slice from storage. Returns how many were restored.
pub fn rehydrate_all(store: &ContentStore, persistor: &Persistor) -> usize {
  Kind::ALL
    .iter()
    .filter(|kind| kind.rehydrate(store, persistor))
    .count()
}

/// Refresh every kind concurrently.
pub async fn refresh_all(ctx: &ContentContext) -> Vec<(Kind, FetchOutcome)> {
  let refreshes = Kind::ALL.iter().map(|&kind| async move { (kind, kind.refresh(ctx).await) });
  futures::future::join_all(refreshes).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::{settle, ScriptedSource};
  use crate::cache::{select, ContentHook, NoopStorage, Slice, SqliteStorage};
  use serde_json::json;
  use std::sync::Arc;

  fn context() -> (Arc<ScriptedSource>, ContentContext) {
    let source = Arc::new(ScriptedSource::new());
    let ctx = ContentContext::new(ContentStore::new(), source.clone());
    (source, ctx)
  }

  #[test]
  fn test_keys_are_unique() {
    let keys = all_keys();
    for (i, key) in keys.iter().enumerate() {
      assert!(!keys[i + 1..].contains(key), "duplicate key {}", key);
    }
  }

  #[tokio::test]
  async fn test_theme_gets_generated_variables() {
    let (source, ctx) = context();
    source.respond(
      "/theme",
      Ok(Envelope::ok(json!({
        "primaryColor": "#123456",
        "borderRadius": {"md": "4px"}
      }))),
    );

    actions::fetch::<SiteTheme>(&ctx, &Params::new()).await;

    let slice = ctx.store.select::<SiteTheme>();
    let vars = slice.items().css_variables.as_ref().unwrap();
    assert_eq!(vars.get("--primary").map(String::as_str), Some("#123456"));
    assert_eq!(vars.get("--radius").map(String::as_str), Some("4px"));
  }

  #[tokio::test]
  async fn test_faq_categories_lead_with_all() {
    let (source, ctx) = context();
    source.respond("/faqs/categories", Ok(Envelope::ok(json!(["Billing", "Meters"]))));

    actions::fetch::<FaqCategories>(&ctx, &Params::new()).await;

    assert_eq!(
      ctx.store.select::<FaqCategories>().items().as_ref(),
      &vec!["All".to_string(), "Billing".to_string(), "Meters".to_string()]
    );
  }

  #[tokio::test]
  async fn test_faq_effect_fetches_in_order() {
    let (source, ctx) = context();
    source.respond("/faqs", Ok(Envelope::ok(json!([{"question": "Q", "answer": "A"}]))));
    source.respond("/faqs/categories", Ok(Envelope::ok(json!(["All"]))));
    actions::request_refresh::<Faqs>(&ctx);

    let outcome = Faqs::mount_effect(ctx.clone(), Params::new()).await;

    assert_eq!(outcome, FetchOutcome::Updated);
    assert_eq!(source.calls("/faqs"), 1);
    assert_eq!(source.calls("/faqs/categories"), 1);
    assert!(!ctx.store.select::<Faqs>().needs_refresh());
  }

  #[tokio::test]
  async fn test_empty_trust_cards_use_defaults() {
    let (source, ctx) = context();
    source.respond("/why-trust-us", Ok(Envelope::ok(json!([]))));

    assert_eq!(
      actions::fetch::<TrustCards>(&ctx, &Params::new()).await,
      FetchOutcome::Unchanged
    );
    assert_eq!(ctx.store.select::<TrustCards>().items().len(), 3);
  }

  #[tokio::test]
  async fn test_steps_ignore_positional_fields() {
    let (source, ctx) = context();
    let steps = json!([
      {"title": "Book a Discovery Call", "description": "d", "image": "a.jpg", "order": 1}
    ]);
    source.respond("/how-we-work", Ok(Envelope::ok(steps)));
    actions::fetch::<HowWeWork>(&ctx, &Params::new()).await;
    let before = ctx.store.select::<HowWeWork>();
    assert_eq!(before.items()[0].icon_name, "Phone");

    source.respond(
      "/how-we-work",
      Ok(Envelope::ok(json!([
        {"title": "Book a Discovery Call", "description": "d", "image": "a.jpg", "order": 7}
      ]))),
    );
    let outcome = actions::fetch::<HowWeWork>(&ctx, &Params::new()).await;

    assert_eq!(outcome, FetchOutcome::Unchanged);
    let after = ctx.store.select::<HowWeWork>();
    assert!(Arc::ptr_eq(before.items(), after.items()));
  }

  #[tokio::test]
  async fn test_news_effect_fetches_lists() {
    let (source, ctx) = context();
    source.respond("/news", Ok(Envelope::ok(json!([{"title": "T", "slug": "t"}]))));
    source.respond("/news/categories", Ok(Envelope::ok(json!(["Energy"]))));
    source.respond("/news/tags", Ok(Envelope::ok(json!([{"name": "gas", "count": 2}]))));

    let outcome = News::mount_effect(ctx.clone(), Params::new().with("page", 2)).await;

    assert_eq!(outcome, FetchOutcome::Updated);
    assert_eq!(source.last_params("/news").unwrap().get("page"), Some("2"));
    assert_eq!(source.last_params("/news/tags").unwrap().get("limit"), Some("20"));
    assert_eq!(ctx.store.select::<NewsCategories>().items().len(), 1);
    assert_eq!(ctx.store.select::<NewsTags>().items()[0].count, Some(2));
  }

  #[tokio::test]
  async fn test_article_detail_with_related() {
    let (source, ctx) = context();
    source.respond(
      "/news/slug/price-cap",
      Ok(Envelope {
        related_news: vec![json!({"title": "Other", "slug": "other"})],
        ..Envelope::ok(json!({"title": "Price cap", "slug": "price-cap"}))
      }),
    );

    select::<ArticleDetail>(&ctx, "price-cap").await;

    let selection = ctx.store.selection::<ArticleDetail>();
    assert_eq!(selection.item().unwrap().title, "Price cap");
    assert_eq!(selection.related()[0].slug, "other");
  }

  #[tokio::test]
  async fn test_refresh_all_and_snapshot() {
    let (source, ctx) = context();
    source.respond("/services", Ok(Envelope::ok(json!([{"title": "Gas", "slug": "gas"}]))));

    let results = refresh_all(&ctx).await;

    assert_eq!(results.len(), Kind::ALL.len());
    let services = results.iter().find(|(k, _)| *k == Kind::Services).unwrap();
    assert_eq!(services.1, FetchOutcome::Updated);
    let failed = results.iter().filter(|(_, o)| !o.is_success()).count();
    assert_eq!(failed, Kind::ALL.len() - 1);

    let snapshot = Kind::Services.snapshot(&ctx.store).unwrap();
    assert_eq!(snapshot["items"][0]["slug"], "gas");
    assert!(!snapshot["lastFetchedAt"].is_null());
  }

  #[test]
  fn test_rehydrate_all_with_nothing_stored() {
    let persistor = Persistor::new(Arc::new(NoopStorage), "persist:test", all_keys());
    assert_eq!(rehydrate_all(&ContentStore::new(), &persistor), 0);
  }

  #[tokio::test]
  async fn test_news_tolerates_null_fields() {
    let (source, ctx) = context();
    source.respond(
      "/news",
      Ok(Envelope::ok(json!([
        {"title": "ok", "slug": "ok", "tags": ["gas"]},
        {"title": null, "slug": "n", "tags": null, "category": null}
      ]))),
    );

    assert_eq!(
      actions::fetch::<News>(&ctx, &Params::new()).await,
      FetchOutcome::Updated
    );
    let slice = ctx.store.select::<News>();
    assert_eq!(slice.items().len(), 2);
    assert!(slice.items()[1].title.is_empty());
    assert!(slice.items()[1].tags.is_empty());
  }

  #[tokio::test]
  async fn test_service_detail() {
    let (source, ctx) = context();
    source.respond(
      "/services/slug/commercial-gas",
      Ok(Envelope::ok(json!({"title": "Commercial Gas", "slug": "commercial-gas"}))),
    );

    let outcome = select::<ServiceDetail>(&ctx, "commercial-gas").await;

    assert_eq!(outcome, FetchOutcome::Updated);
    let selection = ctx.store.selection::<ServiceDetail>();
    assert_eq!(selection.item().unwrap().title, "Commercial Gas");
    assert!(selection.related().is_empty());

    assert!(!select::<ServiceDetail>(&ctx, "missing").await.is_success());
    assert!(ctx.store.selection::<ServiceDetail>().item().is_none());
  }

  fn persistor(storage: &Arc<SqliteStorage>) -> Persistor {
    Persistor::new(storage.clone(), "persist:test", all_keys())
  }

  /// Fetch `K` through a persisted store, then seed a fresh store from storage.
  async fn restart<K: ContentKind>(
    source: &Arc<ScriptedSource>,
    storage: &Arc<SqliteStorage>,
  ) -> (Slice<K>, ContentStore) {
    let store = ContentStore::new();
    let worker = persistor(storage).start(&store);
    let ctx = ContentContext::new(store.clone(), source.clone());
    assert_eq!(
      actions::fetch::<K>(&ctx, &Params::new()).await,
      FetchOutcome::Updated
    );
    worker.shutdown().await;

    let fresh = ContentStore::new();
    assert!(persistor(storage).rehydrate::<K>(&fresh));
    (store.select::<K>(), fresh)
  }

  #[tokio::test]
  async fn test_theme_survives_restart() {
    let source = Arc::new(ScriptedSource::new());
    source.respond(
      "/theme",
      Ok(Envelope::ok(json!({
        "primaryColor": "#1B4D3E",
        "colorVariations": {"primaryForeground": "#fff"},
        "seasonalBanner": {"enabled": true}
      }))),
    );
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());

    let (before, fresh) = restart::<SiteTheme>(&source, &storage).await;

    let after = fresh.select::<SiteTheme>();
    assert_eq!(after.items(), before.items());
    assert_eq!(after.last_fetched_at(), before.last_fetched_at());
    assert!(!after.loading());
    assert!(after.error().is_none());
    let theme = after.items();
    assert_eq!(theme.extra["seasonalBanner"], json!({"enabled": true}));
    let vars = theme.css_variables.as_ref().unwrap();
    assert_eq!(vars.get("--primary-foreground").map(String::as_str), Some("#fff"));
  }

  #[tokio::test]
  async fn test_steps_survive_restart() {
    let source = Arc::new(ScriptedSource::new());
    source.respond(
      "/how-we-work",
      Ok(Envelope::ok(json!([
        {"title": "Book a call", "description": "d1", "image": {"url": "one.jpg"}},
        {"title": "Ongoing support", "description": "d2", "iconName": "Zap"}
      ]))),
    );
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());

    let (before, fresh) = restart::<HowWeWork>(&source, &storage).await;

    let after = fresh.select::<HowWeWork>();
    assert_eq!(after.items(), before.items());
    assert_eq!(after.items()[0].image, "one.jpg");
    assert_eq!(after.items()[1].icon_name, "Zap");
  }

  #[tokio::test]
  async fn test_rehydrated_content_shown_while_revalidating() {
    let source = Arc::new(ScriptedSource::new());
    source.respond("/theme", Ok(Envelope::ok(json!({"primaryColor": "#1B4D3E"}))));
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let (before, fresh) = restart::<SiteTheme>(&source, &storage).await;

    let gate = source.hold();
    let ctx = ContentContext::new(fresh, source.clone());
    let mut hook = ContentHook::<SiteTheme>::new(&ctx);
    hook.render();
    assert!(settle(|| ctx.store.select::<SiteTheme>().loading()).await);

    let view = hook.render();
    assert!(!view.loading);
    assert_eq!(view.data.primary_color, "#1B4D3E");
    assert_eq!(view.data.as_ref(), before.items().as_ref());

    gate.add_permits(1);
    assert_eq!(hook.settled().await, Some(&FetchOutcome::Unchanged));
    assert!(Arc::ptr_eq(&view.data, &hook.render().data));
  }
}
