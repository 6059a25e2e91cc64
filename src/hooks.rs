//! Per-page access hooks.
//!
//! Most content is consumed through a plain [`ContentHook`]; the theme, FAQ
//! and news hooks add derived views on top.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::api::kinds::{
  FaqCategories, Faqs, Hero, HowWeWork, Industries, News, NewsCategories, NewsTags, Services,
  SiteTheme, Suppliers, TeamMembers, Testimonials, TrustCards,
};
use crate::api::types::{Faq, NewsArticle, NewsTag, Theme};
use crate::cache::{ContentContext, ContentHook, ContentKind, FetchOutcome, HookView, Memo, Params};
use crate::theme::{apply_theme, ThemeSurface};

pub type HeroHook = ContentHook<Hero>;
pub type ServicesHook = ContentHook<Services>;
pub type IndustriesHook = ContentHook<Industries>;
pub type SuppliersHook = ContentHook<Suppliers>;
pub type TeamMembersHook = ContentHook<TeamMembers>;
pub type TestimonialsHook = ContentHook<Testimonials>;
pub type TrustCardsHook = ContentHook<TrustCards>;
pub type HowWeWorkHook = ContentHook<HowWeWork>;

// ============================================================================
// Theme
// ============================================================================

/// Theme access that keeps a surface in sync with the cached theme.
pub struct ThemeHook {
  inner: ContentHook<SiteTheme>,
  applied: Option<Arc<Theme>>,
}

impl ThemeHook {
  pub fn new(ctx: &ContentContext) -> Self {
    Self {
      inner: ContentHook::new(ctx),
      applied: None,
    }
  }

  /// Render, applying the theme to `surface` whenever it is a different
  /// theme from the one applied last.
  pub fn render(&mut self, surface: &mut dyn ThemeSurface) -> HookView<Theme> {
    let view = self.inner.render();
    let current = self.applied.as_ref().is_some_and(|t| Arc::ptr_eq(t, &view.data));
    if !current {
      apply_theme(surface, &view.data);
      self.applied = Some(Arc::clone(&view.data));
    }
    view
  }

  pub async fn settled(&mut self) -> Option<&FetchOutcome> {
    self.inner.settled().await
  }
}

// ============================================================================
// FAQs
// ============================================================================

#[derive(Debug, Clone)]
pub struct FaqsView {
  pub faqs: HookView<Vec<Faq>>,
  /// Category filter options, "All" first
  pub categories: Arc<Vec<String>>,
}

type CategoryDeps<T> = (Arc<Vec<T>>, Arc<Vec<String>>);

pub struct FaqsHook {
  inner: ContentHook<Faqs>,
  categories: Memo<CategoryDeps<Faq>, Arc<Vec<String>>>,
}

impl FaqsHook {
  pub fn new(ctx: &ContentContext) -> Self {
    Self::with_params(ctx, Params::new())
  }

  pub fn with_params(ctx: &ContentContext, params: Params) -> Self {
    Self {
      inner: ContentHook::with_params(ctx, params),
      categories: Memo::new(),
    }
  }

  pub fn render(&mut self) -> FaqsView {
    let faqs = self.inner.render();
    let cached = self.inner.context().store.select::<FaqCategories>();
    let deps = (Arc::clone(&faqs.data), Arc::clone(cached.items()));
    let categories = Arc::clone(self.categories.get(deps, |(faqs, cats)| {
      Arc::new(faq_categories(faqs, cats))
    }));
    FaqsView { faqs, categories }
  }

  pub async fn settled(&mut self) -> Option<&FetchOutcome> {
    self.inner.settled().await
  }

  pub fn derivations(&self) -> usize {
    self.categories.computations()
  }
}

/// The cached category list, or categories collected from the FAQs
/// themselves when nothing beyond "All" is cached.
fn faq_categories(faqs: &[Faq], cached: &Vec<String>) -> Vec<String> {
  let mut seen = BTreeSet::new();
  let mut categories: Vec<String> = FaqCategories::default_payload();
  categories.retain(|c| seen.insert(c.clone()));

  for category in cached {
    if seen.insert(category.clone()) {
      categories.push(category.clone());
    }
  }

  if FaqCategories::is_empty(cached) {
    for category in faqs.iter().filter_map(|f| f.category.as_ref()) {
      if seen.insert(category.clone()) {
        categories.push(category.clone());
      }
    }
  }
  categories
}

// ============================================================================
// News
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewsView {
  pub news: HookView<Vec<NewsArticle>>,
  pub categories: Arc<Vec<String>>,
  pub tags: Arc<Vec<NewsTag>>,
}

pub struct NewsHook {
  inner: ContentHook<News>,
  categories: Memo<CategoryDeps<NewsArticle>, Arc<Vec<String>>>,
}

impl NewsHook {
  pub fn new(ctx: &ContentContext) -> Self {
    Self::with_params(ctx, Params::new())
  }

  pub fn with_params(ctx: &ContentContext, params: Params) -> Self {
    Self {
      inner: ContentHook::with_params(ctx, params),
      categories: Memo::new(),
    }
  }

  pub fn render(&mut self) -> NewsView {
    let news = self.inner.render();
    let store = &self.inner.context().store;
    let cached = store.select::<NewsCategories>();
    let tags = Arc::clone(store.select::<NewsTags>().items());

    let deps = (Arc::clone(&news.data), Arc::clone(cached.items()));
    let categories = Arc::clone(self.categories.get(deps, |(articles, cats)| {
      if cats.is_empty() {
        Arc::new(article_categories(articles))
      } else {
        Arc::clone(cats)
      }
    }));

    NewsView {
      news,
      categories,
      tags,
    }
  }

  pub async fn settled(&mut self) -> Option<&FetchOutcome> {
    self.inner.settled().await
  }
}

fn article_categories(articles: &[NewsArticle]) -> Vec<String> {
  articles
    .iter()
    .filter_map(|a| a.category.clone())
    .filter(|c| !c.is_empty())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}
