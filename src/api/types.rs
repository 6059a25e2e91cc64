//! Content types served by the site API.
//!
//! Unknown fields are kept in `extra` so cached payloads round-trip whatever
//! the CMS adds, and so equality covers the whole record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::cache::null_as_default;
use crate::icons::Icon;

pub type Extra = BTreeMap<String, Value>;

// ============================================================================
// Theme
// ============================================================================

/// Site theme: colors, typography, radius tokens and branding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
  #[serde(default, deserialize_with = "null_as_default")]
  pub primary_color: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub color_variations: BTreeMap<String, String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub typography: Typography,
  #[serde(default, deserialize_with = "null_as_default")]
  pub border_radius: BTreeMap<String, String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub branding: Branding,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub css_variables: Option<BTreeMap<String, String>>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
  pub font_family: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub font_size: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
  pub logo_url: Option<String>,
  pub favicon_url: Option<String>,
  pub company_name: Option<String>,
  pub tagline: Option<String>,
}

fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
  entries
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for Theme {
  fn default() -> Self {
    let primary = "#AE613A";
    Self {
      primary_color: primary.to_string(),
      color_variations: pairs(&[
        ("primary", primary),
        ("primary100", primary),
        ("primary80", "rgba(174, 97, 58, 0.8)"),
        ("primary60", "rgba(174, 97, 58, 0.6)"),
        ("primary40", "rgba(174, 97, 58, 0.4)"),
        ("primary30", "rgba(174, 97, 58, 0.3)"),
        ("primary20", "rgba(174, 97, 58, 0.2)"),
        ("primary10", "rgba(174, 97, 58, 0.1)"),
        ("primary5", "rgba(174, 97, 58, 0.05)"),
      ]),
      typography: Typography {
        font_family: Some("Poppins, system-ui, Avenir, Helvetica, Arial, sans-serif".to_string()),
        font_size: pairs(&[
          ("base", "16px"),
          ("small", "14px"),
          ("large", "18px"),
          ("xlarge", "24px"),
        ]),
      },
      border_radius: pairs(&[
        ("sm", "0.25rem"),
        ("md", "0.5rem"),
        ("lg", "0.75rem"),
        ("xl", "1rem"),
      ]),
      branding: Branding {
        company_name: Some("Bristol Utilities".to_string()),
        ..Branding::default()
      },
      css_variables: Some(pairs(&[
        ("--primary", primary),
        ("--primary-100", primary),
        ("--primary-80", "rgba(174, 97, 58, 0.8)"),
        ("--primary-60", "rgba(174, 97, 58, 0.6)"),
        ("--primary-40", "rgba(174, 97, 58, 0.4)"),
        ("--primary-30", "rgba(174, 97, 58, 0.3)"),
        ("--primary-20", "rgba(174, 97, 58, 0.2)"),
        ("--primary-10", "rgba(174, 97, 58, 0.1)"),
        ("--primary-5", "rgba(174, 97, 58, 0.05)"),
        ("--primary-foreground", "#ffffff"),
        ("--ring", primary),
        ("--radius", "0.5rem"),
        ("--radius-sm", "0.25rem"),
        ("--radius-lg", "0.75rem"),
        ("--radius-xl", "1rem"),
      ])),
      extra: Extra::new(),
    }
  }
}

// ============================================================================
// Hero
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cta {
  #[serde(default, deserialize_with = "null_as_default")]
  pub label: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroBackground {
  #[serde(rename = "type", default, deserialize_with = "null_as_default")]
  pub kind: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub video_url: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub image_url: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub overlay: bool,
  #[serde(default, deserialize_with = "null_as_default")]
  pub overlay_opacity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Particles {
  #[serde(default, deserialize_with = "null_as_default")]
  pub enabled: bool,
  #[serde(default, deserialize_with = "null_as_default")]
  pub count: u32,
  #[serde(default, deserialize_with = "null_as_default")]
  pub color: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub size: f64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub speed: f64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub line_color: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub line_opacity: f64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub interactivity: bool,
}

/// Home page hero copy and background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroContent {
  #[serde(default, deserialize_with = "null_as_default")]
  pub badge_label: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub headline: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub subheadline: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub primary_cta: Cta,
  #[serde(default, deserialize_with = "null_as_default")]
  pub secondary_cta: Cta,
  #[serde(default, deserialize_with = "null_as_default")]
  pub background: HeroBackground,
  #[serde(default, deserialize_with = "null_as_default")]
  pub particles: Particles,
  #[serde(flatten)]
  pub extra: Extra,
}

impl Default for HeroContent {
  fn default() -> Self {
    Self {
      badge_label: "Powering UK's Businesses".to_string(),
      headline: "We power your business with the best energy deals".to_string(),
      subheadline: "Orca Business Solutions is a new name, but we're built on real experience."
        .to_string(),
      primary_cta: Cta {
        label: "Explore Us".to_string(),
        link: "/about".to_string(),
      },
      secondary_cta: Cta {
        label: "Contact Us".to_string(),
        link: "/contact".to_string(),
      },
      background: HeroBackground {
        kind: "video".to_string(),
        video_url: "/videos/hero-bg-video.mp4".to_string(),
        image_url: String::new(),
        overlay: false,
        overlay_opacity: 40.0,
      },
      particles: Particles {
        enabled: true,
        count: 80,
        color: "#ffffff".to_string(),
        size: 3.0,
        speed: 2.0,
        line_color: "#ffffff".to_string(),
        line_opacity: 0.4,
        interactivity: true,
      },
      extra: Extra::new(),
    }
  }
}

// ============================================================================
// Collections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
  #[serde(default, deserialize_with = "null_as_default")]
  pub title: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub slug: String,
  pub card_description: Option<String>,
  pub card_icon: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Industry {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  pub description: Option<String>,
  pub icon: Option<String>,
  pub color: Option<String>,
  pub savings: Option<Value>,
  #[serde(flatten)]
  pub extra: Extra,
}

impl Industry {
  /// Stat icon for the industry card, an arrow when unset or unknown.
  pub fn icon(&self) -> Icon {
    self.icon.as_deref().map(Icon::lookup).unwrap_or(Icon::ArrowRight)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  pub rating: Option<f64>,
  pub green_energy: Option<bool>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  pub role: Option<String>,
  pub position: Option<String>,
  pub image: Option<Value>,
  pub linkedin: Option<String>,
  pub email: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  pub company: Option<String>,
  pub position: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub testimonial: String,
  pub rating: Option<f64>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
  #[serde(default, deserialize_with = "null_as_default")]
  pub question: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub answer: String,
  pub category: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

/// "Why trust us" card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustCard {
  #[serde(default, deserialize_with = "null_as_default")]
  pub icon: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub title: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub description: String,
  pub order: Option<u32>,
  #[serde(flatten)]
  pub extra: Extra,
}

impl TrustCard {
  /// Icon to draw, falling back to a clock for unknown names.
  pub fn icon(&self) -> Icon {
    Icon::resolve(&self.icon)
  }

  pub fn defaults() -> Vec<TrustCard> {
    let blurb = "We're on call day and night to tackle gas or electricity faults and minimise downtime.";
    [
      ("Clock", "24/7 Rapid Response"),
      ("DollarSign", "Transparent, Competitive Rates"),
      ("ShieldCheck", "Safety and Compliance First"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (icon, title))| TrustCard {
      icon: icon.to_string(),
      title: title.to_string(),
      description: blurb.to_string(),
      order: Some(i as u32 + 1),
      extra: Extra::new(),
    })
    .collect()
  }
}

/// One step of the "how we work" section, already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HowWeWorkStep {
  pub id: u32,
  pub title: String,
  pub description: String,
  pub icon_name: String,
  pub image: String,
  pub order: u32,
}

impl HowWeWorkStep {
  pub fn icon(&self) -> Icon {
    Icon::resolve(&self.icon_name)
  }

  pub fn defaults() -> Vec<HowWeWorkStep> {
    DEFAULT_STEPS
      .iter()
      .enumerate()
      .map(|(i, (title, description, icon, image))| HowWeWorkStep {
        id: i as u32,
        title: title.to_string(),
        description: description.to_string(),
        icon_name: icon.to_string(),
        image: image.to_string(),
        order: i as u32 + 1,
      })
      .collect()
  }

  /// Image of the default step at `index`, if there is one.
  pub fn default_image(index: usize) -> Option<&'static str> {
    DEFAULT_STEPS.get(index).map(|(_, _, _, image)| *image)
  }
}

const DEFAULT_STEPS: [(&str, &str, &str, &str); 4] = [
  (
    "Book a Discovery Call",
    "Schedule a free consultation to discuss your business needs and energy requirements. We'll understand your current situation, challenges, and goals to provide the best solutions tailored to your business.",
    "Phone",
    "https://images.unsplash.com/photo-1519389950473-47ba0277781c?w=800&q=80",
  ),
  (
    "Strategy Session",
    "We will review the insights from the discovery call and develop a tailored strategy and proposal. We'll create a detailed plan with actionable steps, timelines, and deliverables to meet your project requirements.",
    "FileText",
    "https://images.unsplash.com/photo-1552664730-d307ca884978?w=800&q=80",
  ),
  (
    "Design and Development",
    "Our team brings your strategy to life with custom solutions. We handle all aspects of implementation, ensuring seamless integration with your existing systems and processes.",
    "Code",
    "https://images.unsplash.com/photo-1460925895917-afdab827c52f?w=800&q=80",
  ),
  (
    "Launch and Support",
    "We ensure a smooth launch and provide ongoing support to help you maximize the benefits. Our team remains available to assist with any questions, optimizations, or future enhancements you may need.",
    "Rocket",
    "https://images.unsplash.com/photo-1553484771-371a605b060b?w=800&q=80",
  ),
];

// ============================================================================
// News
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
  #[serde(default, deserialize_with = "null_as_default")]
  pub title: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub slug: String,
  pub category: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub tags: Vec<String>,
  pub excerpt: Option<String>,
  pub featured_image: Option<Value>,
  pub published_at: Option<String>,
  #[serde(flatten)]
  pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsTag {
  pub name: String,
  pub count: Option<u64>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_null_fields_fall_back_to_defaults() {
    let article: NewsArticle =
      serde_json::from_value(json!({"title": null, "slug": "s", "tags": null})).unwrap();
    assert!(article.title.is_empty());
    assert!(article.tags.is_empty());

    let faq: Faq = serde_json::from_value(json!({"question": null, "answer": "a"})).unwrap();
    assert!(faq.question.is_empty());

    let hero: HeroContent =
      serde_json::from_value(json!({"headline": "H", "primaryCta": null, "particles": null})).unwrap();
    assert_eq!(hero.headline, "H");
    assert_eq!(hero.primary_cta, Cta::default());
  }

  #[test]
  fn test_unknown_fields_kept() {
    let service: Service =
      serde_json::from_value(json!({"title": "Gas", "slug": "gas", "heroImage": "g.jpg"})).unwrap();
    assert_eq!(service.extra.get("heroImage"), Some(&json!("g.jpg")));
    let back = serde_json::to_value(&service).unwrap();
    assert_eq!(back["heroImage"], "g.jpg");
  }

  #[test]
  fn test_card_icons() {
    let cards = TrustCard::defaults();
    let icons: Vec<Icon> = cards.iter().map(TrustCard::icon).collect();
    assert_eq!(icons, vec![Icon::Clock, Icon::DollarSign, Icon::ShieldCheck]);

    let steps = HowWeWorkStep::defaults();
    assert_eq!(steps[3].icon(), Icon::Rocket);
    assert_eq!(steps[0].order, 1);
  }

  #[test]
  fn test_industry_icon() {
    let mut industry: Industry = serde_json::from_value(json!({"name": "Hospitality", "icon": "Flame"})).unwrap();
    assert_eq!(industry.icon(), Icon::Flame);
    industry.icon = Some("Rocket".to_string());
    assert_eq!(industry.icon(), Icon::ArrowRight);
    industry.icon = None;
    assert_eq!(industry.icon(), Icon::ArrowRight);
  }
}
