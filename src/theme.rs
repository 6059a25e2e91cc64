//! Projecting theme content onto a styling surface.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::api::types::Theme;

/// Derive CSS custom properties from a theme.
///
/// Explicit `css_variables` are the base; color variations (`primary80` →
/// `--primary80`, `primaryForeground` → `--primary-foreground`), the primary
/// color and radius tokens (`md` is the bare `--radius`) are layered on top.
pub fn generate_css_variables(theme: &Theme) -> BTreeMap<String, String> {
  let mut vars = theme.css_variables.clone().unwrap_or_default();

  for (key, value) in &theme.color_variations {
    vars.insert(format!("--{}", kebab_case(key)), value.clone());
  }

  if !theme.primary_color.is_empty() {
    vars.insert("--primary".to_string(), theme.primary_color.clone());
  }

  for (key, value) in &theme.border_radius {
    let name = if key == "md" {
      "--radius".to_string()
    } else {
      format!("--radius-{}", key)
    };
    vars.insert(name, value.clone());
  }

  vars
}

fn kebab_case(key: &str) -> String {
  let mut out = String::with_capacity(key.len() + 4);
  for c in key.chars() {
    if c.is_ascii_uppercase() {
      out.push('-');
      out.push(c.to_ascii_lowercase());
    } else {
      out.push(c);
    }
  }
  out
}

/// Somewhere a theme can be applied (a document root, a stylesheet, ...).
pub trait ThemeSurface {
  fn set_property(&mut self, name: &str, value: &str);
  fn set_favicon(&mut self, url: &str);
}

/// Write the theme's variables, font family and favicon onto `surface`.
///
/// Applying the same theme twice leaves the surface as it was.
pub fn apply_theme(surface: &mut dyn ThemeSurface, theme: &Theme) {
  let generated;
  let vars = match &theme.css_variables {
    Some(vars) => vars,
    None => {
      generated = generate_css_variables(theme);
      &generated
    }
  };
  for (name, value) in vars {
    surface.set_property(name, value);
  }

  if let Some(font) = theme.typography.font_family.as_deref() {
    surface.set_property("font-family", font);
  }

  if let Some(favicon) = theme.branding.favicon_url.as_deref().filter(|u| !u.is_empty()) {
    surface.set_favicon(favicon);
  }
}

/// In-memory surface that renders to a `:root` rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
  properties: BTreeMap<String, String>,
  favicon: Option<String>,
}

impl StyleSheet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn property(&self, name: &str) -> Option<&str> {
    self.properties.get(name).map(String::as_str)
  }

  pub fn favicon(&self) -> Option<&str> {
    self.favicon.as_deref()
  }

  pub fn render_css(&self) -> String {
    let mut css = String::from(":root {\n");
    for (name, value) in &self.properties {
      let _ = writeln!(css, "  {}: {};", name, value);
    }
    css.push_str("}\n");
    css
  }

  /// `<link>` element for the favicon, if one is set.
  pub fn favicon_link(&self) -> Option<String> {
    self
      .favicon
      .as_ref()
      .map(|href| format!(r#"<link rel="icon" type="image/x-icon" href="{}">"#, href))
  }
}

impl ThemeSurface for StyleSheet {
  fn set_property(&mut self, name: &str, value: &str) {
    self.properties.insert(name.to_string(), value.to_string());
  }

  fn set_favicon(&mut self, url: &str) {
    self.favicon = Some(url.to_string());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bare_theme() -> Theme {
    Theme {
      css_variables: None,
      ..Theme::default()
    }
  }

  #[test]
  fn test_generated_variable_names() {
    let mut theme = bare_theme();
    theme
      .color_variations
      .insert("primaryForeground".to_string(), "#fff".to_string());

    let vars = generate_css_variables(&theme);

    assert_eq!(vars.get("--primary").map(String::as_str), Some("#AE613A"));
    assert_eq!(vars.get("--primary80").map(String::as_str), Some("rgba(174, 97, 58, 0.8)"));
    assert_eq!(vars.get("--primary-foreground").map(String::as_str), Some("#fff"));
    assert_eq!(vars.get("--radius").map(String::as_str), Some("0.5rem"));
    assert_eq!(vars.get("--radius-sm").map(String::as_str), Some("0.25rem"));
    assert!(!vars.contains_key("--radius-md"));
  }

  #[test]
  fn test_explicit_variables_are_kept() {
    let vars = generate_css_variables(&Theme::default());
    assert_eq!(vars.get("--ring").map(String::as_str), Some("#AE613A"));
  }

  #[test]
  fn test_apply_sets_font_and_favicon() {
    let mut theme = Theme::default();
    theme.branding.favicon_url = Some("/favicon.ico".to_string());
    let mut sheet = StyleSheet::new();

    apply_theme(&mut sheet, &theme);

    assert!(sheet.property("font-family").unwrap().starts_with("Poppins"));
    assert_eq!(sheet.property("--radius"), Some("0.5rem"));
    assert_eq!(sheet.favicon(), Some("/favicon.ico"));
    assert!(sheet.favicon_link().unwrap().contains("/favicon.ico"));
  }

  #[test]
  fn test_apply_is_idempotent() {
    let theme = Theme::default();
    let mut once = StyleSheet::new();
    apply_theme(&mut once, &theme);
    let mut twice = once.clone();
    apply_theme(&mut twice, &theme);
    assert_eq!(once, twice);
    assert!(once.render_css().contains("  --primary: #AE613A;"));
  }

  #[test]
  fn test_no_favicon_leaves_surface_alone() {
    let mut sheet = StyleSheet::new();
    apply_theme(&mut sheet, &Theme::default());
    assert!(sheet.favicon().is_none());
    assert!(sheet.favicon_link().is_none());
  }
}
