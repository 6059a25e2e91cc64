//! Icon names the site knows how to draw.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
  TrendingUp,
  Users,
  Clock,
  Shield,
  ShieldCheck,
  DollarSign,
  ArrowDown,
  ArrowUpRight,
  Calculator,
  Phone,
  ArrowRight,
  Play,
  Activity,
  Zap,
  Flame,
  Building,
  Leaf,
  Globe,
  FileText,
  Code,
  Rocket,
}

/// Icons usable for stats and benefit lists.
const STAT_ICONS: [Icon; 16] = [
  Icon::TrendingUp,
  Icon::Users,
  Icon::Clock,
  Icon::Shield,
  Icon::ArrowDown,
  Icon::ArrowUpRight,
  Icon::Calculator,
  Icon::Phone,
  Icon::ArrowRight,
  Icon::Play,
  Icon::Activity,
  Icon::Zap,
  Icon::Flame,
  Icon::Building,
  Icon::Leaf,
  Icon::Globe,
];

impl Icon {
  pub const ALL: [Icon; 21] = [
    Icon::TrendingUp,
    Icon::Users,
    Icon::Clock,
    Icon::Shield,
    Icon::ShieldCheck,
    Icon::DollarSign,
    Icon::ArrowDown,
    Icon::ArrowUpRight,
    Icon::Calculator,
    Icon::Phone,
    Icon::ArrowRight,
    Icon::Play,
    Icon::Activity,
    Icon::Zap,
    Icon::Flame,
    Icon::Building,
    Icon::Leaf,
    Icon::Globe,
    Icon::FileText,
    Icon::Code,
    Icon::Rocket,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Icon::TrendingUp => "TrendingUp",
      Icon::Users => "Users",
      Icon::Clock => "Clock",
      Icon::Shield => "Shield",
      Icon::ShieldCheck => "ShieldCheck",
      Icon::DollarSign => "DollarSign",
      Icon::ArrowDown => "ArrowDown",
      Icon::ArrowUpRight => "ArrowUpRight",
      Icon::Calculator => "Calculator",
      Icon::Phone => "Phone",
      Icon::ArrowRight => "ArrowRight",
      Icon::Play => "Play",
      Icon::Activity => "Activity",
      Icon::Zap => "Zap",
      Icon::Flame => "Flame",
      Icon::Building => "Building",
      Icon::Leaf => "Leaf",
      Icon::Globe => "Globe",
      Icon::FileText => "FileText",
      Icon::Code => "Code",
      Icon::Rocket => "Rocket",
    }
  }

  /// Exact lookup among the stat icons, falling back to an arrow.
  pub fn lookup(name: &str) -> Icon {
    STAT_ICONS
      .iter()
      .copied()
      .find(|icon| icon.name() == name)
      .unwrap_or(Icon::ArrowRight)
  }

  /// Lenient lookup for CMS-entered names: whitespace is dropped and the
  /// first letter capitalized. Unknown names fall back to a clock.
  pub fn resolve(name: &str) -> Icon {
    let clean: String = name.split_whitespace().collect();
    let mut chars = clean.chars();
    let capitalized = match chars.next() {
      Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
      None => return Icon::Clock,
    };

    Icon::ALL
      .iter()
      .copied()
      .find(|icon| icon.name() == clean || icon.name() == capitalized)
      .unwrap_or_else(|| {
        tracing::debug!(icon = name, "unknown icon, using Clock");
        Icon::Clock
      })
  }
}

impl fmt::Display for Icon {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
