use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use orca_content::api::kinds::SiteTheme;
use orca_content::api::{
  all_keys, refresh_all, rehydrate_all, ApiClient, ArticleDetail, Kind, ServiceDetail,
};
use orca_content::cache::{
  select, ContentContext, ContentHook, ContentStore, NoopStorage, Persistor, SnapshotStorage,
  SqliteStorage,
};
use orca_content::config::Config;
use orca_content::theme::{apply_theme, StyleSheet};

#[derive(Parser, Debug)]
#[command(name = "orca-content")]
#[command(about = "Cached access to the Orca site content API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/orca-content/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Content API base URL, overriding the config file
  #[arg(long)]
  api: Option<String>,

  /// Log debug output to stderr
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Refresh one content kind and print its cached state
  Show {
    #[arg(value_enum)]
    kind: Kind,
  },
  /// Print the theme as CSS custom properties
  ThemeCss,
  /// Refresh every content kind
  Warm,
  /// Look up a news article by slug
  Article { slug: String },
  /// Look up a service by slug
  Service { slug: String },
  /// Drop every persisted snapshot
  Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = orca_content::logging::init(args.verbose)?;

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(api) = args.api {
    config.api.base_url = api;
  }

  let storage: Arc<dyn SnapshotStorage> = if config.cache.enabled {
    let path = match &config.cache.path {
      Some(p) => p.clone(),
      None => SqliteStorage::default_path()?,
    };
    Arc::new(SqliteStorage::open_at(&path)?)
  } else {
    Arc::new(NoopStorage)
  };

  let whitelist = match &config.cache.persist {
    Some(keys) => keys.clone(),
    None => all_keys().into_iter().map(String::from).collect(),
  };
  let persistor = Persistor::new(storage, &config.cache.namespace, whitelist)
    .with_debounce(config.cache.debounce())
    .with_max_wait(config.cache.max_wait());

  // Rehydrate before anything can dispatch
  let store = ContentStore::new();
  let restored = rehydrate_all(&store, &persistor);
  info!(restored, namespace = persistor.namespace(), "cache rehydrated");
  let writer = persistor.start(&store);

  let client = ApiClient::new(&config.api)?;
  let ctx = ContentContext::new(store, Arc::new(client));

  let result = run(args.command, &ctx, &persistor).await;

  writer.shutdown().await;
  result
}

async fn run(command: Command, ctx: &ContentContext, persistor: &Persistor) -> Result<()> {
  match command {
    Command::Show { kind } => {
      let outcome = kind.refresh(ctx).await;
      if let Some(e) = outcome.error() {
        eprintln!("warning: {} refresh failed: {}", kind.key(), e);
      }
      let snapshot = kind.snapshot(&ctx.store)?;
      println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Command::ThemeCss => {
      let mut hook = ContentHook::<SiteTheme>::new(ctx);
      hook.render();
      hook.settled().await;
      let mut sheet = StyleSheet::new();
      apply_theme(&mut sheet, &hook.render().data);
      print!("{}", sheet.render_css());
      if let Some(link) = sheet.favicon_link() {
        println!("{}", link);
      }
    }
    Command::Warm => {
      for (kind, outcome) in refresh_all(ctx).await {
        match outcome.error() {
          Some(e) => println!("{:<16} failed: {}", kind.key(), e),
          None => println!("{:<16} {:?}", kind.key(), outcome),
        }
      }
    }
    Command::Article { slug } => {
      let outcome = select::<ArticleDetail>(ctx, &slug).await;
      if let Some(e) = outcome.error() {
        return Err(eyre!("Failed to load article {}: {}", slug, e));
      }
      let selection = ctx.store.selection::<ArticleDetail>();
      let article = selection
        .item()
        .ok_or_else(|| eyre!("Article {} not found", slug))?;
      println!("{}", serde_json::to_string_pretty(article.as_ref())?);
      for related in selection.related().iter() {
        println!("related: {} ({})", related.title, related.slug);
      }
    }
    Command::Service { slug } => {
      let outcome = select::<ServiceDetail>(ctx, &slug).await;
      if let Some(e) = outcome.error() {
        return Err(eyre!("Failed to load service {}: {}", slug, e));
      }
      let selection = ctx.store.selection::<ServiceDetail>();
      let service = selection
        .item()
        .ok_or_else(|| eyre!("Service {} not found", slug))?;
      println!("{}", serde_json::to_string_pretty(service.as_ref())?);
    }
    Command::Clear => {
      for kind in Kind::ALL {
        kind.clear(ctx);
      }
      let removed = persistor.purge()?;
      println!("Removed {} cached snapshots", removed);
    }
  }
  Ok(())
}
