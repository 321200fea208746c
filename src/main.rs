//! GitBrowser core — console demo.
//!
//! Runs the tab list and search services against in-memory backends and
//! prints what each operation does. Set `RUST_LOG=debug` to watch the engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use url::Url;

use gitbrowser_core::app::App;
use gitbrowser_core::managers::tab_store::MemoryTabStore;
use gitbrowser_core::services::data_service::Executor;
use gitbrowser_core::services::search_backend::SearchBackend;
use gitbrowser_core::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use gitbrowser_core::types::errors::SearchError;
use gitbrowser_core::types::tab::{Placement, Tab, TabContent};

type DemoResult = Result<(), Box<dyn std::error::Error>>;

/// Answers from a fixed word list after a short pause.
struct StaticBackend;

#[async_trait]
impl SearchBackend for StaticBackend {
    async fn fetch_suggestions(&self, query: &str) -> Result<Vec<String>, SearchError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(["rust", "rust book", "rustup", "rust analyzer"]
            .iter()
            .filter(|s| s.starts_with(query))
            .map(|s| s.to_string())
            .collect())
    }

    async fn resolve_domain(&self, url: &Url) -> Result<Url, SearchError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        gitbrowser_core::services::search_backend::rewrite_host(url, [93, 184, 216, 34].into())
    }
}

#[tokio::main]
async fn main() -> DemoResult {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║           GitBrowser core v{} — Demo Mode               ║", env!("CARGO_PKG_VERSION"));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let config = std::env::temp_dir().join("gitbrowser-demo").join("core.json");
    let mut settings = SettingsEngine::new(Some(config.to_string_lossy().to_string()));
    settings.load()?;
    settings.set_value("search.resolve_domains", serde_json::json!(true))?;

    let app = App::with_backends(
        settings,
        MemoryTabStore::new(),
        Arc::new(StaticBackend),
        &Executor::Current,
    )?;
    app.tab_manager.wait_ready().await;

    demo_tabs(&app).await?;
    demo_search(&app).await?;

    app.shutdown().await;

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ Tab list and search services demonstrated successfully!");
    println!("═══════════════════════════════════════════════════════════════");
    Ok(())
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

async fn demo_tabs(app: &App) -> DemoResult {
    section("Tab Manager");
    let tabs = &app.tab_manager;

    let github = Tab::site(Url::parse("https://github.com")?, "GitHub");
    let docs = Tab::site(Url::parse("https://docs.rs")?, "Docs.rs");
    tabs.add_tab(github.clone()).await?;
    tabs.add_tab(docs.clone()).await?;
    tabs.add_tab_with(Tab::blank(), Placement::front()).await?;
    println!("  Added 3 tabs, count = {}", tabs.tab_count().await);

    tabs.select_tab(github.id()).await?;
    let replaced = tabs
        .replace_selected(TabContent::site(Url::parse("https://github.com/explore")?, "Explore"))
        .await?;
    println!("  Selected tab now shows: {}", replaced.title());

    tabs.move_tab(docs.id(), 0).await?;
    tabs.remove_tab(github.id()).await?;
    let titles: Vec<String> = tabs.get_all().await.iter().map(|t| t.title().to_string()).collect();
    println!("  Order after move + close: {:?}", titles);
    println!("  Selected: {:?}", tabs.selected_id().await);

    tabs.flush().await?;
    println!("  ✓ TabManager OK");
    println!();
    Ok(())
}

async fn demo_search(app: &App) -> DemoResult {
    section("Search Service");
    let search = &app.search_service;

    let (a, b, c) = tokio::join!(
        search.suggestions("rust"),
        search.suggestions("  RUST "),
        search.suggestions("rust"),
    );
    println!("  3 concurrent 'rust' lookups -> {:?}", a);
    println!(
        "  Backend calls: {} (joined {})",
        search.service().executions_started(),
        search.service().executions_joined()
    );
    println!("  All three callers got the same list: {}", a == b && b == c);

    let resolution = search.resolve_domain(&Url::parse("https://example.com/path")?).await?;
    println!("  Resolved: {}", resolution.url());
    println!("  ✓ SearchService OK");
    println!();
    Ok(())
}
