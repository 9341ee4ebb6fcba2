use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use pagepress_local::chrome::{ChromeRenderer, RendererConfig};
use pagepress_local::title::{TitleClient, DEFAULT_API_BASE_URL, DEFAULT_MODEL};
use pagepress_local::HtmlFetcher;
use pagepress_server::{app, AppState};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pagepress")]
#[command(about = "Turn web pages into print-quality PDFs over HTTP", long_about = None)]
struct Cli {
    /// HTTP listen port.
    #[arg(long, env = "PAGEPRESS_PORT", default_value_t = 3000)]
    port: u16,

    /// API key for the title suggestion provider. Title suggestion is
    /// silently disabled when unset.
    #[arg(long, env = "PAGEPRESS_API_KEY")]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible completions provider.
    #[arg(long, env = "PAGEPRESS_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Model name sent in completion requests.
    #[arg(long, env = "PAGEPRESS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Explicit Chrome/Chromium executable (auto-detected when unset).
    #[arg(long, env = "PAGEPRESS_CHROME")]
    chrome: Option<String>,

    /// Directory holding the companion front-end page.
    #[arg(long, env = "PAGEPRESS_STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let titles = TitleClient::new(cli.api_base_url, cli.api_key, cli.model)?;
    if titles.is_enabled() {
        tracing::info!(model = titles.model(), "title suggestion enabled");
    } else {
        tracing::info!("title suggestion disabled (no API key configured)");
    }

    let renderer = ChromeRenderer::new(
        RendererConfig {
            chrome_path: cli.chrome,
        },
        titles.clone(),
    );

    let state = Arc::new(AppState {
        renderer: Arc::new(renderer),
        fetcher: HtmlFetcher::new()?,
        titles,
    });

    let router = app(state, &cli.static_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router).await?;
    Ok(())
}
