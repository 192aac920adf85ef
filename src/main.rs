mod api;
mod backend;
mod config;
mod dom;
mod exchange;
mod loader;
mod sdk;
mod server;
mod settings;
mod widget;

use crate::config::{AppConfig, load_widget_config};
use crate::exchange::{HttpChatTransport, Submission};
use crate::server::AppState;
use crate::settings::{WidgetConfig, WidgetSettings};
use crate::widget::Widget;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pounce-widget", version, about = "Embeddable chat widget server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the widget assets, mount API and chat relay (default).
    Serve,
    /// Talk to a running server through the widget from the terminal.
    Chat(ChatArgs),
}

#[derive(Debug, Args)]
struct ChatArgs {
    /// Base URL of the server hosting `/chat`.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    url: url::Url,
    /// Page path the widget pretends to be mounted on.
    #[arg(long, default_value = "/")]
    path: String,
    /// Widget config file (`.toml` or `.json`).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Chat(args) => chat(args).await,
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let backend = backend::chat_backend_from_config(config.upstream.as_ref());
    let addr = config.bind_addr;
    let state = AppState::new(config, backend);
    tracing::info!(%addr, "starting pounce-widget server");
    server::run(addr, state).await?;
    Ok(())
}

async fn chat(args: ChatArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => load_widget_config(path)?,
        None => WidgetConfig::default(),
    };
    let page_path = loader::normalize_path(&args.path);
    let Some(mut widget) = Widget::build(WidgetSettings::resolve(&config), &page_path) else {
        tracing::info!(%page_path, "widget is excluded on this page");
        return Ok(());
    };
    let transport = HttpChatTransport::new(&args.url)?;
    tracing::debug!(endpoint = %transport.endpoint(), "chat transport ready");

    widget.open();
    tracing::debug!(state = ?widget.state(), "widget opened");
    println!("── {} ──", widget.settings().header_text);
    for entry in widget.log().entries() {
        println!("{}", entry.display());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        widget.set_input(line);
        if let Submission::Exchanged { .. } = widget.submit(&transport).await
            && let Some(reply) = widget.log().last()
        {
            println!("{}", reply.display());
        }
    }
    widget.close();
    tracing::debug!(entries = widget.log().len(), "chat session ended");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
