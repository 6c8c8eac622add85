// crates/jd-cli/src/main.rs
//
// CLI entrypoint for the JD app.
//
// Renders the home page from live RPC queries and exposes the individual
// procedures, sign-out and the route listing as subcommands.

mod commands;
mod output;
mod pages;

use clap::{Parser, Subcommand};
use commands::hello::HelloCmd;
use commands::AppContext;
use output::OutputFormat;

use jd_client::{base_url, RuntimeContext};
use jd_core::{ClientEnv, Mode};

/// JD CLI: terminal front end for the JD app.
#[derive(Parser, Debug)]
#[command(name = "jd", version, about = "Terminal front end for the JD app")]
struct Cli {
    /// Base URL of the app. Defaults to VERCEL_URL, else http://localhost:$PORT.
    #[arg(long, global = true, env = "JD_URL")]
    url: Option<String>,

    /// Cookie header to send, e.g. the session cookie from a browser.
    #[arg(long, global = true, env = "JD_SESSION_COOKIE")]
    cookie: Option<String>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Render the home page (default).
    Home,

    /// Call example.hello.
    Hello(HelloCmd),

    /// Show the current session.
    Session,

    /// Sign out at the identity provider and refresh the session.
    SignOut,

    /// List the procedures of the app router.
    Routes,
}

// The UI runs on one thread, so every query issued in a tick joins one batch.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let env = ClientEnv::from_env()?;

    let app_url = match cli.url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => base_url(RuntimeContext::Server, |name| std::env::var(name).ok()),
    };
    let app = AppContext {
        app_url,
        cookie: cli.cookie.filter(|c| !c.trim().is_empty()),
        format: OutputFormat::from_flag(cli.json),
    };
    if env.mode == Mode::Development && cli.command.is_none() {
        eprintln!("[{}] {}", env.mode, app.app_url);
    }

    match &cli.command {
        None | Some(Commands::Home) => commands::home::run(&app).await?,
        Some(Commands::Hello(cmd)) => commands::hello::run(&app, cmd).await?,
        Some(Commands::Session) => commands::session::run(&app).await?,
        Some(Commands::SignOut) => commands::sign_out::run(&app).await?,
        Some(Commands::Routes) => commands::routes::run(&app)?,
    }

    Ok(())
}
