// crates/jd-cli/src/commands/hello.rs
//
// `jd hello [--name <name>]`: call `example.hello` directly.

use clap::Args;

use jd_core::api::example::{Hello, HelloInput};

use super::AppContext;
use crate::output::{format_json, OutputFormat};
use crate::pages::home::HELLO_NAME;

/// Greeting query command.
#[derive(Debug, Args)]
pub struct HelloCmd {
    /// Name to greet.
    #[arg(long, default_value = HELLO_NAME)]
    pub name: String,
}

/// Run the hello command.
pub async fn run(app: &AppContext, cmd: &HelloCmd) -> Result<(), Box<dyn std::error::Error>> {
    let client = app.query_client();
    let greeting = client
        .try_fetch::<Hello>(&HelloInput {
            name: cmd.name.clone(),
        })
        .await?;

    match app.format {
        OutputFormat::Json => println!("{}", format_json(&greeting)),
        OutputFormat::Text => println!("{}", greeting),
    }
    Ok(())
}
