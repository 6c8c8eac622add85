// crates/jd-cli/src/commands/session.rs
//
// `jd session`: show who the server thinks the caller is.

use jd_client::QueryState;
use jd_core::api::session::GetSession;

use super::AppContext;
use crate::output::{format_json, OutputFormat};
use crate::pages::home::render_auth_showcase;

/// Run the session command.
pub async fn run(app: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let client = app.query_client();
    let session = client.try_fetch::<GetSession>(&()).await?;

    match app.format {
        OutputFormat::Json => println!("{}", format_json(&session)),
        OutputFormat::Text => {
            if let Some(expires) = session.as_ref().and_then(|s| s.expires) {
                println!("Session expires {}", expires.to_rfc3339());
            }
            println!("{}", render_auth_showcase(&QueryState::Success(session)));
        }
    }
    Ok(())
}
