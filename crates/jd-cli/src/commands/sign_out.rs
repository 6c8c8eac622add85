// crates/jd-cli/src/commands/sign_out.rs
//
// `jd sign-out`: end the session at the identity provider, drop the cached
// session and re-render the auth showcase.

use jd_client::{ClientError, Query, QueryState};
use jd_core::api::session::GetSession;

use super::AppContext;
use crate::pages::home::render_auth_showcase;

/// Whether the loaded session query shows someone signed in. A failed lookup
/// is an error, never "signed out".
fn signed_in(session: &Query<GetSession>) -> Result<bool, ClientError> {
    match session.state() {
        QueryState::Error(err) => Err(err.clone()),
        QueryState::Success(Some(_)) => Ok(true),
        QueryState::Success(None) | QueryState::Pending => Ok(false),
    }
}

/// Run the sign-out command.
pub async fn run(app: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let client = app.query_client();

    let mut session = client.query::<GetSession>(());
    session.load().await;
    if !signed_in(&session)? {
        println!("Not signed in.");
        return Ok(());
    }

    // Later reads must carry the cookie header as the provider left it.
    let cookie = app.auth_client().sign_out(app.cookie.as_deref()).await?;
    client.link().set_header("cookie", cookie).await;
    session.invalidate().await?;
    session.load().await;
    signed_in(&session)?;

    println!("{}", render_auth_showcase(session.state()));
    Ok(())
}
