// crates/jd-cli/src/commands/home.rs
//
// `jd home`: render the home page.

use jd_client::{Query, QueryClient};
use jd_core::api::example::{Hello, HelloInput};
use jd_core::api::session::GetSession;

use super::AppContext;
use crate::pages::home::{render_home, HELLO_NAME};

/// Load both queries of the page. Issued together, they travel in one request.
pub async fn load(client: &QueryClient) -> (Query<Hello>, Query<GetSession>) {
    let mut hello = client.query::<Hello>(HelloInput {
        name: HELLO_NAME.to_string(),
    });
    let mut session = client.query::<GetSession>(());
    tokio::join!(hello.load(), session.load());
    (hello, session)
}

/// Run the home command.
pub async fn run(app: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let client = app.query_client();
    let (hello, session) = load(&client).await;

    if let Some(err) = hello.state().error() {
        eprintln!("example.hello failed: {}", err);
    }
    if let Some(err) = session.state().error() {
        eprintln!("session.getSession failed: {}", err);
    }

    print!("{}", render_home(hello.state(), session.state()));
    println!("\nSign in: {}", app.auth_client().sign_in_url("github"));

    Ok(())
}
