// crates/jd-cli/src/commands/routes.rs
//
// `jd routes`: list the procedures of the application contract.

use tabled::Tabled;

use jd_core::api::{contract, ContractEntry};

use super::AppContext;
use crate::output::{format_json, format_table, OutputFormat};

#[derive(Debug, Tabled)]
struct RouteRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Method")]
    method: &'static str,
}

impl From<&ContractEntry> for RouteRow {
    fn from(entry: &ContractEntry) -> Self {
        Self {
            path: entry.path.clone(),
            kind: entry.kind.as_str(),
            method: entry.kind.http_method().as_str(),
        }
    }
}

/// Run the routes command. Works offline; the contract is compiled in.
pub fn run(app: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let entries = contract();
    match app.format {
        OutputFormat::Json => println!("{}", format_json(&entries)),
        OutputFormat::Text => {
            let rows: Vec<RouteRow> = entries.iter().map(RouteRow::from).collect();
            println!("{}", format_table(&rows));
        }
    }
    Ok(())
}
