//! `veritas status`: resolve the status entries of a credential.

use clap::Args;
use serde_json::json;
use veritas_policies::VerificationInput;
use veritas_status::extract_status_entries;

use crate::engine::{read_input, Engine};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Credential: a JWT, a hex CWT or a JSON document (inline or path to file).
    #[arg(short, long)]
    pub credential: String,
}

pub async fn run(args: &StatusArgs, engine: &Engine) -> anyhow::Result<()> {
    let input = VerificationInput::from_text(&read_input(&args.credential)?);
    let payload = engine.payload(&input)?;

    let Some(entries) = extract_status_entries(&payload)? else {
        println!("Credential carries no status entry");
        return Ok(());
    };

    let mut failures = 0;
    let mut checks = Vec::with_capacity(entries.len());
    for entry in &entries {
        match engine.validator.check(entry).await {
            Ok(check) => checks.push(check.to_json()),
            Err(e) => {
                failures += 1;
                checks.push(json!({
                    "status_list_credential": entry.status_list_credential,
                    "error": e.to_string(),
                }));
            }
        }
    }
    println!("{}", serde_json::to_string_pretty(&checks)?);

    if failures > 0 {
        anyhow::bail!("{} of {} status entries could not be resolved", failures, entries.len());
    }
    Ok(())
}
