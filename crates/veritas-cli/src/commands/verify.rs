//! `veritas verify`: run policies against a single credential.

use clap::Args;
use serde_json::{json, Value};
use veritas_core::{parse_policy_requests, PolicyRequest};
use veritas_policies::VerificationInput;

use crate::engine::{cancel_on_ctrl_c, read_input, Engine};

/// Run when no policy is named: a revoked or suspended credential fails.
const DEFAULT_POLICIES: [&str; 3] = ["expired", "not-before", "revoked-status-list"];

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential: a JWT, a hex CWT or a JSON document (inline or path to file).
    #[arg(short, long)]
    pub credential: String,

    /// Policy names, comma-separated.
    #[arg(short, long, value_delimiter = ',')]
    pub policy: Vec<String>,

    /// Policy requests as a JSON array (inline or path to file).
    #[arg(long, conflicts_with = "policy")]
    pub policies: Option<String>,
}

impl VerifyArgs {
    fn requests(&self) -> anyhow::Result<Vec<PolicyRequest>> {
        if let Some(policies) = &self.policies {
            let value: Value = serde_json::from_str(&read_input(policies)?)
                .map_err(|e| anyhow::anyhow!("invalid policies JSON: {}", e))?;
            return Ok(parse_policy_requests(&value)?);
        }
        if self.policy.is_empty() {
            return Ok(DEFAULT_POLICIES.iter().map(|name| PolicyRequest::new(*name)).collect());
        }
        Ok(self.policy.iter().map(PolicyRequest::new).collect())
    }
}

pub async fn run(args: &VerifyArgs, engine: &Engine) -> anyhow::Result<()> {
    let input = VerificationInput::from_text(&read_input(&args.credential)?);
    let requests = args.requests()?;

    let results = engine
        .runner
        .verify_with_cancel(input, &requests, &cancel_on_ctrl_c())
        .await;
    let success = results.iter().all(|r| r.is_success());

    let report = json!({
        "success": success,
        "results": results,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !success {
        anyhow::bail!("credential failed verification");
    }
    Ok(())
}
