//! `veritas presentation`: verify a presentation and its credentials.

use clap::Args;
use serde_json::json;
use veritas_policies::{PresentationRequest, VerificationInput};

use crate::engine::{cancel_on_ctrl_c, read_input, Engine};

#[derive(Args, Debug)]
pub struct PresentationArgs {
    /// Presentation: a JWT, a hex CWT or a JSON document (inline or path to file).
    #[arg(short, long)]
    pub presentation: String,

    /// Request JSON with `vp_policies`, `vc_policies` and
    /// `specific_policies` (inline or path to file).
    #[arg(short, long)]
    pub request: String,
}

pub async fn run(args: &PresentationArgs, engine: &Engine) -> anyhow::Result<()> {
    let input = VerificationInput::from_text(&read_input(&args.presentation)?);
    let request: PresentationRequest = serde_json::from_str(&read_input(&args.request)?)
        .map_err(|e| anyhow::anyhow!("invalid presentation request: {}", e))?;

    let response = engine
        .runner
        .verify_presentation(input, &request, &cancel_on_ctrl_c())
        .await;
    let success = response.overall_success();

    let report = json!({
        "success": success,
        "policies_run": response.policies_run,
        "policies_failed": response.policies_failed(),
        "time_ms": response.time_ms as u64,
        "results": response.results,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !success {
        anyhow::bail!(
            "presentation failed verification ({} of {} policies failed)",
            response.policies_failed(),
            response.policies_run
        );
    }
    Ok(())
}
