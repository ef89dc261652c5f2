//! `veritas policies`: list the registered policies.

use clap::Args;
use serde_json::json;

use crate::engine::Engine;

#[derive(Args, Debug)]
pub struct PoliciesArgs {
    /// Print as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &PoliciesArgs, engine: &Engine) -> anyhow::Result<()> {
    let described = engine.runner.registry().describe();

    if args.json {
        let listed: Vec<_> = described
            .iter()
            .map(|(name, description)| json!({"policy": name, "description": description}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    let width = described.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, description) in &described {
        println!("  {:width$}  {}", name, description, width = width);
    }
    Ok(())
}
