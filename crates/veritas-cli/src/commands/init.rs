//! `veritas init`: write a default configuration file.

use clap::Args;
use std::path::Path;

use crate::config::VeritasConfig;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file.
    #[arg(short, long)]
    pub force: bool,
}

pub fn run(args: &InitArgs, path: &Path) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    VeritasConfig::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
