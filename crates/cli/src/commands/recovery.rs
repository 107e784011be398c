use anyhow::Result;
use clap::Args;

use crate::progress;
use crate::render;

use super::Context;

#[derive(Args)]
pub struct RecoveryArgs {
    /// Number of days to look back
    #[arg(long, default_value_t = 7)]
    days: usize,
}

pub async fn run(args: RecoveryArgs, ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;

    let spinner = progress::create_spinner("Fetching recovery...");
    let records = client.get_recovery_trend(args.days).await;
    spinner.finish_and_clear();

    println!("{}", render::recovery_trend(&records?));
    Ok(())
}
