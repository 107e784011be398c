use anyhow::Result;
use clap::Args;

use crate::progress;
use crate::render;

use super::Context;

#[derive(Args)]
pub struct SleepArgs {
    /// Number of days to look back
    #[arg(long, default_value_t = 7)]
    days: usize,
}

pub async fn run(args: SleepArgs, ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;

    let spinner = progress::create_spinner("Fetching sleep...");
    let records = client.get_sleep(args.days).await;
    spinner.finish_and_clear();

    println!("{}", render::sleep_trend(&records?));
    Ok(())
}
