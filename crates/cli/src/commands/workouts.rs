use anyhow::Result;
use clap::Args;

use crate::progress;
use crate::render;

use super::Context;

#[derive(Args)]
pub struct WorkoutsArgs {
    /// Number of workouts to return
    #[arg(long, default_value_t = 5)]
    limit: usize,
}

pub async fn run(args: WorkoutsArgs, ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;

    let spinner = progress::create_spinner("Fetching workouts...");
    let records = client.get_workouts(args.limit).await;
    spinner.finish_and_clear();

    println!("{}", render::workouts(&records?));
    Ok(())
}
