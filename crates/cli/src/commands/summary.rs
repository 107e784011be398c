use anyhow::Result;

use crate::progress;
use crate::render;

use super::Context;

pub async fn run(ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;

    let spinner = progress::create_spinner("Fetching today's data...");
    // One refresh up front; the three fetches below then share the fresh token.
    client.ensure_fresh().await?;
    let result = tokio::try_join!(
        client.get_today_recovery(),
        client.get_last_sleep(),
        client.get_cycles(1),
    );
    spinner.finish_and_clear();

    let (recovery, sleep, cycles) = result?;
    println!(
        "{}",
        render::summary(recovery.as_ref(), sleep.as_ref(), cycles.first())
    );
    Ok(())
}
