use anyhow::Result;

use crate::render;

use super::Context;

pub async fn run(ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;
    let profile = client.get_profile().await?;
    println!("{}", render::profile(&profile));
    Ok(())
}
