use anyhow::Result;
use clap::Args;
use console::style;
use dialoguer::{Input, Password};
use tracing::info;

use whoop_client::EnvFileStore;
use whoop_client::store::{
    ACCESS_TOKEN_KEY, CLIENT_ID_KEY, CLIENT_SECRET_KEY, REFRESH_TOKEN_KEY, TokenStore,
};

use super::Context;

#[derive(Args)]
pub struct InitArgs {
    /// WHOOP app client ID
    #[arg(long)]
    client_id: Option<String>,

    /// WHOOP app client secret
    #[arg(long)]
    client_secret: Option<String>,

    /// Access token from the authorization flow
    #[arg(long)]
    access_token: Option<String>,

    /// Refresh token from the authorization flow (requires the `offline` scope).
    /// The first request of every session refreshes, so it cannot be empty.
    #[arg(long)]
    refresh_token: Option<String>,
}

pub async fn run(args: InitArgs, ctx: &Context) -> Result<()> {
    let store = EnvFileStore::new(&ctx.env_file);
    let existing = store.load().await?;

    let client_id = match args.client_id {
        Some(v) => v,
        None => Input::new()
            .with_prompt("Client ID")
            .with_initial_text(existing.client_id)
            .interact_text()?,
    };
    let client_secret = match args.client_secret {
        Some(v) => v,
        None => Password::new().with_prompt("Client secret").interact()?,
    };
    let access_token = match args.access_token {
        Some(v) => v,
        None => Password::new().with_prompt("Access token").interact()?,
    };
    let refresh_token = match args.refresh_token {
        Some(v) => v,
        None => Password::new().with_prompt("Refresh token").interact()?,
    };

    let pairs = credential_pairs(&client_id, &client_secret, &access_token, &refresh_token)?;
    store.write_keys(&pairs).await?;

    info!(env_file = %ctx.env_file.display(), "credentials saved");
    println!("{} Credentials saved.", style("✓").green());
    println!("Env file: {}", ctx.env_file.display());
    Ok(())
}

/// Both tokens are required: a session always starts with a refresh.
fn credential_pairs<'a>(
    client_id: &'a str,
    client_secret: &'a str,
    access_token: &'a str,
    refresh_token: &'a str,
) -> Result<Vec<(&'static str, &'a str)>> {
    if access_token.trim().is_empty() {
        anyhow::bail!("an access token is required");
    }
    if refresh_token.trim().is_empty() {
        anyhow::bail!("a refresh token is required; authorize with the `offline` scope");
    }
    Ok(vec![
        (CLIENT_ID_KEY, client_id.trim()),
        (CLIENT_SECRET_KEY, client_secret.trim()),
        (ACCESS_TOKEN_KEY, access_token.trim()),
        (REFRESH_TOKEN_KEY, refresh_token.trim()),
    ])
}
