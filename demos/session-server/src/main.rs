//! Runs the login/logout API with in-memory sessions and accounts.
//!
//! Configure through the environment (see `latchkey::Settings`). Set
//! `DEMO_EMAIL` and `DEMO_PASSWORD` to register one account at startup.

use latchkey::prelude::*;

async fn seeded_accounts() -> Result<AccountStore, Box<dyn std::error::Error>> {
    let accounts = AccountStore::new();
    if let (Ok(email), Ok(password)) =
        (std::env::var("DEMO_EMAIL"), std::env::var("DEMO_PASSWORD"))
    {
        accounts.register(&email, &password).await?;
    }
    Ok(accounts)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    init_telemetry(settings.json_logs());

    let server = LatchkeyServer::builder()
        .bind(&settings.bind_addr())
        .session_config(settings.session_config()?)
        .accounts(seeded_accounts().await?)
        .build(MemoryStore::new())
        .await?;

    tracing::info!(addr = %server.local_addr()?, "session server listening");
    server.run().await?;
    Ok(())
}
