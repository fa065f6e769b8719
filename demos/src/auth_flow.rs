use std::env;
use std::sync::Arc;

use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wouldyou_session::prelude::*;
use wouldyou_storage::{FileStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let email = env::var("WOULDYOU_DEMO_EMAIL")
        .unwrap_or_else(|_| "demo@example.com".to_string());
    let password =
        env::var("WOULDYOU_DEMO_PASSWORD").unwrap_or_else(|_| "password123".to_string());

    let options = SessionOptions::from_env()?;
    info!(api_url = %options.api_url, "Connecting");
    let manager = SessionManager::connect(
        options,
        Arc::new(MemoryStore::new()),
        Arc::new(FileStore::new("wouldyou-demo.json")),
    )?;

    let mut events = manager.on_state_change();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("  event: {:?}", event);
        }
    });

    println!("1. Restoring session");
    manager.restore().await;

    println!("\n2. Registering {}", email);
    let user = match manager.register(&email, &password).await {
        Ok(user) => user,
        Err(e) if e.auth_code() == Some(ErrorCode::EmailTaken) => {
            println!("Account exists, signing in instead");
            match manager.login(&email, &password).await {
                Ok(user) => user,
                Err(e) => {
                    println!("{}", e.user_message("Login failed. Please try again."));
                    return Ok(());
                }
            }
        }
        Err(e) => {
            println!("{}", e.user_message("Registration failed. Please try again."));
            return Ok(());
        }
    };
    println!("Signed in as {} ({})", user.email, user.id);
    println!("Unlimited play: {}", manager.can_use_feature());

    println!("\n3. Refreshing tokens");
    match manager.refresh_session().await {
        Ok(_) => println!("Session refreshed"),
        Err(e) => println!("Refresh failed: {}", e),
    }

    if env::var("WOULDYOU_DEMO_DELETE").is_ok() {
        println!("\n4. Deleting account");
        manager.delete_account(Some(&password)).await?;
    } else {
        println!("\n4. Signing out");
        manager.logout().await;
    }

    println!("\nSnapshot: {:?}", manager.snapshot());
    Ok(())
}
