use std::sync::Arc;

use chrono::Local;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;
use wouldyou_session::prelude::*;
use wouldyou_storage::{FileStore, MemoryStore, Preferences, StreakTracker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let options = SessionOptions::from_env()?;
    let local: Arc<dyn KeyValueStore> = Arc::new(FileStore::new("wouldyou-demo.json"));
    let manager = SessionManager::connect(options, Arc::new(MemoryStore::new()), local.clone())?;

    let mut events = manager.on_state_change();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("  event: {:?}", event);
        }
    });

    println!("1. Restoring session");
    let state = manager.restore().await;
    println!("Restored as {:?}", state);

    let preferences = Preferences::new(local.clone());
    if !preferences.onboarding_complete().await? {
        println!("First launch, marking onboarding complete");
        preferences.set_onboarding_complete().await?;
    }

    if state == SessionState::Anonymous {
        println!("\n2. Continuing as guest");
        let device_id = manager.continue_as_guest().await?;
        println!("Guest device id: {}", device_id);
    }

    println!("\n3. Playing until the free quota runs out");
    let mut streak = StreakTracker::new(local);
    let today = Local::now().date_naive();
    streak.load(today).await?;

    loop {
        match manager.require_feature() {
            Ok(()) => {
                let count = manager.increment_guest_usage().await;
                let days = streak.record_play(today).await?;
                println!(
                    "Voted ({} used, {:?} left, streak {} days)",
                    count,
                    manager.remaining_free_uses(),
                    days
                );
            }
            Err(e) => {
                println!("{}", e.user_message("Sign in to keep playing"));
                break;
            }
        }

        if manager.is_authenticated() {
            break;
        }
    }

    println!("\nSnapshot: {:?}", manager.snapshot());
    Ok(())
}
