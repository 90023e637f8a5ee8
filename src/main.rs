use expense_tracker::config::CONFIG;
use expense_tracker::core::gateway::ExpenseInput;
use expense_tracker::core::shell::Tab;
use expense_tracker::infrastructure::auth::AuthProvider;
use expense_tracker::{ExpenseTracker, InMemoryAuth, InMemoryDocumentStore, InMemoryActivityLog, Visualization};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// Scripted session against the in-memory backend
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&CONFIG.log_level))
        .init();
    info!(config = ?*CONFIG, "Starting expense tracker demo");

    let auth = Arc::new(InMemoryAuth::new(
        CONFIG.jwt_secret.clone(),
        CONFIG.token_ttl,
        CONFIG.bcrypt_cost,
    ));
    let store = Arc::new(
        InMemoryDocumentStore::new()
            .with_auth(auth.watch_identity())
            .with_pending_writes(true),
    );
    let activity = Arc::new(InMemoryActivityLog::new());
    let mut tracker = ExpenseTracker::start(auth, store, activity, &CONFIG);

    let identity = tracker.sign_up("demo@example.com", "demo-password").await?;
    info!(user_id = %identity.uid, "Signed up demo user");

    let entries = [
        ("Food & Dining", "42.10", "Team lunch"),
        ("Transportation", "18.00", ""),
        ("Food & Dining", "12.75", "Coffee beans"),
        ("Bills & Utilities", "120.00", "Electricity"),
        ("Shopping", "abc", "rejected: not a number"),
    ];
    for (category, amount, note) in entries {
        let input = ExpenseInput {
            category: category.to_string(),
            amount: amount.to_string(),
            note: note.to_string(),
        };
        match tracker.add_expense(&input).await {
            Ok(id) => info!(expense_id = %id, category, "Expense added"),
            Err(e) => warn!(category, message = %e.add_expense_message(), "Expense rejected"),
        }
    }

    let mut updates = tracker.feed_updates();
    tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|state| state.is_fresh() && state.expenses.len() == 4),
    )
    .await??;

    tracker.select_tab(Tab::Analytics);
    let view = tracker.view();
    info!(
        tab = ?view.tab,
        expenses = view.header.expense_count,
        total = view.header.total_amount,
        "Dashboard"
    );
    for expense in &view.feed.expenses {
        info!("{} {} {} {}", expense.display_date(), expense.category, expense.display_amount(), expense.note);
    }
    if let Some(breakdown) = view.summary.breakdown() {
        for line in Visualization::breakdown_lines(breakdown) {
            info!("{}", line);
        }
    }
    let chart = Visualization::pie_chart(&view.summary)?;
    info!(chart = %chart, "Chart configuration");

    tracker.sign_out().await;
    tracker.shutdown().await;
    Ok(())
}
