//! Round trip against a real backend.
//!
//! Needs SUPABASE_URL, SUPABASE_ANON_KEY and the credentials of an
//! approved account in CHANTIER_TEST_EMAIL / CHANTIER_TEST_PASSWORD,
//! usually from a `.env` file. Run with `cargo test -- --ignored`.

use chantier::context::SessionContext;
use chantier::directory::MemorySelectionStore;
use chantier::models::{ExpenseStatus, NewExpense};
use chantier::Chantier;
use dotenv::dotenv;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
#[ignore]
async fn test_project_round_trip() {
    dotenv().ok();
    let _ = pretty_env_logger::try_init();

    let email = std::env::var("CHANTIER_TEST_EMAIL").expect("CHANTIER_TEST_EMAIL must be set");
    let password =
        std::env::var("CHANTIER_TEST_PASSWORD").expect("CHANTIER_TEST_PASSWORD must be set");

    let client = Chantier::from_env().expect("backend settings must be set");
    let ctx = SessionContext::start_with(client, Arc::new(MemorySelectionStore::new()))
        .await
        .unwrap();
    ctx.auth.sign_in(&email, &password).await.unwrap();

    let name = format!("live-{}", Uuid::new_v4());
    let project = ctx
        .projects
        .create_project(&name, Some("created by the live test"))
        .await
        .expect("project should be created");
    assert_eq!(ctx.projects.current_project().map(|p| p.id), Some(project.id.clone()));

    let store = ctx.store();
    let expense = store
        .create_expense(NewExpense {
            supplier_id: None,
            date: "01/03/2024".to_string(),
            item: "Ciment".to_string(),
            quantity: Some("10".to_string()),
            price: 125.5,
            status: ExpenseStatus::Pending,
            invoice_image: None,
        })
        .await
        .unwrap();
    assert_eq!(expense.project_id, project.id);

    let expenses = store.expenses().await.unwrap();
    assert!(expenses.iter().any(|e| e.id == expense.id));

    store.delete_expense(&expense.id).await.unwrap();
    assert!(ctx.projects.delete_project(&project.id).await);
    ctx.auth.sign_out().await.unwrap();
}
