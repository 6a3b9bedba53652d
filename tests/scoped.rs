mod common;

use chantier::cancel::CancelHandle;
use chantier::directory::{MemorySelectionStore, ProjectDirectory};
use chantier::error::Error;
use chantier::models::{Expense, ExpenseStatus, NewExpense, NewOrder, OrderStatus, ProfileStatus};
use chantier::scoped::{OrderLine, ScopedStore};
use chantier::session::AuthProvider;
use common::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A store for `u1` whose profile has `status` and who sees `memberships`
async fn store(server: &MockServer, status: &str, memberships: Value) -> ScopedStore {
    mount_sign_in(server, "u1").await;
    mount_profile(server, "u1", status).await;
    mount_memberships(server, "u1", memberships).await;

    let client = client(server);
    let auth = Arc::new(AuthProvider::new(client.clone()));
    auth.sign_in("u1@chantier.test", "secret").await.unwrap();

    let directory = Arc::new(ProjectDirectory::new(
        client.clone(),
        Arc::new(MemorySelectionStore::new()),
    ));
    directory.on_identity_change(auth.current_user()).await;

    ScopedStore::new(client, auth, directory)
}

fn one_project() -> Value {
    json!([membership_json(
        project_json("p1", "Villa Carthage", "2023-06-01T00:00:00Z"),
        "admin"
    )])
}

fn two_projects() -> Value {
    json!([
        membership_json(project_json("p1", "Villa Carthage", "2023-06-01T00:00:00Z"), "admin"),
        membership_json(project_json("p2", "Immeuble Lac", "2024-02-01T00:00:00Z"), "editor"),
    ])
}

fn expense_json(id: &str, project: &str, supplier: &str, price: f64, status: &str) -> Value {
    json!({
        "id": id,
        "project_id": project,
        "supplier_id": supplier,
        "date": "02/03/2024",
        "item": "F-104",
        "quantity": "12",
        "price": price,
        "status": status,
        "deleted_at": null
    })
}

fn new_expense() -> NewExpense {
    NewExpense {
        supplier_id: Some("beton".to_string()),
        date: "02/03/2024".to_string(),
        item: "F-104".to_string(),
        quantity: Some("12".to_string()),
        price: 840.0,
        status: ExpenseStatus::Pending,
        invoice_image: None,
    }
}

async fn requests_to(server: &MockServer, table: &str) -> Vec<wiremock::Request> {
    let target = format!("/rest/v1/{}", table);
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == target)
        .collect()
}

fn order_row(status: &str) -> Value {
    json!({
        "id": "o1",
        "project_id": "p1",
        "supplier_id": "beton",
        "date": "04/03/2024",
        "status": status,
        "items": [
            { "article_name": "Ciment", "quantity": 10.0, "unit": "sac", "unit_price": 12.5 }
        ]
    })
}

async fn mount_pending_order(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/orders"))
        .and(query_param("id", "eq.o1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([order_row("pending")])))
        .mount(server)
        .await;
}

/// Claiming the delivery returns the row only when `won`; any other
/// PATCH of the order succeeds
async fn mount_order_claim(server: &MockServer, won: bool) {
    let rows = if won {
        json!([order_row("delivered")])
    } else {
        json!([])
    };
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/orders"))
        .and(query_param("id", "eq.o1"))
        .and(query_param("status", "neq.delivered"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/orders"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

async fn order_patches(server: &MockServer) -> Vec<wiremock::Request> {
    requests_to(server, "orders")
        .await
        .into_iter()
        .filter(|r| r.method.to_string() == "PATCH")
        .collect()
}

#[tokio::test]
async fn test_no_project_selected_sends_nothing() {
    init_logger();
    let server = MockServer::start().await;
    let store = store(&server, "approved", json!([])).await;

    let result = store.create_expense(new_expense()).await;
    assert!(matches!(result, Err(Error::NoProjectSelected)));
    assert!(matches!(store.expenses().await, Err(Error::NoProjectSelected)));
    assert!(requests_to(&server, "expenses").await.is_empty());
}

#[tokio::test]
async fn test_pending_profile_is_refused() {
    let server = MockServer::start().await;
    let store = store(&server, "pending", one_project()).await;

    let result = store.deposits().await;
    assert!(matches!(result, Err(Error::NotApproved(ProfileStatus::Pending))));
    assert!(requests_to(&server, "deposits").await.is_empty());
}

#[tokio::test]
async fn test_signed_out_is_refused_before_anything() {
    let server = MockServer::start().await;
    let client = client(&server);
    let auth = Arc::new(AuthProvider::new(client.clone()));
    let directory = Arc::new(ProjectDirectory::new(
        client.clone(),
        Arc::new(MemorySelectionStore::new()),
    ));
    let store = ScopedStore::new(client, auth, directory);

    assert!(matches!(
        store.create_expense(new_expense()).await,
        Err(Error::NotAuthenticated)
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_insert_carries_current_project() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/expenses"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([expense_json("e1", "p1", "beton", 840.0, "pending")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let expense = store.create_expense(new_expense()).await.unwrap();
    assert_eq!(expense.project_id.as_str(), "p1");
    assert_eq!(expense.price, 840.0);

    let sent: Value =
        serde_json::from_slice(&requests_to(&server, "expenses").await[0].body).unwrap();
    assert_eq!(sent[0]["project_id"], "p1");
    assert_eq!(sent[0]["item"], "F-104");
}

#[tokio::test]
async fn test_list_hides_soft_deleted_rows() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/expenses"))
        .and(query_param("project_id", "eq.p1"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            expense_json("e1", "p1", "beton", 1000.0, "paid"),
            expense_json("e2", "p1", "beton", 500.0, "pending"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let expenses: Vec<Expense> = store.expenses().await.unwrap();
    assert_eq!(expenses.len(), 2);
}

#[tokio::test]
async fn test_create_order_tags_lines() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "o1",
            "project_id": "p1",
            "supplier_id": "beton",
            "date": "04/03/2024",
            "status": "pending",
            "notes": null
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/order_items"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": "i1", "order_id": "o1", "article_name": "Ciment", "quantity": 10.0, "unit": "sac", "unit_price": 12.5 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let order = store
        .create_order(
            NewOrder {
                supplier_id: "beton".to_string(),
                date: "04/03/2024".to_string(),
                notes: None,
                status: OrderStatus::Pending,
            },
            vec![
                OrderLine::new("Ciment", 10.0, "sac", 12.5),
                OrderLine::new("   ", 1.0, "pcs", 0.0),
            ],
        )
        .await
        .unwrap();
    assert_eq!(order.items.len(), 1);

    let items = requests_to(&server, "order_items").await;
    let body: Value = serde_json::from_slice(&items[0].body).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["project_id"], "p1");
    assert_eq!(body[0]["order_id"], "o1");
}

#[tokio::test]
async fn test_delivered_order_books_expense() {
    init_logger();
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/orders"))
        .and(query_param("id", "eq.o1"))
        .and(query_param("project_id", "eq.p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "o1",
            "project_id": "p1",
            "supplier_id": "beton",
            "date": "04/03/2024",
            "status": "pending",
            "items": [
                { "article_name": "Ciment", "quantity": 10.0, "unit": "sac", "unit_price": 12.5 },
                { "article_name": "Gravier", "quantity": 3.0, "unit": "m3", "unit_price": 40.0 }
            ]
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/expenses"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([expense_json("e9", "p1", "beton", 245.0, "pending")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/invoice_items"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    mount_order_claim(&server, true).await;

    let order = store
        .update_order_status("o1", OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);

    let expense_requests = requests_to(&server, "expenses").await;
    let expense: Value = serde_json::from_slice(&expense_requests[0].body).unwrap();
    assert_eq!(expense[0]["project_id"], "p1");
    assert_eq!(expense[0]["item"], "Commande du 04/03/2024");
    assert_eq!(expense[0]["quantity"], "Lot");
    assert_eq!(expense[0]["price"], 245.0);
    assert_eq!(expense[0]["status"], "pending");

    let invoice_requests = requests_to(&server, "invoice_items").await;
    let lines: Value = serde_json::from_slice(&invoice_requests[0].body).unwrap();
    assert_eq!(lines.as_array().unwrap().len(), 2);
    assert_eq!(lines[1]["expense_id"], "e9");
    assert_eq!(lines[1]["total_ttc"], 120.0);
    assert_eq!(lines[1]["project_id"], "p1");
}

#[tokio::test]
async fn test_failed_booking_restores_order_status() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    mount_pending_order(&server).await;
    mount_order_claim(&server, true).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/expenses"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "bad row" })))
        .mount(&server)
        .await;

    let result = store.update_order_status("o1", OrderStatus::Delivered).await;
    assert!(matches!(result, Err(Error::Api { status: 400, .. })));

    let undo = order_patches(&server).await;
    assert_eq!(undo.len(), 2);
    assert_eq!(undo[1].url.query_pairs().find(|(k, _)| k == "status").unwrap().1, "eq.delivered");
    let body: Value = serde_json::from_slice(&undo[1].body).unwrap();
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn test_retry_after_failed_invoice_lines_books_once() {
    init_logger();
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    mount_pending_order(&server).await;
    mount_order_claim(&server, true).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/expenses"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([expense_json("e9", "p1", "beton", 125.0, "pending")])),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/invoice_items"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/invoice_items"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/expenses"))
        .and(query_param("id", "eq.e9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let first = store.update_order_status("o1", OrderStatus::Delivered).await;
    assert!(matches!(first, Err(Error::Api { status: 500, .. })));

    let second = store
        .update_order_status("o1", OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(second.status, OrderStatus::Delivered);

    let expenses = requests_to(&server, "expenses").await;
    let created = expenses.iter().filter(|r| r.method.to_string() == "POST").count();
    let removed = expenses.iter().filter(|r| r.method.to_string() == "DELETE").count();
    assert_eq!(created - removed, 1);
}

#[tokio::test]
async fn test_order_delivered_elsewhere_is_not_booked_twice() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    mount_pending_order(&server).await;
    mount_order_claim(&server, false).await;

    let order = store
        .update_order_status("o1", OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert!(requests_to(&server, "expenses").await.is_empty());
}

#[tokio::test]
async fn test_sign_out_cancels_pending_write() {
    init_logger();
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/expenses"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([expense_json("e1", "p1", "beton", 840.0, "pending")]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let pending = {
        let store = store.clone();
        tokio::spawn(async move { store.create_expense(new_expense()).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    store.directory().on_identity_change(None).await;

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("write was not cancelled")
        .unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[tokio::test]
async fn test_linking_twice_is_fine() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/project_suppliers"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    store.link_supplier("beton").await.unwrap();
}

#[tokio::test]
async fn test_archive_supplier_hides_its_rows() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    for table in ["project_suppliers", "expenses", "deposits"] {
        Mock::given(method("PATCH"))
            .and(path(format!("/rest/v1/{}", table)))
            .and(query_param("project_id", "eq.p1"))
            .and(query_param("supplier_id", "eq.beton"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;
    }

    store.archive_supplier("beton").await.unwrap();
    let archived: Value =
        serde_json::from_slice(&requests_to(&server, "expenses").await[0].body).unwrap();
    assert!(archived["deleted_at"].is_string());

    store.restore_supplier("beton").await.unwrap();
    let restored: Value =
        serde_json::from_slice(&requests_to(&server, "expenses").await[1].body).unwrap();
    assert!(restored["deleted_at"].is_null());
}

#[tokio::test]
async fn test_reorder_only_touches_linked_suppliers() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/project_suppliers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "project_id": "p1", "supplier_id": "beton", "sort_order": 0 },
            { "project_id": "p1", "supplier_id": "acier", "sort_order": 1 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/project_suppliers"))
        .and(query_param("on_conflict", "project_id,supplier_id"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let order = ["acier", "inconnu", "beton"].map(String::from);
    store.reorder_suppliers(&order).await.unwrap();

    let upserts: Vec<_> = requests_to(&server, "project_suppliers")
        .await
        .into_iter()
        .filter(|r| r.method.to_string() == "POST")
        .collect();
    let body: Value = serde_json::from_slice(&upserts[0].body).unwrap();
    assert_eq!(
        body,
        json!([
            { "project_id": "p1", "supplier_id": "acier", "sort_order": 0 },
            { "project_id": "p1", "supplier_id": "beton", "sort_order": 1 }
        ])
    );
}

#[tokio::test]
async fn test_supplier_summary() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/expenses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            expense_json("e1", "p1", "beton", 1000.0, "paid"),
            expense_json("e2", "p1", "beton", 500.0, "pending"),
            expense_json("e3", "p1", "acier", 300.0, "paid"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/deposits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "d1", "project_id": "p1", "supplier_id": "beton", "date": "2024-03-01", "amount": 700.0 }
        ])))
        .mount(&server)
        .await;

    let summary = store.supplier_summary("beton").await.unwrap();
    assert_eq!(summary.total_expenses, 1500.0);
    assert_eq!(summary.paid_expenses, 1000.0);
    assert_eq!(summary.balance(), 800.0);
}

#[tokio::test]
async fn test_setting_upserts_on_project_and_key() {
    let server = MockServer::start().await;
    let store = store(&server, "approved", one_project()).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/project_settings"))
        .and(query_param("on_conflict", "project_id,key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "project_id": "p1", "key": "currency", "value": "TND" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let setting = store.save_setting("currency", "TND").await.unwrap();
    assert_eq!(setting.value, "TND");
}

#[tokio::test]
async fn test_view_follows_project_and_stops_on_cancel() {
    init_logger();
    let server = MockServer::start().await;
    let store = store(&server, "approved", two_projects()).await;

    for project in ["p1", "p2"] {
        Mock::given(method("GET"))
            .and(path("/rest/v1/expenses"))
            .and(query_param("project_id", format!("eq.{}", project)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([expense_json(
                &format!("e-{}", project),
                project,
                "beton",
                100.0,
                "pending"
            )])))
            .mount(&server)
            .await;
    }

    let handle = CancelHandle::new();
    let mut view = store.view::<Expense>(handle.signal());

    let first = view.refresh().await.unwrap();
    assert_eq!(first.project.unwrap().as_str(), "p1");
    assert_eq!(first.rows[0].id, "e-p1");

    let p2 = store
        .directory()
        .projects()
        .await
        .into_iter()
        .find(|p| p.id.as_str() == "p2")
        .unwrap();
    store.directory().select_project(p2).await;

    let second = view.changed().await.unwrap();
    assert_eq!(second.project.unwrap().as_str(), "p2");
    assert_eq!(second.rows[0].id, "e-p2");

    handle.cancel();
    assert!(matches!(view.changed().await, Err(Error::Cancelled)));
}
