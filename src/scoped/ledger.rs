//! Expenses, deposits, orders, settings and documents of the current project

use chrono::{Local, Utc};
use log::{error, info, warn};
use serde_json::json;

use super::{Scope, ScopedRow, ScopedStore};
use crate::error::{Error, Result};
use crate::postgrest::SortOrder;
use crate::models::{
    Deposit, Expense, ExpenseStatus, InvoiceItem, NewDeposit, NewExpense, NewInvoiceItem,
    NewOrder, NewOrderItem, NewProjectSetting, NewUploadedDocument, Order, OrderItem, OrderStatus,
    ProjectSetting, UploadedDocument,
};

/// Quantity written on expenses generated from a delivered order
pub const ORDER_EXPENSE_QUANTITY: &str = "Lot";

/// A line of an order being placed
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub article_name: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
}

impl OrderLine {
    pub fn new(article_name: &str, quantity: f64, unit: &str, unit_price: f64) -> Self {
        Self {
            article_name: article_name.to_string(),
            quantity,
            unit: unit.to_string(),
            unit_price,
        }
    }
}

/// Expense booked when `order` is delivered on `today`
pub fn delivery_expense(order: &Order, today: &str) -> NewExpense {
    NewExpense {
        supplier_id: Some(order.supplier_id.clone()),
        date: today.to_string(),
        item: format!("Commande du {}", order.date),
        quantity: Some(ORDER_EXPENSE_QUANTITY.to_string()),
        price: order.total(),
        status: ExpenseStatus::Pending,
        invoice_image: None,
    }
}

fn invoice_line(expense_id: &str, item: &OrderItem) -> NewInvoiceItem {
    NewInvoiceItem {
        expense_id: expense_id.to_string(),
        designation: item.article_name.clone(),
        quantity: item.quantity,
        unit: item.unit.clone(),
        unit_price: item.unit_price.unwrap_or(0.0),
        total_ttc: item.total(),
    }
}

fn first_row<T>(rows: Vec<T>, what: &str, id: &str) -> Result<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| Error::general(format!("{} {} not found in the current project", what, id)))
}

impl ScopedStore {
    pub async fn create_expense(&self, expense: NewExpense) -> Result<Expense> {
        self.insert(expense).await
    }

    pub async fn expenses(&self) -> Result<Vec<Expense>> {
        self.list::<Expense>().await
    }

    pub async fn set_expense_status(&self, expense_id: &str, status: ExpenseStatus) -> Result<Expense> {
        let scope = self.scope().await?;
        let query = self.table(&scope, Expense::TABLE).eq("id", expense_id);
        let rows = scope
            .run(query.update::<_, Expense>(&json!({ "status": status })))
            .await?;
        first_row(rows, "expense", expense_id)
    }

    /// Hide an expense; the row stays in the database
    pub async fn delete_expense(&self, expense_id: &str) -> Result<()> {
        let scope = self.scope().await?;
        let query = self.table(&scope, Expense::TABLE).eq("id", expense_id);
        scope
            .run(query.update_minimal(&json!({ "deleted_at": Utc::now() })))
            .await
    }

    /// Invoice lines attached to an expense
    pub async fn invoice_items(&self, expense_id: &str) -> Result<Vec<InvoiceItem>> {
        let scope = self.scope().await?;
        let query = self.table(&scope, InvoiceItem::TABLE).eq("expense_id", expense_id);
        scope.run(query.execute::<InvoiceItem>()).await
    }

    pub async fn create_deposit(&self, deposit: NewDeposit) -> Result<Deposit> {
        self.insert(deposit).await
    }

    pub async fn deposits(&self) -> Result<Vec<Deposit>> {
        self.list::<Deposit>().await
    }

    pub async fn delete_deposit(&self, deposit_id: &str) -> Result<()> {
        let scope = self.scope().await?;
        let query = self.table(&scope, Deposit::TABLE).eq("id", deposit_id);
        scope
            .run(query.update_minimal(&json!({ "deleted_at": Utc::now() })))
            .await
    }

    /// Place an order with its lines. Lines without an article name are
    /// skipped.
    pub async fn create_order(&self, order: NewOrder, lines: Vec<OrderLine>) -> Result<Order> {
        let scope = self.scope().await?;
        let status = order.status;
        let mut created = self.insert_in(&scope, order).await?;

        let items: Vec<NewOrderItem> = lines
            .into_iter()
            .filter(|line| !line.article_name.trim().is_empty())
            .map(|line| NewOrderItem {
                order_id: created.id.clone(),
                article_name: line.article_name,
                quantity: line.quantity,
                unit: line.unit,
                unit_price: line.unit_price,
                status,
            })
            .collect();

        created.items = self.insert_many_in(&scope, items).await?;
        info!("order {} placed with {} lines", created.id, created.items.len());
        Ok(created)
    }

    /// Orders of the current project, newest first, with their lines
    pub async fn orders(&self) -> Result<Vec<Order>> {
        let scope = self.scope().await?;
        let query = self
            .table(&scope, Order::TABLE)
            .select(Order::SELECT)
            .order("created_at", SortOrder::Descending);
        scope.run(query.execute::<Order>()).await
    }

    /// Change the status of an order.
    ///
    /// Moving an order to `delivered` books an expense for its supplier,
    /// priced at the order total, with one invoice line per order line.
    /// The status change is claimed first so that only one caller books;
    /// when booking fails the claim is undone and nothing is left behind.
    pub async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<Order> {
        let scope = self.scope().await?;
        let query = self
            .table(&scope, Order::TABLE)
            .select(Order::SELECT)
            .eq("id", order_id);
        let order = scope
            .run(query.execute_one::<Order>())
            .await?
            .ok_or_else(|| Error::general(format!("order {} not found in the current project", order_id)))?;

        if status != OrderStatus::Delivered || order.status == OrderStatus::Delivered {
            let query = self.table(&scope, Order::TABLE).eq("id", order_id);
            scope.run(query.update_minimal(&json!({ "status": status }))).await?;
            return Ok(Order { status, ..order });
        }

        let claim = self
            .table(&scope, Order::TABLE)
            .eq("id", order_id)
            .neq("status", OrderStatus::Delivered);
        let claimed = scope
            .run(claim.update::<_, serde_json::Value>(&json!({ "status": status })))
            .await?;
        if claimed.is_empty() {
            info!("order {} was already delivered, nothing booked", order_id);
            return Ok(Order { status, ..order });
        }

        if let Err(err) = self.book_delivery(&scope, &order).await {
            warn!("booking delivery of order {} failed: {}", order_id, err);
            let undo = self
                .table(&scope, Order::TABLE)
                .eq("id", order_id)
                .eq("status", OrderStatus::Delivered);
            if let Err(undo_err) = undo.update_minimal(&json!({ "status": order.status })).await {
                error!("order {} stays delivered without an expense: {}", order_id, undo_err);
            }
            return Err(err);
        }

        Ok(Order { status, ..order })
    }

    /// Write the expense and its invoice lines. A half-written booking is
    /// removed before the error is returned.
    async fn book_delivery(&self, scope: &Scope, order: &Order) -> Result<Expense> {
        let today = Local::now().format("%d/%m/%Y").to_string();
        let expense = self.insert_in(scope, delivery_expense(order, &today)).await?;

        let lines: Vec<NewInvoiceItem> = order
            .items
            .iter()
            .map(|item| invoice_line(&expense.id, item))
            .collect();
        if let Err(err) = self.insert_many_in(scope, lines).await {
            let orphan = self.table(scope, Expense::TABLE).eq("id", &expense.id);
            if let Err(delete_err) = orphan.delete().await {
                error!("expense {} left without invoice lines: {}", expense.id, delete_err);
            }
            return Err(err);
        }

        info!(
            "order {} delivered, expense {} booked for {}",
            order.id, expense.id, expense.price
        );
        Ok(expense)
    }

    pub async fn delete_order(&self, order_id: &str) -> Result<()> {
        let scope = self.scope().await?;
        let query = self.table(&scope, Order::TABLE).eq("id", order_id);
        scope.run(query.delete()).await
    }

    /// Write a project setting, replacing any previous value for `key`
    pub async fn save_setting(&self, key: &str, value: &str) -> Result<ProjectSetting> {
        let setting = NewProjectSetting {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.upsert(setting, "project_id,key").await
    }

    pub async fn setting(&self, key: &str) -> Result<Option<String>> {
        let scope = self.scope().await?;
        let query = self.table(&scope, ProjectSetting::TABLE).eq("key", key);
        let row = scope.run(query.execute_one::<ProjectSetting>()).await?;
        Ok(row.map(|s| s.value))
    }

    /// Record an uploaded file. The uploader is the signed-in identity.
    pub async fn register_document(
        &self,
        supplier_id: Option<&str>,
        file_url: &str,
        file_name: &str,
        note: &str,
    ) -> Result<UploadedDocument> {
        let created_by = self.auth().current_user().map(|u| u.id);
        if created_by.is_none() {
            warn!("registering {} without an uploader", file_name);
        }

        self.insert(NewUploadedDocument {
            supplier_id: supplier_id.map(str::to_string),
            file_url: file_url.to_string(),
            file_name: file_name.to_string(),
            note: note.to_string(),
            created_by,
        })
        .await
    }

    pub async fn documents(&self, supplier_id: Option<&str>) -> Result<Vec<UploadedDocument>> {
        let scope = self.scope().await?;
        let mut query = self.table(&scope, UploadedDocument::TABLE);
        if let Some(supplier_id) = supplier_id {
            query = query.eq("supplier_id", supplier_id);
        }
        scope.run(query.execute::<UploadedDocument>()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delivery_expense_sums_lines() {
        let order: Order = serde_json::from_value(json!({
            "id": "o1",
            "project_id": "p1",
            "supplier_id": "beton",
            "date": "04/03/2024",
            "status": "pending",
            "items": [
                { "article_name": "Ciment", "quantity": 10.0, "unit": "sac", "unit_price": 12.5 },
                { "article_name": "Gravier", "quantity": 3.0, "unit": "m3", "unit_price": 40.0 }
            ]
        }))
        .unwrap();

        let expense = delivery_expense(&order, "05/03/2024");
        assert_eq!(expense.item, "Commande du 04/03/2024");
        assert_eq!(expense.quantity.as_deref(), Some("Lot"));
        assert_eq!(expense.price, 245.0);
        assert_eq!(expense.date, "05/03/2024");
        assert_eq!(expense.supplier_id.as_deref(), Some("beton"));

        let line = invoice_line("e1", &order.items[1]);
        assert_eq!(line.designation, "Gravier");
        assert_eq!(line.total_ttc, 120.0);
    }
}
