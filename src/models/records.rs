//! Project-scoped records: expenses, deposits, orders, suppliers and documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ProjectId, ProjectRole};
use crate::scoped::{ScopedRecord, ScopedRow};

/// Global supplier catalogue
pub const SUPPLIERS_TABLE: &str = "suppliers";

/// Payment status of an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    #[default]
    Pending,
    Paid,
}

/// An invoice booked against a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub project_id: ProjectId,
    pub supplier_id: Option<String>,
    pub date: String,
    pub item: String,
    #[serde(default)]
    pub quantity: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub status: ExpenseStatus,
    #[serde(default)]
    pub invoice_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ScopedRow for Expense {
    const TABLE: &'static str = "expenses";
    const SOFT_DELETE: bool = true;
}

#[derive(Debug, Clone, Serialize)]
pub struct NewExpense {
    pub supplier_id: Option<String>,
    pub date: String,
    pub item: String,
    pub quantity: Option<String>,
    pub price: f64,
    pub status: ExpenseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_image: Option<String>,
}

impl ScopedRecord for NewExpense {
    type Row = Expense;
}

/// A payment made to a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: String,
    pub project_id: ProjectId,
    pub supplier_id: Option<String>,
    pub date: String,
    pub amount: f64,
    #[serde(default)]
    pub payer: Option<String>,
    #[serde(default)]
    pub commercial: Option<String>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ScopedRow for Deposit {
    const TABLE: &'static str = "deposits";
    const SOFT_DELETE: bool = true;
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDeposit {
    pub supplier_id: Option<String>,
    pub date: String,
    pub amount: f64,
    pub payer: Option<String>,
    pub commercial: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

impl ScopedRecord for NewDeposit {
    type Row = Deposit;
}

/// Delivery status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchase order placed with a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub project_id: ProjectId,
    pub supplier_id: String,
    pub date: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Estimated order value: quantity times unit price, summed
    pub fn total(&self) -> f64 {
        self.items.iter().map(OrderItem::total).sum()
    }
}

impl ScopedRow for Order {
    const TABLE: &'static str = "orders";
    const SELECT: &'static str = "*,items:order_items(*)";
}

#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub supplier_id: String,
    pub date: String,
    pub notes: Option<String>,
    pub status: OrderStatus,
}

impl ScopedRecord for NewOrder {
    type Row = Order;
}

/// One line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    pub article_name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub unit_price: Option<f64>,
}

impl OrderItem {
    pub fn total(&self) -> f64 {
        self.quantity * self.unit_price.unwrap_or(0.0)
    }
}

impl ScopedRow for OrderItem {
    const TABLE: &'static str = "order_items";
}

#[derive(Debug, Clone, Serialize)]
pub struct NewOrderItem {
    pub order_id: String,
    pub article_name: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub status: OrderStatus,
}

impl ScopedRecord for NewOrderItem {
    type Row = OrderItem;
}

/// A line of an invoice attached to an expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: String,
    pub project_id: ProjectId,
    pub expense_id: String,
    pub designation: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub total_ttc: Option<f64>,
}

impl ScopedRow for InvoiceItem {
    const TABLE: &'static str = "invoice_items";
}

#[derive(Debug, Clone, Serialize)]
pub struct NewInvoiceItem {
    pub expense_id: String,
    pub designation: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub total_ttc: f64,
}

impl ScopedRecord for NewInvoiceItem {
    type Row = InvoiceItem;
}

/// A catalogue supplier, shared across projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Catalogue entry written when a supplier is first used
#[derive(Debug, Clone, Serialize)]
pub struct NewSupplier {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

impl NewSupplier {
    /// The id is derived from the name: lowercased, whitespace runs
    /// replaced by `_`.
    pub fn new(name: &str, color: Option<&str>) -> Self {
        let id = name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        Self {
            id,
            name: name.to_string(),
            color: color.map(str::to_string),
        }
    }
}

/// Link between a supplier and a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSupplier {
    pub project_id: ProjectId,
    pub supplier_id: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ScopedRow for ProjectSupplier {
    const TABLE: &'static str = "project_suppliers";
    const SOFT_DELETE: bool = true;
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProjectSupplier {
    pub supplier_id: String,
}

impl ScopedRecord for NewProjectSupplier {
    type Row = ProjectSupplier;
}

/// Display position of a supplier within a project
#[derive(Debug, Clone, Serialize)]
pub struct SupplierPosition {
    pub supplier_id: String,
    pub sort_order: i32,
}

impl ScopedRecord for SupplierPosition {
    type Row = ProjectSupplier;
}

/// Free-form key/value setting of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSetting {
    pub project_id: ProjectId,
    pub key: String,
    pub value: String,
}

impl ScopedRow for ProjectSetting {
    const TABLE: &'static str = "project_settings";
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProjectSetting {
    pub key: String,
    pub value: String,
}

impl ScopedRecord for NewProjectSetting {
    type Row = ProjectSetting;
}

/// A file uploaded for a supplier of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: String,
    pub project_id: ProjectId,
    pub supplier_id: Option<String>,
    pub file_url: String,
    pub file_name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl ScopedRow for UploadedDocument {
    const TABLE: &'static str = "uploaded_documents";
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUploadedDocument {
    pub supplier_id: Option<String>,
    pub file_url: String,
    pub file_name: String,
    pub note: String,
    pub created_by: Option<String>,
}

impl ScopedRecord for NewUploadedDocument {
    type Row = UploadedDocument;
}

/// Status of a project invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

/// An invitation to join one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInvitation {
    pub id: String,
    pub project_id: ProjectId,
    pub email: String,
    pub role: ProjectRole,
    pub token: String,
    pub status: InvitationStatus,
    #[serde(default)]
    pub invited_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ScopedRow for ProjectInvitation {
    const TABLE: &'static str = "project_invitations";
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProjectInvitation {
    pub email: String,
    pub role: ProjectRole,
    pub invited_by: Option<String>,
}

impl ScopedRecord for NewProjectInvitation {
    type Row = ProjectInvitation;
}

/// Per-supplier money totals within a project
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierSummary {
    pub supplier_id: String,
    pub total_expenses: f64,
    pub paid_expenses: f64,
    pub deposits: f64,
}

impl SupplierSummary {
    /// Compute totals for `supplier_id` from rows of one project.
    /// Soft-deleted rows are ignored.
    pub fn compute(supplier_id: &str, expenses: &[Expense], deposits: &[Deposit]) -> Self {
        let mine = |id: &Option<String>| id.as_deref() == Some(supplier_id);

        let live_expenses = expenses
            .iter()
            .filter(|e| e.deleted_at.is_none() && mine(&e.supplier_id));
        let (total_expenses, paid_expenses) = live_expenses.fold((0.0, 0.0), |(total, paid), e| {
            let paid_part = if e.status == ExpenseStatus::Paid { e.price } else { 0.0 };
            (total + e.price, paid + paid_part)
        });

        let deposits = deposits
            .iter()
            .filter(|d| d.deleted_at.is_none() && mine(&d.supplier_id))
            .map(|d| d.amount)
            .sum();

        Self {
            supplier_id: supplier_id.to_string(),
            total_expenses,
            paid_expenses,
            deposits,
        }
    }

    /// Amount still owed to the supplier
    pub fn balance(&self) -> f64 {
        self.total_expenses - self.deposits
    }
}
