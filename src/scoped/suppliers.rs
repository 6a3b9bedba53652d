//! Suppliers attached to the current project

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;

use super::{Scope, Scoped, ScopedRow, ScopedStore};
use crate::error::{Error, Result, UNIQUE_VIOLATION};
use crate::models::{
    Deposit, Expense, NewProjectSupplier, NewSupplier, ProjectSupplier, Supplier,
    SupplierPosition, SupplierSummary, SUPPLIERS_TABLE,
};

#[derive(Serialize)]
struct Archive {
    deleted_at: Option<DateTime<Utc>>,
}

impl ScopedStore {
    /// Whole supplier catalogue, shared by every project
    pub async fn catalogue(&self) -> Result<Vec<Supplier>> {
        let scope = self.scope().await?;
        let query = self
            .client()
            .from(SUPPLIERS_TABLE)
            .with_auth(&scope.token)
            .select("*")
            .is_null("deleted_at");
        scope.run(query.execute::<Supplier>()).await
    }

    /// Add a supplier to the catalogue if missing and link it to the
    /// current project
    pub async fn create_supplier(&self, name: &str, color: Option<&str>) -> Result<Supplier> {
        let scope = self.scope().await?;
        let supplier = NewSupplier::new(name, color);
        let query = self.client().from(SUPPLIERS_TABLE).with_auth(&scope.token);
        let rows = scope
            .run(query.upsert::<_, Supplier>(&[&supplier], "id"))
            .await?;

        self.link_in(&scope, &supplier.id).await?;

        Ok(rows.into_iter().next().unwrap_or(Supplier {
            id: supplier.id,
            name: supplier.name,
            color: supplier.color,
            description: None,
            notes: None,
            deleted_at: None,
        }))
    }

    /// Link a catalogue supplier to the current project. Linking twice
    /// is not an error.
    pub async fn link_supplier(&self, supplier_id: &str) -> Result<()> {
        let scope = self.scope().await?;
        self.link_in(&scope, supplier_id).await
    }

    async fn link_in(&self, scope: &Scope, supplier_id: &str) -> Result<()> {
        let link = NewProjectSupplier {
            supplier_id: supplier_id.to_string(),
        };
        match self.insert_in(scope, link).await {
            Ok(_) => {
                info!("linked {} to project {}", supplier_id, scope.project.id);
                Ok(())
            }
            Err(err) if err.has_code(UNIQUE_VIOLATION) => {
                debug!("{} already linked to project {}", supplier_id, scope.project.id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Live supplier links of the current project
    pub async fn project_suppliers(&self) -> Result<Vec<ProjectSupplier>> {
        self.list::<ProjectSupplier>().await
    }

    /// Ids of suppliers archived from the current project
    pub async fn archived_suppliers(&self) -> Result<Vec<String>> {
        let scope = self.scope().await?;
        let query = self
            .table(&scope, ProjectSupplier::TABLE)
            .not_null("deleted_at");
        let rows = scope.run(query.execute::<ProjectSupplier>()).await?;
        Ok(rows.into_iter().map(|row| row.supplier_id).collect())
    }

    /// Hide a supplier from the current project along with its expenses
    /// and deposits there
    pub async fn archive_supplier(&self, supplier_id: &str) -> Result<()> {
        let scope = self.scope().await?;
        self.set_archived(&scope, supplier_id, Some(Utc::now())).await?;
        info!("archived {} from project {}", supplier_id, scope.project.id);
        Ok(())
    }

    /// Undo [`archive_supplier`](Self::archive_supplier)
    pub async fn restore_supplier(&self, supplier_id: &str) -> Result<()> {
        let scope = self.scope().await?;
        self.set_archived(&scope, supplier_id, None).await?;
        info!("restored {} to project {}", supplier_id, scope.project.id);
        Ok(())
    }

    async fn set_archived(
        &self,
        scope: &Scope,
        supplier_id: &str,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let change = Archive { deleted_at };
        for table in [ProjectSupplier::TABLE, Expense::TABLE, Deposit::TABLE] {
            let query = self.table(scope, table).eq("supplier_id", supplier_id);
            scope.run(query.update_minimal(&change)).await?;
        }
        Ok(())
    }

    /// Store the display order of the project's suppliers.
    ///
    /// Only suppliers already linked to the project are reordered; other
    /// ids are ignored rather than linked.
    pub async fn reorder_suppliers(&self, supplier_ids: &[String]) -> Result<()> {
        let scope = self.scope().await?;
        let linked: HashSet<String> = self
            .list_in::<ProjectSupplier>(&scope)
            .await?
            .into_iter()
            .map(|link| link.supplier_id)
            .collect();

        let mut positions = Vec::with_capacity(supplier_ids.len());
        for id in supplier_ids {
            if !linked.contains(id) {
                warn!("{} is not linked to project {}, not reordered", id, scope.project.id);
                continue;
            }
            let sort_order = i32::try_from(positions.len()).map_err(|_| {
                Error::general(format!("too many suppliers to order: {}", supplier_ids.len()))
            })?;
            positions.push(Scoped::new(
                scope.project.id.clone(),
                SupplierPosition {
                    supplier_id: id.clone(),
                    sort_order,
                },
            ));
        }

        if positions.is_empty() {
            return Ok(());
        }

        let query = self
            .client()
            .from(ProjectSupplier::TABLE)
            .with_auth(&scope.token);
        scope
            .run(query.upsert::<_, ProjectSupplier>(&positions, "project_id,supplier_id"))
            .await?;
        Ok(())
    }

    /// Money totals for one supplier in the current project
    pub async fn supplier_summary(&self, supplier_id: &str) -> Result<SupplierSummary> {
        let scope = self.scope().await?;
        let expenses = self.list_in::<Expense>(&scope).await?;
        let deposits = self.list_in::<Deposit>(&scope).await?;
        Ok(SupplierSummary::compute(supplier_id, &expenses, &deposits))
    }
}
