//! # Posting Commands
//!
//! Reads a JSON draft, posts it and reports the invoice number.
//!
//! ## Draft Format
//! ```json
//! {
//!   "invoice_date": "2024-03-02",
//!   "counterparty": { "name": "Ali Traders" },
//!   "paid_cents": 30000,
//!   "lines": [
//!     { "item": { "name": "House Wire", "brand": "Fast" }, "quantity": 5, "unit_price_cents": 10000 }
//!   ]
//! }
//! ```
//! Returns may name their original document by number with `--against`
//! instead of carrying `original_invoice_id`.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use cable_core::{DocumentKind, InvoiceDraft, ProductionDraft, ValidationError};
use cable_db::Database;

use super::{CommandOutcome, CommandResult};
use crate::error::{ApiError, ErrorCode};

/// Posts a non-production document.
pub async fn post(
    db: &Database,
    kind: DocumentKind,
    draft_path: &Path,
    against: Option<&str>,
) -> CommandResult<CommandOutcome> {
    debug!(kind = %kind, path = %draft_path.display(), "post command");

    let mut draft: InvoiceDraft = read_draft(draft_path)?;
    if let Some(number) = against {
        let original_kind = kind.returns_against().ok_or_else(|| {
            ApiError::from(ValidationError::NotAllowed {
                field: "original invoice".to_string(),
                document: kind.label().to_string(),
            })
        })?;
        let header = db
            .ledger()
            .invoice_by_number(original_kind, number)
            .await?
            .ok_or_else(|| {
                ApiError::new(
                    ErrorCode::ReferenceNotFound,
                    format!("{} not found: {}", original_kind.label(), number),
                )
            })?;
        draft.original_invoice_id = Some(header.id);
    }

    let posted = db.ledger().create_invoice(kind, &draft).await?;
    Ok(CommandOutcome::posted(&posted))
}

/// Posts a production run.
pub async fn post_production(db: &Database, draft_path: &Path) -> CommandResult<CommandOutcome> {
    debug!(path = %draft_path.display(), "post-production command");

    let draft: ProductionDraft = read_draft(draft_path)?;
    let posted = db.ledger().create_production_invoice(&draft).await?;
    Ok(CommandOutcome::posted(&posted))
}

fn read_draft<T: DeserializeOwned>(path: &Path) -> CommandResult<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ApiError::validation(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| ApiError::validation(format!("invalid draft {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cable_db::DbConfig;
    use serde_json::json;
    use std::path::PathBuf;

    async fn store() -> Database {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let maker = catalog.add_manufacturer("Fast Cables Ltd", None).await.unwrap();
        catalog.add_brand("Fast", &maker).await.unwrap();
        catalog
            .add_customer(&cable_core::NewParty::named("Ali Traders"))
            .await
            .unwrap();
        db
    }

    fn write(dir: &tempfile::TempDir, name: &str, value: serde_json::Value) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn production(qty: i64) -> serde_json::Value {
        json!({
            "invoice_date": "2024-03-01",
            "outputs": [
                { "item": { "name": "House Wire", "brand": "Fast" }, "quantity": qty, "unit_price_cents": 1500 }
            ]
        })
    }

    fn sale(qty: i64) -> serde_json::Value {
        json!({
            "invoice_date": "2024-03-02",
            "counterparty": { "name": "Ali Traders" },
            "lines": [
                { "item": { "name": "House Wire", "brand": "Fast" }, "quantity": qty, "unit_price_cents": 2000 }
            ]
        })
    }

    #[tokio::test]
    async fn test_post_sale_and_return_by_number() {
        let db = store().await;
        let dir = tempfile::tempdir().unwrap();

        let made = post_production(&db, &write(&dir, "run.json", production(10))).await.unwrap();
        assert_eq!(made.invoice_number.as_deref(), Some("PRD-000001"));

        let sold = post(&db, DocumentKind::Sales, &write(&dir, "sale.json", sale(3)), None)
            .await
            .unwrap();
        assert!(sold.ok);
        assert_eq!(sold.invoice_number.as_deref(), Some("SIN-000001"));

        let returned = post(
            &db,
            DocumentKind::SalesReturn,
            &write(&dir, "return.json", sale(1)),
            Some("SIN-000001"),
        )
        .await
        .unwrap();
        assert_eq!(returned.invoice_number.as_deref(), Some("SRI-000001"));

        let items = db.catalog().stock_items(cable_core::StockKind::Production).await.unwrap();
        assert_eq!(items[0].quantity, 8);
    }

    #[tokio::test]
    async fn test_oversold_sale_reports_shortfall() {
        let db = store().await;
        let dir = tempfile::tempdir().unwrap();
        post_production(&db, &write(&dir, "run.json", production(5))).await.unwrap();

        let err = post(&db, DocumentKind::Sales, &write(&dir, "sale.json", sale(10)), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("short by 5"));
    }

    #[tokio::test]
    async fn test_against_requires_return_kind() {
        let db = store().await;
        let dir = tempfile::tempdir().unwrap();

        let err = post(&db, DocumentKind::Sales, &write(&dir, "sale.json", sale(1)), Some("SIN-000001"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = post(
            &db,
            DocumentKind::SalesReturn,
            &write(&dir, "return.json", sale(1)),
            Some("SIN-000009"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ReferenceNotFound);
    }

    #[tokio::test]
    async fn test_unreadable_draft() {
        let db = store().await;
        let dir = tempfile::tempdir().unwrap();

        let missing = post(&db, DocumentKind::Sales, &dir.path().join("nope.json"), None)
            .await
            .unwrap_err();
        assert_eq!(missing.code, ErrorCode::ValidationError);

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ \"lines\": 3 }").unwrap();
        let bad = post(&db, DocumentKind::Sales, &path, None).await.unwrap_err();
        assert!(bad.message.starts_with("invalid draft"));
    }
}
