//! # Catalog Repository
//!
//! Master data: locations, categories, manufacturers, brands, units,
//! parties, banks and stock items.
//!
//! ## Hierarchy
//! ```text
//! Province ──► District ──► Tehsil ◄── Manufacturer ◄── Brand ◄── StockItem
//!                              ▲                                     │
//!                              └──── Customer / Supplier             ├── Category
//!                                                                    └── Unit
//! ```
//!
//! Names are unique per table (per parent for districts and tehsils);
//! a clash surfaces as [`DbError::UniqueViolation`].
//!
//! The free functions at the bottom take a `&mut SqliteConnection` so the
//! ledger can resolve names inside its own transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use cable_core::validation::{validate_amount_cents, validate_name};
use cable_core::{CounterpartyRole, NewParty, NewStockItem, PartyRef, StockItem, StockKind, StockRef};

use crate::error::{DbError, DbResult};

/// Catalog tables that can be looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEntity {
    Province,
    District,
    Tehsil,
    Category,
    Manufacturer,
    Brand,
    Unit,
    Customer,
    Supplier,
    Bank,
}

impl CatalogEntity {
    pub const fn table(&self) -> &'static str {
        match self {
            CatalogEntity::Province => "provinces",
            CatalogEntity::District => "districts",
            CatalogEntity::Tehsil => "tehsils",
            CatalogEntity::Category => "categories",
            CatalogEntity::Manufacturer => "manufacturers",
            CatalogEntity::Brand => "brands",
            CatalogEntity::Unit => "units",
            CatalogEntity::Customer => "customers",
            CatalogEntity::Supplier => "suppliers",
            CatalogEntity::Bank => "banks",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            CatalogEntity::Province => "province",
            CatalogEntity::District => "district",
            CatalogEntity::Tehsil => "tehsil",
            CatalogEntity::Category => "category",
            CatalogEntity::Manufacturer => "manufacturer",
            CatalogEntity::Brand => "brand",
            CatalogEntity::Unit => "unit",
            CatalogEntity::Customer => "customer",
            CatalogEntity::Supplier => "supplier",
            CatalogEntity::Bank => "bank",
        }
    }
}

impl From<CounterpartyRole> for CatalogEntity {
    fn from(role: CounterpartyRole) -> Self {
        match role {
            CounterpartyRole::Supplier => CatalogEntity::Supplier,
            CounterpartyRole::Customer => CatalogEntity::Customer,
        }
    }
}

/// Repository for master data.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Locations
    // =========================================================================

    pub async fn add_province(&self, name: &str) -> DbResult<String> {
        self.insert_named(CatalogEntity::Province, name).await
    }

    pub async fn add_district(&self, province_id: &str, name: &str) -> DbResult<String> {
        self.insert_child(CatalogEntity::District, "province_id", province_id, name)
            .await
    }

    pub async fn add_tehsil(&self, district_id: &str, name: &str) -> DbResult<String> {
        self.insert_child(CatalogEntity::Tehsil, "district_id", district_id, name)
            .await
    }

    // =========================================================================
    // Products Side
    // =========================================================================

    pub async fn add_category(&self, name: &str) -> DbResult<String> {
        self.insert_named(CatalogEntity::Category, name).await
    }

    pub async fn add_unit(&self, name: &str) -> DbResult<String> {
        self.insert_named(CatalogEntity::Unit, name).await
    }

    /// Registers a manufacturer, optionally located in a tehsil.
    pub async fn add_manufacturer(&self, name: &str, tehsil_id: Option<&str>) -> DbResult<String> {
        validate_name("manufacturer", name).map_err(cable_core::CoreError::from)?;
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO manufacturers (id, name, tehsil_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&id)
        .bind(name.trim())
        .bind(tehsil_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(id = %id, name = %name, "Manufacturer added");
        Ok(id)
    }

    /// Registers a brand under its manufacturer.
    pub async fn add_brand(&self, name: &str, manufacturer_id: &str) -> DbResult<String> {
        self.insert_child(CatalogEntity::Brand, "manufacturer_id", manufacturer_id, name)
            .await
    }

    // =========================================================================
    // Parties and Banks
    // =========================================================================

    pub async fn add_customer(&self, party: &NewParty) -> DbResult<String> {
        self.insert_party(CatalogEntity::Customer, party).await
    }

    pub async fn add_supplier(&self, party: &NewParty) -> DbResult<String> {
        self.insert_party(CatalogEntity::Supplier, party).await
    }

    pub async fn add_bank(
        &self,
        name: &str,
        account_number: Option<&str>,
        branch: Option<&str>,
    ) -> DbResult<String> {
        validate_name("bank", name).map_err(cable_core::CoreError::from)?;
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO banks (id, name, account_number, branch, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(name.trim())
        .bind(account_number)
        .bind(branch)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(id = %id, name = %name, "Bank added");
        Ok(id)
    }

    // =========================================================================
    // Stock Items
    // =========================================================================

    /// Registers a stock item with quantity 0.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let copper = db.catalog()
    ///     .add_stock_item(StockKind::Raw, &NewStockItem::new("Copper 10mm", &brand_id).with_unit_cost(100))
    ///     .await?;
    /// assert_eq!(copper.quantity, 0);
    /// ```
    pub async fn add_stock_item(&self, kind: StockKind, item: &NewStockItem) -> DbResult<StockItem> {
        let mut conn = self.pool.acquire().await?;
        insert_stock_item(&mut conn, kind, item).await
    }

    /// Gets a stock item by ID.
    pub async fn stock_item(&self, kind: StockKind, id: &str) -> DbResult<Option<StockItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_stock_item(&mut conn, kind, id).await
    }

    /// Lists all stock items of a kind, ordered by name.
    pub async fn stock_items(&self, kind: StockKind) -> DbResult<Vec<StockItem>> {
        let sql = format!("SELECT {STOCK_COLUMNS} FROM {} ORDER BY name", kind.table());
        let items: Vec<StockItem> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(items)
    }

    /// Looks up a catalog row id by its name.
    pub async fn find_id(&self, entity: CatalogEntity, name: &str) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        find_id_by_name(&mut conn, entity, name).await
    }

    /// Looks up a stock item id by item name and brand name.
    pub async fn find_stock_id(
        &self,
        kind: StockKind,
        name: &str,
        brand: &str,
    ) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        find_stock_by_name(&mut conn, kind, name, brand).await
    }

    /// Sets the sale price of a production item.
    pub async fn set_sale_price(&self, stock_id: &str, sale_price_cents: i64) -> DbResult<()> {
        validate_amount_cents("sale price", sale_price_cents).map_err(cable_core::CoreError::from)?;

        let result = sqlx::query(
            r#"
            UPDATE production_stock SET
                sale_price_cents = ?2,
                version = version + 1,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(stock_id)
        .bind(sale_price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(StockKind::Production.label(), stock_id));
        }

        debug!(stock_id = %stock_id, sale_price_cents, "Sale price updated");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn insert_named(&self, entity: CatalogEntity, name: &str) -> DbResult<String> {
        validate_name(entity.label(), name).map_err(cable_core::CoreError::from)?;
        let id = Uuid::new_v4().to_string();

        let sql = format!(
            "INSERT INTO {} (id, name, created_at) VALUES (?1, ?2, ?3)",
            entity.table()
        );
        sqlx::query(&sql)
            .bind(&id)
            .bind(name.trim())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        debug!(entity = entity.label(), id = %id, name = %name, "Catalog row added");
        Ok(id)
    }

    async fn insert_child(
        &self,
        entity: CatalogEntity,
        parent_column: &str,
        parent_id: &str,
        name: &str,
    ) -> DbResult<String> {
        validate_name(entity.label(), name).map_err(cable_core::CoreError::from)?;
        let id = Uuid::new_v4().to_string();

        let sql = format!(
            "INSERT INTO {} (id, {}, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            entity.table(),
            parent_column
        );
        sqlx::query(&sql)
            .bind(&id)
            .bind(parent_id)
            .bind(name.trim())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        debug!(entity = entity.label(), id = %id, parent = %parent_id, "Catalog row added");
        Ok(id)
    }

    async fn insert_party(&self, entity: CatalogEntity, party: &NewParty) -> DbResult<String> {
        validate_name(entity.label(), &party.name).map_err(cable_core::CoreError::from)?;
        let id = Uuid::new_v4().to_string();

        let sql = format!(
            r#"
            INSERT INTO {} (id, name, phone, address, tehsil_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            entity.table()
        );
        sqlx::query(&sql)
            .bind(&id)
            .bind(party.name.trim())
            .bind(&party.phone)
            .bind(&party.address)
            .bind(&party.tehsil_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        debug!(entity = entity.label(), id = %id, name = %party.name, "Party added");
        Ok(id)
    }
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

/// Column list matching [`StockItem`]'s `FromRow` shape.
pub(crate) const STOCK_COLUMNS: &str = "id, name, brand_id, category_id, unit_id, quantity, \
     unit_cost_cents, total_cost_cents, sale_price_cents, version, created_at, updated_at";

pub(crate) async fn find_id_by_name(
    conn: &mut SqliteConnection,
    entity: CatalogEntity,
    name: &str,
) -> DbResult<Option<String>> {
    let sql = format!("SELECT id FROM {} WHERE name = ?1", entity.table());
    let id: Option<String> = sqlx::query_scalar(&sql)
        .bind(name.trim())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id)
}

async fn id_exists(conn: &mut SqliteConnection, table: &str, id: &str) -> DbResult<bool> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?1", table);
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Resolves a supplier/customer reference to its id.
pub(crate) async fn resolve_party(
    conn: &mut SqliteConnection,
    role: CounterpartyRole,
    party: &PartyRef,
) -> DbResult<String> {
    let found = match party {
        PartyRef::Id { id } => id_exists(conn, role.table(), id)
            .await?
            .then(|| id.clone()),
        PartyRef::Name { name } => find_id_by_name(conn, role.into(), name).await?,
    };

    found.ok_or_else(|| DbError::missing_reference(role.label(), party.describe()))
}

/// Resolves a bank id, failing with `ReferenceNotFound`.
pub(crate) async fn require_bank(conn: &mut SqliteConnection, bank_id: &str) -> DbResult<()> {
    if id_exists(conn, CatalogEntity::Bank.table(), bank_id).await? {
        Ok(())
    } else {
        Err(DbError::missing_reference("bank", bank_id))
    }
}

pub(crate) async fn find_stock_by_name(
    conn: &mut SqliteConnection,
    kind: StockKind,
    name: &str,
    brand: &str,
) -> DbResult<Option<String>> {
    let sql = format!(
        r#"
        SELECT s.id
        FROM {} s
        JOIN brands b ON b.id = s.brand_id
        WHERE s.name = ?1 AND b.name = ?2
        "#,
        kind.table()
    );
    let id: Option<String> = sqlx::query_scalar(&sql)
        .bind(name.trim())
        .bind(brand.trim())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id)
}

pub(crate) async fn fetch_stock_item(
    conn: &mut SqliteConnection,
    kind: StockKind,
    id: &str,
) -> DbResult<Option<StockItem>> {
    let sql = format!("SELECT {STOCK_COLUMNS} FROM {} WHERE id = ?1", kind.table());
    let item: Option<StockItem> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

/// Resolves a stock reference to an existing row.
///
/// With `create_missing`, an unknown `(name, brand)` becomes a new row with
/// quantity 0 as long as the brand exists.
pub(crate) async fn resolve_stock(
    conn: &mut SqliteConnection,
    kind: StockKind,
    item: &StockRef,
    create_missing: bool,
) -> DbResult<StockItem> {
    match item {
        StockRef::Id { id } => fetch_stock_item(conn, kind, id)
            .await?
            .ok_or_else(|| DbError::missing_reference(kind.label(), id.clone())),

        StockRef::Named { name, brand } => {
            if let Some(id) = find_stock_by_name(conn, kind, name, brand).await? {
                return fetch_stock_item(conn, kind, &id)
                    .await?
                    .ok_or_else(|| DbError::missing_reference(kind.label(), item.describe()));
            }

            if !create_missing {
                return Err(DbError::missing_reference(kind.label(), item.describe()));
            }

            let brand_id = find_id_by_name(conn, CatalogEntity::Brand, brand)
                .await?
                .ok_or_else(|| DbError::missing_reference("brand", brand.clone()))?;

            insert_stock_item(conn, kind, &NewStockItem::new(name.trim(), brand_id)).await
        }
    }
}

pub(crate) async fn insert_stock_item(
    conn: &mut SqliteConnection,
    kind: StockKind,
    item: &NewStockItem,
) -> DbResult<StockItem> {
    validate_name(kind.label(), &item.name).map_err(cable_core::CoreError::from)?;
    validate_amount_cents("unit cost", item.unit_cost_cents).map_err(cable_core::CoreError::from)?;
    if let Some(price) = item.sale_price_cents {
        validate_amount_cents("sale price", price).map_err(cable_core::CoreError::from)?;
    }

    // raw material is never sold directly
    let sale_price = match kind {
        StockKind::Raw => None,
        StockKind::Production => item.sale_price_cents,
    };

    let now = Utc::now();
    let stock = StockItem {
        id: Uuid::new_v4().to_string(),
        name: item.name.trim().to_string(),
        brand_id: item.brand_id.clone(),
        category_id: item.category_id.clone(),
        unit_id: item.unit_id.clone(),
        quantity: 0,
        unit_cost_cents: item.unit_cost_cents,
        total_cost_cents: 0,
        sale_price_cents: sale_price,
        version: 0,
        created_at: now,
        updated_at: now,
    };

    let sql = format!(
        r#"
        INSERT INTO {} (
            id, name, brand_id, category_id, unit_id,
            quantity, unit_cost_cents, total_cost_cents, sale_price_cents,
            version, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12
        )
        "#,
        kind.table()
    );
    sqlx::query(&sql)
        .bind(&stock.id)
        .bind(&stock.name)
        .bind(&stock.brand_id)
        .bind(&stock.category_id)
        .bind(&stock.unit_id)
        .bind(stock.quantity)
        .bind(stock.unit_cost_cents)
        .bind(stock.total_cost_cents)
        .bind(stock.sale_price_cents)
        .bind(stock.version)
        .bind(stock.created_at)
        .bind(stock.updated_at)
        .execute(&mut *conn)
        .await?;

    debug!(kind = kind.table(), id = %stock.id, name = %stock.name, "Stock item registered");
    Ok(stock)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> (Database, String) {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let maker = db.catalog().add_manufacturer("Fast Group", None).await.unwrap();
        let brand = db.catalog().add_brand("Fast", &maker).await.unwrap();
        (db, brand)
    }

    #[tokio::test]
    async fn test_location_hierarchy() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        let punjab = catalog.add_province("Punjab").await.unwrap();
        let lahore = catalog.add_district(&punjab, "Lahore").await.unwrap();
        let tehsil = catalog.add_tehsil(&lahore, "Model Town").await.unwrap();

        let maker = catalog.add_manufacturer("Pak Cables", Some(&tehsil)).await.unwrap();
        assert_eq!(
            catalog.find_id(CatalogEntity::Manufacturer, "Pak Cables").await.unwrap(),
            Some(maker)
        );

        let err = catalog.add_district("no-such-province", "Multan").await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let (db, _) = setup().await;
        db.catalog().add_supplier(&NewParty::named("Punjab Copper")).await.unwrap();

        let err = db
            .catalog()
            .add_supplier(&NewParty::named("Punjab Copper"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_stock_item_starts_empty() {
        let (db, brand) = setup().await;

        let item = db
            .catalog()
            .add_stock_item(StockKind::Raw, &NewStockItem::new("Copper 10mm", &brand).with_unit_cost(100))
            .await
            .unwrap();
        assert_eq!(item.quantity, 0);
        assert_eq!(item.unit_cost_cents, 100);
        assert_eq!(item.total_cost_cents, 0);

        let found = db
            .catalog()
            .find_stock_id(StockKind::Raw, "Copper 10mm", "Fast")
            .await
            .unwrap();
        assert_eq!(found, Some(item.id.clone()));

        // same name lives independently in the other family
        assert_eq!(
            db.catalog()
                .find_stock_id(StockKind::Production, "Copper 10mm", "Fast")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_set_sale_price() {
        let (db, brand) = setup().await;
        let wire = db
            .catalog()
            .add_stock_item(StockKind::Production, &NewStockItem::new("House Wire", &brand))
            .await
            .unwrap();

        db.catalog().set_sale_price(&wire.id, 2000).await.unwrap();

        let reloaded = db
            .catalog()
            .stock_item(StockKind::Production, &wire.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.sale_price_cents, Some(2000));
        assert_eq!(reloaded.version, 1);

        assert!(matches!(
            db.catalog().set_sale_price("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_party_by_name_and_id() {
        let (db, _) = setup().await;
        let id = db.catalog().add_customer(&NewParty::named("Ali Traders")).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let by_name = resolve_party(&mut conn, CounterpartyRole::Customer, &PartyRef::name("Ali Traders"))
            .await
            .unwrap();
        assert_eq!(by_name, id);

        let by_id = resolve_party(&mut conn, CounterpartyRole::Customer, &PartyRef::id(id.clone()))
            .await
            .unwrap();
        assert_eq!(by_id, id);

        let missing = resolve_party(&mut conn, CounterpartyRole::Supplier, &PartyRef::name("Ali Traders"))
            .await
            .unwrap_err();
        assert!(matches!(missing, DbError::ReferenceNotFound { .. }));
    }
}
