//! # Catalog Commands
//!
//! Master data is referenced by name on the command line and resolved to
//! ids here.

use clap::Subcommand;
use serde_json::json;

use cable_core::{NewParty, NewStockItem, StockKind};
use cable_db::{CatalogEntity, Database};

use super::{catalog_id, parse_amount, to_json, CommandOutcome, CommandResult};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    AddProvince { name: String },

    AddDistrict { province: String, name: String },

    AddTehsil { district: String, name: String },

    AddCategory { name: String },

    AddUnit { name: String },

    AddManufacturer {
        name: String,
        #[arg(long)]
        tehsil: Option<String>,
    },

    AddBrand { name: String, manufacturer: String },

    AddCustomer {
        name: String,
        #[command(flatten)]
        contact: Contact,
    },

    AddSupplier {
        name: String,
        #[command(flatten)]
        contact: Contact,
    },

    AddBank {
        name: String,
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        branch: Option<String>,
    },

    /// Register a stock item with zero quantity
    AddItem {
        kind: StockKind,
        name: String,
        brand: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        unit: Option<String>,
        /// Starting unit cost in rupees
        #[arg(long, value_parser = parse_amount, default_value = "0")]
        unit_cost: i64,
        /// Sale price in rupees (production items)
        #[arg(long, value_parser = parse_amount)]
        sale_price: Option<i64>,
    },

    /// Set the sale price of a production item
    SetPrice {
        name: String,
        brand: String,
        #[arg(value_parser = parse_amount)]
        price: i64,
    },

    /// List stock items of a kind
    Items { kind: StockKind },
}

#[derive(Debug, clap::Args)]
pub struct Contact {
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub tehsil: Option<String>,
}

pub async fn run(db: &Database, command: CatalogCommand) -> CommandResult<serde_json::Value> {
    let catalog = db.catalog();

    let (entity, id) = match command {
        CatalogCommand::AddProvince { name } => ("province", catalog.add_province(&name).await?),
        CatalogCommand::AddDistrict { province, name } => {
            let province_id = catalog_id(db, CatalogEntity::Province, &province).await?;
            ("district", catalog.add_district(&province_id, &name).await?)
        }
        CatalogCommand::AddTehsil { district, name } => {
            let district_id = catalog_id(db, CatalogEntity::District, &district).await?;
            ("tehsil", catalog.add_tehsil(&district_id, &name).await?)
        }
        CatalogCommand::AddCategory { name } => ("category", catalog.add_category(&name).await?),
        CatalogCommand::AddUnit { name } => ("unit", catalog.add_unit(&name).await?),
        CatalogCommand::AddManufacturer { name, tehsil } => {
            let tehsil_id = optional_id(db, CatalogEntity::Tehsil, tehsil.as_deref()).await?;
            ("manufacturer", catalog.add_manufacturer(&name, tehsil_id.as_deref()).await?)
        }
        CatalogCommand::AddBrand { name, manufacturer } => {
            let manufacturer_id = catalog_id(db, CatalogEntity::Manufacturer, &manufacturer).await?;
            ("brand", catalog.add_brand(&name, &manufacturer_id).await?)
        }
        CatalogCommand::AddCustomer { name, contact } => {
            let party = party(db, name, contact).await?;
            ("customer", catalog.add_customer(&party).await?)
        }
        CatalogCommand::AddSupplier { name, contact } => {
            let party = party(db, name, contact).await?;
            ("supplier", catalog.add_supplier(&party).await?)
        }
        CatalogCommand::AddBank { name, account, branch } => (
            "bank",
            catalog.add_bank(&name, account.as_deref(), branch.as_deref()).await?,
        ),
        CatalogCommand::AddItem {
            kind,
            name,
            brand,
            category,
            unit,
            unit_cost,
            sale_price,
        } => {
            let mut item = NewStockItem::new(name, catalog_id(db, CatalogEntity::Brand, &brand).await?)
                .with_unit_cost(unit_cost);
            item.category_id = optional_id(db, CatalogEntity::Category, category.as_deref()).await?;
            item.unit_id = optional_id(db, CatalogEntity::Unit, unit.as_deref()).await?;
            if let Some(price) = sale_price {
                item = item.with_sale_price(price);
            }
            let created = catalog.add_stock_item(kind, &item).await?;
            return to_json(&created);
        }
        CatalogCommand::SetPrice { name, brand, price } => {
            let stock_id = catalog
                .find_stock_id(StockKind::Production, &name, &brand)
                .await?
                .ok_or_else(|| {
                    ApiError::not_found(StockKind::Production.label(), &format!("{} ({})", name, brand))
                })?;
            catalog.set_sale_price(&stock_id, price).await?;
            return to_json(&CommandOutcome::success(format!("sale price of {} set", name)));
        }
        CatalogCommand::Items { kind } => return to_json(&catalog.stock_items(kind).await?),
    };

    Ok(json!({ "ok": true, "entity": entity, "id": id }))
}

async fn optional_id(db: &Database, entity: CatalogEntity, name: Option<&str>) -> CommandResult<Option<String>> {
    match name {
        Some(name) => Ok(Some(catalog_id(db, entity, name).await?)),
        None => Ok(None),
    }
}

async fn party(db: &Database, name: String, contact: Contact) -> CommandResult<NewParty> {
    Ok(NewParty {
        name,
        phone: contact.phone,
        address: contact.address,
        tehsil_id: optional_id(db, CatalogEntity::Tehsil, contact.tehsil.as_deref()).await?,
    })
}
