//! # Ledger Planning
//!
//! Pure, in-memory planning of the stock effect of one document.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One Ledger Operation                                │
//! │                                                                         │
//! │  cable-db loads StockPositions ──┐                                      │
//! │                                  ▼                                      │
//! │  draft lines ──► Movements ──► LedgerPlan::build                        │
//! │                                  │                                      │
//! │                 ┌────────────────┴────────────────┐                     │
//! │                 ▼                                 ▼                     │
//! │     Err(InsufficientStock)              Ok(plan)                        │
//! │     nothing written                     ├── positions (new values)      │
//! │                                         └── line cost snapshots         │
//! │                                                 │                       │
//! │                                                 ▼                       │
//! │                      cable-db writes header, lines, positions          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Costing
//! - Inbound at price (purchase, production output): `total += q * price`
//! - Inbound at average (sales return): `total += q * unit_cost`
//! - Outbound: the proportional share of `total` leaves with the goods;
//!   emptying a row removes its whole cost
//!
//! `unit_cost` is always re-derived from `total / quantity` and kept as-is
//! when quantity reaches zero.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Direction, StockItem, StockKind};

// =============================================================================
// Stock Position
// =============================================================================

/// Quantity and cost of one stock row as seen by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosition {
    pub stock_id: String,
    pub kind: StockKind,
    pub name: String,
    pub quantity: i64,
    pub unit_cost: Money,
    pub total_cost: Money,
    /// Version the row had when it was read.
    pub version: i64,
}

impl StockPosition {
    pub fn from_item(kind: StockKind, item: &StockItem) -> Self {
        StockPosition {
            stock_id: item.id.clone(),
            kind,
            name: item.name.clone(),
            quantity: item.quantity,
            unit_cost: item.unit_cost(),
            total_cost: item.total_cost(),
            version: item.version,
        }
    }

    /// Adds `qty` units worth `cost` in total.
    ///
    /// Fails without touching the position if the row would overflow.
    pub fn receive(&mut self, qty: i64, cost: Money) -> CoreResult<()> {
        let quantity = self.quantity.checked_add(qty).ok_or_else(|| overflow("stock quantity"))?;
        let total_cost = self.total_cost.checked_add(cost).ok_or_else(|| overflow("stock value"))?;
        self.quantity = quantity;
        self.total_cost = total_cost;
        if let Some(avg) = self.total_cost.average_over(self.quantity) {
            self.unit_cost = avg;
        }
        Ok(())
    }

    /// Removes `qty` units and returns the cost that left with them.
    pub fn issue(&mut self, qty: i64) -> CoreResult<Money> {
        if qty > self.quantity {
            return Err(CoreError::InsufficientStock {
                item: self.name.clone(),
                available: self.quantity,
                requested: qty,
            });
        }

        let removed = self.total_cost.proportion(qty, self.quantity);
        self.quantity -= qty;
        self.total_cost -= removed;
        if let Some(avg) = self.total_cost.average_over(self.quantity) {
            self.unit_cost = avg;
        }
        Ok(removed)
    }
}

fn overflow(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Movements
// =============================================================================

/// How an inbound movement is valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Valuation {
    /// At the document's unit price.
    AtPrice(Money),
    /// At the row's current average unit cost.
    AtAverageCost,
}

/// One signed stock change requested by a document line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    pub stock_id: String,
    pub direction: Direction,
    pub quantity: i64,
    pub valuation: Valuation,
}

impl Movement {
    pub fn inbound_at_price(stock_id: impl Into<String>, quantity: i64, price: Money) -> Self {
        Movement {
            stock_id: stock_id.into(),
            direction: Direction::Inbound,
            quantity,
            valuation: Valuation::AtPrice(price),
        }
    }

    pub fn inbound_at_average(stock_id: impl Into<String>, quantity: i64) -> Self {
        Movement {
            stock_id: stock_id.into(),
            direction: Direction::Inbound,
            quantity,
            valuation: Valuation::AtAverageCost,
        }
    }

    pub fn outbound(stock_id: impl Into<String>, quantity: i64) -> Self {
        Movement {
            stock_id: stock_id.into(),
            direction: Direction::Outbound,
            quantity,
            valuation: Valuation::AtAverageCost,
        }
    }
}

// =============================================================================
// Ledger Plan
// =============================================================================

/// The complete, checked stock effect of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPlan {
    /// Touched rows with their new values, in first-touch order.
    pub positions: Vec<StockPosition>,
    /// Unit cost of each movement at posting time, parallel to the input.
    pub line_costs: Vec<Money>,
    /// Total cost each movement added or removed, parallel to the input.
    pub cost_moved: Vec<Money>,
}

impl LedgerPlan {
    /// Plans `movements` against `positions`.
    ///
    /// Outbound quantities are summed per row and checked against on-hand
    /// quantity before anything is applied, so two lines of 3 against a
    /// stock of 5 fail the same way as one line of 6.
    ///
    /// ## Errors
    /// - [`CoreError::InsufficientStock`] naming the first short item
    /// - [`CoreError::UnplannedStock`] when a movement has no position
    pub fn build(positions: Vec<StockPosition>, movements: &[Movement]) -> CoreResult<Self> {
        let mut by_id: HashMap<String, StockPosition> = positions
            .into_iter()
            .map(|p| (p.stock_id.clone(), p))
            .collect();

        let mut order: Vec<String> = Vec::new();
        let mut outbound: HashMap<&str, i64> = HashMap::new();
        for movement in movements {
            if !by_id.contains_key(&movement.stock_id) {
                return Err(CoreError::UnplannedStock {
                    stock_id: movement.stock_id.clone(),
                });
            }
            if !order.contains(&movement.stock_id) {
                order.push(movement.stock_id.clone());
            }
            if movement.direction == Direction::Outbound {
                *outbound.entry(movement.stock_id.as_str()).or_insert(0) += movement.quantity;
            }
        }

        for stock_id in &order {
            let Some(&requested) = outbound.get(stock_id.as_str()) else {
                continue;
            };
            let position = &by_id[stock_id];
            if requested > position.quantity {
                return Err(CoreError::InsufficientStock {
                    item: position.name.clone(),
                    available: position.quantity,
                    requested,
                });
            }
        }

        let mut line_costs = Vec::with_capacity(movements.len());
        let mut cost_moved = Vec::with_capacity(movements.len());
        for movement in movements {
            let position = by_id
                .get_mut(&movement.stock_id)
                .ok_or_else(|| CoreError::UnplannedStock {
                    stock_id: movement.stock_id.clone(),
                })?;

            let (unit, moved) = match (movement.direction, movement.valuation) {
                (Direction::Inbound, Valuation::AtPrice(price)) => {
                    let value = price.multiply_quantity(movement.quantity);
                    position.receive(movement.quantity, value)?;
                    (price, value)
                }
                (Direction::Inbound, Valuation::AtAverageCost) => {
                    let unit = position.unit_cost;
                    let value = unit.multiply_quantity(movement.quantity);
                    position.receive(movement.quantity, value)?;
                    (unit, value)
                }
                (Direction::Outbound, _) => {
                    let unit = position.unit_cost;
                    let removed = position.issue(movement.quantity)?;
                    (unit, removed)
                }
            };
            line_costs.push(unit);
            cost_moved.push(moved);
        }

        let positions = order
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        Ok(LedgerPlan {
            positions,
            line_costs,
            cost_moved,
        })
    }

    /// Quantity a touched row ends up with.
    pub fn quantity_after(&self, stock_id: &str) -> Option<i64> {
        self.positions
            .iter()
            .find(|p| p.stock_id == stock_id)
            .map(|p| p.quantity)
    }
}

// =============================================================================
// Return Allowances
// =============================================================================

/// How much of one item a return may still give back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnAllowance {
    pub stock_id: String,
    pub item: String,
    /// Quantity on the original document.
    pub original: i64,
    /// Quantity already returned against it.
    pub returned: i64,
}

/// One requested return line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnLine {
    pub stock_id: String,
    pub item: String,
    pub quantity: i64,
}

/// Checks a return against what its original document moved.
///
/// Items absent from the original have an allowance of zero.
pub fn check_return_quantities(
    invoice_number: &str,
    allowances: &[ReturnAllowance],
    requested: &[ReturnLine],
) -> CoreResult<()> {
    let mut totals: Vec<(&ReturnLine, i64)> = Vec::new();
    for line in requested {
        match totals.iter_mut().find(|(l, _)| l.stock_id == line.stock_id) {
            Some((_, qty)) => *qty += line.quantity,
            None => totals.push((line, line.quantity)),
        }
    }

    for (line, qty) in totals {
        let (original, returned) = allowances
            .iter()
            .find(|a| a.stock_id == line.stock_id)
            .map(|a| (a.original, a.returned))
            .unwrap_or((0, 0));

        if returned + qty > original {
            return Err(CoreError::ReturnExceedsOriginal {
                item: line.item.clone(),
                invoice: invoice_number.to_string(),
                original,
                returned,
                requested: qty,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
