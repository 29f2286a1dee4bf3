//! E-commerce entities: one `Transaction` per order, one `Item` per line.
//!
//! Each item is sent as its own beacon after the transaction beacon.

use crate::error::{Error, Result};

/// Amounts go out as decimal text; NaN and infinities have no wire form.
fn check_amount(field: &str, amount: Option<f64>) -> Result<()> {
    match amount {
        Some(v) if !v.is_finite() => Err(Error::validation(format!(
            "{} must be a finite number, got {}",
            field, v
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// Filled in by `Transaction::add_item`.
    pub order_id: Option<String>,
    /// Product code, `utmipc`.
    pub sku: Option<String>,
    pub name: Option<String>,
    /// Category or variation, `utmiva`.
    pub variation: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u32>,
}

impl Item {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            order_id: None,
            sku: Some(sku.into()),
            name: Some(name.into()),
            variation: None,
            price: Some(price),
            quantity: Some(quantity),
        }
    }

    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.variation = Some(variation.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.sku.is_none() {
            missing.push("sku");
        }
        if self.name.is_none() {
            missing.push("name");
        }
        if self.price.is_none() {
            missing.push("price");
        }
        if self.quantity.is_none() {
            missing.push("quantity");
        }
        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "Items need to have {} defined.",
                missing.join(", ")
            )));
        }
        check_amount("Item price", self.price)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    pub order_id: Option<String>,
    /// Store or affiliation, `utmtst`.
    pub affiliation: Option<String>,
    pub total: Option<f64>,
    pub tax: Option<f64>,
    pub shipping: Option<f64>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    /// ISO 4217 code, `utmcu`.
    pub currency: Option<String>,
    items: Vec<Item>,
}

impl Transaction {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            ..Default::default()
        }
    }

    pub fn with_total(mut self, total: f64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Change the order id, carrying it over to every item already added.
    pub fn set_order_id(&mut self, order_id: impl Into<String>) {
        let order_id = order_id.into();
        for item in &mut self.items {
            item.order_id = Some(order_id.clone());
        }
        self.order_id = Some(order_id);
    }

    /// Add a line item, stamped with this transaction's order id.
    pub fn add_item(&mut self, mut item: Item) {
        item.order_id = self.order_id.clone();
        self.items.push(item);
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn validate(&self) -> Result<()> {
        if self.order_id.is_none() {
            return Err(Error::validation(
                "Transactions need to have at least an order ID defined.",
            ));
        }
        check_amount("Transaction total", self.total)?;
        check_amount("Transaction tax", self.tax)?;
        check_amount("Transaction shipping", self.shipping)
    }
}
