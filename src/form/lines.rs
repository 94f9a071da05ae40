use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calc::{commission, commission_line_total, line_total};

/// Child tables of an invoice form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Items,
    Commissions,
    PamperCommissions,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Table::Items => "items",
            Table::Commissions => "commissions",
            Table::PamperCommissions => "pamper_commissions",
        })
    }
}

/// Notification that a row's stored values changed and its view is stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refresh {
    pub table: Table,
    pub row: usize,
}

/// Quantity/price line. `total` is always `qty × price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub item_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    pub customer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pamper: Option<String>,
    qty: f64,
    price: f64,
    total: f64,
    /// Already rolled into a customer or pamper commission invoice
    #[serde(default)]
    pub has_commission_invoice: bool,
}

impl InvoiceLineItem {
    pub fn new(
        item_code: impl Into<String>,
        customer: impl Into<String>,
        pamper: Option<String>,
        qty: Option<f64>,
        price: Option<f64>,
    ) -> Self {
        let mut line = Self {
            item_code: item_code.into(),
            item_name: None,
            customer: customer.into(),
            pamper,
            qty: qty.unwrap_or(0.0),
            price: price.unwrap_or(0.0),
            total: 0.0,
            has_commission_invoice: false,
        };
        line.recalculate();
        line
    }

    pub fn qty(&self) -> f64 {
        self.qty
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn set_qty(&mut self, qty: Option<f64>) {
        self.qty = qty.unwrap_or(0.0);
        self.recalculate();
    }

    pub fn set_price(&mut self, price: Option<f64>) {
        self.price = price.unwrap_or(0.0);
        self.recalculate();
    }

    pub(crate) fn recalculate(&mut self) {
        self.total = line_total(Some(self.qty), Some(self.price));
    }
}

/// Commission row. `commission_total` is always `commission + taxes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionLine {
    pub item: String,
    commission: f64,
    taxes: f64,
    commission_total: f64,
}

impl CommissionLine {
    pub fn new(item: impl Into<String>, commission: Option<f64>, taxes: Option<f64>) -> Self {
        let mut line = Self {
            item: item.into(),
            commission: commission.unwrap_or(0.0),
            taxes: taxes.unwrap_or(0.0),
            commission_total: 0.0,
        };
        line.recalculate();
        line
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn taxes(&self) -> f64 {
        self.taxes
    }

    pub fn commission_total(&self) -> f64 {
        self.commission_total
    }

    pub fn set_commission(&mut self, commission: Option<f64>) {
        self.commission = commission.unwrap_or(0.0);
        self.recalculate();
    }

    pub fn set_taxes(&mut self, taxes: Option<f64>) {
        self.taxes = taxes.unwrap_or(0.0);
        self.recalculate();
    }

    pub(crate) fn recalculate(&mut self) {
        self.commission_total = commission_line_total(Some(self.commission), Some(self.taxes));
    }
}

/// Agent commission row. `commission` is always `price × percentage / 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PamperCommissionLine {
    pub pamper: String,
    price: f64,
    percentage: f64,
    commission: f64,
    #[serde(default)]
    pub has_commission_invoice: bool,
}

impl PamperCommissionLine {
    pub fn new(pamper: impl Into<String>, price: Option<f64>, percentage: Option<f64>) -> Self {
        let mut line = Self {
            pamper: pamper.into(),
            price: price.unwrap_or(0.0),
            percentage: percentage.unwrap_or(0.0),
            commission: 0.0,
            has_commission_invoice: false,
        };
        line.recalculate();
        line
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn set_price(&mut self, price: Option<f64>) {
        self.price = price.unwrap_or(0.0);
        self.recalculate();
    }

    pub fn set_percentage(&mut self, percentage: Option<f64>) {
        self.percentage = percentage.unwrap_or(0.0);
        self.recalculate();
    }

    pub(crate) fn recalculate(&mut self) {
        self.commission = commission(Some(self.price), Some(self.percentage));
    }
}
