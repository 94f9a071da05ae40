use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PartyType;
use crate::error::{AgriError, Result};
use crate::form::InvoiceForm;

/// Everything recorded in state.toml
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct State {
    #[serde(default)]
    pub counter: Counter,
    #[serde(default)]
    pub forms: Vec<InvoiceForm>,
    #[serde(default)]
    pub commission_invoices: Vec<CommissionInvoice>,
    #[serde(default)]
    pub payments: Vec<PaymentEntry>,
}

impl State {
    pub fn form(&self, id: &str) -> Result<&InvoiceForm> {
        self.forms
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| AgriError::FormNotFound(id.to_string()))
    }

    pub fn form_mut(&mut self, id: &str) -> Result<&mut InvoiceForm> {
        self.forms
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| AgriError::FormNotFound(id.to_string()))
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Counter {
    #[serde(default)]
    pub forms: Sequence,
    #[serde(default)]
    pub commissions: Sequence,
    #[serde(default)]
    pub payments: Sequence,
}

/// Yearly numbering sequence
#[derive(Debug, Deserialize, Serialize)]
pub struct Sequence {
    pub last_number: u32,
    pub last_year: u32,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            last_number: 0,
            last_year: chrono::Utc::now().year() as u32,
        }
    }
}

impl Sequence {
    /// Next number for `year`; restarts at 1 in a new year
    pub fn advance(&mut self, year: u32) -> u32 {
        let next = if self.last_year == year {
            self.last_number + 1
        } else {
            1
        };
        self.last_number = next;
        self.last_year = year;
        next
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommissionInvoice {
    pub number: String,
    pub party_type: PartyType,
    pub party: String,
    pub posting_date: NaiveDate,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Invoice forms this commission was collected from
    pub sources: Vec<String>,
    #[serde(default)]
    pub cancelled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum PaymentType {
    Receive,
    Pay,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentType::Receive => "Receive",
            PaymentType::Pay => "Pay",
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PaymentEntry {
    pub id: String,
    pub party_type: PartyType,
    pub party: String,
    pub posting_date: NaiveDate,
    pub mode_of_payment: String,
    pub payment_type: PaymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub paid_amount: f64,
}

use chrono::Datelike;
