mod download;

pub use download::Downloader;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::calc::commission;
use crate::config::{PartyCatalog, PartyType, PaymentType, State};
use crate::error::{AgriError, Result};
use crate::form::FormStatus;
use crate::link_filter::PartyFilter;

/// Location of a rendered statement: a local path or a server file URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileReference(pub String);

impl FileReference {
    /// Last path segment, used as the downloaded file's name
    pub fn file_name(&self) -> &str {
        self.0.rsplit(&['/', '\\'][..]).next().unwrap_or(&self.0)
    }
}

/// Server side of the statement page
pub trait ReportBackend {
    /// Render one statement per party and return where they were stored
    fn get_reports(&self, filters: &StatementFilters) -> Result<Vec<FileReference>>;

    /// Copy one rendered statement into `dest_dir`
    fn fetch(&self, file: &FileReference, dest_dir: &Path) -> Result<PathBuf>;
}

/// Statement filters. Only the party type is required; without a party every
/// party offered by the statement picker is included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_type: Option<PartyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<NaiveDate>,
    /// Add the running-balance party summary to each statement
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub detailed: bool,
}

impl StatementFilters {
    fn party_type(&self) -> Result<PartyType> {
        let party_type = self
            .party_type
            .ok_or_else(|| AgriError::MissingFilter(vec!["Party Type".to_string()]))?;
        if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
            if to < from {
                return Err(AgriError::InvalidDateRange);
            }
        }
        Ok(party_type)
    }

    fn in_range(&self, date: NaiveDate) -> bool {
        self.from_date.map_or(true, |d| date >= d) && self.to_date.map_or(true, |d| date <= d)
    }

    fn before_range(&self, date: NaiveDate) -> bool {
        self.from_date.is_some_and(|d| date < d)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementItemRow {
    pub invoice_id: String,
    pub date: NaiveDate,
    pub item_name: String,
    pub qty: f64,
    pub price: f64,
    pub total: f64,
    /// Supplier statements only
    pub commission: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementTotals {
    pub total_qty: f64,
    pub total_before_tax: f64,
    pub total_commission: f64,
    pub taxes: f64,
    /// Commission net of the withheld taxes
    pub commission_after_taxes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementPaymentRow {
    pub payment_id: String,
    pub date: NaiveDate,
    pub mode_of_payment: String,
    pub payment_type: PaymentType,
    pub remarks: Option<String>,
    pub paid_amount: f64,
}

/// One line of the party summary. Opening, closing and total rows carry no
/// reference or date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartySummaryRow {
    pub reference: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub debit: f64,
    pub credit: f64,
    /// Running balance, debit minus credit
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub party_type: PartyType,
    pub party: String,
    pub party_name: String,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub items: Vec<StatementItemRow>,
    pub totals: Option<StatementTotals>,
    pub payments: Vec<StatementPaymentRow>,
    pub payments_total: f64,
    /// Filled for detailed statements only
    pub summary: Vec<PartySummaryRow>,
}

/// Build the statements for every party selected by `filters`.
///
/// Parties without items or payments in range get no statement.
pub fn build_statements(
    state: &State,
    parties: &PartyCatalog,
    filters: &StatementFilters,
    tax_rate: f64,
) -> Result<Vec<Statement>> {
    let party_type = filters.party_type()?;

    let selected: Vec<String> = match filters.party.as_deref().filter(|p| !p.is_empty()) {
        Some(party) => vec![party.to_string()],
        None => parties
            .select(party_type, &PartyFilter::for_statement(party_type))
            .into_iter()
            .map(str::to_string)
            .collect(),
    };

    let mut items: BTreeMap<&str, Vec<StatementItemRow>> = BTreeMap::new();
    let mut earlier: BTreeMap<&str, Vec<StatementItemRow>> = BTreeMap::new();
    let forms = state.forms.iter().filter(|f| {
        f.status() == FormStatus::Submitted
            && (filters.in_range(f.posting_date())
                || (filters.detailed && filters.before_range(f.posting_date())))
    });

    for form in forms {
        for line in form.items() {
            let party = match party_type {
                PartyType::Supplier => form.supplier(),
                PartyType::Customer | PartyType::Pamper => line.customer.as_str(),
            };
            if !selected.iter().any(|p| p == party) {
                continue;
            }

            let supplier_commission = (party_type == PartyType::Supplier).then(|| {
                let percentage = parties.commission_percentage(PartyType::Supplier, party);
                commission(Some(line.total()), percentage)
            });

            let target = if filters.in_range(form.posting_date()) {
                &mut items
            } else {
                &mut earlier
            };
            target.entry(party).or_default().push(StatementItemRow {
                invoice_id: form.id.clone(),
                date: form.posting_date(),
                item_name: line
                    .item_name
                    .clone()
                    .unwrap_or_else(|| line.item_code.clone()),
                qty: line.qty(),
                price: line.price(),
                total: line.total(),
                commission: supplier_commission,
            });
        }
    }

    let mut statements = Vec::new();
    for party in &selected {
        let mut rows = items.remove(party.as_str()).unwrap_or_default();
        // Newest first; stable for rows of the same day
        rows.sort_by(|a, b| b.date.cmp(&a.date));

        let payments: Vec<StatementPaymentRow> = state
            .payments
            .iter()
            .filter(|p| p.party_type == party_type && &p.party == party)
            .filter(|p| filters.in_range(p.posting_date))
            .map(|p| StatementPaymentRow {
                payment_id: p.id.clone(),
                date: p.posting_date,
                mode_of_payment: p.mode_of_payment.clone(),
                payment_type: p.payment_type,
                remarks: p.remarks.clone(),
                paid_amount: p.paid_amount,
            })
            .collect();

        if rows.is_empty() && payments.is_empty() {
            continue;
        }

        let totals = (!rows.is_empty()).then(|| summarize(&rows, party_type, tax_rate));
        let payments_total = payments.iter().map(|p| p.paid_amount).sum();

        let summary = if filters.detailed {
            let earlier_rows = earlier.remove(party.as_str()).unwrap_or_default();
            let earlier_paid: f64 = state
                .payments
                .iter()
                .filter(|p| p.party_type == party_type && &p.party == party)
                .filter(|p| filters.before_range(p.posting_date))
                .map(|p| signed_amount(party_type, p.payment_type, p.paid_amount))
                .sum();
            let opening = Opening::from_history(&earlier_rows, earlier_paid, party_type, tax_rate);
            party_summary(opening, &rows, &payments, party_type, tax_rate)
        } else {
            Vec::new()
        };

        statements.push(Statement {
            party_type,
            party: party.clone(),
            party_name: parties
                .display_name(party_type, party)
                .unwrap_or(party)
                .to_string(),
            from_date: filters.from_date,
            to_date: filters.to_date,
            items: rows,
            totals,
            payments,
            payments_total,
            summary,
        });
    }

    debug!(%party_type, statements = statements.len(), "built statements");
    Ok(statements)
}

fn summarize(rows: &[StatementItemRow], party_type: PartyType, tax_rate: f64) -> StatementTotals {
    let total_qty = rows.iter().map(|r| r.qty).sum();
    let total_before_tax = rows.iter().map(|r| r.total).sum();
    let total_commission: f64 = rows.iter().filter_map(|r| r.commission).sum();

    let taxes = if party_type == PartyType::Supplier {
        commission(Some(total_commission), Some(tax_rate))
    } else {
        0.0
    };

    StatementTotals {
        total_qty,
        total_before_tax,
        total_commission,
        taxes,
        commission_after_taxes: total_commission - taxes,
    }
}

// Payments count towards the party in their natural direction: money paid
// to a supplier, or received from a customer.
fn signed_amount(party_type: PartyType, payment_type: PaymentType, amount: f64) -> f64 {
    match (party_type, payment_type) {
        (PartyType::Supplier, PaymentType::Pay) => amount,
        (PartyType::Supplier, PaymentType::Receive) => -amount,
        (_, PaymentType::Receive) => amount,
        (_, PaymentType::Pay) => -amount,
    }
}

/// Debit and credit carried in from before the statement period
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Opening {
    debit: f64,
    credit: f64,
}

impl Opening {
    // Same bookkeeping as the period rows, collapsed onto one side.
    fn from_history(
        rows: &[StatementItemRow],
        paid: f64,
        party_type: PartyType,
        tax_rate: f64,
    ) -> Self {
        let sales: f64 = rows.iter().map(|r| r.total).sum();
        let mut owed_by_party = paid;
        if party_type == PartyType::Supplier && !rows.is_empty() {
            let totals = summarize(rows, party_type, tax_rate);
            owed_by_party += totals.total_commission + totals.taxes;
        }

        let (debit, credit) = if party_type == PartyType::Supplier {
            (owed_by_party, sales)
        } else {
            (sales, owed_by_party)
        };

        let balance = debit - credit;
        if debit.abs() > credit.abs() {
            Self {
                debit: balance.abs(),
                credit: 0.0,
            }
        } else {
            Self {
                debit: 0.0,
                credit: balance.abs(),
            }
        }
    }

    fn balance(&self) -> f64 {
        self.debit - self.credit
    }
}

struct SummaryBuilder {
    rows: Vec<PartySummaryRow>,
    balance: f64,
    debit: f64,
    credit: f64,
    // Customer statements are seen from the customer's side.
    switch_columns: bool,
}

impl SummaryBuilder {
    fn push(
        &mut self,
        reference: Option<String>,
        date: Option<NaiveDate>,
        description: String,
        debit: f64,
        credit: f64,
    ) {
        let (debit, credit) = if self.switch_columns {
            (credit, debit)
        } else {
            (debit, credit)
        };
        self.balance += debit - credit;
        self.debit += debit;
        self.credit += credit;
        self.rows.push(PartySummaryRow {
            reference,
            date,
            description,
            debit,
            credit,
            balance: self.balance,
        });
    }
}

/// Running debit/credit ledger of one party: opening balance, every item
/// and payment in date order, supplier commission and taxes, then the total.
fn party_summary(
    opening: Opening,
    items: &[StatementItemRow],
    payments: &[StatementPaymentRow],
    party_type: PartyType,
    tax_rate: f64,
) -> Vec<PartySummaryRow> {
    let mut builder = SummaryBuilder {
        rows: vec![PartySummaryRow {
            reference: None,
            date: None,
            description: "Opening Balance".to_string(),
            debit: opening.debit,
            credit: opening.credit,
            balance: opening.balance(),
        }],
        balance: opening.balance(),
        debit: opening.debit,
        credit: opening.credit,
        switch_columns: party_type != PartyType::Supplier,
    };

    let mut ordered: Vec<&StatementItemRow> = items.iter().collect();
    ordered.sort_by_key(|r| r.date);
    for row in ordered {
        builder.push(
            Some(row.invoice_id.clone()),
            Some(row.date),
            format!("{} * {} {}", row.qty, row.price, row.item_name),
            0.0,
            row.total,
        );
    }

    let mut ordered: Vec<&StatementPaymentRow> = payments.iter().collect();
    ordered.sort_by_key(|p| p.date);
    for payment in ordered {
        builder.push(
            Some(payment.payment_id.clone()),
            Some(payment.date),
            payment
                .remarks
                .clone()
                .unwrap_or_else(|| payment.mode_of_payment.clone()),
            signed_amount(party_type, payment.payment_type, payment.paid_amount),
            0.0,
        );
    }

    if party_type == PartyType::Supplier {
        let totals = summarize(items, party_type, tax_rate);
        builder.push(None, None, "Commissions".to_string(), totals.total_commission, 0.0);
        builder.push(None, None, "Taxes".to_string(), totals.taxes, 0.0);
    }

    builder.rows.push(PartySummaryRow {
        reference: None,
        date: None,
        description: "Total".to_string(),
        debit: builder.debit,
        credit: builder.credit,
        balance: builder.balance,
    });
    builder.rows
}
