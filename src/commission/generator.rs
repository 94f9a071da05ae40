use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use super::aggregator::{AggregationFilters, PartyInvoiceGroup};
use crate::config::{format_number, AgricultureSettings, CommissionInvoice, PartyType, State};
use crate::error::{AgriError, Result};
use crate::form::{FormStatus, InvoiceForm};

/// Outcome of a batch of commission invoices
#[derive(Debug, Default, PartialEq)]
pub struct GenerationSummary {
    pub created: Vec<String>,
    /// Source forms that were already invoiced or are gone
    pub skipped: Vec<String>,
}

impl GenerationSummary {
    pub fn message(&self) -> String {
        let mut message = format!(
            "Invoices Created Successfully ({} created",
            self.created.len()
        );
        if !self.skipped.is_empty() {
            message.push_str(&format!(", {} skipped", self.skipped.len()));
        }
        message.push(')');
        message
    }
}

/// Persist one commission invoice per group and mark its source records as
/// invoiced so they drop out of later aggregations.
pub fn generate_commission_invoices(
    state: &mut State,
    groups: &[PartyInvoiceGroup],
    filters: &AggregationFilters,
    settings: &AgricultureSettings,
    today: NaiveDate,
) -> GenerationSummary {
    let mut summary = GenerationSummary::default();

    for group in groups {
        if !mark_sources(state, group, true) {
            warn!(invoice_id = %group.invoice_id, party = %group.party, "source already invoiced");
            summary.skipped.push(group.invoice_id.clone());
            continue;
        }

        let year = today.year() as u32;
        let seq = state.counter.commissions.advance(year);
        let number = format_number(&settings.commission_number_format, year, seq);

        state.commission_invoices.push(CommissionInvoice {
            number: number.clone(),
            party_type: group.party_type,
            party: group.party.clone(),
            posting_date: today,
            period_from: filters.from_date.unwrap_or(group.from_date),
            period_to: filters.to_date.unwrap_or(group.to_date),
            total: group.commission_total,
            item: settings.commission_item.clone(),
            sources: vec![group.invoice_id.clone()],
            cancelled: false,
        });

        info!(%number, invoice_id = %group.invoice_id, total = group.commission_total, "created commission invoice");
        summary.created.push(number);
    }

    summary
}

/// Cancel a commission invoice and release the records it covered
pub fn cancel_commission_invoice(state: &mut State, number: &str) -> Result<CommissionInvoice> {
    let idx = state
        .commission_invoices
        .iter()
        .position(|c| c.number == number)
        .ok_or_else(|| AgriError::CommissionInvoiceNotFound(number.to_string()))?;

    if state.commission_invoices[idx].cancelled {
        return Err(AgriError::CommissionInvoiceCancelled(number.to_string()));
    }

    let invoice = state.commission_invoices[idx].clone();
    for source in &invoice.sources {
        if let Ok(form) = state.form_mut(source) {
            mark_form(form, invoice.party_type, &invoice.party, false);
        }
    }

    state.commission_invoices[idx].cancelled = true;
    info!(%number, "cancelled commission invoice");
    Ok(state.commission_invoices[idx].clone())
}

// Returns false when nothing was left to mark.
fn mark_sources(state: &mut State, group: &PartyInvoiceGroup, invoiced: bool) -> bool {
    let Ok(form) = state.form_mut(&group.invoice_id) else {
        return false;
    };
    if form.status() != FormStatus::Submitted {
        return false;
    }

    mark_form(form, group.party_type, &group.party, invoiced)
}

// Marks exactly what the aggregator bills for this party type: pamper rows
// belong to Pamper invoices only.
fn mark_form(form: &mut InvoiceForm, party_type: PartyType, party: &str, invoiced: bool) -> bool {
    match party_type {
        PartyType::Supplier => form.set_supplier_invoiced(invoiced),
        PartyType::Customer => form.mark_lines_invoiced(party, invoiced) > 0,
        PartyType::Pamper => {
            let lines = form.mark_lines_invoiced(party, invoiced);
            let rows = form.mark_pamper_rows_invoiced(party, invoiced);
            lines + rows > 0
        }
    }
}
