mod lines;

pub use lines::{CommissionLine, InvoiceLineItem, PamperCommissionLine, Refresh, Table};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Item;
use crate::error::{AgriError, Result};
use crate::link_filter::{ItemFilter, PartyFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FormStatus {
    #[default]
    Draft,
    Submitted,
    Cancelled,
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormStatus::Draft => "DRAFT",
            FormStatus::Submitted => "SUBMITTED",
            FormStatus::Cancelled => "CANCELLED",
        })
    }
}

/// A supplier's consignment sold to one or more customers.
///
/// Rows are addressed by index. Every mutation that changes a derived value
/// returns a [`Refresh`] for the touched row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceForm {
    pub id: String,
    posting_date: NaiveDate,
    supplier: String,
    customer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pamper: Option<String>,
    #[serde(default)]
    status: FormStatus,
    #[serde(default)]
    grand_total: f64,
    /// Already rolled into the supplier's commission invoice
    #[serde(default)]
    has_supplier_commission_invoice: bool,
    #[serde(default)]
    items: Vec<InvoiceLineItem>,
    #[serde(default)]
    commissions: Vec<CommissionLine>,
    #[serde(default)]
    pamper_commissions: Vec<PamperCommissionLine>,
}

impl InvoiceForm {
    pub fn new(
        id: impl Into<String>,
        posting_date: NaiveDate,
        supplier: impl Into<String>,
        customer: impl Into<String>,
        pamper: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            posting_date,
            supplier: supplier.into(),
            customer: customer.into(),
            pamper,
            status: FormStatus::Draft,
            grand_total: 0.0,
            has_supplier_commission_invoice: false,
            items: Vec::new(),
            commissions: Vec::new(),
            pamper_commissions: Vec::new(),
        }
    }

    pub fn posting_date(&self) -> NaiveDate {
        self.posting_date
    }

    pub fn supplier(&self) -> &str {
        &self.supplier
    }

    /// Already rolled into the supplier's commission invoice
    pub fn has_supplier_commission_invoice(&self) -> bool {
        self.has_supplier_commission_invoice
    }

    pub fn customer(&self) -> &str {
        &self.customer
    }

    pub fn pamper(&self) -> Option<&str> {
        self.pamper.as_deref()
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn items(&self) -> &[InvoiceLineItem] {
        &self.items
    }

    pub fn commissions(&self) -> &[CommissionLine] {
        &self.commissions
    }

    pub fn pamper_commissions(&self) -> &[PamperCommissionLine] {
        &self.pamper_commissions
    }

    /// Sum of item line totals
    pub fn grand_total(&self) -> f64 {
        self.grand_total
    }

    /// Parties an item line may be billed to
    pub fn line_customer_filter(&self) -> PartyFilter {
        PartyFilter::named([Some(self.customer.as_str()), self.pamper()])
    }

    /// Agents selectable on item lines and pamper commission rows
    pub fn line_pamper_filter(&self) -> PartyFilter {
        PartyFilter::named([self.pamper()])
    }

    pub fn set_customer(&mut self, customer: impl Into<String>) -> Result<Vec<Refresh>> {
        self.ensure_editable()?;
        self.customer = customer.into();
        Ok(self.propagate_parties())
    }

    pub fn set_pamper(&mut self, pamper: Option<String>) -> Result<Vec<Refresh>> {
        self.ensure_editable()?;
        self.pamper = pamper;
        Ok(self.propagate_parties())
    }

    // Header customer/pamper override whatever the lines held.
    fn propagate_parties(&mut self) -> Vec<Refresh> {
        self.items
            .iter_mut()
            .enumerate()
            .map(|(row, line)| {
                line.customer = self.customer.clone();
                line.pamper = self.pamper.clone();
                Refresh {
                    table: Table::Items,
                    row,
                }
            })
            .collect()
    }

    /// Append an item line billed to the header customer and pamper
    pub fn add_item(
        &mut self,
        item_code: &str,
        item: &Item,
        qty: Option<f64>,
        price: Option<f64>,
    ) -> Result<Refresh> {
        self.ensure_editable()?;
        if !ItemFilter::line_items().matches(item) {
            return Err(AgriError::ItemNotAllowed {
                item: item_code.to_string(),
                table: Table::Items.to_string(),
            });
        }

        let mut line =
            InvoiceLineItem::new(item_code, self.customer.clone(), self.pamper.clone(), qty, price);
        line.item_name = Some(item.name.clone());
        self.items.push(line);
        self.update_grand_total();

        Ok(Refresh {
            table: Table::Items,
            row: self.items.len() - 1,
        })
    }

    pub fn set_item_qty(&mut self, row: usize, qty: Option<f64>) -> Result<Refresh> {
        self.ensure_editable()?;
        self.item_mut(row)?.set_qty(qty);
        self.update_grand_total();
        Ok(Refresh {
            table: Table::Items,
            row,
        })
    }

    pub fn set_item_price(&mut self, row: usize, price: Option<f64>) -> Result<Refresh> {
        self.ensure_editable()?;
        self.item_mut(row)?.set_price(price);
        self.update_grand_total();
        Ok(Refresh {
            table: Table::Items,
            row,
        })
    }

    /// Bill a single line to the header customer or to the header pamper
    pub fn set_item_customer(&mut self, row: usize, customer: &str) -> Result<Refresh> {
        self.ensure_editable()?;
        if !self.line_customer_filter().admits_name(customer) {
            return Err(AgriError::PartyNotSelectable {
                party_type: "Customer".to_string(),
                party: customer.to_string(),
            });
        }
        self.item_mut(row)?.customer = customer.to_string();
        Ok(Refresh {
            table: Table::Items,
            row,
        })
    }

    /// Set or clear the agent of a single line; only the header pamper qualifies
    pub fn set_item_pamper(&mut self, row: usize, pamper: Option<&str>) -> Result<Refresh> {
        self.ensure_editable()?;
        if let Some(name) = pamper {
            if !self.line_pamper_filter().admits_name(name) {
                return Err(AgriError::PartyNotSelectable {
                    party_type: "Pamper".to_string(),
                    party: name.to_string(),
                });
            }
        }
        self.item_mut(row)?.pamper = pamper.map(str::to_string);
        Ok(Refresh {
            table: Table::Items,
            row,
        })
    }

    pub fn remove_item(&mut self, row: usize) -> Result<InvoiceLineItem> {
        self.ensure_editable()?;
        if row >= self.items.len() {
            return Err(Self::row_not_found(Table::Items, row));
        }
        let removed = self.items.remove(row);
        self.update_grand_total();
        Ok(removed)
    }

    pub fn add_commission(
        &mut self,
        item_code: &str,
        item: &Item,
        commission: Option<f64>,
        taxes: Option<f64>,
    ) -> Result<Refresh> {
        self.ensure_editable()?;
        if !ItemFilter::commission_items().matches(item) {
            return Err(AgriError::ItemNotAllowed {
                item: item_code.to_string(),
                table: Table::Commissions.to_string(),
            });
        }

        self.commissions
            .push(CommissionLine::new(item_code, commission, taxes));
        Ok(Refresh {
            table: Table::Commissions,
            row: self.commissions.len() - 1,
        })
    }

    pub fn set_commission_amount(&mut self, row: usize, commission: Option<f64>) -> Result<Refresh> {
        self.ensure_editable()?;
        self.commissions
            .get_mut(row)
            .ok_or_else(|| Self::row_not_found(Table::Commissions, row))?
            .set_commission(commission);
        Ok(Refresh {
            table: Table::Commissions,
            row,
        })
    }

    pub fn set_commission_taxes(&mut self, row: usize, taxes: Option<f64>) -> Result<Refresh> {
        self.ensure_editable()?;
        self.commissions
            .get_mut(row)
            .ok_or_else(|| Self::row_not_found(Table::Commissions, row))?
            .set_taxes(taxes);
        Ok(Refresh {
            table: Table::Commissions,
            row,
        })
    }

    /// Append a commission row for the header pamper
    pub fn add_pamper_commission(
        &mut self,
        price: Option<f64>,
        percentage: Option<f64>,
    ) -> Result<Refresh> {
        self.ensure_editable()?;
        let pamper = self.pamper.clone().ok_or_else(|| AgriError::PartyNotSelectable {
            party_type: "Pamper".to_string(),
            party: String::new(),
        })?;

        self.pamper_commissions
            .push(PamperCommissionLine::new(pamper, price, percentage));
        Ok(Refresh {
            table: Table::PamperCommissions,
            row: self.pamper_commissions.len() - 1,
        })
    }

    pub fn set_pamper_commission_price(&mut self, row: usize, price: Option<f64>) -> Result<Refresh> {
        self.ensure_editable()?;
        self.pamper_commission_mut(row)?.set_price(price);
        Ok(Refresh {
            table: Table::PamperCommissions,
            row,
        })
    }

    pub fn set_pamper_commission_percentage(
        &mut self,
        row: usize,
        percentage: Option<f64>,
    ) -> Result<Refresh> {
        self.ensure_editable()?;
        self.pamper_commission_mut(row)?.set_percentage(percentage);
        Ok(Refresh {
            table: Table::PamperCommissions,
            row,
        })
    }

    pub fn submit(&mut self) -> Result<()> {
        self.ensure_editable()?;
        self.update_grand_total();
        self.status = FormStatus::Submitted;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        if self.status != FormStatus::Submitted {
            return Err(AgriError::FormNotEditable {
                id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        self.status = FormStatus::Cancelled;
        Ok(())
    }

    /// Flag the form as covered by the supplier's commission invoice.
    /// Returns false when the flag already had that value.
    pub fn set_supplier_invoiced(&mut self, invoiced: bool) -> bool {
        let changed = self.has_supplier_commission_invoice != invoiced;
        self.has_supplier_commission_invoice = invoiced;
        changed
    }

    /// Set the commission-invoiced flag on every item line billed to `party`.
    /// Returns the number of lines whose flag changed.
    pub fn mark_lines_invoiced(&mut self, party: &str, invoiced: bool) -> usize {
        let mut changed = 0;
        for line in self.items.iter_mut().filter(|l| l.customer == party) {
            if line.has_commission_invoice != invoiced {
                line.has_commission_invoice = invoiced;
                changed += 1;
            }
        }
        changed
    }

    /// Same as [`Self::mark_lines_invoiced`] for the pamper commission rows of `party`
    pub fn mark_pamper_rows_invoiced(&mut self, party: &str, invoiced: bool) -> usize {
        let mut changed = 0;
        for row in self.pamper_commissions.iter_mut().filter(|r| r.pamper == party) {
            if row.has_commission_invoice != invoiced {
                row.has_commission_invoice = invoiced;
                changed += 1;
            }
        }
        changed
    }

    /// Recompute every derived value, e.g. after loading from disk
    pub fn recalculate(&mut self) {
        self.items.iter_mut().for_each(InvoiceLineItem::recalculate);
        self.commissions.iter_mut().for_each(CommissionLine::recalculate);
        self.pamper_commissions
            .iter_mut()
            .for_each(PamperCommissionLine::recalculate);
        self.update_grand_total();
    }

    fn update_grand_total(&mut self) {
        self.grand_total = self.items.iter().map(InvoiceLineItem::total).sum();
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.status == FormStatus::Draft {
            Ok(())
        } else {
            Err(AgriError::FormNotEditable {
                id: self.id.clone(),
                status: self.status.to_string(),
            })
        }
    }

    fn item_mut(&mut self, row: usize) -> Result<&mut InvoiceLineItem> {
        self.items
            .get_mut(row)
            .ok_or_else(|| Self::row_not_found(Table::Items, row))
    }

    fn pamper_commission_mut(&mut self, row: usize) -> Result<&mut PamperCommissionLine> {
        self.pamper_commissions
            .get_mut(row)
            .ok_or_else(|| Self::row_not_found(Table::PamperCommissions, row))
    }

    fn row_not_found(table: Table, row: usize) -> AgriError {
        AgriError::RowNotFound {
            table: table.to_string(),
            row,
        }
    }
}
