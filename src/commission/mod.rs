mod aggregator;
mod generator;
mod session;

pub use aggregator::{aggregate, AggregationFilters, PartyInvoiceGroup, ValidatedFilters};
pub use generator::{cancel_commission_invoice, generate_commission_invoices, GenerationSummary};
pub use session::{BusyFlag, BusyGuard, CommissionSession, SessionState};

use crate::error::Result;

/// Server side of the commission management page
pub trait CommissionBackend {
    /// Un-invoiced records of the filtered party, one group per invoice form
    fn aggregate(&mut self, filters: &AggregationFilters) -> Result<Vec<PartyInvoiceGroup>>;

    /// Persist one commission invoice per group; returns a summary message
    fn generate_invoices(
        &mut self,
        groups: &[PartyInvoiceGroup],
        filters: &AggregationFilters,
    ) -> Result<String>;
}
