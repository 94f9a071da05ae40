use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::aggregator::{AggregationFilters, PartyInvoiceGroup};
use super::CommissionBackend;
use crate::config::{PartyCatalog, PartyType};
use crate::error::{AgriError, Result};
use crate::link_filter::PartyFilter;

/// Shared "processing" indicator of one page instance.
///
/// Clones observe the same flag, so a spinner can watch it while a request
/// runs.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark busy unless a request already holds the flag
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }
}

/// Releases the busy flag when dropped, whatever the request's outcome
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Last fetch found nothing to invoice
    Empty,
    /// Groups fetched and waiting for invoice creation
    Reviewing(Vec<PartyInvoiceGroup>),
    /// Invoices were created; the next step is a fresh fetch
    Requery,
}

/// Commission management page: filters, the last aggregation result and at
/// most one backend request in flight.
pub struct CommissionSession<B> {
    backend: B,
    parties: PartyCatalog,
    filters: AggregationFilters,
    state: SessionState,
    busy: BusyFlag,
}

impl<B: CommissionBackend> CommissionSession<B> {
    /// `parties` is the already loaded catalog the party picker draws from
    pub fn new(backend: B, parties: PartyCatalog) -> Self {
        Self {
            backend,
            parties,
            filters: AggregationFilters::default(),
            state: SessionState::Idle,
            busy: BusyFlag::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn filters(&self) -> &AggregationFilters {
        &self.filters
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn set_from_date(&mut self, date: Option<NaiveDate>) {
        self.filters.from_date = date;
        self.discard_result();
    }

    pub fn set_to_date(&mut self, date: Option<NaiveDate>) {
        self.filters.to_date = date;
        self.discard_result();
    }

    /// Changing the party type clears the selected party
    pub fn set_party_type(&mut self, party_type: Option<PartyType>) {
        if self.filters.party_type != party_type {
            self.filters.party = None;
        }
        self.filters.party_type = party_type;
        self.discard_result();
    }

    pub fn set_party(&mut self, party: Option<String>) {
        self.filters.party = party;
        self.discard_result();
    }

    // Fetched groups only belong to the filters they were fetched with.
    fn discard_result(&mut self) {
        if self.state != SessionState::Idle {
            debug!("filters changed, discarding fetched groups");
            self.state = SessionState::Idle;
        }
    }

    /// Parties the picker offers for the current party type
    pub fn party_choices(&self) -> Vec<&str> {
        match self.filters.party_type {
            Some(party_type) => self
                .parties
                .select(party_type, &PartyFilter::for_aggregation(party_type)),
            None => Vec::new(),
        }
    }

    /// Fetch the party's un-invoiced records. An empty slice is a normal
    /// outcome and moves the session to [`SessionState::Empty`].
    pub fn fetch_invoices(&mut self) -> Result<&[PartyInvoiceGroup]> {
        let valid = self.filters.validate()?;
        self.parties.require(
            valid.party_type,
            &valid.party,
            &PartyFilter::for_aggregation(valid.party_type),
        )?;

        let _guard = self.busy.try_acquire().ok_or(AgriError::RequestInFlight)?;
        debug!(party_type = %valid.party_type, party = %valid.party, "fetching party invoices");
        let groups = self.backend.aggregate(&self.filters)?;

        self.state = if groups.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Reviewing(groups)
        };

        match &self.state {
            SessionState::Reviewing(groups) => Ok(groups.as_slice()),
            _ => Ok(&[][..]),
        }
    }

    /// Create invoices for the groups under review. On failure the groups
    /// stay under review so the request can be retried.
    pub fn create_invoices(&mut self) -> Result<String> {
        let SessionState::Reviewing(groups) = &self.state else {
            return Err(AgriError::NothingToInvoice);
        };

        let _guard = self.busy.try_acquire().ok_or(AgriError::RequestInFlight)?;
        let message = self.backend.generate_invoices(groups, &self.filters)?;
        info!(%message, "commission invoices created");

        self.state = SessionState::Requery;
        Ok(message)
    }
}
