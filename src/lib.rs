pub mod calc;
pub mod commission;
pub mod config;
pub mod error;
pub mod form;
pub mod link_filter;
pub mod local;
pub mod logging;
pub mod pdf;
pub mod remote;
pub mod statement;

pub use commission::{AggregationFilters, CommissionBackend, CommissionSession, PartyInvoiceGroup};
pub use config::{Config, Item, PartyCatalog, PartyType, State};
pub use error::{AgriError, Result};
pub use form::{FormStatus, InvoiceForm};
pub use local::LocalBackend;
pub use remote::RemoteBackend;
pub use statement::{Downloader, FileReference, ReportBackend, Statement, StatementFilters};
