use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgriError {
    #[error("Config directory not found at {0}. Run 'agri init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {reason}")]
    ConfigWrite { path: PathBuf, reason: String },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Missing Filters: {}", .0.join(", "))]
    MissingFilter(Vec<String>),

    #[error("To date must be after from date")]
    InvalidDateRange,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Unknown party type '{0}'. Use 'supplier', 'customer' or 'pamper'")]
    UnknownPartyType(String),

    #[error("{party_type} '{party}' not found in parties.toml")]
    PartyNotFound { party_type: String, party: String },

    #[error("{party_type} '{party}' cannot be selected here")]
    PartyNotSelectable { party_type: String, party: String },

    #[error("Item '{0}' not found in items.toml")]
    ItemNotFound(String),

    #[error("Item '{item}' is not allowed in {table}")]
    ItemNotAllowed { item: String, table: String },

    #[error("Invoice form '{0}' not found")]
    FormNotFound(String),

    #[error("Invoice form '{id}' is {status} and cannot be changed")]
    FormNotEditable { id: String, status: String },

    #[error("Row {row} not found in {table}")]
    RowNotFound { table: String, row: usize },

    #[error("Commission invoice '{0}' not found")]
    CommissionInvoiceNotFound(String),

    #[error("Commission invoice '{0}' is already cancelled")]
    CommissionInvoiceCancelled(String),

    #[error("A request is already in progress")]
    RequestInFlight,

    #[error("Nothing to invoice. Fetch party invoices first")]
    NothingToInvoice,

    #[error("Remote call failed: {0}")]
    RemoteFailure(String),

    #[error("Payment amount must be greater than zero")]
    InvalidPaymentAmount,

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgriError>;
