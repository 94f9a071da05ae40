mod typst;

pub use typst::{generate_form_pdf, generate_statement_pdf, FormDocument, StatementDocument};
