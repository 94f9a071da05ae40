use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::commission::{
    aggregate, generate_commission_invoices, AggregationFilters, CommissionBackend,
    PartyInvoiceGroup,
};
use crate::config::{
    load_config, load_items, load_parties, load_state, resolve_output_dir, save_state, Config,
};
use crate::error::{AgriError, Result};
use crate::link_filter::ItemFilter;
use crate::pdf::{generate_statement_pdf, StatementDocument};
use crate::statement::{build_statements, FileReference, ReportBackend, StatementFilters};

/// Serves commission and statement requests from the config directory
#[derive(Debug, Clone)]
pub struct LocalBackend {
    cfg_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(cfg_dir: impl Into<PathBuf>) -> Self {
        Self {
            cfg_dir: cfg_dir.into(),
        }
    }

    pub fn cfg_dir(&self) -> &Path {
        &self.cfg_dir
    }

    fn check_commission_item(&self, config: &Config) -> Result<()> {
        let Some(code) = config.agriculture.commission_item.as_deref() else {
            return Ok(());
        };
        let items = load_items(&self.cfg_dir)?;
        let item = items
            .get(code)
            .ok_or_else(|| AgriError::ItemNotFound(code.to_string()))?;
        if !ItemFilter::commission_items().matches(item) {
            return Err(AgriError::ItemNotAllowed {
                item: code.to_string(),
                table: "commission invoices".to_string(),
            });
        }
        Ok(())
    }
}

impl CommissionBackend for LocalBackend {
    fn aggregate(&mut self, filters: &AggregationFilters) -> Result<Vec<PartyInvoiceGroup>> {
        let state = load_state(&self.cfg_dir)?;
        let parties = load_parties(&self.cfg_dir)?;
        aggregate(&state.forms, &parties, filters)
    }

    fn generate_invoices(
        &mut self,
        groups: &[PartyInvoiceGroup],
        filters: &AggregationFilters,
    ) -> Result<String> {
        let config = load_config(&self.cfg_dir)?;
        self.check_commission_item(&config)?;

        let mut state = load_state(&self.cfg_dir)?;
        let today = chrono::Local::now().date_naive();
        let summary =
            generate_commission_invoices(&mut state, groups, filters, &config.agriculture, today);
        save_state(&self.cfg_dir, &state)?;

        Ok(summary.message())
    }
}

impl ReportBackend for LocalBackend {
    fn get_reports(&self, filters: &StatementFilters) -> Result<Vec<FileReference>> {
        let config = load_config(&self.cfg_dir)?;
        let parties = load_parties(&self.cfg_dir)?;
        let state = load_state(&self.cfg_dir)?;

        let statements =
            build_statements(&state, &parties, filters, config.agriculture.default_tax_rate)?;
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        let output_dir = resolve_output_dir(&config.reports.output_dir, &self.cfg_dir);
        fs::create_dir_all(&output_dir)?;

        let today = chrono::Local::now().date_naive();
        let mut files = Vec::with_capacity(statements.len());
        for statement in &statements {
            let path = output_dir.join(format!("{}-{today}.pdf", statement.party));
            let document = StatementDocument {
                company: &config.company,
                currency_symbol: &config.agriculture.currency_symbol,
                generated_date: today.format("%Y-%m-%d").to_string(),
                statement,
            };
            generate_statement_pdf(&document, &path)?;
            info!(party = %statement.party, path = %path.display(), "rendered statement");
            files.push(FileReference(path.to_string_lossy().into_owned()));
        }

        Ok(files)
    }

    fn fetch(&self, file: &FileReference, dest_dir: &Path) -> Result<PathBuf> {
        let source = PathBuf::from(&file.0);
        let target = dest_dir.join(file.file_name());
        if source != target {
            fs::copy(&source, &target)?;
        }
        Ok(target)
    }
}
