//! Client for a server that exposes the commission and statement pages as
//! JSON methods under `/api/method/<name>`. Every reply wraps its payload in
//! a `{"message": ...}` envelope.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

use crate::commission::{AggregationFilters, CommissionBackend, PartyInvoiceGroup};
use crate::config::RemoteSettings;
use crate::error::{AgriError, Result};
use crate::statement::{FileReference, ReportBackend, StatementFilters};

const COMMISSION_PAGE: &str =
    "agricultural_marketing.agricultural_marketing.page.commission_management.commission_management";
const STATEMENT_PAGE: &str =
    "agricultural_marketing.agricultural_marketing.page.statement_forms.statement_forms";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    message: T,
}

pub struct RemoteBackend {
    base_url: String,
    agent: Agent,
}

impl RemoteBackend {
    pub fn new(settings: &RemoteSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();

        Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn call<T: DeserializeOwned>(&self, method: &str, args: serde_json::Value) -> Result<T> {
        let url = format!("{}/api/method/{method}", self.base_url);
        debug!(%url, "remote call");

        let body = serde_json::to_string(&args).map_err(|e| AgriError::RemoteFailure(e.to_string()))?;
        let reply: String = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(body.as_str())
            .map_err(|e| AgriError::RemoteFailure(e.to_string()))?
            .body_mut()
            .read_to_string()
            .map_err(|e| AgriError::RemoteFailure(e.to_string()))?;

        decode_message(&reply)
    }

    /// Absolute URL for a file reference; server-relative paths are joined
    /// to the base URL
    fn file_url(&self, file: &FileReference) -> String {
        if file.0.starts_with("http://") || file.0.starts_with("https://") {
            file.0.clone()
        } else {
            format!("{}/{}", self.base_url, file.0.trim_start_matches('/'))
        }
    }
}

fn decode_message<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(reply)
        .map_err(|e| AgriError::RemoteFailure(format!("unexpected reply: {e}")))?;
    Ok(envelope.message)
}

impl CommissionBackend for RemoteBackend {
    fn aggregate(&mut self, filters: &AggregationFilters) -> Result<Vec<PartyInvoiceGroup>> {
        self.call(
            &format!("{COMMISSION_PAGE}.execute"),
            json!({ "filters": filters }),
        )
    }

    fn generate_invoices(
        &mut self,
        groups: &[PartyInvoiceGroup],
        filters: &AggregationFilters,
    ) -> Result<String> {
        self.call(
            &format!("{COMMISSION_PAGE}.generate_commission_invoices"),
            json!({ "invoices": groups, "filters": filters }),
        )
    }
}

impl ReportBackend for RemoteBackend {
    fn get_reports(&self, filters: &StatementFilters) -> Result<Vec<FileReference>> {
        // An empty reply carries a null message
        let files: Option<Vec<FileReference>> = self.call(
            &format!("{STATEMENT_PAGE}.get_reports"),
            json!({ "filters": filters }),
        )?;
        Ok(files.unwrap_or_default())
    }

    fn fetch(&self, file: &FileReference, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.file_url(file);
        debug!(%url, "downloading file");

        let bytes = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| AgriError::RemoteFailure(e.to_string()))?
            .body_mut()
            .read_to_vec()
            .map_err(|e| AgriError::RemoteFailure(e.to_string()))?;

        let path = dest_dir.join(file.file_name());
        fs::write(&path, bytes)?;
        Ok(path)
    }
}
