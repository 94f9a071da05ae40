use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub company: Company,
    pub agriculture: AgricultureSettings,
    pub reports: ReportSettings,
    #[serde(default)]
    pub remote: Option<RemoteSettings>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Company {
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgricultureSettings {
    /// Percentage withheld from supplier commissions on statements
    #[serde(default)]
    pub default_tax_rate: f64,
    pub currency_symbol: String,
    pub form_number_format: String,
    pub commission_number_format: String,
    /// Item used when a commission invoice is itemised
    #[serde(default)]
    pub commission_item: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportSettings {
    pub output_dir: String,
    /// Pause between consecutive statement downloads
    #[serde(default = "default_download_delay_ms")]
    pub download_delay_ms: u64,
}

fn default_download_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RemoteSettings {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}
