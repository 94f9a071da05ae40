mod item;
mod party;
mod settings;
mod state;

pub use item::Item;
pub use party::{Customer, PartyCatalog, PartyType, Supplier};
pub use settings::{AgricultureSettings, Company, Config, RemoteSettings, ReportSettings};
pub use state::{
    CommissionInvoice, Counter, PaymentEntry, PaymentType, Sequence, State,
};

use crate::error::{AgriError, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.agri/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "agri") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.agri/
    let home = dirs_home().ok_or_else(|| {
        AgriError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".agri"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Output directory from config; relative paths are taken from the config dir
pub fn resolve_output_dir(output_dir: &str, cfg_dir: &Path) -> PathBuf {
    let path = expand_path(output_dir);
    if path.is_absolute() {
        path
    } else {
        cfg_dir.join(path)
    }
}

/// Fill a numbering template such as `COM-{year}-{seq:04}`
pub fn format_number(format: &str, year: u32, seq: u32) -> String {
    format
        .replace("{year}", &year.to_string())
        .replace("{seq:04}", &format!("{:04}", seq))
        .replace("{seq:05}", &format!("{:05}", seq))
        .replace("{seq:03}", &format!("{:03}", seq))
}

fn load_toml<T: DeserializeOwned>(path: PathBuf) -> Result<T> {
    if !path.exists() {
        return Err(AgriError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| AgriError::ConfigParse { path, source: e })
}

fn save_toml<T: Serialize>(path: PathBuf, value: &T) -> Result<()> {
    let content = toml::to_string_pretty(value).map_err(|e| AgriError::ConfigWrite {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    fs::write(path, content)?;
    Ok(())
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    load_toml(config_dir.join("config.toml"))
}

/// Load parties.toml
pub fn load_parties(config_dir: &Path) -> Result<PartyCatalog> {
    load_toml(config_dir.join("parties.toml"))
}

/// Save parties.toml
pub fn save_parties(config_dir: &Path, parties: &PartyCatalog) -> Result<()> {
    save_toml(config_dir.join("parties.toml"), parties)
}

/// Load items.toml keyed by item code
pub fn load_items(config_dir: &Path) -> Result<BTreeMap<String, Item>> {
    load_toml(config_dir.join("items.toml"))
}

/// Load state.toml (creates default if missing)
pub fn load_state(config_dir: &Path) -> Result<State> {
    let path = config_dir.join("state.toml");
    if !path.exists() {
        return Ok(State::default());
    }
    let mut state: State = load_toml(path)?;
    for form in &mut state.forms {
        form.recalculate();
    }
    Ok(state)
}

/// Save state.toml
pub fn save_state(config_dir: &Path, state: &State) -> Result<()> {
    save_toml(config_dir.join("state.toml"), state)
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[company]
name = "Your Trading House"
address = "Central Market, Stall 12"
city = "Cairo"
country = "Egypt"
# phone = "+20-2-1234-5678"    # optional
# tax_id = "123-456-789"       # optional

[agriculture]
default_tax_rate = 0.0          # percent withheld from supplier commissions
currency_symbol = "$"
form_number_format = "AMF-{year}-{seq:04}"
commission_number_format = "COM-{year}-{seq:04}"
# commission_item = "commission"  # must be a commission item from items.toml

[reports]
output_dir = "output"
download_delay_ms = 1000        # pause between statement downloads

# Use a remote server for commission and statement requests
# [remote]
# url = "https://erp.example.com"
# timeout_secs = 30
"#;

/// Template content for parties.toml
pub const PARTIES_TEMPLATE: &str = r#"# Suppliers and customers. The table key (e.g., [suppliers.farmer-a]) is the
# identifier used on the command line.
#
# Pampers (commission agents) are customers with is_pamper = true.

[suppliers.farmer-a]
name = "Farmer A"
is_farmer = true
commission_percentage = 7.0
related_customer = "farmer-a"

[customers.farmer-a]
name = "Farmer A"
is_farmer = true
commission_percentage = 7.0

[customers.acme]
name = "ACME Grocers"
is_customer = true
commission_percentage = 2.0

[customers.agent-x]
name = "Agent X"
is_customer = true
is_pamper = true
commission_percentage = 1.0
"#;

/// Template content for items.toml
pub const ITEMS_TEMPLATE: &str = r#"# Items sold on invoice forms. Commission items can only be used on
# commission rows.

[tomatoes]
name = "Tomatoes"

[potatoes]
name = "Potatoes"

[commission]
name = "Commission"
commission_item = true
"#;
