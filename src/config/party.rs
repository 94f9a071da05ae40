use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{AgriError, Result};
use crate::link_filter::{PartyFilter, PartyFlags};

/// Category of party used for aggregation and statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyType {
    /// Farmer supplying the goods
    Supplier,
    Customer,
    /// Commission agent; stored with the customers
    Pamper,
}

impl PartyType {
    pub fn label(&self) -> &'static str {
        match self {
            PartyType::Supplier => "Supplier",
            PartyType::Customer => "Customer",
            PartyType::Pamper => "Pamper",
        }
    }
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PartyType {
    type Err = AgriError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supplier" | "farmer" => Ok(PartyType::Supplier),
            "customer" => Ok(PartyType::Customer),
            "pamper" | "agent" => Ok(PartyType::Pamper),
            _ => Err(AgriError::UnknownPartyType(s.to_string())),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Supplier {
    pub name: String,
    #[serde(default)]
    pub is_farmer: bool,
    #[serde(default)]
    pub commission_percentage: f64,
    /// Customer record created alongside the supplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_customer: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Customer {
    pub name: String,
    #[serde(default)]
    pub is_customer: bool,
    #[serde(default)]
    pub is_farmer: bool,
    #[serde(default)]
    pub is_pamper: bool,
    #[serde(default)]
    pub commission_percentage: f64,
}

/// Contents of parties.toml
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PartyCatalog {
    #[serde(default)]
    pub suppliers: BTreeMap<String, Supplier>,
    #[serde(default)]
    pub customers: BTreeMap<String, Customer>,
}

impl PartyCatalog {
    pub fn flags(&self, party_type: PartyType, id: &str) -> Option<PartyFlags> {
        match party_type {
            PartyType::Supplier => self.suppliers.get(id).map(|s| PartyFlags {
                is_farmer: s.is_farmer,
                ..PartyFlags::default()
            }),
            PartyType::Customer | PartyType::Pamper => self.customers.get(id).map(|c| PartyFlags {
                is_farmer: c.is_farmer,
                is_customer: c.is_customer,
                is_pamper: c.is_pamper,
            }),
        }
    }

    pub fn display_name(&self, party_type: PartyType, id: &str) -> Option<&str> {
        match party_type {
            PartyType::Supplier => self.suppliers.get(id).map(|s| s.name.as_str()),
            PartyType::Customer | PartyType::Pamper => {
                self.customers.get(id).map(|c| c.name.as_str())
            }
        }
    }

    pub fn commission_percentage(&self, party_type: PartyType, id: &str) -> Option<f64> {
        match party_type {
            PartyType::Supplier => self.suppliers.get(id).map(|s| s.commission_percentage),
            PartyType::Customer | PartyType::Pamper => {
                self.customers.get(id).map(|c| c.commission_percentage)
            }
        }
    }

    /// Party ids of the given type that pass `filter`, sorted by id
    pub fn select(&self, party_type: PartyType, filter: &PartyFilter) -> Vec<&str> {
        let ids: Vec<&str> = match party_type {
            PartyType::Supplier => self.suppliers.keys().map(String::as_str).collect(),
            PartyType::Customer | PartyType::Pamper => {
                self.customers.keys().map(String::as_str).collect()
            }
        };

        ids.into_iter()
            .filter(|id| {
                self.flags(party_type, id)
                    .is_some_and(|flags| filter.matches(id, flags))
            })
            .collect()
    }

    /// Fails unless `id` exists and passes `filter`
    pub fn require(&self, party_type: PartyType, id: &str, filter: &PartyFilter) -> Result<()> {
        let flags = self
            .flags(party_type, id)
            .ok_or_else(|| AgriError::PartyNotFound {
                party_type: party_type.to_string(),
                party: id.to_string(),
            })?;

        if filter.matches(id, flags) {
            Ok(())
        } else {
            Err(AgriError::PartyNotSelectable {
                party_type: party_type.to_string(),
                party: id.to_string(),
            })
        }
    }

    /// Add a farmer supplier together with its related farmer customer.
    /// Returns the id of the customer record.
    pub fn register_supplier(&mut self, id: &str, mut supplier: Supplier) -> String {
        let mut customer_id = id.to_string();
        let mut suffix = 1;
        while self.customers.contains_key(&customer_id) {
            customer_id = format!("{id}-{suffix}");
            suffix += 1;
        }

        self.customers.insert(
            customer_id.clone(),
            Customer {
                name: supplier.name.clone(),
                is_customer: false,
                is_farmer: true,
                is_pamper: false,
                commission_percentage: supplier.commission_percentage,
            },
        );

        supplier.related_customer = Some(customer_id.clone());
        self.suppliers.insert(id.to_string(), supplier);
        customer_id
    }
}
