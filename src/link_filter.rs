//! Typed predicates used to populate link pickers.
//!
//! Each picker on the invoice form, the commission page and the statement
//! page narrows the selectable parties or items with one of these filters.
//! A `None` field places no restriction.

use crate::config::{Item, PartyType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartyFlags {
    pub is_farmer: bool,
    pub is_customer: bool,
    pub is_pamper: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyFilter {
    pub is_farmer: Option<bool>,
    pub is_customer: Option<bool>,
    pub is_pamper: Option<bool>,
    pub names: Option<Vec<String>>,
}

impl PartyFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn farmers() -> Self {
        Self {
            is_farmer: Some(true),
            ..Self::default()
        }
    }

    pub fn non_farmers() -> Self {
        Self {
            is_farmer: Some(false),
            ..Self::default()
        }
    }

    pub fn customers() -> Self {
        Self {
            is_customer: Some(true),
            ..Self::default()
        }
    }

    pub fn pampers() -> Self {
        Self {
            is_pamper: Some(true),
            ..Self::default()
        }
    }

    /// Restrict to an explicit set of ids; empty entries are ignored
    pub fn named<'a>(names: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        Self {
            names: Some(names.into_iter().flatten().map(str::to_string).collect()),
            ..Self::default()
        }
    }

    /// Party picker on the commission management page
    pub fn for_aggregation(party_type: PartyType) -> Self {
        match party_type {
            PartyType::Customer => Self::non_farmers(),
            PartyType::Pamper => Self::pampers(),
            PartyType::Supplier => Self::any(),
        }
    }

    /// Party picker on the statement page
    pub fn for_statement(party_type: PartyType) -> Self {
        match party_type {
            PartyType::Customer => Self::customers(),
            PartyType::Pamper => Self::pampers(),
            PartyType::Supplier => Self::any(),
        }
    }

    pub fn admits_name(&self, id: &str) -> bool {
        self.names
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| n == id))
    }

    pub fn matches(&self, id: &str, flags: PartyFlags) -> bool {
        fn check(wanted: Option<bool>, actual: bool) -> bool {
            wanted.map_or(true, |w| w == actual)
        }

        check(self.is_farmer, flags.is_farmer)
            && check(self.is_customer, flags.is_customer)
            && check(self.is_pamper, flags.is_pamper)
            && self.admits_name(id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub commission_item: Option<bool>,
}

impl ItemFilter {
    /// Items allowed on quantity/price lines
    pub fn line_items() -> Self {
        Self {
            commission_item: Some(false),
        }
    }

    /// Items allowed on commission rows and as the settings' commission item
    pub fn commission_items() -> Self {
        Self {
            commission_item: Some(true),
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.commission_item
            .map_or(true, |wanted| wanted == item.commission_item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FARMER: PartyFlags = PartyFlags {
        is_farmer: true,
        is_customer: false,
        is_pamper: false,
    };

    const BUYER: PartyFlags = PartyFlags {
        is_farmer: false,
        is_customer: true,
        is_pamper: false,
    };

    #[test]
    fn customer_aggregation_picker_excludes_farmers() {
        let filter = PartyFilter::for_aggregation(PartyType::Customer);
        assert!(!filter.matches("farmer-a", FARMER));
        assert!(filter.matches("acme", BUYER));
    }

    #[test]
    fn supplier_pickers_are_unrestricted() {
        assert_eq!(PartyFilter::for_aggregation(PartyType::Supplier), PartyFilter::any());
        assert_eq!(PartyFilter::for_statement(PartyType::Supplier), PartyFilter::any());
    }

    #[test]
    fn named_filter_skips_missing_entries() {
        let filter = PartyFilter::named([Some("acme"), None]);
        assert_eq!(filter.names, Some(vec!["acme".to_string()]));
        assert!(filter.matches("acme", BUYER));
        assert!(!filter.matches("beta", BUYER));
    }

    #[test]
    fn item_filters_split_commission_items() {
        let grapes = Item {
            name: "Grapes".into(),
            commission_item: false,
        };
        let fee = Item {
            name: "Commission".into(),
            commission_item: true,
        };

        assert!(ItemFilter::line_items().matches(&grapes));
        assert!(!ItemFilter::line_items().matches(&fee));
        assert!(ItemFilter::commission_items().matches(&fee));
        assert!(ItemFilter::default().matches(&grapes));
    }
}
