use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calc::commission;
use crate::config::{PartyCatalog, PartyType};
use crate::error::{AgriError, Result};
use crate::form::{FormStatus, InvoiceForm};

/// Filters of the commission management page. All four are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_type: Option<PartyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
}

/// Filters that passed [`AggregationFilters::validate`]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFilters {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub party_type: PartyType,
    pub party: String,
}

impl AggregationFilters {
    /// Collects every missing filter into a single `MissingFilter` error,
    /// in the order To Date, From Date, Party Type, Party.
    pub fn validate(&self) -> Result<ValidatedFilters> {
        let party = self
            .party
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let mut missing = Vec::new();
        if self.to_date.is_none() {
            missing.push("To Date".to_string());
        }
        if self.from_date.is_none() {
            missing.push("From Date".to_string());
        }
        if self.party_type.is_none() {
            missing.push("Party Type".to_string());
        }
        if party.is_none() {
            missing.push("Party".to_string());
        }

        match (self.from_date, self.to_date, self.party_type, party) {
            (Some(from_date), Some(to_date), Some(party_type), Some(party)) => {
                if to_date < from_date {
                    return Err(AgriError::InvalidDateRange);
                }
                Ok(ValidatedFilters {
                    from_date,
                    to_date,
                    party_type,
                    party: party.to_string(),
                })
            }
            _ => Err(AgriError::MissingFilter(missing)),
        }
    }
}

/// Commission owed by one party on one invoice form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyInvoiceGroup {
    pub party_type: PartyType,
    pub party: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub invoice_id: String,
    pub posting_date: NaiveDate,
    /// Item lines attributed to the party
    pub line_count: usize,
    pub line_total: f64,
    pub commission_total: f64,
}

/// Group every not-yet-invoiced record of the filtered party by source form.
///
/// Only submitted forms posted within the date range (inclusive) are
/// considered. The party is taken as given: picker restrictions are the
/// caller's concern. An empty result means there is nothing to invoice.
pub fn aggregate(
    forms: &[InvoiceForm],
    parties: &PartyCatalog,
    filters: &AggregationFilters,
) -> Result<Vec<PartyInvoiceGroup>> {
    let filters = filters.validate()?;

    let percentage = parties
        .commission_percentage(filters.party_type, &filters.party)
        .unwrap_or_else(|| {
            warn!(
                party_type = %filters.party_type,
                party = %filters.party,
                "party missing from catalog, using 0% commission"
            );
            0.0
        });

    let mut groups: Vec<PartyInvoiceGroup> = forms
        .iter()
        .filter(|f| f.status() == FormStatus::Submitted)
        .filter(|f| f.posting_date() >= filters.from_date && f.posting_date() <= filters.to_date)
        .filter_map(|form| match filters.party_type {
            PartyType::Supplier => supplier_group(form, &filters, percentage),
            PartyType::Customer => customer_group(form, &filters, percentage, false),
            PartyType::Pamper => customer_group(form, &filters, percentage, true),
        })
        .collect();

    groups.sort_by(|a, b| {
        a.posting_date
            .cmp(&b.posting_date)
            .then_with(|| a.invoice_id.cmp(&b.invoice_id))
    });

    debug!(
        party_type = %filters.party_type,
        party = %filters.party,
        groups = groups.len(),
        "aggregated party invoices"
    );

    Ok(groups)
}

fn new_group(form: &InvoiceForm, filters: &ValidatedFilters) -> PartyInvoiceGroup {
    PartyInvoiceGroup {
        party_type: filters.party_type,
        party: filters.party.clone(),
        from_date: filters.from_date,
        to_date: filters.to_date,
        invoice_id: form.id.clone(),
        posting_date: form.posting_date(),
        line_count: 0,
        line_total: 0.0,
        commission_total: 0.0,
    }
}

// The supplier's commission is taken on the whole form.
fn supplier_group(
    form: &InvoiceForm,
    filters: &ValidatedFilters,
    percentage: f64,
) -> Option<PartyInvoiceGroup> {
    if form.supplier() != filters.party || form.has_supplier_commission_invoice() {
        return None;
    }

    let grand_total = form.grand_total();
    Some(PartyInvoiceGroup {
        line_count: form.items().len(),
        line_total: grand_total,
        commission_total: commission(Some(grand_total), Some(percentage)),
        ..new_group(form, filters)
    })
}

// Customers pay commission per line billed to them. Agents additionally
// collect their pamper commission rows.
fn customer_group(
    form: &InvoiceForm,
    filters: &ValidatedFilters,
    percentage: f64,
    include_pamper_rows: bool,
) -> Option<PartyInvoiceGroup> {
    let mut group = new_group(form, filters);
    let mut eligible = false;

    for line in form
        .items()
        .iter()
        .filter(|l| l.customer == filters.party && !l.has_commission_invoice)
    {
        eligible = true;
        group.line_count += 1;
        group.line_total += line.total();
        group.commission_total += commission(Some(line.total()), Some(percentage));
    }

    if include_pamper_rows {
        for row in form
            .pamper_commissions()
            .iter()
            .filter(|r| r.pamper == filters.party && !r.has_commission_invoice)
        {
            eligible = true;
            group.commission_total += row.commission();
        }
    }

    eligible.then_some(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Customer, Item, Supplier};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn produce() -> Item {
        Item {
            name: "Produce".into(),
            commission_item: false,
        }
    }

    fn parties() -> PartyCatalog {
        let mut parties = PartyCatalog::default();
        parties.suppliers.insert(
            "FarmerA".into(),
            Supplier {
                name: "Farmer A".into(),
                is_farmer: true,
                commission_percentage: 10.0,
                related_customer: None,
            },
        );
        parties.customers.insert(
            "ACME".into(),
            Customer {
                name: "ACME".into(),
                is_customer: true,
                is_farmer: false,
                is_pamper: false,
                commission_percentage: 2.0,
            },
        );
        parties.customers.insert(
            "AgentX".into(),
            Customer {
                name: "Agent X".into(),
                is_customer: true,
                is_farmer: false,
                is_pamper: true,
                commission_percentage: 1.0,
            },
        );
        parties
    }

    fn submitted(id: &str, posted: NaiveDate, supplier: &str, lines: &[(f64, f64)]) -> InvoiceForm {
        let mut form = InvoiceForm::new(id, posted, supplier, "ACME", Some("AgentX".into()));
        for (qty, price) in lines {
            form.add_item("produce", &produce(), Some(*qty), Some(*price))
                .unwrap();
        }
        form.submit().unwrap();
        form
    }

    fn filters(party_type: PartyType, party: &str) -> AggregationFilters {
        AggregationFilters {
            from_date: Some(date(2024, 1, 1)),
            to_date: Some(date(2024, 1, 31)),
            party_type: Some(party_type),
            party: Some(party.into()),
        }
    }

    #[test]
    fn missing_filters_are_all_reported() {
        let err = AggregationFilters::default().validate().unwrap_err();
        match err {
            AgriError::MissingFilter(names) => {
                assert_eq!(names, ["To Date", "From Date", "Party Type", "Party"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_to_date_and_party_are_listed_together() {
        let filters = AggregationFilters {
            from_date: Some(date(2024, 1, 1)),
            to_date: None,
            party_type: Some(PartyType::Supplier),
            party: Some("  ".into()),
        };
        match filters.validate() {
            Err(AgriError::MissingFilter(names)) => assert_eq!(names, ["To Date", "Party"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut filters = filters(PartyType::Supplier, "FarmerA");
        filters.from_date = Some(date(2024, 2, 1));
        assert!(matches!(filters.validate(), Err(AgriError::InvalidDateRange)));
    }

    #[test]
    fn supplier_groups_cover_only_that_supplier_within_range() {
        let forms = vec![
            submitted("F1", date(2024, 1, 10), "FarmerA", &[(10.0, 5.0)]),
            submitted("F2", date(2024, 1, 12), "FarmerB", &[(10.0, 5.0)]),
            submitted("F3", date(2024, 2, 1), "FarmerA", &[(10.0, 5.0)]),
            submitted("F4", date(2024, 1, 31), "FarmerA", &[(2.0, 100.0)]),
        ];

        let groups = aggregate(&forms, &parties(), &filters(PartyType::Supplier, "FarmerA")).unwrap();

        let ids: Vec<_> = groups.iter().map(|g| g.invoice_id.as_str()).collect();
        assert_eq!(ids, ["F1", "F4"]);
        assert_eq!(groups[0].line_total, 50.0);
        assert_eq!(groups[0].commission_total, 5.0);
        assert_eq!(groups[1].commission_total, 20.0);
    }

    #[test]
    fn drafts_and_invoiced_forms_are_skipped() {
        let mut invoiced = submitted("F1", date(2024, 1, 10), "FarmerA", &[(1.0, 1.0)]);
        invoiced.set_supplier_invoiced(true);
        let draft = InvoiceForm::new("F2", date(2024, 1, 10), "FarmerA", "ACME", None);

        let groups =
            aggregate(&[invoiced, draft], &parties(), &filters(PartyType::Supplier, "FarmerA"))
                .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn no_matching_records_is_an_empty_result() {
        let forms = vec![submitted("F1", date(2024, 1, 10), "FarmerA", &[(1.0, 1.0)])];
        let groups = aggregate(&forms, &parties(), &filters(PartyType::Supplier, "Nobody")).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn customer_groups_sum_only_their_lines() {
        let mut form = InvoiceForm::new(
            "F1",
            date(2024, 1, 10),
            "FarmerA",
            "ACME",
            Some("AgentX".into()),
        );
        form.add_item("produce", &produce(), Some(10.0), Some(10.0)).unwrap();
        form.add_item("produce", &produce(), Some(5.0), Some(10.0)).unwrap();
        form.set_item_customer(1, "AgentX").unwrap();
        form.submit().unwrap();

        let groups = aggregate(&[form], &parties(), &filters(PartyType::Customer, "ACME")).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].line_count, 1);
        assert_eq!(groups[0].line_total, 100.0);
        assert_eq!(groups[0].commission_total, 2.0);
    }

    #[test]
    fn pamper_groups_include_pamper_commission_rows() {
        let mut form = InvoiceForm::new(
            "F1",
            date(2024, 1, 10),
            "FarmerA",
            "ACME",
            Some("AgentX".into()),
        );
        form.add_item("produce", &produce(), Some(10.0), Some(10.0)).unwrap();
        form.add_pamper_commission(Some(200.0), Some(5.0)).unwrap();
        form.submit().unwrap();

        let groups = aggregate(&[form], &parties(), &filters(PartyType::Pamper, "AgentX")).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].line_count, 0);
        assert_eq!(groups[0].commission_total, 10.0);
    }

    #[test]
    fn invoiced_customer_lines_are_skipped() {
        let mut form = submitted("F1", date(2024, 1, 10), "FarmerA", &[(1.0, 1.0)]);
        form.mark_lines_invoiced("ACME", true);
        let groups = aggregate(&[form], &parties(), &filters(PartyType::Customer, "ACME")).unwrap();
        assert!(groups.is_empty());
    }
}
