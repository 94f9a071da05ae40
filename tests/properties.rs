use agri::calc::{commission, commission_line_total, line_total};
use agri::commission::{aggregate, AggregationFilters};
use agri::config::{Item, PartyCatalog, PartyType, Supplier};
use agri::error::AgriError;
use agri::form::InvoiceForm;
use chrono::NaiveDate;
use proptest::prelude::*;

fn tomatoes() -> Item {
    Item {
        name: "Tomatoes".into(),
        commission_item: false,
    }
}

fn catalog() -> PartyCatalog {
    let mut parties = PartyCatalog::default();
    for (id, pct) in [("farmer-a", 7.0), ("farmer-b", 4.0)] {
        parties.register_supplier(
            id,
            Supplier {
                name: id.to_string(),
                is_farmer: true,
                commission_percentage: pct,
                related_customer: None,
            },
        );
    }
    parties
}

fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(offset))
}

prop_compose! {
    /// Submitted form for one of two suppliers on one of the first 60 days of 2024
    fn arb_form(idx: usize)(
        supplier in prop::sample::select(vec!["farmer-a", "farmer-b"]),
        offset in 0u32..60,
        qty in 0.0f64..1_000.0,
        price in 0.0f64..100.0,
    ) -> InvoiceForm {
        let mut form = InvoiceForm::new(format!("AMF-2024-{idx:04}"), day(offset), supplier, "acme", None);
        form.add_item("tomatoes", &tomatoes(), Some(qty), Some(price)).unwrap();
        form.submit().unwrap();
        form
    }
}

fn arb_forms() -> impl Strategy<Value = Vec<InvoiceForm>> {
    (1usize..8).prop_flat_map(|n| (0..n).map(arb_form).collect::<Vec<_>>())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn line_total_is_product(q in 0.0f64..1e6, p in 0.0f64..1e6) {
        prop_assert_eq!(line_total(Some(q), Some(p)), q * p);
        prop_assert_eq!(line_total(None, Some(p)), 0.0);
        prop_assert_eq!(line_total(Some(q), None), 0.0);
    }

    #[test]
    fn commission_line_total_is_sum(c in 0.0f64..1e6, t in 0.0f64..1e6) {
        prop_assert_eq!(commission_line_total(Some(c), Some(t)), c + t);
    }

    /// Negative and above-100 percentages pass through unclamped
    #[test]
    fn commission_is_not_clamped(p in 0.0f64..1e6, r in -500.0f64..500.0) {
        prop_assert_eq!(commission(Some(p), Some(r)), p * r / 100.0);
    }

    #[test]
    fn missing_filters_are_all_listed_in_order(
        from in any::<bool>(),
        to in any::<bool>(),
        party_type in any::<bool>(),
        party in any::<bool>(),
    ) {
        let filters = AggregationFilters {
            from_date: from.then(|| day(0)),
            to_date: to.then(|| day(30)),
            party_type: party_type.then_some(PartyType::Supplier),
            party: party.then(|| "farmer-a".to_string()),
        };

        let mut expected = Vec::new();
        if !to { expected.push("To Date"); }
        if !from { expected.push("From Date"); }
        if !party_type { expected.push("Party Type"); }
        if !party { expected.push("Party"); }

        match filters.validate() {
            Ok(_) => prop_assert!(expected.is_empty()),
            Err(AgriError::MissingFilter(labels)) => prop_assert_eq!(labels, expected),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn supplier_aggregation_stays_within_supplier_and_range(
        forms in arb_forms(),
        start in 0u32..60,
        len in 0u32..60,
    ) {
        let filters = AggregationFilters {
            from_date: Some(day(start)),
            to_date: Some(day(start + len)),
            party_type: Some(PartyType::Supplier),
            party: Some("farmer-a".into()),
        };

        let groups = aggregate(&forms, &catalog(), &filters).unwrap();

        let expected = forms
            .iter()
            .filter(|f| f.supplier() == "farmer-a")
            .filter(|f| f.posting_date() >= day(start) && f.posting_date() <= day(start + len))
            .count();
        prop_assert_eq!(groups.len(), expected);

        for group in &groups {
            let form = forms.iter().find(|f| f.id == group.invoice_id).unwrap();
            prop_assert_eq!(form.supplier(), "farmer-a");
            prop_assert_eq!(group.commission_total, commission(Some(form.grand_total()), Some(7.0)));
        }
    }

    #[test]
    fn header_customer_reaches_every_line(lines in 1usize..10, switch_to_agent in any::<bool>()) {
        let mut form = InvoiceForm::new("AMF-2024-0001", day(0), "farmer-a", "acme", Some("agent-x".into()));
        for _ in 0..lines {
            form.add_item("tomatoes", &tomatoes(), Some(1.0), Some(1.0)).unwrap();
        }

        let customer = if switch_to_agent { "agent-x" } else { "beta" };
        let refreshed = form.set_customer(customer).unwrap();

        prop_assert_eq!(refreshed.len(), lines);
        prop_assert!(form.items().iter().all(|l| l.customer == customer));
        prop_assert!(form.items().iter().all(|l| l.pamper.as_deref() == Some("agent-x")));
    }
}
