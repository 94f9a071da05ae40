use assert_cmd::prelude::*;
use chrono::Datelike;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn agri_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("agri"))
}

/// Initialized config dir inside a fresh temp dir
fn setup() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("agri-config");

    agri_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();

    (temp_dir, config_path)
}

fn agri(config_path: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    agri_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(args)
        .assert()
}

/// Submitted form AMF-2024-0001: farmer-a sells 10 x 30.00 to acme, agent-x as pamper
fn submitted_form(config_path: &Path) {
    agri(
        config_path,
        &[
            "form",
            "new",
            "--supplier",
            "farmer-a",
            "--customer",
            "acme",
            "--pamper",
            "agent-x",
            "--date",
            "2024-01-05",
        ],
    )
    .success()
    .stdout(predicate::str::contains("Created draft form AMF-2024-0001"));

    agri(
        config_path,
        &["form", "add-item", "AMF-2024-0001", "tomatoes", "--qty", "10", "--price", "30"],
    )
    .success()
    .stdout(predicate::str::contains("items row 1 = $300.00"));

    agri(config_path, &["form", "submit", "AMF-2024-0001"])
        .success()
        .stdout(predicate::str::contains("grand total $300.00"));
}

const JANUARY: [&str; 4] = ["--from", "2024-01-01", "--to", "2024-01-31"];

#[test]
fn test_help() {
    agri_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Commission invoicing for agricultural marketing",
        ));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("agri-config");

    agri_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized agri config"));

    assert!(config_path.join("config.toml").exists());
    assert!(config_path.join("parties.toml").exists());
    assert!(config_path.join("items.toml").exists());
}

#[test]
fn test_init_fails_if_exists() {
    let (_temp_dir, config_path) = setup();

    agri(&config_path, &["init"])
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent");

    agri(&config_path, &["forms"])
        .failure()
        .stderr(predicate::str::contains("Run 'agri init'"));
}

#[test]
fn test_parties_list() {
    let (_temp_dir, config_path) = setup();

    agri(&config_path, &["parties"])
        .success()
        .stdout(predicate::str::contains("Farmer A"))
        .stdout(predicate::str::contains("ACME Grocers"))
        .stdout(predicate::str::contains("customer, pamper"));
}

#[test]
fn test_parties_filtered_to_pampers() {
    let (_temp_dir, config_path) = setup();

    agri(&config_path, &["parties", "--type", "pamper"])
        .success()
        .stdout(predicate::str::contains("Agent X"))
        .stdout(predicate::str::contains("ACME Grocers").not())
        .stdout(predicate::str::contains("Suppliers").not());
}

#[test]
fn test_items_list() {
    let (_temp_dir, config_path) = setup();

    agri(&config_path, &["items"])
        .success()
        .stdout(predicate::str::contains("tomatoes"))
        .stdout(predicate::str::contains("Commission"))
        .stdout(predicate::str::contains("commission"));
}

#[test]
fn test_add_supplier_creates_related_customer() {
    let (_temp_dir, config_path) = setup();

    agri(
        &config_path,
        &["add-supplier", "farmer-b", "--name", "Farmer B", "--commission", "5"],
    )
    .success()
    .stdout(predicate::str::contains("related customer: farmer-b"));

    let parties = fs::read_to_string(config_path.join("parties.toml")).unwrap();
    assert!(parties.contains("[customers.farmer-b]"));
    assert!(parties.contains("related_customer = \"farmer-b\""));
}

#[test]
fn test_add_supplier_with_taken_customer_id() {
    let (_temp_dir, config_path) = setup();

    // acme is already a customer id
    agri(&config_path, &["add-supplier", "acme", "--name", "ACME Farms"])
        .success()
        .stdout(predicate::str::contains("related customer: acme-1"));
}

#[test]
fn test_form_new_rejects_farmer_as_customer() {
    let (_temp_dir, config_path) = setup();

    agri(
        &config_path,
        &["form", "new", "--supplier", "farmer-a", "--customer", "farmer-a"],
    )
    .failure()
    .stderr(predicate::str::contains("cannot be selected"));
}

#[test]
fn test_form_new_unknown_supplier() {
    let (_temp_dir, config_path) = setup();

    agri(
        &config_path,
        &["form", "new", "--supplier", "nobody", "--customer", "acme"],
    )
    .failure()
    .stderr(predicate::str::contains("'nobody' not found"));
}

#[test]
fn test_form_line_editing() {
    let (_temp_dir, config_path) = setup();

    agri(
        &config_path,
        &[
            "form",
            "new",
            "--supplier",
            "farmer-a",
            "--customer",
            "acme",
            "--date",
            "2024-03-10",
        ],
    )
    .success();

    agri(
        &config_path,
        &["form", "add-item", "AMF-2024-0001", "tomatoes", "--qty", "4", "--price", "2.5"],
    )
    .success()
    .stdout(predicate::str::contains("$10.00"));

    agri(&config_path, &["form", "set-qty", "AMF-2024-0001", "1", "6"])
        .success()
        .stdout(predicate::str::contains("$15.00"));

    agri(&config_path, &["form", "set-price", "AMF-2024-0001", "1", "3"])
        .success()
        .stdout(predicate::str::contains("$18.00"));

    agri(&config_path, &["form", "set-qty", "AMF-2024-0001", "5", "1"])
        .failure()
        .stderr(predicate::str::contains("Row 5 not found in items"));

    agri(&config_path, &["form", "set-qty", "AMF-2024-0001", "0", "1"])
        .failure()
        .stderr(predicate::str::contains("invalid value '0'"));

    agri(&config_path, &["form", "remove-item", "AMF-2024-0001", "0"])
        .failure()
        .stderr(predicate::str::contains("invalid value '0'"));

    agri(&config_path, &["form", "show", "AMF-2024-0001"])
        .success()
        .stdout(predicate::str::contains("Tomatoes"))
        .stdout(predicate::str::contains("Grand total: $18.00"))
        .stdout(predicate::str::contains("DRAFT"));
}

#[test]
fn test_form_item_pickers() {
    let (_temp_dir, config_path) = setup();

    agri(
        &config_path,
        &["form", "new", "--supplier", "farmer-a", "--customer", "acme"],
    )
    .success();

    let year = chrono::Local::now().year();
    let form_id = format!("AMF-{year}-0001");

    agri(&config_path, &["form", "add-item", &form_id, "commission"])
        .failure()
        .stderr(predicate::str::contains("not allowed in items"));

    agri(&config_path, &["form", "add-commission", &form_id, "tomatoes"])
        .failure()
        .stderr(predicate::str::contains("not allowed in commissions"));

    agri(
        &config_path,
        &["form", "add-commission", &form_id, "commission", "--commission", "12", "--taxes", "3"],
    )
    .success()
    .stdout(predicate::str::contains("commissions row 1 = $15.00"));

    agri(&config_path, &["form", "add-item", &form_id, "onions"])
        .failure()
        .stderr(predicate::str::contains("Item 'onions' not found"));
}

#[test]
fn test_header_customer_propagates_to_lines() {
    let (_temp_dir, config_path) = setup();

    agri(
        &config_path,
        &[
            "form",
            "new",
            "--supplier",
            "farmer-a",
            "--customer",
            "acme",
            "--date",
            "2024-02-01",
        ],
    )
    .success();
    agri(&config_path, &["form", "add-item", "AMF-2024-0001", "tomatoes"]).success();
    agri(&config_path, &["form", "add-item", "AMF-2024-0001", "potatoes"]).success();

    agri(&config_path, &["form", "set-customer", "AMF-2024-0001", "agent-x"])
        .success()
        .stdout(predicate::str::contains("customer set on 2 rows"));

    agri(&config_path, &["form", "show", "AMF-2024-0001"])
        .success()
        .stdout(predicate::str::contains("acme").not());
}

#[test]
fn test_line_pamper_is_limited_to_header_pamper() {
    let (_temp_dir, config_path) = setup();

    agri(
        &config_path,
        &["form", "new", "--supplier", "farmer-a", "--customer", "acme", "--pamper", "agent-x", "--date", "2024-01-06"],
    )
    .success();
    agri(&config_path, &["form", "add-item", "AMF-2024-0001", "tomatoes"]).success();

    agri(&config_path, &["form", "set-line-pamper", "AMF-2024-0001", "1", "beta"])
        .failure()
        .stderr(predicate::str::contains("cannot be selected here"));

    agri(&config_path, &["form", "set-line-pamper", "AMF-2024-0001", "1"]).success();
    agri(&config_path, &["form", "show", "AMF-2024-0001"])
        .success()
        .stdout(predicate::str::contains("Pamper:   agent-x"))
        .stdout(predicate::str::contains("│ agent-x").not());

    agri(&config_path, &["form", "set-line-pamper", "AMF-2024-0001", "1", "agent-x"]).success();
    agri(&config_path, &["form", "show", "AMF-2024-0001"])
        .success()
        .stdout(predicate::str::contains("│ agent-x"));
}

#[test]
fn test_pamper_commission_rows() {
    let (_temp_dir, config_path) = setup();
    submitted_form(&config_path);

    agri(
        &config_path,
        &["form", "new", "--supplier", "farmer-a", "--customer", "acme", "--pamper", "agent-x", "--date", "2024-01-06"],
    )
    .success();

    agri(
        &config_path,
        &["form", "add-pamper-commission", "AMF-2024-0002", "--price", "200", "--percentage", "5"],
    )
    .success()
    .stdout(predicate::str::contains("pamper_commissions row 1 = $10.00"));

    agri(
        &config_path,
        &["form", "set-pamper-commission", "AMF-2024-0002", "1", "--price", "300"],
    )
    .success()
    .stdout(predicate::str::contains("$15.00"));
}

#[test]
fn test_submitted_form_is_read_only() {
    let (_temp_dir, config_path) = setup();
    submitted_form(&config_path);

    agri(&config_path, &["form", "set-qty", "AMF-2024-0001", "1", "2"])
        .failure()
        .stderr(predicate::str::contains("SUBMITTED and cannot be changed"));

    agri(&config_path, &["form", "cancel", "AMF-2024-0001"])
        .success()
        .stdout(predicate::str::contains("Cancelled AMF-2024-0001"));

    agri(&config_path, &["forms"])
        .success()
        .stdout(predicate::str::contains("CANCELLED"));
}

#[test]
fn test_commissions_missing_filters() {
    let (_temp_dir, config_path) = setup();

    agri(&config_path, &["commissions"])
        .failure()
        .stderr(predicate::str::contains(
            "Missing Filters: To Date, From Date, Party Type, Party",
        ));

    agri(
        &config_path,
        &["commissions", "--from", "2024-01-01", "--party-type", "customer"],
    )
    .failure()
    .stderr(predicate::str::contains("Missing Filters: To Date, Party"));
}

#[test]
fn test_commissions_inverted_range() {
    let (_temp_dir, config_path) = setup();

    agri(
        &config_path,
        &[
            "commissions",
            "--from",
            "2024-02-01",
            "--to",
            "2024-01-01",
            "--party-type",
            "customer",
            "--party",
            "acme",
        ],
    )
    .failure()
    .stderr(predicate::str::contains("To date must be after from date"));
}

#[test]
fn test_commissions_invalid_date() {
    let (_temp_dir, config_path) = setup();

    agri(&config_path, &["commissions", "--from", "01/02/2024"])
        .failure()
        .stderr(predicate::str::contains("Invalid date '01/02/2024'"));
}

#[test]
fn test_commissions_rejects_farmer_customer() {
    let (_temp_dir, config_path) = setup();

    let mut args = vec!["commissions"];
    args.extend(JANUARY);
    args.extend(["--party-type", "customer", "--party", "farmer-a"]);

    agri(&config_path, &args)
        .failure()
        .stderr(predicate::str::contains("cannot be selected"));
}

#[test]
fn test_commissions_empty() {
    let (_temp_dir, config_path) = setup();

    let mut args = vec!["commissions"];
    args.extend(JANUARY);
    args.extend(["--party-type", "customer", "--party", "acme"]);

    agri(&config_path, &args)
        .success()
        .stdout(predicate::str::contains("Party has no data to show."));
}

#[test]
fn test_commissions_create_and_cancel() {
    let (_temp_dir, config_path) = setup();
    submitted_form(&config_path);

    let mut args = vec!["commissions"];
    args.extend(JANUARY);
    args.extend(["--party-type", "customer", "--party", "acme"]);

    agri(&config_path, &args)
        .success()
        .stdout(predicate::str::contains("AMF-2024-0001"))
        .stdout(predicate::str::contains("$6.00"))
        .stdout(predicate::str::contains("--create"));

    let mut create = args.clone();
    create.push("--create");
    agri(&config_path, &create)
        .success()
        .stdout(predicate::str::contains(
            "Invoices Created Successfully (1 created)",
        ));

    // Invoiced lines drop out of the next query
    agri(&config_path, &args)
        .success()
        .stdout(predicate::str::contains("Party has no data to show."));

    let number = format!("COM-{}-0001", chrono::Local::now().year());
    agri(&config_path, &["commission-invoices"])
        .success()
        .stdout(predicate::str::contains(number.as_str()))
        .stdout(predicate::str::contains("ACTIVE"));

    agri(&config_path, &["cancel-commission", &number])
        .success()
        .stdout(predicate::str::contains("1 source form(s) released"));

    agri(&config_path, &["cancel-commission", &number])
        .failure()
        .stderr(predicate::str::contains("already cancelled"));

    // Released lines are available again
    agri(&config_path, &args)
        .success()
        .stdout(predicate::str::contains("AMF-2024-0001"));
}

#[test]
fn test_supplier_commission() {
    let (_temp_dir, config_path) = setup();
    submitted_form(&config_path);

    let mut args = vec!["commissions"];
    args.extend(JANUARY);
    args.extend(["--party-type", "supplier", "--party", "farmer-a"]);

    // 300.00 at 7%
    agri(&config_path, &args)
        .success()
        .stdout(predicate::str::contains("$21.00"));
}

#[test]
fn test_add_payment() {
    let (_temp_dir, config_path) = setup();

    agri(
        &config_path,
        &["add-payment", "--party-type", "customer", "--party", "acme", "0"],
    )
    .failure()
    .stderr(predicate::str::contains("greater than zero"));

    agri(
        &config_path,
        &[
            "add-payment",
            "--party-type",
            "customer",
            "--party",
            "acme",
            "150",
            "--date",
            "2024-01-20",
        ],
    )
    .success()
    .stdout(predicate::str::contains("Recorded $150.00"))
    .stdout(predicate::str::contains("PAY-2024-0001"));

    agri(
        &config_path,
        &["add-payment", "--party-type", "customer", "--party", "ghost", "10"],
    )
    .failure()
    .stderr(predicate::str::contains("'ghost' not found"));
}

#[test]
fn test_statements_missing_party_type() {
    let (_temp_dir, config_path) = setup();

    agri(&config_path, &["statements"])
        .failure()
        .stderr(predicate::str::contains("Missing Filters: Party Type"));
}

#[test]
fn test_statements_without_data() {
    let (temp_dir, config_path) = setup();
    let dest = temp_dir.path().join("downloads");

    agri(
        &config_path,
        &[
            "statements",
            "--party-type",
            "customer",
            "--dest",
            dest.to_str().unwrap(),
        ],
    )
    .success()
    .stdout(predicate::str::contains("Party has no data to show."));

    assert!(!dest.exists());
}
