use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use agri::commission::{cancel_commission_invoice, AggregationFilters, CommissionBackend, CommissionSession};
use agri::config::{
    config_dir, format_number, load_config, load_items, load_parties, load_state,
    resolve_output_dir, save_parties, save_state, Item, PartyCatalog, PartyType, PaymentEntry,
    PaymentType, State, Supplier, CONFIG_TEMPLATE, ITEMS_TEMPLATE, PARTIES_TEMPLATE,
};
use agri::error::{AgriError, Result};
use agri::form::{InvoiceForm, Refresh};
use agri::link_filter::PartyFilter;
use agri::pdf::{generate_form_pdf, FormDocument};
use agri::statement::{Downloader, ReportBackend, StatementFilters};
use agri::{logging, LocalBackend, RemoteBackend};

const PAYMENT_NUMBER_FORMAT: &str = "PAY-{year}-{seq:04}";

#[derive(Parser)]
#[command(name = "agri")]
#[command(version, about = "Commission invoicing for agricultural marketing", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.agri or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// List configured suppliers and customers
    Parties {
        /// Only show one party type (supplier, customer, pamper)
        #[arg(long = "type")]
        party_type: Option<PartyType>,
    },

    /// List available items
    Items,

    /// Register a supplier together with its related farmer customer
    AddSupplier {
        /// Identifier used on the command line
        id: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Commission percentage charged to the supplier
        #[arg(long, default_value_t = 0.0)]
        commission: f64,

        /// Register a supplier that is not a farmer
        #[arg(long)]
        not_farmer: bool,
    },

    /// Create and edit invoice forms
    #[command(subcommand)]
    Form(FormCommand),

    /// List invoice forms
    Forms {
        /// Number of forms to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a party's un-invoiced commissions, optionally creating invoices
    Commissions {
        /// Start of the period (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End of the period (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// supplier, customer or pamper
        #[arg(long)]
        party_type: Option<PartyType>,

        /// Party identifier from parties.toml
        #[arg(long)]
        party: Option<String>,

        /// Create one commission invoice per listed form
        #[arg(long)]
        create: bool,
    },

    /// List commission invoices
    CommissionInvoices,

    /// Cancel a commission invoice and release the records it covered
    CancelCommission {
        /// Commission invoice number (e.g., COM-2025-0001)
        number: String,
    },

    /// Record a payment received from or paid to a party
    AddPayment {
        /// supplier, customer or pamper
        #[arg(long)]
        party_type: PartyType,

        /// Party identifier from parties.toml
        #[arg(long)]
        party: String,

        /// Paid amount
        amount: f64,

        /// Mode of payment
        #[arg(long, default_value = "Cash")]
        mode: String,

        /// Money paid to the party (default: received from the party)
        #[arg(long)]
        pay: bool,

        /// Payment date (default: today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        remarks: Option<String>,
    },

    /// Render party statements and download them
    Statements {
        /// supplier, customer or pamper
        #[arg(long)]
        party_type: Option<PartyType>,

        /// Single party (default: every party of the type)
        #[arg(long)]
        party: Option<String>,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,

        /// Add the running-balance party summary
        #[arg(long)]
        detailed: bool,

        /// Directory the statements are saved to
        #[arg(long, default_value = ".")]
        dest: PathBuf,
    },
}

#[derive(Subcommand)]
enum FormCommand {
    /// Start a draft invoice form
    New {
        /// Farmer supplier
        #[arg(long)]
        supplier: String,

        #[arg(long)]
        customer: String,

        /// Commission agent
        #[arg(long)]
        pamper: Option<String>,

        /// Posting date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Add an item line
    AddItem {
        form: String,
        item: String,
        #[arg(long)]
        qty: Option<f64>,
        #[arg(long)]
        price: Option<f64>,
    },

    /// Change an item line's quantity
    SetQty {
        form: String,
        #[arg(value_parser = row_number())]
        row: usize,
        qty: f64,
    },

    /// Change an item line's price
    SetPrice {
        form: String,
        #[arg(value_parser = row_number())]
        row: usize,
        price: f64,
    },

    /// Change the header customer on the form and every item line
    SetCustomer { form: String, customer: String },

    /// Change (or clear) the header pamper on the form and every item line
    SetPamper { form: String, pamper: Option<String> },

    /// Bill one item line to the header customer or pamper
    SetLineCustomer {
        form: String,
        #[arg(value_parser = row_number())]
        row: usize,
        customer: String,
    },

    /// Set (or clear) the pamper on one item line
    SetLinePamper {
        form: String,
        #[arg(value_parser = row_number())]
        row: usize,
        pamper: Option<String>,
    },

    /// Remove an item line
    RemoveItem {
        form: String,
        #[arg(value_parser = row_number())]
        row: usize,
    },

    /// Add a commission row
    AddCommission {
        form: String,
        item: String,
        #[arg(long)]
        commission: Option<f64>,
        #[arg(long)]
        taxes: Option<f64>,
    },

    /// Change a commission row
    SetCommission {
        form: String,
        #[arg(value_parser = row_number())]
        row: usize,
        #[arg(long)]
        commission: Option<f64>,
        #[arg(long)]
        taxes: Option<f64>,
    },

    /// Add a commission row for the header pamper
    AddPamperCommission {
        form: String,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        percentage: Option<f64>,
    },

    /// Change a pamper commission row
    SetPamperCommission {
        form: String,
        #[arg(value_parser = row_number())]
        row: usize,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        percentage: Option<f64>,
    },

    /// Submit a draft form
    Submit { form: String },

    /// Cancel a submitted form
    Cancel { form: String },

    /// Show a form with all its rows
    Show { form: String },

    /// Render a form to PDF
    Print {
        form: String,

        /// Custom output file path (default: output_dir/<form>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    if !matches!(cli.command, Commands::Init) && !cfg_dir.exists() {
        return Err(AgriError::ConfigNotFound(cfg_dir));
    }

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Parties { party_type } => cmd_parties(&cfg_dir, party_type),
        Commands::Items => cmd_items(&cfg_dir),
        Commands::AddSupplier {
            id,
            name,
            commission,
            not_farmer,
        } => cmd_add_supplier(&cfg_dir, &id, name, commission, !not_farmer),
        Commands::Form(command) => cmd_form(&cfg_dir, command).map_err(one_based_row),
        Commands::Forms { limit } => cmd_forms(&cfg_dir, limit),
        Commands::Commissions {
            from,
            to,
            party_type,
            party,
            create,
        } => {
            let filters = AggregationFilters {
                from_date: parse_date(from.as_deref())?,
                to_date: parse_date(to.as_deref())?,
                party_type,
                party,
            };
            cmd_commissions(&cfg_dir, filters, create)
        }
        Commands::CommissionInvoices => cmd_commission_invoices(&cfg_dir),
        Commands::CancelCommission { number } => cmd_cancel_commission(&cfg_dir, &number),
        Commands::AddPayment {
            party_type,
            party,
            amount,
            mode,
            pay,
            date,
            remarks,
        } => {
            let payment_type = if pay {
                PaymentType::Pay
            } else {
                PaymentType::Receive
            };
            cmd_add_payment(
                &cfg_dir,
                party_type,
                &party,
                amount,
                mode,
                payment_type,
                date.as_deref(),
                remarks,
            )
        }
        Commands::Statements {
            party_type,
            party,
            from,
            to,
            detailed,
            dest,
        } => {
            let filters = StatementFilters {
                party_type,
                party,
                from_date: parse_date(from.as_deref())?,
                to_date: parse_date(to.as_deref())?,
                detailed,
            };
            cmd_statements(&cfg_dir, &filters, &dest)
        }
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| AgriError::InvalidDate(s.to_string()))
        })
        .transpose()
}

fn money(currency_symbol: &str, value: f64) -> String {
    format!("{currency_symbol}{value:.2}")
}

/// Rows are numbered from 1 on the command line
/// Rows are numbered from 1 on the command line
fn row_number() -> clap::builder::RangedU64ValueParser<usize> {
    clap::builder::RangedU64ValueParser::new().range(1..)
}

fn row_index(row: usize) -> usize {
    row - 1
}

fn one_based_row(err: AgriError) -> AgriError {
    match err {
        AgriError::RowNotFound { table, row } => AgriError::RowNotFound {
            table,
            row: row + 1,
        },
        other => other,
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(AgriError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("output"))?;

    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("parties.toml"), PARTIES_TEMPLATE)?;
    fs::write(cfg_dir.join("items.toml"), ITEMS_TEMPLATE)?;

    println!("Initialized agri config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your company details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Add suppliers and customers: $EDITOR {}/parties.toml",
        cfg_dir.display()
    );
    println!(
        "  3. Configure items:            $EDITOR {}/items.toml",
        cfg_dir.display()
    );
    println!();
    println!("Then start your first invoice form:");
    println!("  agri form new --supplier <supplier-id> --customer <customer-id>");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct SupplierRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "FARMER")]
    farmer: String,
    #[tabled(rename = "COMMISSION %")]
    commission: String,
    #[tabled(rename = "CUSTOMER")]
    related_customer: String,
}

#[derive(Tabled)]
struct CustomerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ROLE")]
    role: String,
    #[tabled(rename = "COMMISSION %")]
    commission: String,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "USE")]
    usage: String,
}

#[derive(Tabled)]
struct FormRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "FORM")]
    id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "SUPPLIER")]
    supplier: String,
    #[tabled(rename = "CUSTOMER")]
    customer: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ITEM")]
    item: String,
    #[tabled(rename = "CUSTOMER")]
    customer: String,
    #[tabled(rename = "PAMPER")]
    pamper: String,
    #[tabled(rename = "QTY")]
    qty: String,
    #[tabled(rename = "PRICE")]
    price: String,
    #[tabled(rename = "TOTAL")]
    total: String,
}

#[derive(Tabled)]
struct CommissionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ITEM")]
    item: String,
    #[tabled(rename = "COMMISSION")]
    commission: String,
    #[tabled(rename = "TAXES")]
    taxes: String,
    #[tabled(rename = "TOTAL")]
    total: String,
}

#[derive(Tabled)]
struct PamperCommissionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "PAMPER")]
    pamper: String,
    #[tabled(rename = "PRICE")]
    price: String,
    #[tabled(rename = "%")]
    percentage: String,
    #[tabled(rename = "COMMISSION")]
    commission: String,
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "FORM")]
    invoice_id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "LINES")]
    lines: usize,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "COMMISSION")]
    commission: String,
}

#[derive(Tabled)]
struct CommissionInvoiceRow {
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "PARTY")]
    party: String,
    #[tabled(rename = "PERIOD")]
    period: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

/// List configured parties
fn cmd_parties(cfg_dir: &Path, party_type: Option<PartyType>) -> Result<()> {
    let parties = load_parties(cfg_dir)?;

    if parties.suppliers.is_empty() && parties.customers.is_empty() {
        println!("No parties configured.");
        println!("Add parties to: {}/parties.toml", cfg_dir.display());
        return Ok(());
    }

    if matches!(party_type, None | Some(PartyType::Supplier)) {
        let rows: Vec<SupplierRow> = parties
            .suppliers
            .iter()
            .map(|(id, s)| SupplierRow {
                id: id.clone(),
                name: s.name.clone(),
                farmer: if s.is_farmer { "yes" } else { "no" }.to_string(),
                commission: format!("{:.2}", s.commission_percentage),
                related_customer: s.related_customer.clone().unwrap_or_default(),
            })
            .collect();
        println!("Suppliers");
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    if party_type != Some(PartyType::Supplier) {
        let filter = match party_type {
            Some(PartyType::Pamper) => PartyFilter::pampers(),
            _ => PartyFilter::any(),
        };
        let title = match party_type {
            Some(PartyType::Pamper) => "Pampers",
            _ => "Customers",
        };
        let rows: Vec<CustomerRow> = parties
            .select(PartyType::Customer, &filter)
            .into_iter()
            .filter_map(|id| parties.customers.get(id).map(|c| (id, c)))
            .map(|(id, c)| {
                let mut roles = Vec::new();
                if c.is_customer {
                    roles.push("customer");
                }
                if c.is_farmer {
                    roles.push("farmer");
                }
                if c.is_pamper {
                    roles.push("pamper");
                }
                CustomerRow {
                    id: id.to_string(),
                    name: c.name.clone(),
                    role: roles.join(", "),
                    commission: format!("{:.2}", c.commission_percentage),
                }
            })
            .collect();
        println!("{title}");
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    Ok(())
}

/// List available items
fn cmd_items(cfg_dir: &Path) -> Result<()> {
    let items = load_items(cfg_dir)?;

    if items.is_empty() {
        println!("No items configured.");
        println!("Add items to: {}/items.toml", cfg_dir.display());
        return Ok(());
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|(id, item)| ItemRow {
            id: id.clone(),
            name: item.name.clone(),
            usage: if item.commission_item {
                "commission"
            } else {
                "sale"
            }
            .to_string(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

fn cmd_add_supplier(
    cfg_dir: &Path,
    id: &str,
    name: String,
    commission_percentage: f64,
    is_farmer: bool,
) -> Result<()> {
    let mut parties = load_parties(cfg_dir)?;
    if parties.suppliers.contains_key(id) {
        return Err(AgriError::ConfigWrite {
            path: cfg_dir.join("parties.toml"),
            reason: format!("supplier '{id}' already exists"),
        });
    }

    let customer_id = parties.register_supplier(
        id,
        Supplier {
            name,
            is_farmer,
            commission_percentage,
            related_customer: None,
        },
    );
    save_parties(cfg_dir, &parties)?;

    println!("Added supplier {id} (related customer: {customer_id})");
    Ok(())
}

fn find_item<'a>(items: &'a std::collections::BTreeMap<String, Item>, code: &str) -> Result<&'a Item> {
    items
        .get(code)
        .ok_or_else(|| AgriError::ItemNotFound(code.to_string()))
}

fn print_refresh(form: &InvoiceForm, refresh: &Refresh, currency_symbol: &str) {
    let value = match refresh.table {
        agri::form::Table::Items => form.items().get(refresh.row).map(|l| l.total()),
        agri::form::Table::Commissions => form
            .commissions()
            .get(refresh.row)
            .map(|c| c.commission_total()),
        agri::form::Table::PamperCommissions => form
            .pamper_commissions()
            .get(refresh.row)
            .map(|p| p.commission()),
    };
    match value {
        Some(value) => println!(
            "{}: {} row {} = {}",
            form.id,
            refresh.table,
            refresh.row + 1,
            money(currency_symbol, value)
        ),
        None => println!("{}: {} updated", form.id, refresh.table),
    }
}

fn cmd_form(cfg_dir: &Path, command: FormCommand) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let parties = load_parties(cfg_dir)?;
    let mut state = load_state(cfg_dir)?;
    let currency = config.agriculture.currency_symbol.clone();

    match command {
        FormCommand::New {
            supplier,
            customer,
            pamper,
            date,
        } => {
            parties.require(PartyType::Supplier, &supplier, &PartyFilter::farmers())?;
            parties.require(PartyType::Customer, &customer, &PartyFilter::customers())?;
            if let Some(pamper) = &pamper {
                parties.require(PartyType::Pamper, pamper, &PartyFilter::pampers())?;
            }

            let posting_date = match parse_date(date.as_deref())? {
                Some(d) => d,
                None => chrono::Local::now().date_naive(),
            };
            let year = posting_date.year() as u32;
            let seq = state.counter.forms.advance(year);
            let id = format_number(&config.agriculture.form_number_format, year, seq);

            state
                .forms
                .push(InvoiceForm::new(id.clone(), posting_date, supplier, customer, pamper));
            save_state(cfg_dir, &state)?;
            println!("Created draft form {id}");
            return Ok(());
        }
        FormCommand::AddItem {
            form,
            item,
            qty,
            price,
        } => {
            let items = load_items(cfg_dir)?;
            let entry = find_item(&items, &item)?;
            let form = state.form_mut(&form)?;
            let refresh = form.add_item(&item, entry, qty, price)?;
            print_refresh(form, &refresh, &currency);
        }
        FormCommand::SetQty { form, row, qty } => {
            let form = state.form_mut(&form)?;
            let refresh = form.set_item_qty(row_index(row), Some(qty))?;
            print_refresh(form, &refresh, &currency);
        }
        FormCommand::SetPrice { form, row, price } => {
            let form = state.form_mut(&form)?;
            let refresh = form.set_item_price(row_index(row), Some(price))?;
            print_refresh(form, &refresh, &currency);
        }
        FormCommand::SetCustomer { form, customer } => {
            parties.require(PartyType::Customer, &customer, &PartyFilter::customers())?;
            let form = state.form_mut(&form)?;
            let refreshed = form.set_customer(customer)?;
            println!("{}: customer set on {} rows", form.id, refreshed.len());
        }
        FormCommand::SetPamper { form, pamper } => {
            if let Some(pamper) = &pamper {
                parties.require(PartyType::Pamper, pamper, &PartyFilter::pampers())?;
            }
            let form = state.form_mut(&form)?;
            let refreshed = form.set_pamper(pamper)?;
            println!("{}: pamper set on {} rows", form.id, refreshed.len());
        }
        FormCommand::SetLineCustomer {
            form,
            row,
            customer,
        } => {
            let form = state.form_mut(&form)?;
            let refresh = form.set_item_customer(row_index(row), &customer)?;
            print_refresh(form, &refresh, &currency);
        }
        FormCommand::SetLinePamper { form, row, pamper } => {
            let form = state.form_mut(&form)?;
            let refresh = form.set_item_pamper(row_index(row), pamper.as_deref())?;
            print_refresh(form, &refresh, &currency);
        }
        FormCommand::RemoveItem { form, row } => {
            let form = state.form_mut(&form)?;
            let removed = form.remove_item(row_index(row))?;
            println!(
                "{}: removed {} (grand total {})",
                form.id,
                removed.item_code,
                money(&currency, form.grand_total())
            );
        }
        FormCommand::AddCommission {
            form,
            item,
            commission,
            taxes,
        } => {
            let items = load_items(cfg_dir)?;
            let entry = find_item(&items, &item)?;
            let form = state.form_mut(&form)?;
            let refresh = form.add_commission(&item, entry, commission, taxes)?;
            print_refresh(form, &refresh, &currency);
        }
        FormCommand::SetCommission {
            form,
            row,
            commission,
            taxes,
        } => {
            let form = state.form_mut(&form)?;
            let mut refresh = None;
            if commission.is_some() {
                refresh = Some(form.set_commission_amount(row_index(row), commission)?);
            }
            if taxes.is_some() {
                refresh = Some(form.set_commission_taxes(row_index(row), taxes)?);
            }
            if let Some(refresh) = refresh {
                print_refresh(form, &refresh, &currency);
            }
        }
        FormCommand::AddPamperCommission {
            form,
            price,
            percentage,
        } => {
            let form = state.form_mut(&form)?;
            let refresh = form.add_pamper_commission(price, percentage)?;
            print_refresh(form, &refresh, &currency);
        }
        FormCommand::SetPamperCommission {
            form,
            row,
            price,
            percentage,
        } => {
            let form = state.form_mut(&form)?;
            let mut refresh = None;
            if price.is_some() {
                refresh = Some(form.set_pamper_commission_price(row_index(row), price)?);
            }
            if percentage.is_some() {
                refresh = Some(form.set_pamper_commission_percentage(row_index(row), percentage)?);
            }
            if let Some(refresh) = refresh {
                print_refresh(form, &refresh, &currency);
            }
        }
        FormCommand::Submit { form } => {
            let form = state.form_mut(&form)?;
            form.submit()?;
            println!(
                "Submitted {} (grand total {})",
                form.id,
                money(&currency, form.grand_total())
            );
        }
        FormCommand::Cancel { form } => {
            let form = state.form_mut(&form)?;
            form.cancel()?;
            println!("Cancelled {}", form.id);
        }
        FormCommand::Show { form } => {
            show_form(state.form(&form)?, &parties, &currency);
            return Ok(());
        }
        FormCommand::Print { form, output } => {
            let form = state.form(&form)?;
            let output_path = match output {
                Some(p) => p,
                None => {
                    let dir = resolve_output_dir(&config.reports.output_dir, cfg_dir);
                    std::fs::create_dir_all(&dir)?;
                    dir.join(format!("{}.pdf", form.id))
                }
            };
            let document = FormDocument {
                company: &config.company,
                currency_symbol: &currency,
                supplier_name: parties
                    .display_name(PartyType::Supplier, form.supplier())
                    .unwrap_or(form.supplier()),
                customer_name: parties
                    .display_name(PartyType::Customer, form.customer())
                    .unwrap_or(form.customer()),
                form,
            };
            generate_form_pdf(&document, &output_path)?;
            println!("Generated {}", output_path.display());
            return Ok(());
        }
    }

    save_state(cfg_dir, &state)
}

fn show_form(form: &InvoiceForm, parties: &PartyCatalog, currency: &str) {
    let supplier = parties
        .display_name(PartyType::Supplier, form.supplier())
        .unwrap_or(form.supplier());
    let customer = parties
        .display_name(PartyType::Customer, form.customer())
        .unwrap_or(form.customer());

    println!("Form:     {} ({})", form.id, form.status());
    println!("Date:     {}", form.posting_date());
    println!("Supplier: {supplier}");
    println!("Customer: {customer}");
    if let Some(pamper) = form.pamper() {
        println!("Pamper:   {pamper}");
    }

    if !form.items().is_empty() {
        let rows: Vec<LineRow> = form
            .items()
            .iter()
            .enumerate()
            .map(|(idx, line)| LineRow {
                index: idx + 1,
                item: line
                    .item_name
                    .clone()
                    .unwrap_or_else(|| line.item_code.clone()),
                customer: line.customer.clone(),
                pamper: line.pamper.clone().unwrap_or_default(),
                qty: format!("{}", line.qty()),
                price: money(currency, line.price()),
                total: money(currency, line.total()),
            })
            .collect();
        println!();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    if !form.commissions().is_empty() {
        let rows: Vec<CommissionRow> = form
            .commissions()
            .iter()
            .enumerate()
            .map(|(idx, c)| CommissionRow {
                index: idx + 1,
                item: c.item.clone(),
                commission: money(currency, c.commission()),
                taxes: money(currency, c.taxes()),
                total: money(currency, c.commission_total()),
            })
            .collect();
        println!();
        println!("Commissions");
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    if !form.pamper_commissions().is_empty() {
        let rows: Vec<PamperCommissionRow> = form
            .pamper_commissions()
            .iter()
            .enumerate()
            .map(|(idx, p)| PamperCommissionRow {
                index: idx + 1,
                pamper: p.pamper.clone(),
                price: money(currency, p.price()),
                percentage: format!("{}", p.percentage()),
                commission: money(currency, p.commission()),
            })
            .collect();
        println!();
        println!("Pamper Commissions");
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    println!();
    println!("Grand total: {}", money(currency, form.grand_total()));
}

/// List invoice forms, newest first
fn cmd_forms(cfg_dir: &Path, limit: Option<usize>) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;

    if state.forms.is_empty() {
        println!("No invoice forms yet.");
        return Ok(());
    }

    let rows: Vec<FormRow> = state
        .forms
        .iter()
        .rev()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(idx, form)| FormRow {
            index: idx + 1,
            id: form.id.clone(),
            date: form.posting_date().to_string(),
            supplier: form.supplier().to_string(),
            customer: form.customer().to_string(),
            total: money(&config.agriculture.currency_symbol, form.grand_total()),
            status: form.status().to_string(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

fn cmd_commissions(cfg_dir: &Path, filters: AggregationFilters, create: bool) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let parties = load_parties(cfg_dir)?;
    let currency = config.agriculture.currency_symbol.clone();

    match &config.remote {
        Some(remote) => run_commissions(RemoteBackend::new(remote), parties, filters, create, &currency),
        None => run_commissions(LocalBackend::new(cfg_dir), parties, filters, create, &currency),
    }
}

fn run_commissions<B: CommissionBackend>(
    backend: B,
    parties: PartyCatalog,
    filters: AggregationFilters,
    create: bool,
    currency: &str,
) -> Result<()> {
    let mut session = CommissionSession::new(backend, parties);
    session.set_party_type(filters.party_type);
    session.set_party(filters.party);
    session.set_from_date(filters.from_date);
    session.set_to_date(filters.to_date);

    let groups = session.fetch_invoices()?;
    if groups.is_empty() {
        println!("Party has no data to show.");
        return Ok(());
    }

    let commission_total: f64 = groups.iter().map(|g| g.commission_total).sum();
    let rows: Vec<GroupRow> = groups
        .iter()
        .map(|g| GroupRow {
            invoice_id: g.invoice_id.clone(),
            date: g.posting_date.to_string(),
            lines: g.line_count,
            total: money(currency, g.line_total),
            commission: money(currency, g.commission_total),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    println!("Total commission: {}", money(currency, commission_total));

    if create {
        let message = session.create_invoices()?;
        println!("{message}");
    } else {
        println!("Run again with --create to create the commission invoices.");
    }

    Ok(())
}

fn cmd_commission_invoices(cfg_dir: &Path) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let state = load_state(cfg_dir)?;

    if state.commission_invoices.is_empty() {
        println!("No commission invoices yet.");
        return Ok(());
    }

    let rows: Vec<CommissionInvoiceRow> = state
        .commission_invoices
        .iter()
        .rev()
        .map(|c| CommissionInvoiceRow {
            number: c.number.clone(),
            date: c.posting_date.to_string(),
            party: format!("{} {}", c.party_type, c.party),
            period: format!("{} .. {}", c.period_from, c.period_to),
            total: money(&config.agriculture.currency_symbol, c.total),
            status: if c.cancelled { "CANCELLED" } else { "ACTIVE" }.to_string(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

fn cmd_cancel_commission(cfg_dir: &Path, number: &str) -> Result<()> {
    let mut state = load_state(cfg_dir)?;
    let invoice = cancel_commission_invoice(&mut state, number)?;
    save_state(cfg_dir, &state)?;

    println!(
        "Cancelled {} ({} source form(s) released)",
        invoice.number,
        invoice.sources.len()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_add_payment(
    cfg_dir: &Path,
    party_type: PartyType,
    party: &str,
    amount: f64,
    mode_of_payment: String,
    payment_type: PaymentType,
    date: Option<&str>,
    remarks: Option<String>,
) -> Result<()> {
    if amount <= 0.0 {
        return Err(AgriError::InvalidPaymentAmount);
    }

    let config = load_config(cfg_dir)?;
    let parties = load_parties(cfg_dir)?;
    parties.require(party_type, party, &PartyFilter::any())?;

    let posting_date = match parse_date(date)? {
        Some(d) => d,
        None => chrono::Local::now().date_naive(),
    };

    let mut state: State = load_state(cfg_dir)?;
    let year = posting_date.year() as u32;
    let seq = state.counter.payments.advance(year);
    let id = format_number(PAYMENT_NUMBER_FORMAT, year, seq);

    state.payments.push(PaymentEntry {
        id: id.clone(),
        party_type,
        party: party.to_string(),
        posting_date,
        mode_of_payment,
        payment_type,
        remarks,
        paid_amount: amount,
    });
    save_state(cfg_dir, &state)?;

    println!(
        "Recorded {} {} payment {id} for {party}",
        money(&config.agriculture.currency_symbol, amount),
        payment_type
    );
    Ok(())
}

fn cmd_statements(cfg_dir: &Path, filters: &StatementFilters, dest: &Path) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let downloader = Downloader::from_millis(config.reports.download_delay_ms);

    match &config.remote {
        Some(remote) => run_statements(&RemoteBackend::new(remote), filters, &downloader, dest),
        None => run_statements(&LocalBackend::new(cfg_dir), filters, &downloader, dest),
    }
}

fn run_statements<B: ReportBackend>(
    backend: &B,
    filters: &StatementFilters,
    downloader: &Downloader,
    dest: &Path,
) -> Result<()> {
    let files = backend.get_reports(filters)?;
    if files.is_empty() {
        println!("Party has no data to show.");
        return Ok(());
    }

    for path in downloader.download_all(backend, &files, dest)? {
        println!("Saved {}", path.display());
    }
    Ok(())
}
