use serde::Serialize;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::config::Company;
use crate::error::{AgriError, Result};
use crate::form::InvoiceForm;
use crate::statement::Statement;

/// Data handed to the statement template
#[derive(Debug, Serialize)]
pub struct StatementDocument<'a> {
    pub company: &'a Company,
    pub currency_symbol: &'a str,
    pub generated_date: String,
    pub statement: &'a Statement,
}

/// Data handed to the invoice form template
#[derive(Debug, Serialize)]
pub struct FormDocument<'a> {
    pub company: &'a Company,
    pub currency_symbol: &'a str,
    pub supplier_name: &'a str,
    pub customer_name: &'a str,
    pub form: &'a InvoiceForm,
}

const SHARED_HELPERS: &str = r##"
#let fmt-int(digits) = {
  let len = digits.len()
  let out = ""
  for (i, digit) in digits.clusters().enumerate() {
    if i > 0 and calc.rem(len - i, 3) == 0 {
      out += ","
    }
    out += digit
  }
  out
}

#let fmt-currency(amount) = {
  let negative = amount < 0
  let parts = str(calc.round(calc.abs(amount), digits: 2)).split(".")
  let whole = fmt-int(parts.at(0))
  let frac = if parts.len() > 1 { parts.at(1) } else { "00" }
  let frac2 = if frac.len() == 1 { frac + "0" } else { frac }
  (if negative { "-" } else { "" }) + data.currency_symbol + whole + "." + frac2
}

#let company-header(title) = grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #text(size: 16pt, weight: "bold")[#data.company.name]
    #v(0.3em)
    #data.company.address \
    #data.company.city, #data.company.country
    #if data.company.phone != none [
      \ #data.company.phone
    ]
  ],
  [
    #text(size: 20pt, weight: "bold")[#title]
  ]
)
"##;

/// Party statement: items, commission totals and payments
const STATEMENT_TEMPLATE: &str = r##"// Statement Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "a4",
  flipped: true,
  margin: (top: 0.8in, bottom: 0.8in, left: 0.8in, right: 0.8in),
)

#set text(font: "Helvetica", size: 10pt)

HELPERS

#let st = data.statement
#let supplier = st.party_type == "Supplier"

#company-header("STATEMENT")

#v(1em)
#line(length: 100%, stroke: 0.5pt + gray)
#v(1em)

#grid(
  columns: (1fr, 1fr),
  [
    #text(weight: "bold", size: 11pt)[#st.party_type:]
    #v(0.3em)
    #text(weight: "bold")[#st.party_name]
  ],
  [
    #if st.from_date != none [ From: #st.from_date \ ]
    #if st.to_date != none [ To: #st.to_date \ ]
    Generated: #data.generated_date
  ]
)

#v(1.5em)

#if st.items.len() > 0 [
  #table(
    columns: if supplier { (auto, auto, 1fr, auto, auto, auto, auto) } else { (auto, auto, 1fr, auto, auto, auto) },
    align: right,
    stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else if y > 0 { (bottom: 0.5pt + gray) },
    inset: 6pt,
    fill: (x, y) => if y == 0 { luma(240) } else { none },

    ..if supplier {
      ([*Date*], [*Invoice*], [*Item*], [*Qty*], [*Price*], [*Total*], [*Commission*])
    } else {
      ([*Date*], [*Invoice*], [*Item*], [*Qty*], [*Price*], [*Total*])
    },

    ..st.items.map(row => {
      let cells = (
        row.date,
        row.invoice_id,
        row.item_name,
        str(row.qty),
        fmt-currency(row.price),
        fmt-currency(row.total),
      )
      if supplier { cells + (fmt-currency(row.commission),) } else { cells }
    }).flatten()
  )

  #v(1em)

  #align(right)[
    #table(
      columns: (auto, auto),
      stroke: none,
      align: (right, right),
      inset: 5pt,

      [Total Without Taxes:], [#fmt-currency(st.totals.total_before_tax)],
      [Quantity:], [#st.totals.total_qty],
      ..if supplier {
        (
          [Commission:], [#fmt-currency(st.totals.total_commission)],
          [Taxes:], [#fmt-currency(st.totals.taxes)],
          table.hline(stroke: 1pt),
          [*Total with Taxes:*], [*#fmt-currency(st.totals.commission_after_taxes)*],
        )
      } else { () }
    )
  ]
]

#if st.payments.len() > 0 [
  #v(1.5em)
  #text(weight: "bold", size: 11pt)[Payments]
  #v(0.5em)
  #table(
    columns: (auto, auto, auto, auto, 1fr, auto),
    stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else if y > 0 { (bottom: 0.5pt + gray) },
    inset: 6pt,
    fill: (x, y) => if y == 0 { luma(240) } else { none },

    [*Date*], [*Payment*], [*Mode*], [*Type*], [*Remarks*], [*Amount*],

    ..st.payments.map(p => (
      p.date,
      p.payment_id,
      p.mode_of_payment,
      p.payment_type,
      if p.remarks != none { p.remarks } else { "" },
      fmt-currency(p.paid_amount),
    )).flatten(),

    table.cell(colspan: 5, align: right)[*Grand Total*], [*#fmt-currency(st.payments_total)*],
  )
]

#if st.summary.len() > 0 [
  #v(1.5em)
  #text(weight: "bold", size: 11pt)[Party Summary]
  #v(0.5em)
  #table(
    columns: (auto, auto, 1fr, auto, auto, auto),
    align: (left, left, left, right, right, right),
    stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else if y > 0 { (bottom: 0.5pt + gray) },
    inset: 6pt,
    fill: (x, y) => if y == 0 { luma(240) } else { none },

    [*Date*], [*Reference*], [*Statement*], [*Debit*], [*Credit*], [*Balance*],

    ..st.summary.map(r => (
      if r.date != none { r.date } else { "" },
      if r.reference != none { r.reference } else { "" },
      r.description,
      fmt-currency(r.debit),
      fmt-currency(r.credit),
      fmt-currency(r.balance),
    )).flatten(),
  )
]

#if data.company.tax_id != none [
  #v(2em)
  #text(size: 9pt, fill: gray)[Tax ID: #data.company.tax_id]
]
"##;

/// Printable invoice form
const FORM_TEMPLATE: &str = r##"// Invoice Form Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "a4",
  margin: (top: 0.8in, bottom: 0.8in, left: 0.8in, right: 0.8in),
)

#set text(font: "Helvetica", size: 10pt)

HELPERS

#let f = data.form

#company-header("INVOICE FORM")

#v(0.5em)
#align(right)[
  #table(
    columns: (auto, auto),
    stroke: none,
    align: (right, left),
    inset: 2pt,
    [*Form \#:*], [#f.id],
    [*Date:*], [#f.posting_date],
    [*Status:*], [#f.status],
  )
]

#v(1em)
#line(length: 100%, stroke: 0.5pt + gray)
#v(1em)

#grid(
  columns: (1fr, 1fr),
  [
    #text(weight: "bold", size: 11pt)[Supplier:]
    #v(0.3em)
    #data.supplier_name
  ],
  [
    #text(weight: "bold", size: 11pt)[Customer:]
    #v(0.3em)
    #data.customer_name
    #if f.at("pamper", default: none) != none [
      \ Pamper: #f.pamper
    ]
  ]
)

#v(1.5em)

#table(
  columns: (auto, 1fr, auto, auto, auto, auto),
  align: (center, left, left, right, right, right),
  stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else if y > 0 { (bottom: 0.5pt + gray) },
  inset: 8pt,
  fill: (x, y) => if y == 0 { luma(240) } else { none },

  [*\#*], [*Item*], [*Customer*], [*Qty*], [*Price*], [*Total*],

  ..f.items.enumerate().map(((i, item)) => (
    str(i + 1),
    item.at("item_name", default: item.item_code),
    item.customer,
    str(item.qty),
    fmt-currency(item.price),
    fmt-currency(item.total),
  )).flatten()
)

#if f.commissions.len() > 0 [
  #v(1em)
  #text(weight: "bold")[Commissions]
  #table(
    columns: (1fr, auto, auto, auto),
    align: (left, right, right, right),
    inset: 6pt,
    stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else { none },
    [*Item*], [*Commission*], [*Taxes*], [*Total*],
    ..f.commissions.map(c => (
      c.item,
      fmt-currency(c.commission),
      fmt-currency(c.taxes),
      fmt-currency(c.commission_total),
    )).flatten()
  )
]

#if f.pamper_commissions.len() > 0 [
  #v(1em)
  #text(weight: "bold")[Pamper Commissions]
  #table(
    columns: (1fr, auto, auto, auto),
    align: (left, right, right, right),
    inset: 6pt,
    stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else { none },
    [*Pamper*], [*Price*], [*%*], [*Commission*],
    ..f.pamper_commissions.map(p => (
      p.pamper,
      fmt-currency(p.price),
      str(p.percentage),
      fmt-currency(p.commission),
    )).flatten()
  )
]

#v(1em)

#align(right)[
  #text(size: 12pt, weight: "bold")[Grand Total: #fmt-currency(f.grand_total)]
]
"##;

/// Generate a statement PDF using Typst CLI
pub fn generate_statement_pdf(document: &StatementDocument, output_path: &Path) -> Result<()> {
    compile(STATEMENT_TEMPLATE, "statement", document, output_path)
}

/// Generate a printable invoice form PDF using Typst CLI
pub fn generate_form_pdf(document: &FormDocument, output_path: &Path) -> Result<()> {
    compile(FORM_TEMPLATE, "form", document, output_path)
}

fn compile<T: Serialize>(template: &str, name: &str, data: &T, output_path: &Path) -> Result<()> {
    // Check if typst is available
    let typst_check = Command::new("typst").arg("--version").output();

    if typst_check.is_err() {
        return Err(AgriError::TypstNotFound);
    }

    // Create temp directory for template
    let temp_dir = std::env::temp_dir().join("agri-cli");
    std::fs::create_dir_all(&temp_dir)?;

    // Serialize data to JSON
    let json_data =
        serde_json::to_string(data).map_err(|e| AgriError::PdfGeneration(e.to_string()))?;

    let json_name = format!("{name}_data.json");
    let json_path = temp_dir.join(&json_name);
    std::fs::write(&json_path, &json_data)?;

    // Write template with relative JSON path
    let template_content = template
        .replace("HELPERS", SHARED_HELPERS)
        .replace("DATA_JSON_PATH", &json_name);
    let template_path = temp_dir.join(format!("{name}.typ"));
    std::fs::write(&template_path, &template_content)?;

    debug!(template = %template_path.display(), output = %output_path.display(), "running typst");

    let output = Command::new("typst")
        .arg("compile")
        .arg("--root")
        .arg(&temp_dir)
        .arg(&template_path)
        .arg(output_path)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AgriError::PdfGeneration(stderr.to_string()));
    }

    // Clean up temp files
    let _ = std::fs::remove_file(&template_path);
    let _ = std::fs::remove_file(&json_path);

    Ok(())
}
