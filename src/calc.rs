//! Derived values for invoice form rows.
//!
//! Every operand is optional and an absent operand counts as zero, so none of
//! these functions can fail. Results carry plain `f64` precision.

/// Item line total: `qty × price`
pub fn line_total(qty: Option<f64>, price: Option<f64>) -> f64 {
    qty.unwrap_or(0.0) * price.unwrap_or(0.0)
}

/// Commission row total: `commission + taxes`
pub fn commission_line_total(commission: Option<f64>, taxes: Option<f64>) -> f64 {
    commission.unwrap_or(0.0) + taxes.unwrap_or(0.0)
}

/// Commission earned on `price` at `percentage` percent.
///
/// The percentage is not clamped: negative values and values above 100 are
/// applied as given.
pub fn commission(price: Option<f64>, percentage: Option<f64>) -> f64 {
    price.unwrap_or(0.0) * percentage.unwrap_or(0.0) / 100.0
}
