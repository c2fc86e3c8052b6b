use rust_decimal::Decimal;
use validator::ValidationError;

/// Build a `LIKE` pattern matching `needle` anywhere in a lowercased column.
/// `%`, `_` and `\` in the needle are escaped with `\`.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Largest amount a `DECIMAL(10, 2)` money column can hold.
pub const MAX_MONEY: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 2);

/// Money as returned by the API: always two decimal places.
pub fn money(amount: Decimal) -> Decimal {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);
    amount
}

pub fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() {
        return Err(ValidationError::new("positive_price")
            .with_message("price must be greater than zero".into()));
    }
    if *price > MAX_MONEY {
        return Err(ValidationError::new("price_too_large")
            .with_message(format!("price cannot exceed {}", MAX_MONEY).into()));
    }
    Ok(())
}

pub fn validate_non_negative_total(total: &Decimal) -> Result<(), ValidationError> {
    if total.is_sign_negative() && !total.is_zero() {
        return Err(ValidationError::new("non_negative_total")
            .with_message("total price cannot be negative".into()));
    }
    if *total > MAX_MONEY {
        return Err(ValidationError::new("total_too_large")
            .with_message(format!("total price cannot exceed {}", MAX_MONEY).into()));
    }
    Ok(())
}
