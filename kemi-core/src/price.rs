//! Price formatting with precision that scales with the magnitude of the price
//!
//! Crypto prices span from fractions of a cent to tens of thousands of
//! dollars, so a fixed number of decimals is wrong at one end or the other.

/// Number of decimals to show for a price of this magnitude
pub fn price_precision(price: f64) -> u32 {
    if price == 0.0 || !price.is_finite() {
        return 2;
    }

    let abs_price = price.abs();
    if abs_price < 0.01 {
        8
    } else if abs_price < 1.0 {
        6
    } else if abs_price < 1000.0 {
        4
    } else {
        2
    }
}

/// Round `value` to the precision appropriate for `reference` (or for the
/// value itself when no reference price is given)
pub fn round_to_precision(value: f64, reference: Option<f64>) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let precision = price_precision(reference.unwrap_or(value));
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Format a price for display. USD prices get a `$` prefix.
pub fn format_crypto_price(price: f64, currency: &str) -> String {
    let prefix = if currency.eq_ignore_ascii_case("usd") {
        "$"
    } else {
        ""
    };

    if price == 0.0 || !price.is_finite() {
        return format!("{}0.00", prefix);
    }

    let abs_price = price.abs();
    let body = if abs_price < 0.000_001 {
        format!("{:.2e}", price)
    } else if abs_price < 0.01 {
        let trimmed = trim_trailing_zeros(&format!("{:.8}", price));
        let decimals = trimmed.split('.').nth(1).map(str::len).unwrap_or(0);
        if decimals < 2 {
            format!("{:.8}", price)
        } else {
            trimmed
        }
    } else if abs_price < 1.0 {
        trim_trailing_zeros(&format!("{:.6}", price))
    } else if abs_price < 1000.0 {
        format!("{:.4}", price)
    } else {
        with_thousands_separators(&format!("{:.2}", price))
    };

    format!("{}{}", prefix, body)
}

/// Format a number with a fixed number of decimals and `,` thousands separators
pub fn format_with_separators(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    with_thousands_separators(&format!("{:.*}", decimals, value))
}

fn trim_trailing_zeros(formatted: &str) -> String {
    if !formatted.contains('.') {
        return formatted.to_string();
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn with_thousands_separators(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}
