//! Number formatting for text streams
//!
//! Text records print reals with a fixed number of significant digits, using
//! the shortest of fixed and scientific notation exactly like C `%g`.

/// Format `value` like C `printf("%.*g", precision, value)`
///
/// # Example
/// ```
/// use g4ants_session_core::wire::format_general;
///
/// assert_eq!(format_general(1000.0, 6), "1000");
/// assert_eq!(format_general(0.1 + 0.2, 6), "0.3");
/// assert_eq!(format_general(1.0e6, 6), "1e+06");
/// assert_eq!(format_general(-1.25e-7, 3), "-1.25e-07");
/// ```
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let digits = precision.max(1);

    // Scientific rendering decides the decimal exponent after rounding
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_trailing_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
