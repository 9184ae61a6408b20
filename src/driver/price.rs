/// Normalizes a Polish storefront price to a two-decimal string
///
/// Currency symbols, letters and whitespace are dropped, then `,` and `.` are
/// resolved as thousands or decimal separators:
///
/// | Input shape | Reading |
/// |-------------|---------|
/// | both `,` and `.` | the rightmost one is the decimal separator |
/// | one `,` followed by 3 digits | thousands separator |
/// | one `,` otherwise | decimal separator |
/// | several `,` | thousands separators |
/// | one `.` followed by 3 digits | thousands separator |
/// | `.` otherwise | decimal separator |
///
/// Returns an empty string when nothing parseable remains.
///
/// # Examples
///
/// ```
/// use shelfwatch::driver::format_pl_price;
///
/// assert_eq!(format_pl_price("29,35 zł"), "29.35");
/// assert_eq!(format_pl_price("1.234,56 PLN"), "1234.56");
/// assert_eq!(format_pl_price("2,749 zł"), "2749.00");
/// assert_eq!(format_pl_price("brak"), "");
/// ```
pub fn format_pl_price(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return String::new();
    }

    let normalized = resolve_separators(&cleaned);

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => format!("{:.2}", value),
        _ => {
            tracing::debug!(price = text, "Failed to format price");
            String::new()
        }
    }
}

fn resolve_separators(cleaned: &str) -> String {
    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    match (commas, dots) {
        (0, 0) => cleaned.to_string(),
        (c, d) if c > 0 && d > 0 => {
            let last_dot = cleaned.rfind('.').unwrap_or(0);
            let last_comma = cleaned.rfind(',').unwrap_or(0);
            if last_dot > last_comma {
                cleaned.replace(',', "")
            } else {
                cleaned.replace('.', "").replace(',', ".")
            }
        }
        (1, 0) => {
            if digits_after(cleaned, ',') == 3 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (_, 0) => cleaned.replace(',', ""),
        (0, 1) if digits_after(cleaned, '.') == 3 => cleaned.replace('.', ""),
        _ => cleaned.to_string(),
    }
}

fn digits_after(s: &str, separator: char) -> usize {
    s.find(separator)
        .map(|pos| s.len() - pos - separator.len_utf8())
        .unwrap_or(0)
}
