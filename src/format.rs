/// Format a price in rupees with Indian digit grouping: `Rs. 1,23,456.5/-`.
///
/// Up to three fraction digits are kept, trailing zeros dropped. Zero and
/// non-finite values render as `Rs. 0/-`.
pub fn format_inr(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "Rs. 0/-".to_string();
    }

    let text = format!("{:.3}", value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    if int_part.chars().all(|c| c == '0') && frac_part.is_empty() {
        return "Rs. 0/-".to_string();
    }

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }
    out.push_str(&group_indian(int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    format!("Rs. {}/-", out)
}

/// Last three digits, then groups of two: 12345678 -> 1,23,45,678
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);

    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}
