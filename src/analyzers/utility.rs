/// Rounded percentage of `part` over `total`, half-up. Returns 0 for an empty total.
pub fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}

/// Arithmetic mean of rounded rates, itself rounded. Returns 0 for empty input.
pub fn mean_rate(rates: &[u32]) -> u32 {
    if rates.is_empty() {
        return 0;
    }
    (rates.iter().map(|r| *r as f64).sum::<f64>() / rates.len() as f64).round() as u32
}
