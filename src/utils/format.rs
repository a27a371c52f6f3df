use chrono::{DateTime, Utc};

/// Format an atom amount as a coin value with `decimals` places
pub fn format_coin_amount(atoms: i64, decimals: u32) -> String {
    format!(
        "{:.*}",
        decimals as usize,
        atoms as f64 / 10f64.powi(decimals as i32)
    )
}

/// How far behind `now` a header with timestamp `last_header_time` (unix seconds) is.
///
/// Returns `"1 day"` or `"N days"`, and `None` when the header is less than a day old.
pub fn days_behind(last_header_time: i64, now: DateTime<Utc>) -> Option<String> {
    let header_time = DateTime::<Utc>::from_timestamp(last_header_time, 0)?;
    let days = now.signed_duration_since(header_time).num_days();
    match days {
        d if d < 1 => None,
        1 => Some("1 day".to_string()),
        d => Some(format!("{} days", d)),
    }
}
