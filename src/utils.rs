use crate::BreakdownRow;

const THOUSAND: f64 = 1_000.0;
const HUNDRED_THOUSAND: f64 = 100_000.0;
const MILLION: f64 = 1_000_000.0;
const HUNDRED_MILLION: f64 = 100_000_000.0;
const BILLION: f64 = 1_000_000_000.0;
const HUNDRED_BILLION: f64 = 100_000_000_000.0;

/// Format a metric for compact display: `999`, `1.2k`, `150k`, `3M`, `2.5B`.
///
/// Values below a thousand are printed as-is (`40.5` stays `40.5`). Larger
/// values are truncated, not rounded, to one decimal, and lose the decimal
/// entirely from the hundred-unit mark up.
///
/// # Examples
/// ```
/// use goal_breakdown::utils::format_number;
/// assert_eq!(format_number(950.0), "950");
/// assert_eq!(format_number(1_250.0), "1.2k");
/// assert_eq!(format_number(123_456.0), "123k");
/// assert_eq!(format_number(2_000_000.0), "2M");
/// ```
pub fn format_number(num: f64) -> String {
    let (unit, hundred, suffix) = if num >= BILLION {
        (BILLION, HUNDRED_BILLION, "B")
    } else if num >= MILLION {
        (MILLION, HUNDRED_MILLION, "M")
    } else if num >= THOUSAND {
        (THOUSAND, HUNDRED_THOUSAND, "k")
    } else {
        return format!("{}", num);
    };

    let scaled = num / unit;
    if scaled == scaled.floor() || num >= hundred {
        format!("{}{}", scaled.floor(), suffix)
    } else {
        format!("{}{}", (scaled * 10.0).floor() / 10.0, suffix)
    }
}

/// Integer counts go through the same formatter.
pub fn format_count(count: u64) -> String {
    format_number(count as f64)
}

/// Width of a row's bar as a percentage of the largest count in the result.
pub fn bar_width_percent(count: u64, rows: &[BreakdownRow]) -> f64 {
    let max = rows.iter().map(|r| r.count).max().unwrap_or(0);
    if max == 0 {
        0.0
    } else {
        (count as f64 / max as f64 * 100.0).min(100.0)
    }
}
