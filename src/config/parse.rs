//! Parsers for the human-readable limit expressions.
//!
//! Both parsers are total: malformed input falls back to the default rather
//! than failing, so a typo in the environment never prevents startup.

/// Size cap used when the expression is empty or malformed (1 GiB).
pub const DEFAULT_MAX_SIZE: u64 = 1024 * 1024 * 1024;

/// Rate-limit spec used when the expression is empty or malformed.
pub const DEFAULT_RATE: RateSpec = RateSpec { rate: 1, burst: 5 };

const UNITS: [(&str, u64); 4] = [
    ("GB", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("KB", 1024),
    ("B", 1),
];

/// Token-bucket parameters: refill `rate` tokens/second, hold at most `burst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSpec {
    pub rate: u32,
    pub burst: u32,
}

/// Parse a size expression such as `"1GB"`, `"500mb"` or `"1024"` into bytes.
pub fn parse_size(expr: &str) -> u64 {
    let upper = expr.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return DEFAULT_MAX_SIZE;
    }

    let (digits, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|rest| (rest, *mult)))
        .unwrap_or((upper.as_str(), 1));

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .unwrap_or(DEFAULT_MAX_SIZE)
}

/// Parse a `<rate>-<burst>` expression such as `"1-5"`.
pub fn parse_rate_limit(expr: &str) -> RateSpec {
    let mut parts = expr.trim().split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(rate), Some(burst), None) => match (rate.parse(), burst.parse()) {
            (Ok(rate), Ok(burst)) => RateSpec { rate, burst },
            _ => DEFAULT_RATE,
        },
        _ => DEFAULT_RATE,
    }
}
