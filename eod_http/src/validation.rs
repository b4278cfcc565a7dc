//! Parameter checks shared by the endpoint adapters
//!
//! Failures surface as [`ApiError::InvalidParameter`] before any quota is
//! drawn.

use std::fmt;
use std::str::FromStr;

use crate::errors::ApiError;
use crate::errors::Result;

const MAX_SYMBOL_LEN: usize = 48;

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '$' | '.' | '+')
}

/// Check a ticker and rewrite it into the form the service expects
///
/// Everything after the last dot is read as the exchange, so a symbol with a
/// market suffix (`BRK.B.US`) has its first dot replaced: `BRK-B.US`.
pub fn validate_normalize_symbol(symbol: &str) -> Result<String> {
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN || !symbol.chars().all(is_symbol_char) {
        return Err(ApiError::InvalidParameter(format!("Symbol is invalid: {symbol}")));
    }

    if symbol.matches('.').count() == 2 {
        return Ok(symbol.replacen('.', "-", 1));
    }

    Ok(symbol.to_string())
}

/// Sort order of historical rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Ascending => "a",
            Order::Descending => "d",
        }
    }
}

pub fn validate_order(order: &str) -> Result<Order> {
    match order {
        "a" => Ok(Order::Ascending),
        "d" => Ok(Order::Descending),
        _ => Err(ApiError::InvalidParameter("Order must be 'a' (ascending) or 'd' (descending)".to_string())),
    }
}

impl FromStr for Order {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        validate_order(s)
    }
}

/// Which family of bars an interval applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Eod,
    Intraday,
}

/// End-of-day bar period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "d",
            Period::Weekly => "w",
            Period::Monthly => "m",
        }
    }
}

impl FromStr for Period {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        validate_interval(s, DataKind::Eod)?;
        Ok(match s {
            "w" => Period::Weekly,
            "m" => Period::Monthly,
            _ => Period::Daily,
        })
    }
}

/// Intraday bar size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    OneMinute,
    #[default]
    FiveMinutes,
    OneHour,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::OneHour => "1h",
        }
    }
}

impl FromStr for Interval {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        validate_interval(s, DataKind::Intraday)?;
        Ok(match s {
            "1m" => Interval::OneMinute,
            "1h" => Interval::OneHour,
            _ => Interval::FiveMinutes,
        })
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check an interval string against the values allowed for `kind`
pub fn validate_interval(interval: &str, kind: DataKind) -> Result<()> {
    let (allowed, message): (&[&str], &str) = match kind {
        DataKind::Eod => (&["d", "w", "m"], "Interval must be 'd' (daily), 'w' (weekly), or 'm' (monthly)"),
        DataKind::Intraday => (&["1m", "5m", "1h"], "Interval must be '1m', '5m', or '1h'"),
    };

    if allowed.contains(&interval) {
        Ok(())
    } else {
        Err(ApiError::InvalidParameter(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_symbols() {
        for (symbol, expected) in [("AAPL", "AAPL"), ("GOOG", "GOOG"), ("BRK.B.US", "BRK-B.US"), ("BRK-A", "BRK-A"), ("AAPL.US", "AAPL.US"), ("^GSPC", "")] {
            if expected.is_empty() {
                assert!(validate_normalize_symbol(symbol).is_err(), "{symbol} should be rejected");
            } else {
                assert_eq!(validate_normalize_symbol(symbol).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_invalid_symbols() {
        let too_long = "A".repeat(49);
        for symbol in ["INVALID SYMBOL!", "", too_long.as_str(), "symbol@invalid"] {
            let err = validate_normalize_symbol(symbol).unwrap_err();
            assert!(matches!(err, ApiError::InvalidParameter(ref msg) if msg.starts_with("Symbol is invalid")));
        }
    }

    #[test]
    fn test_punctuation_between_upper_and_lower_case_rejected() {
        for symbol in ["FOO_BAR.US", "A^B", "X[1]", "A\\B", "`AAPL"] {
            assert!(validate_normalize_symbol(symbol).is_err(), "{symbol} should be rejected");
        }
    }

    #[test]
    fn test_longest_symbol_accepted() {
        let symbol = "A".repeat(48);
        assert_eq!(validate_normalize_symbol(&symbol).unwrap(), symbol);
    }

    #[test]
    fn test_order() {
        assert_eq!(validate_order("a").unwrap(), Order::Ascending);
        assert_eq!(validate_order("d").unwrap(), Order::Descending);
        assert!(validate_order("asc").is_err());
        assert!(validate_order("").is_err());
    }

    #[test]
    fn test_interval_per_kind() {
        for interval in ["d", "w", "m"] {
            assert!(validate_interval(interval, DataKind::Eod).is_ok());
            assert!(validate_interval(interval, DataKind::Intraday).is_err());
        }
        for interval in ["1m", "5m", "1h"] {
            assert!(validate_interval(interval, DataKind::Intraday).is_ok());
            assert!(validate_interval(interval, DataKind::Eod).is_err());
        }
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("w".parse::<Period>().unwrap(), Period::Weekly);
        assert_eq!("1h".parse::<Interval>().unwrap(), Interval::OneHour);
        assert_eq!("d".parse::<Order>().unwrap(), Order::Descending);
        assert!("1d".parse::<Interval>().is_err());
        assert_eq!(Interval::default().to_string(), "5m");
    }
}
