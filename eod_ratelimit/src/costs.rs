//! Per-endpoint call costs
//!
//! Most EODHD endpoints consume one call from the daily budget. Heavier
//! endpoints cost more and the account endpoint is free.

/// Endpoint prefix to cost, matched on the first path segment
pub const ENDPOINT_COSTS: &[(&str, u32)] = &[("eod", 1), ("intraday", 5), ("user", 0)];

/// Cost charged for endpoints missing from `ENDPOINT_COSTS`
pub const DEFAULT_COST: u32 = 1;

/// Look up the cost of a call to `endpoint`
///
/// Leading and trailing slashes are ignored and the match is
/// case-insensitive, so `/INTRADAY/TSLA/` costs the same as `intraday/TSLA`.
pub fn get_endpoint_cost(endpoint: &str) -> u32 {
    let prefix = endpoint.trim_matches('/').split('/').next().unwrap_or_default();

    ENDPOINT_COSTS.iter().find(|(name, _)| name.eq_ignore_ascii_case(prefix)).map(|(_, cost)| *cost).unwrap_or(DEFAULT_COST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_endpoint_cost() {
        let cases = [
            ("eod/AAPL", 1),
            ("eod/AAPL.US", 1),
            ("intraday/AAPL", 5),
            ("intraday/MSFT.US", 5),
            ("user", 0),
            ("EOD/AAPL", 1),
            ("INTRADAY/TSLA", 5),
            ("USER", 0),
            ("/eod/AAPL", 1),
            ("/intraday/TSLA/", 5),
            ("fundamentals/AAPL", 1),
            ("options/AAPL", 1),
        ];

        for (endpoint, expected) in cases {
            assert_eq!(get_endpoint_cost(endpoint), expected, "cost of {endpoint}");
        }
    }

    #[test]
    fn test_prefix_must_match_whole_segment() {
        assert_eq!(get_endpoint_cost("users/me"), DEFAULT_COST);
        assert_eq!(get_endpoint_cost("eodbulk"), DEFAULT_COST);
    }

    #[test]
    fn test_empty_endpoint() {
        assert_eq!(get_endpoint_cost(""), DEFAULT_COST);
        assert_eq!(get_endpoint_cost("//"), DEFAULT_COST);
    }

    #[test]
    fn test_endpoint_costs_constant() {
        for key in ["eod", "intraday", "user"] {
            assert!(ENDPOINT_COSTS.iter().any(|(name, _)| *name == key), "missing {key}");
        }
    }
}
