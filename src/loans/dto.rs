use rust_decimal::Decimal;
use serde::Deserialize;

/// Request body for a loan application.
#[derive(Debug, Deserialize)]
pub struct ApplyLoanRequest {
    pub amount: Decimal,
    pub purpose: String,
    pub duration_months: i32,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

const MAX_LIMIT: i64 = 100;

impl Pagination {
    /// Postgres rejects negative LIMIT/OFFSET; clamp to what it accepts and
    /// cap the page size.
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn pagination_clamps_negative_values() {
        let p: Pagination = serde_json::from_str(r#"{"limit": -5, "offset": -10}"#).unwrap();
        assert_eq!(p.limit(), 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn pagination_caps_oversized_limit() {
        let p: Pagination = serde_json::from_str(r#"{"limit": 10000, "offset": 3}"#).unwrap();
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 3);
    }

    #[test]
    fn apply_request_parses_decimal_amount() {
        let req: ApplyLoanRequest = serde_json::from_str(
            r#"{"amount": "2500.50", "purpose": "equipment", "duration_months": 12}"#,
        )
        .unwrap();
        assert_eq!(req.amount.to_string(), "2500.50");
        assert_eq!(req.duration_months, 12);
    }
}
