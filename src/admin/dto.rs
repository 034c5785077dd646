use serde::Deserialize;

use crate::loans::repo_types::LoanStatus;

/// Request body for an admin loan-status change.
#[derive(Debug, Deserialize)]
pub struct UpdateLoanStatusRequest {
    pub status: LoanStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_lowercase() {
        let req: UpdateLoanStatusRequest = serde_json::from_str(r#"{"status": "approved"}"#).unwrap();
        assert_eq!(req.status, LoanStatus::Approved);
    }
}
