//! Translation of typed port failures into domain [`Error`]s.
//!
//! Every failure is logged here before it leaves a service: client-side
//! problems at `warn`, infrastructure problems at `error`.

use serde_json::json;
use tracing::{error, warn};

use super::Error;
use super::filter::FilterError;
use super::ports::RepositoryError;
use super::validation::ValidationError;

pub(crate) fn repository_failure(operation: &'static str, err: RepositoryError) -> Error {
    match err {
        RepositoryError::NotFound { message } => {
            warn!(operation, %message, "record not found");
            Error::not_found(message)
        }
        RepositoryError::InvalidArgument { message } => {
            warn!(operation, %message, "invalid repository argument");
            Error::invalid_request(message)
        }
        RepositoryError::InvalidField { field } => {
            warn!(operation, %field, "unknown field requested");
            Error::invalid_request(format!("unknown field `{field}`"))
                .with_details(json!({ "field": field, "code": "invalid_field" }))
        }
        RepositoryError::Conflict { message } => {
            warn!(operation, %message, "conflicting write rejected");
            Error::conflict(message)
        }
        RepositoryError::Connection { message } => {
            error!(operation, %message, "repository unavailable");
            Error::service_unavailable(format!("repository unavailable: {message}"))
        }
        other @ (RepositoryError::Query { .. } | RepositoryError::TransactionClosed { .. }) => {
            error!(operation, error = %other, "repository failure");
            Error::internal(other.to_string())
        }
    }
}

pub(crate) fn validation_failure(operation: &'static str, err: &ValidationError) -> Error {
    warn!(operation, error = %err, "validation failed");
    Error::invalid_request(err.to_string()).with_details(err.details())
}

pub(crate) fn filter_failure(operation: &'static str, err: FilterError) -> Error {
    repository_failure(operation, err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::validation::ValidationRule;
    use rstest::rstest;

    #[rstest]
    #[case(RepositoryError::not_found("gone"), ErrorCode::NotFound)]
    #[case(RepositoryError::invalid_argument("empty"), ErrorCode::InvalidRequest)]
    #[case(RepositoryError::invalid_field("sku"), ErrorCode::InvalidRequest)]
    #[case(RepositoryError::conflict("email taken"), ErrorCode::Conflict)]
    #[case(RepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
    #[case(RepositoryError::query("syntax"), ErrorCode::InternalError)]
    fn repository_errors_map_to_codes(#[case] err: RepositoryError, #[case] code: ErrorCode) {
        assert_eq!(repository_failure("test", err).code(), code);
    }

    #[rstest]
    fn validation_errors_carry_details() {
        let err = ValidationError::new("price", ValidationRule::NonNegative).at(2);
        let mapped = validation_failure("test", &err);
        assert_eq!(mapped.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            mapped.details(),
            Some(&json!({"field": "price", "code": "price_non_negative", "index": 2}))
        );
    }
}
