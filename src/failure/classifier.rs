//! Failure classification.
//!
//! # Responsibilities
//! - Map any [`Failure`] (or unclassified error) to an [`ErrorResponse`]
//! - Keep the mapping in one table so every boundary renders failures alike
//!
//! # Design Decisions
//! - First match wins; duplicate kinds are rejected when the table is built
//! - Unregistered kinds fall back to 500 with the failure's description
//! - Classification never fails and holds no mutable state

use std::error::Error;

use axum::http::StatusCode;

use crate::catalog::{StoreError, TARIFF_CODE_CONSTRAINT};
use crate::failure::{ErrorResponse, Failure, FailureKind};
use crate::observability::metrics;

/// Converts one kind of failure into a response.
pub type Handler = fn(&Failure) -> ErrorResponse;

const UNKNOWN_ERROR: &str = "unknown error";
const DUPLICATE_TARIFF_CODE: &str = "tariff_code: a product with this tariff code already exists";

/// Error raised while building a classifier table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    #[error("a handler for {0:?} failures is already registered")]
    DuplicateHandler(FailureKind),
}

/// Read-only table of failure handlers.
#[derive(Debug, Clone)]
pub struct Classifier {
    handlers: Vec<(FailureKind, Handler)>,
}

impl Classifier {
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::default()
    }

    /// The catalog's error contract.
    ///
    /// `Store` failures other than constraint violations and `Internal`
    /// failures have no entry and take the 500 fallback.
    pub fn standard() -> Self {
        Self {
            handlers: vec![
                (FailureKind::Validation, validation as Handler),
                (FailureKind::Malformed, bad_request),
                (FailureKind::BadRequest, bad_request),
                (FailureKind::Constraint, constraint_violation),
                (FailureKind::NotFound, not_found),
                (FailureKind::RateLimited, rate_limited),
                (FailureKind::Unavailable, unavailable),
                (FailureKind::TimedOut, timed_out),
                (FailureKind::MethodNotAllowed, method_not_allowed),
            ],
        }
    }

    /// Map a typed failure to its response.
    pub fn classify(&self, failure: &Failure) -> ErrorResponse {
        let kind = failure.kind();
        let mut response = self
            .handlers
            .iter()
            .find(|(registered, _)| *registered == kind)
            .map(|(_, handler)| handler(failure))
            .unwrap_or_else(|| fallback(&failure.to_string()));

        // handlers registered through the builder may leave the body empty
        if response.messages().is_empty() {
            response.push(describe(&failure.to_string()));
        }

        record(kind, &response);
        response
    }

    /// Map an arbitrary error, recognizing typed failures and store errors
    /// anywhere they surface.
    pub fn classify_error(&self, error: &(dyn Error + 'static)) -> ErrorResponse {
        if let Some(failure) = error.downcast_ref::<Failure>() {
            return self.classify(failure);
        }
        if let Some(store_error) = error.downcast_ref::<StoreError>() {
            return self.classify(&Failure::Store(store_error.clone()));
        }

        let response = fallback(&error.to_string());
        tracing::warn!(error = %error, "Unclassified error");
        metrics::record_failure(response.status().as_u16());
        response
    }

    pub fn handles(&self, kind: FailureKind) -> bool {
        self.handlers.iter().any(|(registered, _)| *registered == kind)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}

/// Incrementally assembles a [`Classifier`].
#[derive(Debug, Default)]
pub struct ClassifierBuilder {
    handlers: Vec<(FailureKind, Handler)>,
}

impl ClassifierBuilder {
    pub fn register(mut self, kind: FailureKind, handler: Handler) -> Result<Self, ClassifierError> {
        if self.handlers.iter().any(|(registered, _)| *registered == kind) {
            return Err(ClassifierError::DuplicateHandler(kind));
        }
        self.handlers.push((kind, handler));
        Ok(self)
    }

    pub fn build(self) -> Classifier {
        Classifier {
            handlers: self.handlers,
        }
    }
}

fn record(kind: FailureKind, response: &ErrorResponse) {
    if response.status().is_server_error() {
        tracing::warn!(kind = ?kind, status = %response.status(), messages = ?response.messages(), "Request failed");
    } else {
        tracing::debug!(kind = ?kind, status = %response.status(), messages = ?response.messages(), "Request rejected");
    }
    metrics::record_failure(response.status().as_u16());
}

fn describe(text: &str) -> &str {
    if text.trim().is_empty() {
        UNKNOWN_ERROR
    } else {
        text
    }
}

fn fallback(description: &str) -> ErrorResponse {
    ErrorResponse::single(StatusCode::INTERNAL_SERVER_ERROR, describe(description))
}

fn described(failure: &Failure, status: StatusCode) -> ErrorResponse {
    ErrorResponse::single(status, describe(&failure.to_string()))
}

fn validation(failure: &Failure) -> ErrorResponse {
    let mut response = ErrorResponse::new(StatusCode::BAD_REQUEST);
    if let Failure::Validation(fields) = failure {
        for field in fields {
            response.push(field.to_string());
        }
    }
    if response.messages().is_empty() {
        response.push(describe(&failure.to_string()));
    }
    response
}

fn bad_request(failure: &Failure) -> ErrorResponse {
    described(failure, StatusCode::BAD_REQUEST)
}

fn constraint_violation(failure: &Failure) -> ErrorResponse {
    let outer = failure.to_string();
    let root_cause = root_cause(failure).unwrap_or_else(|| outer.clone());

    let message = if root_cause.contains(TARIFF_CODE_CONSTRAINT) {
        DUPLICATE_TARIFF_CODE.to_string()
    } else {
        format!("data integrity error: {root_cause}")
    };
    ErrorResponse::single(StatusCode::CONFLICT, message)
}

/// Text of the deepest error in the source chain, if there is one.
fn root_cause(error: &(dyn Error + 'static)) -> Option<String> {
    let mut current = error.source()?;
    while let Some(next) = current.source() {
        current = next;
    }
    Some(current.to_string())
}

fn not_found(failure: &Failure) -> ErrorResponse {
    described(failure, StatusCode::NOT_FOUND)
}

fn rate_limited(failure: &Failure) -> ErrorResponse {
    described(failure, StatusCode::TOO_MANY_REQUESTS)
}

fn unavailable(failure: &Failure) -> ErrorResponse {
    described(failure, StatusCode::SERVICE_UNAVAILABLE)
}

fn timed_out(failure: &Failure) -> ErrorResponse {
    described(failure, StatusCode::REQUEST_TIMEOUT)
}

fn method_not_allowed(failure: &Failure) -> ErrorResponse {
    described(failure, StatusCode::METHOD_NOT_ALLOWED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ConstraintViolation, ProductId};
    use crate::failure::FieldError;
    use crate::resilience::GuardError;

    fn classify(failure: Failure) -> ErrorResponse {
        Classifier::standard().classify(&failure)
    }

    #[test]
    fn test_validation_emits_one_message_per_field_in_order() {
        let response = classify(Failure::Validation(vec![
            FieldError::new("name", "must be between 3 and 100 characters"),
            FieldError::new("tariff_code", "must contain exactly 8 digits"),
            FieldError::new("name", "must be between 3 and 100 characters"),
        ]));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.messages(),
            [
                "name: must be between 3 and 100 characters",
                "tariff_code: must contain exactly 8 digits",
                "name: must be between 3 and 100 characters",
            ]
        );
    }

    #[test]
    fn test_empty_validation_still_has_a_message() {
        let response = classify(Failure::Validation(Vec::new()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.messages().len(), 1);
    }

    #[test]
    fn test_malformed_uses_description() {
        let response = classify(Failure::Malformed("expected value at line 1 column 1".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.messages(), ["expected value at line 1 column 1"]);
    }

    #[test]
    fn test_duplicate_tariff_code_gets_fixed_message() {
        let response = classify(Failure::Store(StoreError::Constraint {
            message: "could not execute statement".into(),
            cause: Some(ConstraintViolation {
                constraint: TARIFF_CODE_CONSTRAINT.into(),
                detail: "on PRODUCTS(TARIFF_CODE) values ('12345678')".into(),
            }),
        }));

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.messages(), [DUPLICATE_TARIFF_CODE]);
    }

    #[test]
    fn test_other_constraint_reports_root_cause() {
        let response = classify(Failure::Store(StoreError::Constraint {
            message: "could not execute statement".into(),
            cause: Some(ConstraintViolation {
                constraint: "PK_PRODUCTS".into(),
                detail: "on PRODUCTS(ID)".into(),
            }),
        }));

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.messages(),
            ["data integrity error: unique index or primary key violation: \"PK_PRODUCTS\" on PRODUCTS(ID)"]
        );
    }

    #[test]
    fn test_constraint_without_cause_uses_outer_message() {
        let response = classify(Failure::Store(StoreError::Constraint {
            message: "NULL not allowed for column NAME".into(),
            cause: None,
        }));

        assert_eq!(
            response.messages(),
            ["data integrity error: NULL not allowed for column NAME"]
        );
    }

    #[test]
    fn test_not_found() {
        let response = classify(Failure::NotFound(ProductId(999)));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.messages(), ["product not found with id: 999"]);
    }

    #[test]
    fn test_rate_limited() {
        let response = classify(Failure::RateLimited("request limit reached".into()));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.messages(), ["request limit reached"]);
    }

    #[test]
    fn test_unavailable_references_requested_id() {
        let response = classify(Failure::Unavailable {
            id: ProductId(7),
            cause: GuardError::CircuitOpen("product-service".into()),
        });

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.messages(),
            ["product service is currently unavailable; requested id: 7"]
        );
    }

    #[test]
    fn test_timeout_and_unsupported_method() {
        let response = classify(Failure::TimedOut(std::time::Duration::from_secs(30)));
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(response.messages(), ["request did not complete within 30s"]);

        let response = classify(Failure::MethodNotAllowed {
            method: "PATCH".into(),
            path: "/products".into(),
        });
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.messages(), ["method PATCH is not supported on /products"]);
    }

    #[test]
    fn test_handler_returning_no_messages_gets_the_description() {
        fn silent(_: &Failure) -> ErrorResponse {
            ErrorResponse::new(StatusCode::GONE)
        }
        let classifier = Classifier::builder()
            .register(FailureKind::NotFound, silent)
            .unwrap()
            .build();

        let response = classifier.classify(&Failure::NotFound(ProductId(4)));
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(response.messages(), ["product not found with id: 4"]);
    }

    #[test]
    fn test_unregistered_kinds_fall_back_to_500() {
        let response = classify(Failure::Store(StoreError::Unavailable("connection reset".into())));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.messages(), ["store unavailable: connection reset"]);

        let response = classify(Failure::Internal(String::new()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.messages(), [UNKNOWN_ERROR]);
    }

    #[test]
    fn test_classify_error_recognizes_typed_failures() {
        let classifier = Classifier::standard();
        let failure = Failure::NotFound(ProductId(3));
        assert_eq!(classifier.classify_error(&failure).status(), StatusCode::NOT_FOUND);

        let store_error = StoreError::Constraint {
            message: "could not execute statement".into(),
            cause: Some(ConstraintViolation {
                constraint: TARIFF_CODE_CONSTRAINT.into(),
                detail: String::new(),
            }),
        };
        assert_eq!(classifier.classify_error(&store_error).status(), StatusCode::CONFLICT);

        let io = std::io::Error::other("disk on fire");
        let response = classifier.classify_error(&io);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.messages(), ["disk on fire"]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let err = Classifier::builder()
            .register(FailureKind::NotFound, not_found)
            .unwrap()
            .register(FailureKind::NotFound, bad_request)
            .unwrap_err();

        assert_eq!(err, ClassifierError::DuplicateHandler(FailureKind::NotFound));
    }

    #[test]
    fn test_custom_table_only_handles_registered_kinds() {
        let classifier = Classifier::builder()
            .register(FailureKind::NotFound, not_found)
            .unwrap()
            .build();

        assert!(classifier.handles(FailureKind::NotFound));
        assert!(!classifier.handles(FailureKind::RateLimited));
        let response = classifier.classify(&Failure::RateLimited("slow down".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_standard_table_has_unique_kinds() {
        let classifier = Classifier::standard();
        let mut kinds: Vec<_> = classifier.handlers.iter().map(|(k, _)| *k).collect();
        let total = kinds.len();
        kinds.sort_by_key(|k| *k as u8);
        kinds.dedup();
        assert_eq!(kinds.len(), total);
    }
}
