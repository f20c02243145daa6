//! Request decoding and validation.
//!
//! # Responsibilities
//! - Tag every request with an `x-request-id` (UUID v4) and echo it back
//! - Decode product payloads and check field constraints
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - All field problems are reported at once, one per field, in
//!   declaration order
//! - Decoding problems are `Malformed`; constraint problems are `Validation`

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{HeaderName, Request};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::Span;

use crate::catalog::{Product, ProductId};
use crate::failure::{Failure, FieldError};

pub const X_REQUEST_ID: &str = "x-request-id";

const NAME_CHARS: std::ops::RangeInclusive<usize> = 3..=100;
const TARIFF_CODE_DIGITS: usize = 8;
const TARIFF_DESCRIPTION_MAX_CHARS: usize = 255;

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Span for one HTTP request, carrying its request id.
pub fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

/// Body accepted by create and update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductRequest {
    pub name: Option<String>,
    pub tariff_code: Option<String>,
    pub tariff_description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

impl ProductRequest {
    /// Every invalid field, at most one entry per field.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        match self.name.as_deref().map(str::trim) {
            None | Some("") => errors.push(FieldError::new("name", "is required")),
            Some(_) => {
                let chars = self.name.as_deref().map(|n| n.chars().count()).unwrap_or(0);
                if !NAME_CHARS.contains(&chars) {
                    errors.push(FieldError::new("name", "must be between 3 and 100 characters"));
                }
            }
        }

        match self.tariff_code.as_deref() {
            None => errors.push(FieldError::new("tariff_code", "is required")),
            Some(code) if code.trim().is_empty() => {
                errors.push(FieldError::new("tariff_code", "is required"))
            }
            Some(code) => {
                let digits = code.len() == TARIFF_CODE_DIGITS && code.bytes().all(|b| b.is_ascii_digit());
                if !digits {
                    errors.push(FieldError::new("tariff_code", "must contain exactly 8 digits"));
                }
            }
        }

        if let Some(description) = &self.tariff_description {
            if description.chars().count() > TARIFF_DESCRIPTION_MAX_CHARS {
                errors.push(FieldError::new(
                    "tariff_description",
                    "must be at most 255 characters",
                ));
            }
        }

        match self.price {
            None => errors.push(FieldError::new("price", "is required")),
            Some(price) if price < Decimal::new(1, 2) => {
                errors.push(FieldError::new("price", "must be greater than zero"))
            }
            Some(_) => {}
        }

        match self.quantity {
            None => errors.push(FieldError::new("quantity", "is required")),
            Some(quantity) if quantity < 0 => {
                errors.push(FieldError::new("quantity", "must not be negative"))
            }
            Some(_) => {}
        }

        errors
    }

    /// Validate and convert into a product carrying `id`.
    pub fn into_product(self, id: Option<ProductId>) -> Result<Product, Failure> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(Failure::Validation(errors));
        }

        match (self.name, self.tariff_code, self.price, self.quantity) {
            (Some(name), Some(tariff_code), Some(price), Some(quantity)) => Ok(Product {
                id,
                name,
                tariff_code,
                tariff_description: self.tariff_description,
                price,
                quantity,
            }),
            _ => Err(Failure::Internal("validated product is missing a field".to_string())),
        }
    }
}

pub fn malformed_body(rejection: JsonRejection) -> Failure {
    Failure::Malformed(rejection.body_text())
}

pub fn invalid_path(rejection: PathRejection) -> Failure {
    Failure::BadRequest(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid() -> ProductRequest {
        ProductRequest {
            name: Some("Notebook Dell".into()),
            tariff_code: Some("12345678".into()),
            tariff_description: Some("Notebook with Intel Core i7".into()),
            price: Some(dec!(22.95)),
            quantity: Some(10),
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<String> {
        errors.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_valid_request_becomes_product() {
        let product = valid().into_product(None).unwrap();
        assert_eq!(product.name, "Notebook Dell");
        assert_eq!(product.price, dec!(22.95));
        assert_eq!(product.id, None);
    }

    #[test]
    fn test_empty_request_reports_every_required_field_in_order() {
        let errors = ProductRequest::default().validate();
        assert_eq!(
            fields(&errors),
            [
                "name: is required",
                "tariff_code: is required",
                "price: is required",
                "quantity: is required",
            ]
        );
    }

    #[test]
    fn test_constraint_violations() {
        let request = ProductRequest {
            name: Some("TV".into()),
            tariff_code: Some("1234567a".into()),
            tariff_description: Some("x".repeat(256)),
            price: Some(dec!(0)),
            quantity: Some(-1),
        };

        assert_eq!(
            fields(&request.validate()),
            [
                "name: must be between 3 and 100 characters",
                "tariff_code: must contain exactly 8 digits",
                "tariff_description: must be at most 255 characters",
                "price: must be greater than zero",
                "quantity: must not be negative",
            ]
        );
    }

    #[test]
    fn test_boundaries_are_accepted() {
        let request = ProductRequest {
            name: Some("abc".into()),
            tariff_description: Some("é".repeat(255)),
            price: Some(dec!(0.01)),
            quantity: Some(0),
            ..valid()
        };
        assert!(request.validate().is_empty());

        let too_long = ProductRequest {
            name: Some("n".repeat(101)),
            ..valid()
        };
        assert_eq!(too_long.validate().len(), 1);
    }

    #[test]
    fn test_invalid_request_is_validation_failure() {
        let request = ProductRequest {
            quantity: Some(-5),
            ..valid()
        };
        match request.into_product(None) {
            Err(Failure::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}
