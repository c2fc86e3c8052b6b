use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path},
    http::request::Parts,
};
use validator::Validate;

use crate::error::AppError;

/// JSON body extractor whose rejections go through [`AppError`], so a
/// malformed body still gets an error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T: Validate> AppJson<T> {
    /// Run the body's field validation and hand back the inner value.
    pub fn validated(self) -> Result<T, AppError> {
        self.0.validate()?;
        Ok(self.0)
    }
}

/// Numeric record id taken from the single path parameter.
///
/// Anything that is not an integer id cannot name a record, so it is
/// reported as not found rather than as a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::NotFound(e.body_text()))?;

        parse_record_id(&raw).map(RecordId)
    }
}

pub fn parse_record_id(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::NotFound(format!("No record with id '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_id() {
        assert_eq!(parse_record_id("42").unwrap(), 42);
        assert!(matches!(parse_record_id("abc"), Err(AppError::NotFound(_))));
        assert!(matches!(parse_record_id("-1"), Err(AppError::NotFound(_))));
        assert!(matches!(
            parse_record_id("64f1c2e8a9b3"),
            Err(AppError::NotFound(_))
        ));
    }
}
