//! Authentication for the level API
//!
//! Every level and connection route requires a bearer token naming the
//! acting user.

mod jwt;

pub use jwt::{
    extract_token_from_header, Claims, JwtValidator, TokenValidationResult, DEFAULT_EXPIRY_SECONDS,
};

use bson::oid::ObjectId;
use hyper::header::AUTHORIZATION;
use hyper::HeaderMap;
use tracing::debug;

use crate::types::PromittoError;

/// Resolve the acting user from the `Authorization` header
pub fn authenticate(jwt: &JwtValidator, headers: &HeaderMap) -> Result<ObjectId, PromittoError> {
    let header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());

    let token = extract_token_from_header(header)
        .ok_or_else(|| PromittoError::Unauthorized("No token, authorization denied".into()))?;

    let result = jwt.verify_token(token);
    let Some(claims) = result.claims.filter(|_| result.valid) else {
        debug!(reason = ?result.error, "Rejected token");
        return Err(PromittoError::Unauthorized("Token is not valid".into()));
    };

    ObjectId::parse_str(&claims.user_id)
        .map_err(|_| PromittoError::Unauthorized("Token is not valid".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_authenticate_bearer() {
        let jwt = JwtValidator::new_dev();
        let user = ObjectId::new();
        let token = jwt.generate_token(&user).unwrap();

        let resolved = authenticate(&jwt, &headers(&format!("Bearer {}", token))).unwrap();
        assert_eq!(resolved, user);
    }

    #[test]
    fn test_missing_token() {
        let err = authenticate(&JwtValidator::new_dev(), &HeaderMap::new()).unwrap_err();
        assert_eq!(err.public_message(), "No token, authorization denied");
    }

    #[test]
    fn test_garbage_token() {
        let err = authenticate(&JwtValidator::new_dev(), &headers("Bearer nope")).unwrap_err();
        assert_eq!(err.public_message(), "Token is not valid");
    }
}
