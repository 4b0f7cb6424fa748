use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::auth::{verify_jwt, Claims};
use crate::error::ApiError;
use crate::tenancy::Actor;

/// Resolve the caller from `Authorization: Bearer <jwt>`.
///
/// Always inserts an [`Actor`] extension: anonymous when no header is sent,
/// the token's user otherwise. A header that is present but unusable is a 401.
pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let actor = match extract_jwt_from_headers(&headers) {
        Ok(None) => Actor::anonymous(),
        Ok(Some(token)) => {
            let claims = verify_jwt(&token).map_err(|e| {
                warn!("Rejected token for {}: {}", request.uri().path(), e);
                ApiError::unauthorized(e.to_string())
            })?;
            let actor = claims.to_actor();
            request.extensions_mut().insert::<Claims>(claims);
            actor
        }
        Err(msg) => {
            warn!("Rejected Authorization header for {}: {}", request.uri().path(), msg);
            return Err(ApiError::unauthorized(msg));
        }
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Extract the bearer token; `Ok(None)` when no Authorization header is present
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("Empty JWT token".to_string()),
        Some(token) => Ok(Some(token.trim().to_string())),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_jwt_from_headers(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn rejects_non_bearer_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic YWxhZGRpbjpvcGVu"));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer  "));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers), Ok(Some("abc.def.ghi".to_string())));
    }
}
