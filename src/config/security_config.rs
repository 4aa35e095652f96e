use crate::models::AppState;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::extract::State;
use http::{HeaderMap, StatusCode};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // user id
    pub email: String, // passed through to the checkout provider
    pub role: String,  // "user" | "admin"
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingHeader,
    InvalidFormat,
    InvalidToken(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingHeader => write!(f, "Authorization header required"),
            AuthError::InvalidFormat => write!(f, "Invalid Authorization format"),
            AuthError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
        }
    }
}

impl From<AuthError> for (StatusCode, String) {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "Authorization header required".to_string(),
            ),
            AuthError::InvalidFormat => (
                StatusCode::BAD_REQUEST,
                "Invalid Authorization format".to_string(),
            ),
            AuthError::InvalidToken(msg) => {
                (StatusCode::UNAUTHORIZED, format!("Invalid token: {}", msg))
            }
        }
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat);
    }

    Ok(token.to_string())
}

pub fn verify_token(state: &AppState, token: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt.secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = match extract_bearer_token(req.headers()) {
        Ok(token) => token,
        Err(error) => {
            let (status, message): (StatusCode, String) = error.into();
            return Err((status, message).into_response());
        }
    };

    let claims = match verify_token(&state, &token) {
        Ok(claims) => claims,
        Err(error) => {
            warn!("Rejected bearer token: {}", error);
            let (status, message): (StatusCode, String) = error.into();
            return Err((status, message).into_response());
        }
    };

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_map(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let token = extract_bearer_token(&header_map("Bearer abc.def.ghi")).unwrap();
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_header() {
        assert!(matches!(
            extract_bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingHeader)
        ));
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        assert!(matches!(
            extract_bearer_token(&header_map("Basic dXNlcg==")),
            Err(AuthError::InvalidFormat)
        ));
    }

    #[test]
    fn rejects_empty_token() {
        assert!(matches!(
            extract_bearer_token(&header_map("Bearer   ")),
            Err(AuthError::InvalidFormat)
        ));
    }

    #[test]
    fn admin_check() {
        let claims = Claims {
            sub: "u".into(),
            email: "u@example.com".into(),
            role: "admin".into(),
            exp: 0,
            iat: 0,
        };
        assert!(claims.is_admin());
    }
}
