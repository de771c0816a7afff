use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user id.
    pub sub: Uuid,
    pub role: String,
    pub exp: usize,
}

/// Identity inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == "admin" {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }
}

/// Missing or malformed headers are 401; a present-but-bad token (expired,
/// wrong signature) is 403.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = bearer_token(header_value)?;
    let claims = decode_token(token, &state.config.jwt_secret)?;

    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

fn bearer_token(header_value: Option<&str>) -> Result<&str, AppError> {
    let header_value = header_value.ok_or_else(|| {
        AppError::Unauthorized("Authorization header is required".to_string())
    })?;

    let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Authorization header must start with Bearer".to_string())
    })?;

    if token.is_empty() || token == "null" {
        return Err(AppError::Unauthorized("Token cannot be null".to_string()));
    }

    Ok(token)
}

fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|err| {
        let message = match err.kind() {
            ErrorKind::ExpiredSignature => "Token expired",
            _ => "Invalid token",
        };
        AppError::Forbidden(format!("Forbidden: {}", message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn token_with_exp(exp: usize) -> String {
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: "vendor".to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        assert!(matches!(bearer_token(None), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_non_bearer_header_is_unauthorized() {
        assert!(matches!(
            bearer_token(Some("Basic abc")),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_null_token_is_unauthorized() {
        assert!(matches!(
            bearer_token(Some("Bearer null")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            bearer_token(Some("Bearer ")),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_valid_token_decodes() {
        let token = token_with_exp(future_exp());
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.role, "vendor");
    }

    #[test]
    fn test_expired_token_is_forbidden() {
        let token = token_with_exp((chrono::Utc::now().timestamp() - 3600) as usize);
        let err = decode_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(m) if m.contains("Token expired")));
    }

    #[test]
    fn test_wrong_signature_is_forbidden() {
        let token = token_with_exp(future_exp());
        let err = decode_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(m) if m.contains("Invalid token")));
    }

    #[test]
    fn test_garbage_token_is_forbidden() {
        let err = decode_token("not-a-jwt", SECRET).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_require_admin() {
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: "admin".to_string(),
        };
        assert!(admin.require_admin().is_ok());

        let courier = AuthUser {
            user_id: Uuid::new_v4(),
            role: "delivery".to_string(),
        };
        assert!(matches!(
            courier.require_admin(),
            Err(AppError::Forbidden(_))
        ));
    }
}
