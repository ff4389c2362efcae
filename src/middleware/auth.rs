// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::{Caller, Claims},
};

/// Valida o JWT emitido pelo provedor de autenticação e devolve quem está chamando.
pub fn caller_from_token(token: &str, jwt_secret: &str) -> Result<Caller, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    let claims = token_data.claims;
    if claims.sub.trim().is_empty() {
        return Err(AppError::InvalidToken);
    }
    Ok(Caller::new(claims.sub, claims.role))
}

// Extrator para obter o usuário autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub Caller);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_request_parts(parts, state)
            .await
            .unwrap_or_default();

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

        caller_from_token(bearer.token(), &app_state.jwt_secret)
            .map(AuthenticatedUser)
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, role: Role, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            role,
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
    }

    #[test]
    fn valid_token_yields_caller_with_role() {
        let caller = caller_from_token(&token("ana", Role::Cliente, "s3cr3t"), "s3cr3t").unwrap();
        assert_eq!(caller, Caller::client("ana"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let err = caller_from_token(&token("ana", Role::Admin, "outro"), "s3cr3t").unwrap_err();
        assert_eq!(err.code(), "invalid_token");
    }
}
