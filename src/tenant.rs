//! Tenant scope guard.
//!
//! Every handler takes a `TenantContext` parameter, extracted from the bearer
//! token the platform's identity service issued. Repository calls thread the
//! context through structurally, so there is no code path that queries
//! without an active tenant.

use crate::{errors::AppError, state::AppState};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims minted by the platform identity service. `sub` is the acting user,
/// `tenant` the establishment the session is bound to.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub tenant: String,
    pub exp: usize,
    pub iat: usize,
}

/// Active tenant plus the acting user for approve/pay/grant audit fields.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
}

impl TenantContext {
    /// Reject a row fetched by primary key that belongs to another tenant.
    /// A mismatch is fatal and logged; it is never softened into a 404.
    pub fn guard(&self, row_tenant_id: Uuid) -> Result<(), AppError> {
        if row_tenant_id == self.tenant_id {
            Ok(())
        } else {
            Err(AppError::TenantViolation(format!(
                "tenant {} attempted to access a row owned by another tenant",
                self.tenant_id
            )))
        }
    }
}

impl FromRequestParts<AppState> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers: &HeaderMap = &parts.headers;

        let auth_header = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))?;

        let secret = state.config.jwt_secret.as_bytes();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user_id =
            Uuid::parse_str(&token_data.claims.sub).map_err(|_| AppError::InvalidToken)?;
        let tenant_id =
            Uuid::parse_str(&token_data.claims.tenant).map_err(|_| AppError::InvalidToken)?;

        Ok(TenantContext { tenant_id, user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_accepts_own_tenant() {
        let tenant_id = Uuid::new_v4();
        let ctx = TenantContext {
            tenant_id,
            user_id: Uuid::new_v4(),
        };
        assert!(ctx.guard(tenant_id).is_ok());
    }

    #[test]
    fn guard_rejects_foreign_tenant() {
        let ctx = TenantContext {
            tenant_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        };
        let err = ctx.guard(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::TenantViolation(_)));
    }
}
