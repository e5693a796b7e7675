//! Caller identity and authorization tiers
//!
//! The service sits behind an OAuth proxy that forwards the authenticated
//! user and groups as headers. Reads need any user; writes need an admin.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::{ApiError, AppState};

pub const USER_HEADER: &str = "x-forwarded-user";
pub const GROUPS_HEADER: &str = "x-forwarded-groups";

/// Who is calling, as reported by the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub groups: Vec<String>,
}

impl Identity {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user = headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|u| !u.is_empty())?
            .to_string();

        let groups = headers
            .get(GROUPS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self { user, groups })
    }

    pub fn is_admin(&self, admin_users: &[String], admin_groups: &[String]) -> bool {
        admin_users.iter().any(|u| u == &self.user)
            || self.groups.iter().any(|g| admin_groups.contains(g))
    }
}

fn identify(parts: &Parts) -> Result<Identity, ApiError> {
    Identity::from_headers(&parts.headers).ok_or_else(|| ApiError {
        status: StatusCode::UNAUTHORIZED,
        message: "Not authenticated".to_string(),
    })
}

/// Any authenticated caller
#[derive(Debug)]
pub struct ReadAccess(pub Identity);

impl FromRequestParts<Arc<AppState>> for ReadAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        identify(parts).map(ReadAccess)
    }
}

/// Caller allowed to mutate records
#[derive(Debug)]
pub struct AdminAccess(pub Identity);

impl FromRequestParts<Arc<AppState>> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = identify(parts)?;
        if !identity.is_admin(&state.admin_users, &state.admin_groups) {
            info!("Denied {} {} to {}", parts.method, parts.uri.path(), identity.user);
            return Err(ApiError {
                status: StatusCode::FORBIDDEN,
                message: format!("User {} is not allowed to modify images", identity.user),
            });
        }
        Ok(AdminAccess(identity))
    }
}
