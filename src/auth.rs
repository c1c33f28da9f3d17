//! Authentication: signup and signin against the portal backend.
//!
//! The session is a plain value handed to every API call. There is no
//! global "current user" anywhere; two sessions can coexist in one
//! process without seeing each other.

use crate::api::types::{AuthResponse, Role, SigninRequest, SignupRequest};
use crate::api::ApiClient;
use crate::error::PortalError;

/// An authenticated identity. `user_id` is the opaque token the backend
/// expects in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: String,
    pub role: Role,
}

impl AuthSession {
    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }
}

pub async fn signin(
    api: &ApiClient,
    email: &str,
    password: &str,
) -> Result<AuthSession, PortalError> {
    let response: AuthResponse = api
        .post_json(
            None,
            "/signin",
            &SigninRequest {
                email: email.to_string(),
                password: password.to_string(),
            },
        )
        .await?;
    log::info!("Signed in as {} ({:?})", response.user_id, response.role);
    Ok(AuthSession {
        user_id: response.user_id,
        role: response.role,
    })
}

pub async fn signup(api: &ApiClient, request: &SignupRequest) -> Result<AuthSession, PortalError> {
    let response: AuthResponse = api.post_json(None, "/signup", request).await?;
    log::info!("Signed up as {} ({:?})", response.user_id, response.role);
    Ok(AuthSession {
        user_id: response.user_id,
        role: response.role,
    })
}
