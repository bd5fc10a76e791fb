//! Auth gate for the dashboard routes
//!
//! Auth state is a plain value passed to whoever needs it. Signed-in users
//! are admins when `user_roles` holds an `admin` row for them.

use attendx_auth::{Session, User};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::routes::Route;
use crate::store::{fetch_rows, DataStore, Select, Table};

/// Role that opens the dashboard
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// The session is still being resolved
    Loading,
    Anonymous,
    SignedIn { session: Session, is_admin: bool },
}

impl AuthState {
    /// Credentials for the dashboard, if this state may open it
    pub fn admin_session(&self) -> Option<AdminSession> {
        match self {
            AuthState::SignedIn {
                session,
                is_admin: true,
            } => Some(AdminSession {
                user: session.user.clone(),
                access_token: session.access_token.clone(),
            }),
            _ => None,
        }
    }
}

/// A signed-in admin, injected into the dashboard context
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    pub user: User,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Auth is loading; show a spinner and decide later
    Pending,
    Redirect(Route),
}

/// Decide whether `route` may render for `state`
pub fn guard(route: &Route, state: &AuthState) -> Access {
    if !route.is_protected() {
        return Access::Granted;
    }
    match state {
        AuthState::Loading => Access::Pending,
        AuthState::SignedIn { is_admin: true, .. } => Access::Granted,
        AuthState::SignedIn { .. } | AuthState::Anonymous => Access::Redirect(Route::Login),
    }
}

#[derive(Debug, Deserialize)]
struct UserRole {
    role: String,
}

pub async fn is_admin(store: &dyn DataStore, user_id: &str) -> Result<bool> {
    let roles: Vec<UserRole> = fetch_rows(
        store,
        Table::UserRoles,
        Select::all().eq("user_id", user_id).eq("role", ADMIN_ROLE),
    )
    .await?;
    Ok(roles.iter().any(|r| r.role == ADMIN_ROLE))
}

/// Turn an optional session into an [`AuthState`]. Expired sessions count as
/// anonymous.
pub async fn resolve_auth_state(
    store: &dyn DataStore,
    session: Option<Session>,
) -> Result<AuthState> {
    let session = match session {
        Some(session) if !session.is_expired() => session,
        _ => return Ok(AuthState::Anonymous),
    };
    let is_admin = is_admin(store, &session.user.id).await?;
    debug!(user = %session.user.id, is_admin, "resolved auth state");
    Ok(AuthState::SignedIn { session, is_admin })
}
