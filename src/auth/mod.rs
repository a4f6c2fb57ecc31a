//! In-memory auth and billing stubs.
//!
//! Mock implementations of the account and subscription collaborators: users,
//! login tokens, and plan quotas all live in process-local maps, and passwords
//! are unsalted SHA-256 digests. Nothing here is production auth; real
//! deployments put an identity provider and a billing service behind these
//! same signatures.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Trial tier.
    #[default]
    Free,
    /// Entry paid tier.
    Starter,
    /// Full paid tier.
    Pro,
}

impl Plan {
    /// Monthly token allowance for the plan.
    pub fn token_quota(&self) -> u64 {
        match self {
            Plan::Free => 20_000,
            Plan::Starter => 200_000,
            Plan::Pro => 2_000_000,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Starter => write!(f, "starter"),
            Plan::Pro => write!(f, "pro"),
        }
    }
}

impl std::str::FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "starter" => Ok(Plan::Starter),
            "pro" => Ok(Plan::Pro),
            _ => Err(format!("Unknown plan: {}", s)),
        }
    }
}

/// A registered user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: String,
    /// Login email.
    pub email: String,
    /// Unsalted SHA-256 password digest (mock only).
    #[serde(skip_serializing, default)]
    pub password_digest: String,
    /// Current subscription plan.
    pub plan: Plan,
    /// Tokens consumed in the current period.
    pub tokens_used: u64,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct AuthState {
    users: HashMap<String, User>,
    tokens: HashMap<String, String>,
}

/// In-memory user, session-token, and plan registry.
#[derive(Default)]
pub struct AuthService {
    state: RwLock<AuthState>,
}

impl AuthService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new user.
    pub fn register(&self, email: &str, password: &str, plan: Plan) -> AuthResult<User> {
        let mut state = self.state.write().unwrap();
        if state.users.values().any(|u| u.email == email) {
            return Err(AuthError::UserExists {
                email: email.to_string(),
            });
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_digest: digest(password),
            plan,
            tokens_used: 0,
            created_at: Utc::now(),
        };
        state.users.insert(user.id.clone(), user.clone());

        info!(user_id = %user.id, plan = %user.plan, "User registered");
        Ok(user)
    }

    /// Log a user in, returning a bearer token.
    pub fn login(&self, email: &str, password: &str) -> AuthResult<String> {
        let mut state = self.state.write().unwrap();
        let user_id = state
            .users
            .values()
            .find(|u| u.email == email && u.password_digest == digest(password))
            .map(|u| u.id.clone())
            .ok_or(AuthError::InvalidCredentials)?;

        let token = Uuid::new_v4().to_string();
        state.tokens.insert(token.clone(), user_id);
        Ok(token)
    }

    /// Resolve a bearer token to its user.
    pub fn validate_token(&self, token: &str) -> AuthResult<User> {
        let state = self.state.read().unwrap();
        state
            .tokens
            .get(token)
            .and_then(|user_id| state.users.get(user_id))
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    /// Change a user's plan.
    pub fn update_plan(&self, user_id: &str, plan: Plan) -> AuthResult<User> {
        let mut state = self.state.write().unwrap();
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| AuthError::UserNotFound {
                user_id: user_id.to_string(),
            })?;
        user.plan = plan;
        info!(user_id = %user.id, plan = %plan, "Plan updated");
        Ok(user.clone())
    }

    /// Check that a user can spend `requested_tokens` within their quota.
    ///
    /// Callers run this at the boundary, before orchestrating an action.
    pub fn check_quota(&self, user_id: &str, requested_tokens: u64) -> AuthResult<()> {
        let state = self.state.read().unwrap();
        let user = state
            .users
            .get(user_id)
            .ok_or_else(|| AuthError::UserNotFound {
                user_id: user_id.to_string(),
            })?;

        let limit = user.plan.token_quota();
        if user.tokens_used + requested_tokens > limit {
            return Err(AuthError::QuotaExceeded {
                used: user.tokens_used,
                limit,
            });
        }
        Ok(())
    }

    /// Meter tokens against a user's quota after a completed action.
    pub fn record_usage(&self, user_id: &str, tokens: u64) -> AuthResult<()> {
        let mut state = self.state.write().unwrap();
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| AuthError::UserNotFound {
                user_id: user_id.to_string(),
            })?;
        user.tokens_used += tokens;
        Ok(())
    }
}

fn digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
