//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs minted by the platform's account service. This
//! crate only verifies them and turns the claims into a [`RequestContext`]
//! that handlers pass explicitly into service calls.

use std::{fmt, str::FromStr, sync::Arc};

use color_eyre::Result;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::models::InvalidValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Parent,
    Admin,
}

impl Role {
    pub const LABELS: &'static [&'static str] = &["teacher", "parent", "admin"];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Parent => "parent",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive.
impl FromStr for Role {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "teacher" => Ok(Role::Teacher),
            "parent" => Ok(Role::Parent),
            "admin" => Ok(Role::Admin),
            _ => Err(InvalidValue {
                field: "role",
                value: s.to_owned(),
                expected: Self::LABELS,
            }),
        }
    }
}

/// Roles allowed to author, edit and delete assessments.
pub const AUTHOR_ROLES: &[Role] = &[Role::Teacher, Role::Admin];

#[derive(Debug, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
struct Claims {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    roles: Vec<String>,
    exp: i64,
}

/// The caller of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl RequestContext {
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        self.roles.iter().any(|r| allowed.contains(r))
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    inner: Arc<Keys>,
}

struct Keys {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            inner: Arc::new(Keys {
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation: Validation::new(Algorithm::HS256),
            }),
        }
    }

    /// Verifies signature and expiry. Unknown role names are dropped with a
    /// debug log.
    pub fn verify(&self, token: &str) -> Result<RequestContext> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.inner.decoding, &self.inner.validation)?;
        let claims = data.claims;

        Ok(RequestContext {
            user_id: claims.sub,
            email: claims.email,
            roles: claims
                .roles
                .iter()
                .filter_map(|r| {
                    r.parse()
                        .inspect_err(|e: &InvalidValue| tracing::debug!("ignoring token role: {e}"))
                        .ok()
                })
                .collect(),
        })
    }
}
