use anyhow::Result;
use serde::Serialize;

use crate::{
    auth::Identity,
    database::RescueDatabase,
    error::{AppError, AppResult},
    model::Profile,
    profile::ProfileResolver,
    routes::{access_denied_location, Route},
};

/// Per-navigation guard state. `Checking` always resolves to one of the other two.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GuardState {
    Checking,
    Authorized { profile: Option<Profile> },
    Denied { attempted_path: String, redirect: String },
}

impl GuardState {
    /// Transition out of `Checking` once the role lookup has answered.
    pub fn resolve(self, attempted_path: &str, member: Option<Profile>) -> GuardState {
        match self {
            GuardState::Checking => match member {
                Some(profile) => GuardState::Authorized {
                    profile: Some(profile),
                },
                None => GuardState::Denied {
                    attempted_path: attempted_path.to_string(),
                    redirect: access_denied_location(attempted_path),
                },
            },
            terminal => terminal,
        }
    }

    pub fn into_profile(self) -> AppResult<Option<Profile>> {
        match self {
            GuardState::Authorized { profile } => Ok(profile),
            GuardState::Denied { attempted_path, .. } => Err(AppError::AccessDenied { attempted_path }),
            GuardState::Checking => Err(AppError::AccessDenied {
                attempted_path: String::new(),
            }),
        }
    }
}

/// Re-verifies role membership on every protected navigation. Nothing is cached.
pub struct AccessGuard<'a> {
    db: &'a RescueDatabase,
}

impl<'a> AccessGuard<'a> {
    pub fn new(db: &'a RescueDatabase) -> Self {
        AccessGuard { db }
    }

    pub async fn check(&self, identity: Option<&Identity>, route: Route) -> Result<GuardState> {
        let role = match route.required_role() {
            Some(role) => role,
            None => return Ok(GuardState::Authorized { profile: None }),
        };

        let member = match identity {
            Some(identity) => {
                ProfileResolver::new(self.db)
                    .in_role(&identity.uid, role)
                    .await?
            }
            None => None,
        };

        let state = GuardState::Checking.resolve(route.path(), member);
        if let GuardState::Denied { .. } = &state {
            tracing::info!(
                uid = identity.map(|i| i.uid.as_str()).unwrap_or("anonymous"),
                path = route.path(),
                "Access denied."
            );
        }

        Ok(state)
    }

    /// The caller's profile for a role-gated route, or `AccessDenied`.
    pub async fn authorize(&self, identity: Option<&Identity>, route: Route) -> AppResult<Profile> {
        let state = self.check(identity, route).await.map_err(AppError::Submission)?;

        state
            .into_profile()?
            .ok_or_else(|| AppError::AccessDenied {
                attempted_path: route.path().to_string(),
            })
    }
}
