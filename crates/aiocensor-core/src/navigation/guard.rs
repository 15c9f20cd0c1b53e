//! Navigation guard - decides whether a route transition proceeds.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::debug;

use super::routes::{Location, RouteTable};
use crate::auth::SessionManager;

/// Query parameter carrying the originally requested path to the login page.
pub const REDIRECT_QUERY: &str = "redirect";

/// Redirects followed by [`NavigationGuard::navigate`] before giving up.
const MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Location),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Too many redirects navigating to {0}")]
    RedirectLoop(String),
}

pub struct NavigationGuard {
    manager: Arc<SessionManager>,
    routes: RouteTable,
    /// Where an anonymous user was headed before being sent to login
    pending: Mutex<Option<Location>>,
}

impl NavigationGuard {
    pub fn new(manager: Arc<SessionManager>, routes: RouteTable) -> Self {
        Self {
            manager,
            routes,
            pending: Mutex::new(None),
        }
    }

    pub fn pending_target(&self) -> Option<Location> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_pending(&self, target: Option<Location>) -> Option<Location> {
        std::mem::replace(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
            target,
        )
    }

    /// Decide a single transition from `from` (if any) to `to`.
    pub fn before_each(&self, to: &Location, from: Option<&Location>) -> GuardDecision {
        let authenticated = self.manager.check_auth();
        let Some((route, to)) = self.routes.resolve(to) else {
            return GuardDecision::Proceed;
        };

        if route.requires_guest && authenticated {
            debug!(to = %to, "Signed in, leaving guest-only route");
            return GuardDecision::Redirect(self.routes.landing_location());
        }

        if route.requires_auth && !authenticated {
            debug!(to = %to, "Sign-in required, remembering target");
            let login = self
                .routes
                .login_location()
                .with_query(REDIRECT_QUERY, to.full_path());
            self.set_pending(Some(to));
            return GuardDecision::Redirect(login);
        }

        let from_login = from.is_some_and(|from| self.routes.is_login(from));
        if from_login && authenticated {
            if let Some(target) = self.set_pending(None) {
                debug!(target = %target, "Replaying target after sign-in");
                if target != to {
                    return GuardDecision::Redirect(target);
                }
            }
        }

        GuardDecision::Proceed
    }

    /// Follow the guard's redirects from `from` to wherever `to` ends up.
    pub fn navigate(
        &self,
        to: &Location,
        from: Option<&Location>,
    ) -> Result<Location, NavigationError> {
        let mut current = to.clone();
        for _ in 0..=MAX_REDIRECTS {
            match self.before_each(&current, from) {
                GuardDecision::Proceed => {
                    return Ok(self
                        .routes
                        .resolve(&current)
                        .map_or(current, |(_, resolved)| resolved));
                }
                GuardDecision::Redirect(next) => current = next,
            }
        }
        Err(NavigationError::RedirectLoop(to.full_path()))
    }

    pub fn title_for(&self, location: &Location) -> String {
        self.routes.title_for(location)
    }
}
