//! Route table and the navigation guard run before every transition.
//!
//! Guest-only routes bounce signed-in users to the dashboard; protected routes
//! send anonymous users to login and remember where they were going, so the
//! first navigation away from login after signing in lands there.

pub mod guard;
pub mod routes;

pub use guard::{GuardDecision, NavigationError, NavigationGuard, REDIRECT_QUERY};
pub use routes::{Location, Route, RouteTable};
