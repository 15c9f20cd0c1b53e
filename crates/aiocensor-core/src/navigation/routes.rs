use std::collections::BTreeMap;
use std::fmt;

use url::form_urlencoded;

/// Prefix of every page title
const TITLE_PREFIX: &str = "AIOCENSOR";

/// Title used when a route has none of its own
const DEFAULT_TITLE: &str = "AIOCENSOR Console";

/// A navigation target: a path plus query parameters.
///
/// Query keys and values are stored decoded and percent-encoded by
/// [`full_path`](Self::full_path), so a value may itself be a full path with
/// its own query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl Location {
    pub fn new(path: &str) -> Self {
        Self {
            path: normalize_path(path),
            query: BTreeMap::new(),
        }
    }

    /// Parse a full path such as `/login?redirect=/blacklist`.
    pub fn parse(full_path: &str) -> Self {
        let (path, query) = full_path.split_once('?').unwrap_or((full_path, ""));
        let query = form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self {
            path: normalize_path(path),
            query,
        }
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.insert(key.to_string(), value.into());
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        format!("{}?{query}", self.path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

/// Leading slash, no trailing slash except for the root.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub path: &'static str,
    pub requires_auth: bool,
    /// Only reachable while signed out (the login page)
    pub requires_guest: bool,
    pub title: Option<&'static str>,
}

impl Route {
    pub fn guest(name: &'static str, path: &'static str) -> Self {
        Self {
            name,
            path,
            requires_auth: false,
            requires_guest: true,
            title: None,
        }
    }

    pub fn protected(name: &'static str, path: &'static str) -> Self {
        Self {
            name,
            path,
            requires_auth: true,
            requires_guest: false,
            title: None,
        }
    }

    pub fn titled(mut self, title: &'static str) -> Self {
        self.title = Some(title);
        self
    }
}

/// The console's routes and the two special destinations the guard needs.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    login: &'static str,
    landing: &'static str,
}

impl RouteTable {
    /// `login` and `landing` are route names; unknown paths resolve to `landing`.
    pub fn new(routes: Vec<Route>, login: &'static str, landing: &'static str) -> Self {
        Self {
            routes,
            login,
            landing,
        }
    }

    /// The admin console: login, the dashboard and its three pages.
    pub fn console() -> Self {
        Self::new(
            vec![
                Route::guest("Login", "/login"),
                Route::protected("Dashboard", "/"),
                Route::protected("AuditLog", "/audit").titled("Audit Log"),
                Route::protected("BlackList", "/blacklist").titled("Blacklist"),
                Route::protected("SensitiveWords", "/sensitive").titled("Sensitive Words"),
            ],
            "Login",
            "Dashboard",
        )
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    fn by_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.path == path)
    }

    pub fn login_location(&self) -> Location {
        Location::new(self.by_name(self.login).map_or("/login", |r| r.path))
    }

    pub fn landing_location(&self) -> Location {
        Location::new(self.by_name(self.landing).map_or("/", |r| r.path))
    }

    /// Match a location, sending unknown paths to the landing route.
    pub fn resolve(&self, location: &Location) -> Option<(&Route, Location)> {
        if let Some(route) = self.by_path(&location.path) {
            return Some((route, location.clone()));
        }
        let landing = self.by_name(self.landing)?;
        Some((landing, Location::new(landing.path)))
    }

    pub fn is_login(&self, location: &Location) -> bool {
        self.by_path(&location.path)
            .is_some_and(|route| route.name == self.login)
    }

    /// Page title for a location.
    pub fn title_for(&self, location: &Location) -> String {
        match self.resolve(location).and_then(|(route, _)| route.title) {
            Some(title) => format!("{TITLE_PREFIX} - {title}"),
            None => DEFAULT_TITLE.to_string(),
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::console()
    }
}
