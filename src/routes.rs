//! Route surface
//!
//! `/` is the marketing page and `/auth` the login page; everything under
//! `/dashboard` needs an admin session (see [`crate::gate`]). Any other path
//! resolves to [`Route::NotFound`].

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Dashboard(DashboardPage),
    NotFound(String),
}

/// Pages of the dashboard, in sidebar order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardPage {
    Home,
    Students,
    Classes,
    Attendance,
    Warnings,
    Messages,
    Reports,
}

impl DashboardPage {
    pub const ALL: [DashboardPage; 7] = [
        DashboardPage::Home,
        DashboardPage::Students,
        DashboardPage::Classes,
        DashboardPage::Attendance,
        DashboardPage::Warnings,
        DashboardPage::Messages,
        DashboardPage::Reports,
    ];

    /// Sidebar label
    pub fn label(&self) -> &'static str {
        match self {
            DashboardPage::Home => "Dashboard",
            DashboardPage::Students => "Students",
            DashboardPage::Classes => "Classes",
            DashboardPage::Attendance => "Attendance",
            DashboardPage::Warnings => "Warnings",
            DashboardPage::Messages => "Messages",
            DashboardPage::Reports => "Reports",
        }
    }

    fn segment(&self) -> Option<&'static str> {
        match self {
            DashboardPage::Home => None,
            DashboardPage::Students => Some("students"),
            DashboardPage::Classes => Some("classes"),
            DashboardPage::Attendance => Some("attendance"),
            DashboardPage::Warnings => Some("warnings"),
            DashboardPage::Messages => Some("messages"),
            DashboardPage::Reports => Some("reports"),
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|page| page.segment() == Some(segment))
    }
}

impl Route {
    /// Resolve a path. A query string or fragment is ignored, as are
    /// repeated and trailing slashes.
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["auth"] => Route::Login,
            ["dashboard"] => Route::Dashboard(DashboardPage::Home),
            ["dashboard", page] => match DashboardPage::from_segment(page) {
                Some(page) => Route::Dashboard(page),
                None => Route::NotFound(path.to_string()),
            },
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/auth".to_string(),
            Route::Dashboard(page) => match page.segment() {
                Some(segment) => format!("/dashboard/{}", segment),
                None => "/dashboard".to_string(),
            },
            Route::NotFound(path) => path.clone(),
        }
    }

    /// Whether the route needs an admin session
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_public_routes() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/auth"), Route::Login);
        assert_eq!(Route::parse("/auth?next=/dashboard"), Route::Login);
    }

    #[test]
    fn parses_dashboard_pages() {
        assert_eq!(
            Route::parse("/dashboard"),
            Route::Dashboard(DashboardPage::Home)
        );
        assert_eq!(
            Route::parse("/dashboard/warnings/"),
            Route::Dashboard(DashboardPage::Warnings)
        );
        for page in DashboardPage::ALL {
            let route = Route::Dashboard(page);
            assert_eq!(Route::parse(&route.path()), route);
        }
    }

    #[test]
    fn unknown_paths_are_not_found() {
        assert_eq!(
            Route::parse("/dashboard/settings"),
            Route::NotFound("/dashboard/settings".to_string())
        );
        assert_eq!(
            Route::parse("/pricing"),
            Route::NotFound("/pricing".to_string())
        );
        assert_eq!(
            Route::parse("/dashboard/students/extra").path(),
            "/dashboard/students/extra"
        );
    }

    #[test]
    fn only_dashboard_is_protected() {
        assert!(Route::parse("/dashboard/reports").is_protected());
        assert!(!Route::Login.is_protected());
        assert!(!Route::parse("/nope").is_protected());
    }
}
