use crate::model::Role;

/// Navigable views. Only the three homepages require a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    About,
    TypeOfLogin,
    Donations,
    UserLogin,
    NgoLogin,
    AdminLogin,
    UserSignup,
    NgoSignup,
    AdminSignup,
    AccessDenied,
    UserHomepage,
    NgoHomepage,
    AdminDashboard,
}

impl Route {
    pub const ALL: [Route; 14] = [
        Route::Home,
        Route::About,
        Route::TypeOfLogin,
        Route::Donations,
        Route::UserLogin,
        Route::NgoLogin,
        Route::AdminLogin,
        Route::UserSignup,
        Route::NgoSignup,
        Route::AdminSignup,
        Route::AccessDenied,
        Route::UserHomepage,
        Route::NgoHomepage,
        Route::AdminDashboard,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::About => "/about",
            Route::TypeOfLogin => "/type-of-login",
            Route::Donations => "/donations",
            Route::UserLogin => "/user-login",
            Route::NgoLogin => "/ngo-login",
            Route::AdminLogin => "/admin-login",
            Route::UserSignup => "/user-signup",
            Route::NgoSignup => "/ngo-signup",
            Route::AdminSignup => "/admin-signup",
            Route::AccessDenied => "/access-denied",
            Route::UserHomepage => "/user-homepage",
            Route::NgoHomepage => "/ngo-homepage",
            Route::AdminDashboard => "/admin-dashboard",
        }
    }

    /// Match a path, ignoring any query string and a trailing slash.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split('?').next().unwrap_or_default();
        let path = match path.strip_suffix('/') {
            Some("") | None => path,
            Some(trimmed) => trimmed,
        };

        Route::ALL.iter().copied().find(|route| route.path() == path)
    }

    pub fn required_role(self) -> Option<Role> {
        match self {
            Route::UserHomepage => Some(Role::User),
            Route::NgoHomepage => Some(Role::Ngo),
            Route::AdminDashboard => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn homepage(role: Role) -> Route {
        match role {
            Role::User => Route::UserHomepage,
            Role::Ngo => Route::NgoHomepage,
            Role::Admin => Route::AdminDashboard,
        }
    }
}

/// Where a denied navigation is sent, keeping the attempted path for "go back".
pub fn access_denied_location(attempted_path: &str) -> String {
    match serde_urlencoded::to_string([("from", attempted_path)]) {
        Ok(query) => format!("{}?{}", Route::AccessDenied.path(), query),
        Err(_) => Route::AccessDenied.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/ngo-homepage/"), Some(Route::NgoHomepage));
        assert_eq!(Route::from_path("/ngo-homepage?status=pending"), Some(Route::NgoHomepage));
        assert_eq!(Route::from_path("/nope"), None);
    }

    #[test]
    fn only_homepages_are_gated() {
        let gated: Vec<Route> = Route::ALL
            .iter()
            .copied()
            .filter(|route| route.required_role().is_some())
            .collect();
        assert_eq!(
            gated,
            vec![Route::UserHomepage, Route::NgoHomepage, Route::AdminDashboard]
        );
    }

    #[test]
    fn denied_location_escapes_path() {
        assert_eq!(
            access_denied_location("/admin-dashboard"),
            "/access-denied?from=%2Fadmin-dashboard"
        );
    }
}
