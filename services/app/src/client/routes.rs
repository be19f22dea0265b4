//! services/app/src/client/routes.rs
//!
//! Client-side routes and the guard for the ones that need a session.

use crate::client::state::{AppState, BootPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Teachers,
    Favorites,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Teachers => "/teachers",
            Route::Favorites => "/favorites",
        }
    }

    /// Unknown paths fall back to the landing page.
    pub fn parse(path: &str) -> Route {
        let trimmed = path.split(['?', '#']).next().unwrap_or("");
        match trimmed.trim_end_matches('/') {
            "/teachers" => Route::Teachers,
            "/favorites" => Route::Favorites,
            _ => Route::Home,
        }
    }

    pub fn requires_session(self) -> bool {
        matches!(self, Route::Favorites)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Render(Route),
    Redirect(Route),
    /// Persisted state or the first auth check is still outstanding; render
    /// nothing yet rather than redirecting too early.
    Pending,
}

pub fn resolve(route: Route, state: &AppState) -> RouteDecision {
    if !route.requires_session() {
        return RouteDecision::Render(route);
    }
    if state.boot == BootPhase::Loading || !state.auth.initialized {
        return RouteDecision::Pending;
    }
    if state.auth.is_signed_in() {
        RouteDecision::Render(route)
    } else {
        RouteDecision::Redirect(Route::Home)
    }
}
