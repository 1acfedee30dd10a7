use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::session::store::{SessionSnapshot, SessionStore};

/// Screens of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Signup,
    Login,
    Upload,
    Results,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    /// No gating at all.
    Public,
    /// Waits for the session to settle, then renders whether or not a session exists.
    PublicOnly,
    /// Waits for the session to settle, then requires a session.
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still loading: show a neutral waiting state.
    Waiting,
    Render,
    Redirect(Route),
}

impl Route {
    pub fn policy(self) -> RoutePolicy {
        match self {
            Route::Landing => RoutePolicy::Public,
            Route::Signup | Route::Login => RoutePolicy::PublicOnly,
            Route::Upload | Route::Results | Route::History => RoutePolicy::Protected,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Signup => "/signup",
            Route::Login => "/login",
            Route::Upload => "/upload",
            Route::Results => "/results",
            Route::History => "/history",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub fn protected(snapshot: &SessionSnapshot) -> GuardDecision {
    if snapshot.loading {
        GuardDecision::Waiting
    } else if snapshot.session.is_none() {
        GuardDecision::Redirect(Route::Login)
    } else {
        GuardDecision::Render
    }
}

pub fn public_only(snapshot: &SessionSnapshot) -> GuardDecision {
    if snapshot.loading {
        GuardDecision::Waiting
    } else {
        GuardDecision::Render
    }
}

pub fn decide(route: Route, snapshot: &SessionSnapshot) -> GuardDecision {
    match route.policy() {
        RoutePolicy::Public => GuardDecision::Render,
        RoutePolicy::PublicOnly => public_only(snapshot),
        RoutePolicy::Protected => protected(snapshot),
    }
}

/// Applies the route policies to the live session state.
pub struct RouteGuard {
    session: Arc<SessionStore>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Decision against the current snapshot; may be `Waiting`.
    pub fn check(&self, route: Route) -> GuardDecision {
        decide(route, &self.session.snapshot())
    }

    /// Waits for the session to finish loading, then decides. Never returns `Waiting`
    /// for a gated route.
    pub async fn settle(&self, route: Route) -> GuardDecision {
        let mut rx = self.session.subscribe();
        let snapshot = match rx.wait_for(|s| !s.loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.session.snapshot(),
        };
        let decision = decide(route, &snapshot);
        debug!("Route {route} -> {decision:?}");
        decision
    }
}
