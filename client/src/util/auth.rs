//! Route guard: decides whether a protected subtree renders.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected page applies the same unauthenticated-redirect behavior.
//! `decide` is the pure decision; `RouteGuard` wires it to the auth store so
//! the decision is recomputed whenever the session or the guarded location
//! changes, including a logout while protected content is on screen.
//!
//! The guard is the authoritative in-app check. The edge filter in front of
//! the site only looks at transport credentials and can be fooled by a stale
//! cookie; this guard reads the session the client actually holds.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::state::auth::{AuthState, AuthStore, Subscription};

pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// What a guarded subtree requires, plus where it currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardRequirement {
    pub require_auth: bool,
    pub path: String,
    pub query: String,
    pub redirect_target: String,
}

impl GuardRequirement {
    /// A route that needs a signed-in user.
    #[must_use]
    pub fn protected(path: &str) -> Self {
        Self { require_auth: true, path: path.to_owned(), ..Self::default() }
    }

    /// A route anyone may see.
    #[must_use]
    pub fn public(path: &str) -> Self {
        Self { require_auth: false, path: path.to_owned(), ..Self::default() }
    }

    #[must_use]
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.trim_start_matches('?').to_owned();
        self
    }

    #[must_use]
    pub fn with_redirect_target(mut self, target: &str) -> Self {
        self.redirect_target = target.to_owned();
        self
    }
}

impl Default for GuardRequirement {
    fn default() -> Self {
        Self {
            require_auth: false,
            path: "/".to_owned(),
            query: String::new(),
            redirect_target: DEFAULT_LOGIN_PATH.to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The store is still reading persisted credentials.
    ShowLoading,
    /// Navigate to `location`; `login_href` is the bare login target for the
    /// prompt shown while that navigation is pending.
    RedirectToLogin { location: String, login_href: String },
    /// Rendered in the same pass as a redirect, with a manual link to login.
    ShowUnauthorizedPrompt { login_href: String },
    ShowContent,
}

impl Decision {
    /// What to render for this decision right now. A redirect is
    /// navigational and not instantaneous, so it renders the prompt.
    #[must_use]
    pub fn view(&self) -> Decision {
        match self {
            Self::RedirectToLogin { login_href, .. } => Self::ShowUnauthorizedPrompt { login_href: login_href.clone() },
            other => other.clone(),
        }
    }

    pub fn redirect_location(&self) -> Option<&str> {
        match self {
            Self::RedirectToLogin { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// Whether auth has loaded and no user is present.
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}

/// Path plus query string, the query included only when non-empty.
pub fn return_url(path: &str, query: &str) -> String {
    let query = query.trim_start_matches('?');
    if query.is_empty() { path.to_owned() } else { format!("{path}?{query}") }
}

/// Login location carrying the percent-encoded return URL as `from`.
pub fn login_location(redirect_target: &str, path: &str, query: &str) -> String {
    let separator = if redirect_target.contains('?') { '&' } else { '?' };
    let url = return_url(path, query);
    let encoded = urlencoding::encode(&url);
    format!("{redirect_target}{separator}from={encoded}")
}

/// Decide how a guarded subtree renders for the given session state.
pub fn decide(state: &AuthState, requirement: &GuardRequirement) -> Decision {
    if state.loading {
        return Decision::ShowLoading;
    }
    if requirement.require_auth && should_redirect_unauth(state) {
        return Decision::RedirectToLogin {
            location: login_location(&requirement.redirect_target, &requirement.path, &requirement.query),
            login_href: requirement.redirect_target.clone(),
        };
    }
    Decision::ShowContent
}

// =============================================================================
// REACTIVE GUARD
// =============================================================================

struct GuardInner {
    store: Weak<AuthStore>,
    requirement: RefCell<GuardRequirement>,
    decision: RefCell<Decision>,
    navigate: Box<dyn Fn(&str)>,
}

impl GuardInner {
    fn reevaluate(&self) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let next = decide(&store.snapshot(), &self.requirement.borrow());
        let previous = self.decision.replace(next.clone());
        if previous == next {
            return;
        }
        tracing::debug!(?previous, ?next, "route guard decision changed");
        if let Some(location) = next.redirect_location() {
            (self.navigate)(location);
        }
    }
}

/// A guard installed on the auth store. It stays subscribed until dropped.
pub struct RouteGuard {
    inner: Rc<GuardInner>,
    _subscription: Subscription,
}

impl RouteGuard {
    /// Subscribe to `store` and evaluate immediately. `navigate` runs once
    /// each time the decision transitions into a redirect.
    pub fn install<F>(store: &Rc<AuthStore>, requirement: GuardRequirement, navigate: F) -> Self
    where
        F: Fn(&str) + 'static,
    {
        let inner = Rc::new(GuardInner {
            store: Rc::downgrade(store),
            requirement: RefCell::new(requirement),
            decision: RefCell::new(Decision::ShowLoading),
            navigate: Box::new(navigate),
        });

        let weak = Rc::downgrade(&inner);
        let subscription = store.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                inner.reevaluate();
            }
        });
        inner.reevaluate();

        Self { inner, _subscription: subscription }
    }

    pub fn decision(&self) -> Decision {
        self.inner.decision.borrow().clone()
    }

    /// What to render this pass.
    pub fn view(&self) -> Decision {
        self.inner.decision.borrow().view()
    }

    pub fn requirement(&self) -> GuardRequirement {
        self.inner.requirement.borrow().clone()
    }

    /// Track a navigation within the guarded subtree.
    pub fn set_location(&self, path: &str, query: &str) {
        {
            let mut requirement = self.inner.requirement.borrow_mut();
            requirement.path = path.to_owned();
            requirement.query = query.trim_start_matches('?').to_owned();
        }
        self.inner.reevaluate();
    }

    pub fn set_requirement(&self, requirement: GuardRequirement) {
        *self.inner.requirement.borrow_mut() = requirement;
        self.inner.reevaluate();
    }
}

impl std::fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGuard")
            .field("requirement", &self.inner.requirement.borrow())
            .field("decision", &self.inner.decision.borrow())
            .finish_non_exhaustive()
    }
}
