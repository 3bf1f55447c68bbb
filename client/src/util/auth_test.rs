use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::net::types::User;
use crate::util::storage::{MemoryStorage, save_credentials};

fn alice() -> User {
    serde_json::from_value(serde_json::json!({ "id": 1, "username": "alice", "email": "a@example.com" })).unwrap()
}

fn signed_out() -> AuthState {
    AuthState { user: None, loading: false }
}

fn signed_in() -> AuthState {
    AuthState { user: Some(alice()), loading: false }
}

// =============================================================================
// should_redirect_unauth
// =============================================================================

#[test]
fn should_redirect_unauth_when_not_loading_and_user_missing() {
    assert!(should_redirect_unauth(&signed_out()));
}

#[test]
fn should_not_redirect_while_loading() {
    let state = AuthState { user: None, loading: true };
    assert!(!should_redirect_unauth(&state));
}

#[test]
fn should_not_redirect_when_user_exists() {
    assert!(!should_redirect_unauth(&signed_in()));
}

// =============================================================================
// decide
// =============================================================================

#[test]
fn protected_route_without_user_redirects_with_encoded_path() {
    let decision = decide(&signed_out(), &GuardRequirement::protected("/admin/articles"));
    assert_eq!(
        decision,
        Decision::RedirectToLogin {
            location: "/login?from=%2Fadmin%2Farticles".to_owned(),
            login_href: "/login".to_owned(),
        }
    );
}

#[test]
fn protected_route_redirect_includes_encoded_query() {
    let requirement = GuardRequirement::protected("/admin/articles").with_query("tab=drafts");
    let decision = decide(&signed_out(), &requirement);
    assert_eq!(decision.redirect_location(), Some("/login?from=%2Fadmin%2Farticles%3Ftab%3Ddrafts"));
}

#[test]
fn leading_question_mark_in_query_is_not_doubled() {
    let requirement = GuardRequirement::protected("/admin").with_query("?a=1");
    assert_eq!(decide(&signed_out(), &requirement).redirect_location(), Some("/login?from=%2Fadmin%3Fa%3D1"));
}

#[test]
fn custom_redirect_target_is_used() {
    let requirement = GuardRequirement::protected("/admin").with_redirect_target("/signin");
    assert_eq!(decide(&signed_out(), &requirement).redirect_location(), Some("/signin?from=%2Fadmin"));
}

#[test]
fn redirect_target_with_query_appends_from() {
    assert_eq!(login_location("/login?theme=dark", "/admin", ""), "/login?theme=dark&from=%2Fadmin");
}

#[test]
fn loading_shows_loading_even_for_public_routes() {
    let loading = AuthState { user: None, loading: true };
    assert_eq!(decide(&loading, &GuardRequirement::protected("/admin")), Decision::ShowLoading);
    assert_eq!(decide(&loading, &GuardRequirement::public("/")), Decision::ShowLoading);
}

#[test]
fn public_route_always_shows_content_once_loaded() {
    for state in [signed_in(), signed_out()] {
        assert_eq!(decide(&state, &GuardRequirement::public("/articles")), Decision::ShowContent);
    }
}

#[test]
fn protected_route_with_user_shows_content() {
    assert_eq!(decide(&signed_in(), &GuardRequirement::protected("/admin")), Decision::ShowContent);
}

#[test]
fn redirect_renders_unauthorized_prompt() {
    let decision = decide(&signed_out(), &GuardRequirement::protected("/admin"));
    assert_eq!(decision.view(), Decision::ShowUnauthorizedPrompt { login_href: "/login".to_owned() });
    assert_eq!(Decision::ShowContent.view(), Decision::ShowContent);
}

#[test]
fn return_url_omits_empty_query() {
    assert_eq!(return_url("/admin", ""), "/admin");
    assert_eq!(return_url("/admin", "x=1"), "/admin?x=1");
}

// =============================================================================
// RouteGuard
// =============================================================================

fn recording_guard(store: &Rc<AuthStore>, requirement: GuardRequirement) -> (RouteGuard, Rc<RefCell<Vec<String>>>) {
    let visits = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&visits);
    let guard = RouteGuard::install(store, requirement, move |location| log.borrow_mut().push(location.to_owned()));
    (guard, visits)
}

#[test]
fn guard_waits_for_initialization_then_redirects_once() {
    let store = Rc::new(AuthStore::new(Rc::new(MemoryStorage::new())));
    let (guard, visits) = recording_guard(&store, GuardRequirement::protected("/admin/articles"));
    assert_eq!(guard.view(), Decision::ShowLoading);
    assert!(visits.borrow().is_empty());

    store.initialize();

    assert_eq!(*visits.borrow(), vec!["/login?from=%2Fadmin%2Farticles".to_owned()]);
    assert_eq!(guard.view(), Decision::ShowUnauthorizedPrompt { login_href: "/login".to_owned() });
}

#[test]
fn guard_shows_content_for_persisted_session() {
    let storage = Rc::new(MemoryStorage::new());
    save_credentials(&*storage, "tok", &alice()).unwrap();
    let store = Rc::new(AuthStore::new(storage));
    let (guard, visits) = recording_guard(&store, GuardRequirement::protected("/admin"));

    store.initialize();

    assert_eq!(guard.decision(), Decision::ShowContent);
    assert!(visits.borrow().is_empty());
}

#[test]
fn logout_while_viewing_protected_content_redirects() {
    let store = Rc::new(AuthStore::new(Rc::new(MemoryStorage::new())));
    store.login(alice());
    let (guard, visits) = recording_guard(&store, GuardRequirement::protected("/admin/articles").with_query("tab=drafts"));
    assert_eq!(guard.decision(), Decision::ShowContent);

    store.logout();

    assert_eq!(*visits.borrow(), vec!["/login?from=%2Fadmin%2Farticles%3Ftab%3Ddrafts".to_owned()]);
    assert!(guard.decision().redirect_location().is_some());
}

#[test]
fn repeated_notifications_do_not_repeat_navigation() {
    let store = Rc::new(AuthStore::new(Rc::new(MemoryStorage::new())));
    store.initialize();
    let (_guard, visits) = recording_guard(&store, GuardRequirement::protected("/admin"));

    store.logout();
    store.logout();

    assert_eq!(visits.borrow().len(), 1);
}

#[test]
fn location_change_reevaluates() {
    let store = Rc::new(AuthStore::new(Rc::new(MemoryStorage::new())));
    store.initialize();
    let (guard, visits) = recording_guard(&store, GuardRequirement::protected("/admin"));

    guard.set_location("/admin/create-article", "");

    assert_eq!(
        *visits.borrow(),
        vec!["/login?from=%2Fadmin".to_owned(), "/login?from=%2Fadmin%2Fcreate-article".to_owned()]
    );
    assert_eq!(guard.requirement().path, "/admin/create-article");
}

#[test]
fn requirement_change_to_public_shows_content() {
    let store = Rc::new(AuthStore::new(Rc::new(MemoryStorage::new())));
    store.initialize();
    let (guard, _visits) = recording_guard(&store, GuardRequirement::protected("/admin"));

    guard.set_requirement(GuardRequirement::public("/articles"));

    assert_eq!(guard.decision(), Decision::ShowContent);
}

#[test]
fn dropping_guard_unsubscribes() {
    let store = Rc::new(AuthStore::new(Rc::new(MemoryStorage::new())));
    let (guard, _visits) = recording_guard(&store, GuardRequirement::protected("/admin"));
    assert_eq!(store.listener_count(), 1);
    drop(guard);
    assert_eq!(store.listener_count(), 0);
}
