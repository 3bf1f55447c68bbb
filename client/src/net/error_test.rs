use super::*;

#[test]
fn backend_message_reads_single_string() {
    assert_eq!(backend_message(r#"{"message":"Title is taken"}"#), Some("Title is taken".to_owned()));
}

#[test]
fn backend_message_joins_validation_list() {
    let body = r#"{"message":["title should not be empty","content should not be empty"],"statusCode":400}"#;
    assert_eq!(
        backend_message(body),
        Some("title should not be empty; content should not be empty".to_owned())
    );
}

#[test]
fn backend_message_ignores_blank_and_garbage() {
    assert_eq!(backend_message(r#"{"message":"   "}"#), None);
    assert_eq!(backend_message("<html>bad gateway</html>"), None);
    assert_eq!(backend_message(r#"{"error":"x"}"#), None);
}

#[test]
fn login_failure_maps_401_to_bad_credentials() {
    assert_eq!(
        login_failure(401, r#"{"message":"Unauthorized"}"#),
        LoginError::FormError { message: "Invalid username or password".to_owned() }
    );
}

#[test]
fn login_failure_maps_400_to_malformed_input() {
    assert_eq!(
        login_failure(400, ""),
        LoginError::FormError { message: "Malformed request, check your input".to_owned() }
    );
}

#[test]
fn login_failure_prefers_backend_message_for_other_statuses() {
    assert_eq!(
        login_failure(503, r#"{"message":"maintenance"}"#),
        LoginError::FormError { message: "maintenance".to_owned() }
    );
    assert_eq!(login_failure(500, ""), LoginError::FormError { message: LOGIN_RETRY_MESSAGE.to_owned() });
}

#[test]
fn api_failure_classifies_statuses() {
    assert!(api_failure(401, "").is_unauthorized());
    assert!(matches!(api_failure(404, ""), ApiError::NotFound));
    match api_failure(422, r#"{"message":"bad tags"}"#) {
        ApiError::Status { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "bad tags");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn api_failure_falls_back_to_status_text() {
    match api_failure(502, "") {
        ApiError::Status { message, .. } => assert_eq!(message, "request failed with status 502"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn login_error_display_includes_field_name() {
    let err = LoginError::field(LoginField::Password, "Enter your password");
    assert_eq!(err.to_string(), "password: Enter your password");
}
