mod common;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::{ADMIN_ID, MANAGER_ID, MockRepo, WAITER_ID, test_config};
use restaurant_api::{
    auth::Identity,
    config::Env,
    error::ApiError,
    handlers,
    models::{
        CreateMenuItemRequest, LoginRequest, RegisterRequest, Role, SubmitReportRequest, UpdateMenuItemRequest,
    },
    repository::RepositoryState,
};
use std::sync::Arc;
use tokio::test;

// --- Helper Functions ---

fn repo_state(repo: &Arc<MockRepo>) -> State<RepositoryState> {
    let repo: RepositoryState = repo.clone();
    State(repo)
}

fn identity(role: Role) -> Identity {
    let id = match role {
        Role::Admin => ADMIN_ID,
        Role::Manager => MANAGER_ID,
        Role::Waiter => WAITER_ID,
    };
    Identity { id, role }
}

fn register_request(email: &str, password: &str, role: Option<Role>) -> RegisterRequest {
    RegisterRequest {
        name: "Sam".to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role,
    }
}

// --- Register / Login ---

#[test]
async fn test_register_defaults_to_waiter_and_hashes_password() {
    let repo = Arc::new(MockRepo::default());

    let (status, Json(profile)) = handlers::register(
        repo_state(&repo),
        Json(register_request("  Sam@Example.com ", "long-enough", None)),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile.role, Role::Waiter);
    assert_eq!(profile.email, "sam@example.com");

    let stored = repo.users.lock().unwrap()[0].clone();
    assert_eq!(stored.role, "WAITER");
    assert_ne!(stored.password_hash, "long-enough");
}

#[test]
async fn test_register_validation() {
    let repo = Arc::new(MockRepo::default());
    let cases = [
        RegisterRequest {
            name: "   ".to_string(),
            ..register_request("a@b.c", "long-enough", None)
        },
        register_request("not-an-email", "long-enough", None),
        register_request("a@b.c", "short", None),
    ];

    for req in cases {
        let err = handlers::register(repo_state(&repo), Json(req)).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)), "{err:?}");
    }
    assert!(repo.calls().is_empty());
}

#[test]
async fn test_register_duplicate_email_is_conflict() {
    let repo = Arc::new(MockRepo::default());
    let req = || register_request("dup@example.com", "long-enough", Some(Role::Manager));

    handlers::register(repo_state(&repo), Json(req())).await.unwrap();
    let err = handlers::register(repo_state(&repo), Json(req())).await.unwrap_err();

    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
}

#[test]
async fn test_login_rejects_wrong_password_and_unknown_email_alike() {
    let repo = Arc::new(MockRepo::default());
    handlers::register(
        repo_state(&repo),
        Json(register_request("kim@example.com", "right-password", None)),
    )
    .await
    .unwrap();

    let wrong_password = handlers::login(
        repo_state(&repo),
        State(test_config(Env::Production)),
        Json(LoginRequest {
            email: "kim@example.com".to_string(),
            password: "wrong-password".to_string(),
        }),
    )
    .await
    .unwrap_err();

    let unknown_email = handlers::login(
        repo_state(&repo),
        State(test_config(Env::Production)),
        Json(LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "right-password".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password.status_code(), StatusCode::UNAUTHORIZED);
}

#[test]
async fn test_login_issues_token_for_stored_role() {
    let repo = Arc::new(MockRepo::default());
    handlers::register(
        repo_state(&repo),
        Json(register_request("lee@example.com", "right-password", Some(Role::Admin))),
    )
    .await
    .unwrap();
    let config = test_config(Env::Production);

    let Json(response) = handlers::login(
        repo_state(&repo),
        State(config.clone()),
        Json(LoginRequest {
            email: "LEE@example.com".to_string(),
            password: "right-password".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.user.role, Role::Admin);
    assert_eq!(response.expires_in, config.jwt_expiry_hours * 3600);
    assert!(!response.token.is_empty());
}

// --- Menu ---

#[test]
async fn test_create_menu_item_records_creator() {
    let repo = Arc::new(MockRepo::with_staff());

    let (status, Json(item)) = handlers::create_menu_item(
        identity(Role::Manager),
        repo_state(&repo),
        Json(CreateMenuItemRequest {
            name: "  Tiramisu ".to_string(),
            price: 6.5,
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item.name, "Tiramisu");
    assert_eq!(item.created_by, MANAGER_ID);
    assert!(!item.is_approved);
}

#[test]
async fn test_create_menu_item_validation() {
    let repo = Arc::new(MockRepo::with_staff());

    for (name, price) in [("", 5.0), ("Soup", -1.0), ("Soup", f64::NAN), ("Soup", f64::INFINITY)] {
        let err = handlers::create_menu_item(
            identity(Role::Admin),
            repo_state(&repo),
            Json(CreateMenuItemRequest {
                name: name.to_string(),
                price,
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)), "{name} {price}");
    }
    assert!(repo.calls().is_empty());
}

#[test]
async fn test_waiters_only_see_approved_items() {
    let repo = Arc::new(MockRepo::with_staff());
    repo.insert_menu_item("Approved", true);
    repo.insert_menu_item("Pending", false);

    let Json(for_waiter) = handlers::get_all_menu_items(identity(Role::Waiter), repo_state(&repo))
        .await
        .unwrap();
    let Json(for_manager) = handlers::get_all_menu_items(identity(Role::Manager), repo_state(&repo))
        .await
        .unwrap();

    assert_eq!(for_waiter.len(), 1);
    assert_eq!(for_waiter[0].name, "Approved");
    assert_eq!(for_manager.len(), 2);
    assert_eq!(
        repo.calls(),
        vec![
            "list_menu_items(only_approved=true)".to_string(),
            "list_menu_items(only_approved=false)".to_string(),
        ]
    );
}

#[test]
async fn test_update_menu_item_is_partial() {
    let repo = Arc::new(MockRepo::with_staff());
    let id = repo.insert_menu_item("Soup", false);

    let Json(item) = handlers::update_menu_item(
        identity(Role::Manager),
        repo_state(&repo),
        Path(id),
        Json(UpdateMenuItemRequest {
            price: Some(11.0),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(item.name, "Soup");
    assert_eq!(item.price, 11.0);
    assert_eq!(item.category.as_deref(), Some("mains"));
}

#[test]
async fn test_update_menu_item_errors() {
    let repo = Arc::new(MockRepo::with_staff());
    let id = repo.insert_menu_item("Soup", false);

    let missing = handlers::update_menu_item(
        identity(Role::Admin),
        repo_state(&repo),
        Path(404),
        Json(UpdateMenuItemRequest::default()),
    )
    .await
    .unwrap_err();
    assert!(matches!(missing, ApiError::NotFound(_)));

    let blank_name = handlers::update_menu_item(
        identity(Role::Admin),
        repo_state(&repo),
        Path(id),
        Json(UpdateMenuItemRequest {
            name: Some(" ".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(blank_name, ApiError::BadRequest(_)));

    let negative_price = handlers::update_menu_item(
        identity(Role::Admin),
        repo_state(&repo),
        Path(id),
        Json(UpdateMenuItemRequest {
            price: Some(-0.5),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(negative_price, ApiError::BadRequest(_)));
}

#[test]
async fn test_delete_menu_item() {
    let repo = Arc::new(MockRepo::with_staff());
    let id = repo.insert_menu_item("Soup", true);

    let status = handlers::delete_menu_item(identity(Role::Admin), repo_state(&repo), Path(id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let again = handlers::delete_menu_item(identity(Role::Admin), repo_state(&repo), Path(id))
        .await
        .unwrap_err();
    assert!(matches!(again, ApiError::NotFound(_)));
}

#[test]
async fn test_approve_menu_item_records_approver() {
    let repo = Arc::new(MockRepo::with_staff());
    let id = repo.insert_menu_item("Soup", false);

    let Json(item) = handlers::approve_menu_item(identity(Role::Admin), repo_state(&repo), Path(id))
        .await
        .unwrap();
    assert!(item.is_approved);
    assert_eq!(item.approved_by, Some(ADMIN_ID));

    let missing = handlers::approve_menu_item(identity(Role::Admin), repo_state(&repo), Path(999))
        .await
        .unwrap_err();
    assert!(matches!(missing, ApiError::NotFound(_)));
}

// --- Reports ---

#[test]
async fn test_submit_report_uses_caller_identity() {
    let repo = Arc::new(MockRepo::with_staff());

    let (status, Json(report)) = handlers::submit_report(
        identity(Role::Manager),
        repo_state(&repo),
        Json(SubmitReportRequest {
            title: " Shift notes ".to_string(),
            content: "Ran out of basil.".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report.submitted_by, MANAGER_ID);
    assert_eq!(report.title, "Shift notes");
}

#[test]
async fn test_submit_report_rejects_blank_fields() {
    let repo = Arc::new(MockRepo::with_staff());

    let err = handlers::submit_report(
        identity(Role::Manager),
        repo_state(&repo),
        Json(SubmitReportRequest {
            title: "Shift notes".to_string(),
            content: "   ".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::BadRequest(_)));
    assert!(repo.reports.lock().unwrap().is_empty());
}

// --- Error rendering ---

#[test]
async fn test_api_error_renders_status_and_code() {
    let response = ApiError::not_found("menu item 9 not found").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ApiError::bad_request("nope").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
