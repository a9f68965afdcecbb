use crate::{
    AppConfig,
    auth::{self, Identity},
    error::ApiError,
    models::{
        CreateMenuItemRequest, LoginRequest, LoginResponse, MenuItem, NewUser, RegisterRequest, Report, Role,
        SubmitReportRequest, UpdateMenuItemRequest, UserProfile,
    },
    repository::RepositoryState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

const MIN_PASSWORD_LEN: usize = 8;

// --- Auth Handlers ---

/// register
///
/// [Public Route] Creates a staff account. The password is stored salted and
/// hashed; the response never contains it.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserProfile),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(repo): State<RepositoryState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();

    if name.is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("email is not valid"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let role = payload.role.unwrap_or(Role::Waiter);
    let user = repo
        .create_user(NewUser {
            name: name.to_string(),
            email,
            password_hash: auth::hash_password(&payload.password),
            role,
        })
        .await?;

    tracing::info!(user_id = %user.id, %role, "user registered");

    let profile = UserProfile {
        id: user.id,
        name: user.name,
        email: user.email,
        role,
    };
    Ok((StatusCode::CREATED, Json(profile)))
}

/// login
///
/// [Public Route] Checks email and password and issues a bearer token.
/// Unknown email and wrong password produce the same 401.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(repo): State<RepositoryState>,
    State(config): State<AppConfig>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let invalid = || ApiError::unauthorized("invalid email or password");

    let user = repo.find_user_by_email(&email).await?.ok_or_else(invalid)?;
    if !auth::verify_password(&payload.password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(invalid());
    }

    let (token, expires_in) = auth::issue_token(user.id, &config).map_err(|e| {
        tracing::error!("token signing failed: {:?}", e);
        ApiError::internal("could not issue token")
    })?;

    let user = UserProfile::try_from(user).map_err(|e| {
        tracing::error!("stored user has {}", e);
        ApiError::internal("account is misconfigured")
    })?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in,
        user,
    }))
}

// --- Menu Handlers ---

/// create_menu_item
///
/// [ADMIN, MANAGER] Adds a menu item. It stays hidden from waiters until approved.
#[utoipa::path(
    post,
    path = "/menu",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Created", body = MenuItem),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn create_menu_item(
    identity: Identity,
    State(repo): State<RepositoryState>,
    Json(mut payload): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    payload.name = payload.name.trim().to_string();
    if payload.name.is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    validate_price(payload.price)?;

    let item = repo.create_menu_item(payload, identity.id).await?;
    tracing::info!(item_id = item.id, created_by = %identity.id, "menu item created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// get_all_menu_items
///
/// [ADMIN, MANAGER, WAITER] Lists the menu. Waiters only see approved items.
#[utoipa::path(
    get,
    path = "/menu",
    responses(
        (status = 200, description = "Menu items", body = [MenuItem]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_all_menu_items(
    identity: Identity,
    State(repo): State<RepositoryState>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    let only_approved = identity.role == Role::Waiter;
    let items = repo.list_menu_items(only_approved).await?;
    Ok(Json(items))
}

/// update_menu_item
///
/// [ADMIN, MANAGER] Partial update; absent fields keep their value.
#[utoipa::path(
    put,
    path = "/menu/{id}",
    params(("id" = i64, Path, description = "Menu item ID")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Updated", body = MenuItem),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_menu_item(
    _identity: Identity,
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateMenuItemRequest>,
) -> Result<Json<MenuItem>, ApiError> {
    if let Some(name) = payload.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::bad_request("name must not be empty"));
        }
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
    }

    match repo.update_menu_item(id, payload).await? {
        Some(item) => Ok(Json(item)),
        None => Err(ApiError::not_found(format!("menu item {id} not found"))),
    }
}

/// delete_menu_item
///
/// [ADMIN] Removes a menu item.
#[utoipa::path(
    delete,
    path = "/menu/{id}",
    params(("id" = i64, Path, description = "Menu item ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_menu_item(
    identity: Identity,
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if repo.delete_menu_item(id).await? {
        tracing::info!(item_id = id, deleted_by = %identity.id, "menu item deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("menu item {id} not found")))
    }
}

/// approve_menu_item
///
/// [ADMIN] Marks an item approved and records who approved it. Approving an
/// already approved item is harmless and returns it unchanged apart from the approver.
#[utoipa::path(
    patch,
    path = "/menu/approve/{id}",
    params(("id" = i64, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Approved", body = MenuItem),
        (status = 404, description = "Not Found")
    )
)]
pub async fn approve_menu_item(
    identity: Identity,
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
) -> Result<Json<MenuItem>, ApiError> {
    match repo.approve_menu_item(id, identity.id).await? {
        Some(item) => {
            tracing::info!(item_id = id, approved_by = %identity.id, "menu item approved");
            Ok(Json(item))
        }
        None => Err(ApiError::not_found(format!("menu item {id} not found"))),
    }
}

// --- Report Handlers ---

/// submit_report
///
/// [MANAGER] Files a report under the caller's id.
#[utoipa::path(
    post,
    path = "/reports",
    request_body = SubmitReportRequest,
    responses(
        (status = 201, description = "Submitted", body = Report),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn submit_report(
    identity: Identity,
    State(repo): State<RepositoryState>,
    Json(payload): Json<SubmitReportRequest>,
) -> Result<(StatusCode, Json<Report>), ApiError> {
    let title = payload.title.trim();
    let content = payload.content.trim();
    if title.is_empty() || content.is_empty() {
        return Err(ApiError::bad_request("title and content are required"));
    }

    let request = SubmitReportRequest {
        title: title.to_string(),
        content: content.to_string(),
    };
    let report = repo.create_report(request, identity.id).await?;
    tracing::info!(report_id = report.id, submitted_by = %identity.id, "report submitted");
    Ok((StatusCode::CREATED, Json(report)))
}

fn validate_price(price: f64) -> Result<(), ApiError> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(ApiError::bad_request("price must be a non-negative number"))
    }
}
