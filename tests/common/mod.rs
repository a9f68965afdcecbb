#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use restaurant_api::{
    AppState,
    auth::{self, Claims},
    config::{AppConfig, Env},
    error::RepositoryError,
    models::{
        CreateMenuItemRequest, MenuItem, NewUser, Report, Role, SubmitReportRequest, UpdateMenuItemRequest, User,
    },
    repository::Repository,
};
use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
pub const ADMIN_ID: Uuid = Uuid::from_u128(1);
pub const MANAGER_ID: Uuid = Uuid::from_u128(2);
pub const WAITER_ID: Uuid = Uuid::from_u128(3);

// --- In-memory Repository ---

// Behaves like the Postgres repository closely enough for handler and router
// tests, and records which mutating calls were made.
#[derive(Default)]
pub struct MockRepo {
    pub users: Mutex<Vec<User>>,
    pub menu_items: Mutex<Vec<MenuItem>>,
    pub reports: Mutex<Vec<Report>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_lookups: bool,
}

impl MockRepo {
    /// One user per role, with the password "password123".
    pub fn with_staff() -> Self {
        let repo = MockRepo::default();
        for (id, role) in [(ADMIN_ID, Role::Admin), (MANAGER_ID, Role::Manager), (WAITER_ID, Role::Waiter)] {
            repo.insert_user(id, role);
        }
        repo
    }

    pub fn insert_user(&self, id: Uuid, role: Role) {
        self.insert_raw_user(id, role.as_str());
    }

    pub fn insert_raw_user(&self, id: Uuid, role: &str) {
        let lower = role.to_lowercase();
        self.users.lock().unwrap().push(User {
            id,
            name: format!("{lower} user"),
            email: format!("{lower}-{}@example.com", id.simple()),
            password_hash: auth::hash_password("password123"),
            role: role.to_string(),
            created_at: Utc::now(),
        });
    }

    pub fn insert_menu_item(&self, name: &str, is_approved: bool) -> i64 {
        let mut items = self.menu_items.lock().unwrap();
        let id = items.len() as i64 + 1;
        items.push(MenuItem {
            id,
            name: name.to_string(),
            description: None,
            price: 9.5,
            category: Some("mains".to_string()),
            is_approved,
            approved_by: is_approved.then_some(ADMIN_ID),
            created_by: MANAGER_ID,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        if self.fail_lookups {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(format!("email {} is already registered", user.email)));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role.as_str().to_string(),
            created_at: Utc::now(),
        };
        users.push(created.clone());
        self.record("create_user");
        Ok(created)
    }

    async fn create_menu_item(&self, req: CreateMenuItemRequest, created_by: Uuid) -> Result<MenuItem, RepositoryError> {
        let mut items = self.menu_items.lock().unwrap();
        let item = MenuItem {
            id: items.len() as i64 + 1,
            name: req.name,
            description: req.description,
            price: req.price,
            category: req.category,
            is_approved: false,
            approved_by: None,
            created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        items.push(item.clone());
        self.record("create_menu_item");
        Ok(item)
    }

    async fn list_menu_items(&self, only_approved: bool) -> Result<Vec<MenuItem>, RepositoryError> {
        self.record(format!("list_menu_items(only_approved={only_approved})"));
        Ok(self
            .menu_items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| !only_approved || item.is_approved)
            .cloned()
            .collect())
    }

    async fn update_menu_item(&self, id: i64, req: UpdateMenuItemRequest) -> Result<Option<MenuItem>, RepositoryError> {
        self.record(format!("update_menu_item({id})"));
        let mut items = self.menu_items.lock().unwrap();
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            item.name = name;
        }
        if let Some(description) = req.description {
            item.description = Some(description);
        }
        if let Some(price) = req.price {
            item.price = price;
        }
        if let Some(category) = req.category {
            item.category = Some(category);
        }
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn delete_menu_item(&self, id: i64) -> Result<bool, RepositoryError> {
        self.record(format!("delete_menu_item({id})"));
        let mut items = self.menu_items.lock().unwrap();
        let before = items.len();
        items.retain(|item| item.id != id);
        Ok(items.len() < before)
    }

    async fn approve_menu_item(&self, id: i64, approved_by: Uuid) -> Result<Option<MenuItem>, RepositoryError> {
        self.record(format!("approve_menu_item({id})"));
        let mut items = self.menu_items.lock().unwrap();
        Ok(items.iter_mut().find(|item| item.id == id).map(|item| {
            item.is_approved = true;
            item.approved_by = Some(approved_by);
            item.clone()
        }))
    }

    async fn create_report(&self, req: SubmitReportRequest, submitted_by: Uuid) -> Result<Report, RepositoryError> {
        let mut reports = self.reports.lock().unwrap();
        let report = Report {
            id: reports.len() as i64 + 1,
            submitted_by,
            title: req.title,
            content: req.content,
            created_at: Utc::now(),
        };
        reports.push(report.clone());
        self.record("create_report");
        Ok(report)
    }
}

// --- Helper Functions ---

pub fn test_config(env: Env) -> AppConfig {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    config
}

pub fn app_state(env: Env, repo: Arc<MockRepo>) -> AppState {
    AppState {
        repo,
        config: test_config(env),
    }
}

/// Signs a token for `user_id` that expires `exp_offset` seconds from now
/// (negative offsets produce an already expired token).
pub fn create_token(user_id: Uuid, exp_offset: i64, secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

pub fn bearer(user_id: Uuid) -> String {
    format!("Bearer {}", create_token(user_id, 3600, TEST_JWT_SECRET))
}

pub fn staff_id(role: Role) -> Uuid {
    match role {
        Role::Admin => ADMIN_ID,
        Role::Manager => MANAGER_ID,
        Role::Waiter => WAITER_ID,
    }
}
