//! In-memory stores and an HTTP harness for handler tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::http::{header, HeaderValue};
use axum_test::{TestRequest, TestServer};
use bytes::Bytes;
use serde_json::{json, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    app::build_app,
    config::{AppConfig, JwtConfig, StorageConfig},
    mail::{Mailer, OutgoingEmail},
    products::{
        repo::ProductCatalog,
        repo_types::{NewProduct, Product},
    },
    state::AppState,
    storage::{object_url, StorageClient},
    users::{
        repo::{ResetTokenStore, UserDirectory},
        repo_types::{NewUser, PasswordResetToken, ProfileUpdate, PublicUser, User},
    },
};

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<Vec<User>>,
    miss_next_password_write: AtomicBool,
}

impl InMemoryUserDirectory {
    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn remove(&self, id: Uuid) {
        self.users.lock().unwrap().retain(|u| u.id != id);
    }

    /// The next `update_password` matches no row, as if the user was
    /// deleted after being loaded.
    pub fn miss_next_password_write(&self) {
        self.miss_next_password_write.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_public(&self, id: Uuid) -> anyhow::Result<Option<PublicUser>> {
        Ok(self.find_by_id(id).await?.map(PublicUser::from))
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            phone: user.phone,
            bio: user.bio,
            photo: None,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(Some(created))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.name = update.name;
        user.phone = update.phone;
        user.bio = update.bio;
        user.photo = update.photo;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        if self.miss_next_password_write.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryResetTokens {
    tokens: Mutex<Vec<PasswordResetToken>>,
}

impl InMemoryResetTokens {
    pub fn all(&self) -> Vec<PasswordResetToken> {
        self.tokens.lock().unwrap().clone()
    }

    /// Moves every stored expiry into the past.
    pub fn expire_all(&self) {
        let past = OffsetDateTime::now_utc() - time::Duration::minutes(1);
        for token in self.tokens.lock().unwrap().iter_mut() {
            token.expires_at = past;
        }
    }
}

#[async_trait]
impl ResetTokenStore for InMemoryResetTokens {
    async fn delete_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn insert(&self, token: &PasswordResetToken) -> anyhow::Result<()> {
        self.tokens.lock().unwrap().push(token.clone());
        Ok(())
    }

    async fn find_live(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<PasswordResetToken>> {
        let tokens = self.tokens.lock().unwrap();
        Ok(tokens
            .iter()
            .find(|t| t.token_hash == token_hash && t.is_live(now))
            .cloned())
    }
}

/// Keeps insertion order so listings are newest first even on equal timestamps.
#[derive(Default)]
pub struct InMemoryProducts {
    products: Mutex<Vec<Product>>,
}

#[async_trait]
impl ProductCatalog for InMemoryProducts {
    async fn create(&self, product: NewProduct) -> anyhow::Result<Product> {
        let now = OffsetDateTime::now_utc();
        let created = Product {
            id: Uuid::new_v4(),
            user_id: product.user_id,
            name: product.name,
            sku: product.sku,
            category: product.category,
            quantity: product.quantity,
            price: product.price,
            description: product.description,
            image: product.image,
            created_at: now,
            updated_at: now,
        };
        self.products.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_by_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<Product>> {
        let products = self.products.lock().unwrap();
        Ok(products
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let products = self.products.lock().unwrap();
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, product: &Product) -> anyhow::Result<Option<Product>> {
        let mut products = self.products.lock().unwrap();
        let Some(stored) = products.iter_mut().find(|p| p.id == product.id) else {
            return Ok(None);
        };
        stored.name.clone_from(&product.name);
        stored.category.clone_from(&product.category);
        stored.quantity.clone_from(&product.quantity);
        stored.price.clone_from(&product.price);
        stored.description.clone_from(&product.description);
        stored.image.clone_from(&product.image);
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut products = self.products.lock().unwrap();
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Makes the next `send` return an error.
    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        if self.fail.swap(false, Ordering::SeqCst) {
            anyhow::bail!("smtp unavailable");
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    keys: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeStorage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(
        &self,
        key: &str,
        _body: Bytes,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("bucket unavailable");
        }
        self.keys.lock().unwrap().push(key.to_string());
        Ok(object_url("https://fake.local", key))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "pinvent".into(),
            audience: "pinvent-users".into(),
            ttl_minutes: 60,
        },
        frontend_url: "http://localhost:3000".into(),
        cors_origins: vec!["http://localhost:3000".into()],
        mail_from: "no-reply@pinvent.test".into(),
        support_email: "support@pinvent.test".into(),
        smtp: None,
        storage: StorageConfig {
            endpoint: "https://fake.local".into(),
            bucket: "images".into(),
            access_key: "key".into(),
            secret_key: "secret".into(),
            region: "us-east-1".into(),
            public_url: "https://fake.local".into(),
        },
        legacy_login_cookie: true,
    }
}

/// Full router over in-memory stores.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub users: Arc<InMemoryUserDirectory>,
    pub reset_tokens: Arc<InMemoryResetTokens>,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<FakeStorage>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(test_config(), FakeStorage::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::build(config, FakeStorage::default())
    }

    pub fn with_storage(storage: FakeStorage) -> Self {
        Self::build(test_config(), storage)
    }

    fn build(config: AppConfig, storage: FakeStorage) -> Self {
        let users = Arc::new(InMemoryUserDirectory::default());
        let reset_tokens = Arc::new(InMemoryResetTokens::default());
        let mailer = Arc::new(RecordingMailer::default());
        let storage = Arc::new(storage);

        let state = AppState {
            config: Arc::new(config),
            users: users.clone(),
            reset_tokens: reset_tokens.clone(),
            products: Arc::new(InMemoryProducts::default()),
            mailer: mailer.clone(),
            storage: storage.clone(),
        };
        let server = TestServer::new(build_app(state.clone())).expect("test server");

        Self {
            server,
            state,
            users,
            reset_tokens,
            mailer,
            storage,
        }
    }

    /// Registers a user and returns the issued session token.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> String {
        let res = self
            .server
            .post("/api/users")
            .json(&json!({
                "name": name,
                "email": email,
                "password": password,
                "confirmPassword": password,
            }))
            .await;
        res.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = res.json();
        body["token"].as_str().expect("token in body").to_string()
    }

    fn with_session(req: TestRequest, token: &str) -> TestRequest {
        let cookie = HeaderValue::from_str(&format!("token={token}")).expect("cookie header");
        req.add_header(header::COOKIE, cookie)
    }

    pub fn authed_get(&self, path: &str, token: &str) -> TestRequest {
        Self::with_session(self.server.get(path), token)
    }

    pub fn authed_post(&self, path: &str, token: &str) -> TestRequest {
        Self::with_session(self.server.post(path), token)
    }

    pub fn authed_patch(&self, path: &str, token: &str) -> TestRequest {
        Self::with_session(self.server.patch(path), token)
    }

    pub fn authed_delete(&self, path: &str, token: &str) -> TestRequest {
        Self::with_session(self.server.delete(path), token)
    }
}
