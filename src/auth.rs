use std::collections::HashMap;
use std::sync::Arc;

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use r2d2_redis::redis::Commands;
use r2d2_redis::{r2d2 as redis_r2d2, RedisConnectionManager};
use serde::Serialize;
use tracing::debug;

use crate::access::{self, Resource};
use crate::errors::{AppError, Result};
use crate::store::Store;

pub type RedisPool = redis_r2d2::Pool<RedisConnectionManager>;

// The login service writes `session:<token>` -> user id.
const SESSION_KEY_PREFIX: &str = "session:";

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: i32,
    pub is_staff: bool,
}

impl Identity {
    pub fn owns<R: Resource + ?Sized>(&self, resource: &R) -> bool {
        access::is_owner(self, resource)
    }
}

pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token, failing with `Unauthenticated` when it is unknown.
    fn authenticate(&self, token: &str) -> Result<Identity>;
}

pub fn initialize_redis_pool(redis_url: &str) -> Result<RedisPool> {
    let manager =
        RedisConnectionManager::new(redis_url).map_err(|e| AppError::Session(e.to_string()))?;
    redis_r2d2::Pool::builder()
        .build(manager)
        .map_err(|e| AppError::Session(e.to_string()))
}

pub struct RedisSessions {
    pool: RedisPool,
    store: Arc<dyn Store>,
}

impl RedisSessions {
    pub fn new(pool: RedisPool, store: Arc<dyn Store>) -> Self {
        RedisSessions { pool, store }
    }
}

impl IdentityProvider for RedisSessions {
    fn authenticate(&self, token: &str) -> Result<Identity> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AppError::Session(e.to_string()))?;
        let user_id: Option<i32> = conn
            .get(format!("{SESSION_KEY_PREFIX}{token}"))
            .map_err(|e| AppError::Session(e.to_string()))?;
        let user_id = user_id.ok_or(AppError::Unauthenticated)?;
        let user = self.store.find_user(user_id)?.ok_or_else(|| {
            debug!(user_id, "session points at a missing user");
            AppError::Unauthenticated
        })?;
        Ok(Identity {
            user_id: user.id,
            is_staff: user.is_staff,
        })
    }
}

/// Fixed token table, for tests and local tooling.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentities {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, identity: Identity) -> Self {
        self.tokens.insert(token.to_string(), identity);
        self
    }
}

impl IdentityProvider for StaticIdentities {
    fn authenticate(&self, token: &str) -> Result<Identity> {
        self.tokens
            .get(token)
            .copied()
            .ok_or(AppError::Unauthenticated)
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let provider = req.app_data::<web::Data<dyn IdentityProvider>>().cloned();
        Box::pin(async move {
            let token = token.ok_or(AppError::Unauthenticated)?;
            let provider = provider
                .ok_or_else(|| AppError::Config("identity provider is not registered".into()))?;
            web::block(move || provider.authenticate(&token))
                .await
                .map_err(|e| AppError::Session(e.to_string()))?
        })
    }
}
