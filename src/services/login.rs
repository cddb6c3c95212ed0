//! `login` and `users` services.

use super::{Context, Handler};
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use relay_proto::{LoginRequest, ResponseData, status};
use serde_json::Value;
use tracing::info;

/// Registers a user and appends the login audit entry.
pub struct LoginHandler;

#[async_trait]
impl Handler for LoginHandler {
    async fn handle(&self, ctx: &Context<'_>, data: Value) -> ServiceResult<ResponseData> {
        let request: LoginRequest =
            serde_json::from_value(data).map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let user = request
            .user
            .filter(|u| !u.is_empty())
            .ok_or(ServiceError::MissingUser)?;

        let mut store = ctx.state.store.lock().await;
        if store.has_user(&user) {
            return Err(ServiceError::DuplicateUser);
        }
        store.add_user(&user, request.timestamp)?;
        info!(user = %user, "user logged in");

        Ok(ResponseData::with_status(status::SUCCESS))
    }
}

/// Returns the full user list.
pub struct UsersHandler;

#[async_trait]
impl Handler for UsersHandler {
    async fn handle(&self, ctx: &Context<'_>, _data: Value) -> ServiceResult<ResponseData> {
        let store = ctx.state.store.lock().await;
        Ok(ResponseData {
            users: Some(store.users().to_vec()),
            ..ResponseData::default()
        })
    }
}
