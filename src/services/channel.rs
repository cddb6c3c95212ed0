//! `channel` and `channels` services.

use super::{Context, Handler};
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use relay_proto::{ChannelRequest, ResponseData, status};
use serde_json::Value;
use tracing::info;

/// Creates a channel.
pub struct ChannelHandler;

#[async_trait]
impl Handler for ChannelHandler {
    async fn handle(&self, ctx: &Context<'_>, data: Value) -> ServiceResult<ResponseData> {
        let request: ChannelRequest =
            serde_json::from_value(data).map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let channel = request
            .channel
            .filter(|c| !c.is_empty())
            .ok_or(ServiceError::MissingChannel)?;

        let mut store = ctx.state.store.lock().await;
        if store.has_channel(&channel) {
            return Err(ServiceError::DuplicateChannel);
        }
        store.add_channel(&channel)?;
        info!(channel = %channel, "channel created");

        Ok(ResponseData::with_status(status::SUCCESS))
    }
}

/// Returns the full channel list.
pub struct ChannelsHandler;

#[async_trait]
impl Handler for ChannelsHandler {
    async fn handle(&self, ctx: &Context<'_>, _data: Value) -> ServiceResult<ResponseData> {
        let store = ctx.state.store.lock().await;
        Ok(ResponseData {
            channels: Some(store.channels().to_vec()),
            ..ResponseData::default()
        })
    }
}
