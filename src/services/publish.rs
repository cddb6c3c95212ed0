//! `publish` service: channel posts.

use super::{Context, Handler};
use crate::error::{ServiceError, ServiceResult};
use crate::state::store::PublicationRecord;
use async_trait::async_trait;
use relay_proto::{Envelope, PublishEvent, PublishRequest, ResponseData, service, status};
use serde_json::Value;
use tracing::debug;

/// Routes a post to a channel topic and records it.
///
/// Fanout and the durable append run inside one store critical section,
/// and the reply is built only after the save completes.
pub struct PublishHandler;

#[async_trait]
impl Handler for PublishHandler {
    async fn handle(&self, ctx: &Context<'_>, data: Value) -> ServiceResult<ResponseData> {
        let request: PublishRequest =
            serde_json::from_value(data).map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let channel = request.channel.unwrap_or_default();

        let mut store = ctx.state.store.lock().await;
        if !store.has_channel(&channel) {
            return Err(ServiceError::NoSuchChannel);
        }

        let user = request.user.unwrap_or_default();
        let message = request.message.unwrap_or_default();

        let event = Envelope::new(
            service::PUBLISH,
            PublishEvent {
                user: user.clone(),
                channel: channel.clone(),
                message: message.clone(),
                timestamp: request.timestamp,
                clock: ctx.state.clock.tick(),
            },
        );
        ctx.state.publisher.publish(&channel, event).await;

        store.append_publication(PublicationRecord {
            user,
            channel: channel.clone(),
            message,
            timestamp: request.timestamp,
        })?;
        debug!(channel = %channel, "publication routed");

        Ok(ResponseData::with_status(status::OK))
    }
}
