//! `message` service: direct messages.

use super::{Context, Handler};
use crate::error::{ServiceError, ServiceResult};
use crate::state::store::MessageRecord;
use async_trait::async_trait;
use relay_proto::{DirectMessage, Envelope, MessageRequest, ResponseData, service, status};
use serde_json::Value;
use tracing::debug;

/// Routes a direct message to the recipient's topic and records it.
pub struct MessageHandler;

#[async_trait]
impl Handler for MessageHandler {
    async fn handle(&self, ctx: &Context<'_>, data: Value) -> ServiceResult<ResponseData> {
        let request: MessageRequest =
            serde_json::from_value(data).map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let dst = request.dst.unwrap_or_default();

        let mut store = ctx.state.store.lock().await;
        if !store.has_user(&dst) {
            return Err(ServiceError::NoSuchUser);
        }

        let src = request.src.unwrap_or_default();
        let message = request.message.unwrap_or_default();

        let event = Envelope::new(
            service::MESSAGE,
            DirectMessage {
                src: src.clone(),
                dst: dst.clone(),
                message: message.clone(),
                timestamp: request.timestamp,
                clock: ctx.state.clock.tick(),
            },
        );
        ctx.state.publisher.publish(&dst, event).await;

        store.append_message(MessageRecord {
            src,
            dst: dst.clone(),
            message,
            timestamp: request.timestamp,
        })?;
        debug!(dst = %dst, "direct message routed");

        Ok(ResponseData::with_status(status::OK))
    }
}
