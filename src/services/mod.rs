//! Service dispatcher.
//!
//! One handler per service, registered in a [`Registry`] keyed by service
//! tag. Dispatch observes the inbound clock before any processing, routes
//! by tag, and stamps every reply (success or error) with a freshly
//! ticked clock, so the requester's causality tracking stays correct on
//! failure paths too. Unknown tags fall through to the
//! unrecognized-service error.

mod channel;
mod login;
mod message;
mod publish;

pub use channel::{ChannelHandler, ChannelsHandler};
pub use login::{LoginHandler, UsersHandler};
pub use message::MessageHandler;
pub use publish::PublishHandler;

use crate::error::{ServiceError, ServiceResult};
use crate::state::NodeState;
use async_trait::async_trait;
use relay_proto::{Envelope, ResponseData, service, unix_now};
use serde_json::Value;
use std::collections::HashMap;

/// Handler context passed to each service handler.
pub struct Context<'a> {
    /// Shared node state.
    pub state: &'a NodeState,
}

/// Trait implemented by all service handlers.
///
/// A handler validates its payload, applies the mutation inside one store
/// critical section, and returns the reply body; the dispatcher stamps
/// clock and timestamp afterwards.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &Context<'_>, data: Value) -> ServiceResult<ResponseData>;
}

/// Registry of service handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all six service handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();
        handlers.insert(service::LOGIN, Box::new(LoginHandler));
        handlers.insert(service::USERS, Box::new(UsersHandler));
        handlers.insert(service::CHANNEL, Box::new(ChannelHandler));
        handlers.insert(service::CHANNELS, Box::new(ChannelsHandler));
        handlers.insert(service::PUBLISH, Box::new(PublishHandler));
        handlers.insert(service::MESSAGE, Box::new(MessageHandler));
        Self { handlers }
    }

    /// Handles one request and produces exactly one reply envelope.
    ///
    /// The reply preserves the request's service tag, including for
    /// unrecognized tags and handler faults.
    pub async fn dispatch(&self, state: &NodeState, request: Envelope) -> Envelope {
        if let Some(clock) = request.clock() {
            state.clock.observe(clock);
        }

        let ctx = Context { state };
        let outcome = match self.handlers.get(request.service.as_str()) {
            Some(handler) => handler.handle(&ctx, request.data).await,
            None => Err(ServiceError::UnrecognizedService),
        };

        let mut body = match outcome {
            Ok(body) => body,
            Err(e) => ResponseData::error(e.to_string()),
        };
        body.timestamp = unix_now();
        body.clock = state.clock.tick();
        Envelope::new(request.service, body)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic error reply for a request that never decoded: the service tag
/// is unknowable, so the designated `error` tag is used instead.
pub fn fault_reply(state: &NodeState, description: impl Into<String>) -> Envelope {
    let mut body = ResponseData::error(description);
    body.timestamp = unix_now();
    body.clock = state.clock.tick();
    Envelope::new(service::ERROR, body)
}
