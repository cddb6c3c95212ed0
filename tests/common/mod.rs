//! Integration test common infrastructure.
//!
//! Stands up in-process relay fixtures (broker, proxy, reference service)
//! over real TCP and drives spawned relayd nodes through end-to-end
//! flows. The fixtures are test infrastructure, not deliverable
//! components: the broker shuttles opaque frames, the proxy does topic
//! matching, the reference service assigns ranks.

// Not every test binary uses every fixture.
#![allow(dead_code)]

pub mod node;
pub mod relay;

#[allow(unused_imports)]
pub use node::TestNode;
#[allow(unused_imports)]
pub use relay::{BrokerFixture, ProxyFixture, ReferenceFixture, TestClient, TestSubscriber};
