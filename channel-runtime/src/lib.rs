/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

#![forbid(unsafe_code)]
#![forbid(missing_docs)]

//! # Channel Runtime
//!
//! The runtime under generated AsyncAPI channel controllers, built on Tokio. Generated code
//! supplies typed messages and handlers; this crate moves envelopes between them and a
//! message broker.
//!
//! ## Key Concepts
//!
//! - **Broker (`BrokerController`)**: the publish/subscribe capability a controller needs.
//!   `MemoryBroker` is an in-process implementation.
//! - **Envelopes**: a flat header map plus payload bytes. Received envelopes are settled
//!   exactly once through `acknowledge` or `reject`.
//! - **Middleware (`Pipeline`)**: an ordered chain run around every publication and
//!   reception, each stage continuing through `Next`.
//! - **Controller**: one dispatch task per subscribed channel, typed publishing, and
//!   request/reply matched on correlation identifiers (`wait_for_reply`).
//! - **Codec**: JSON helpers and open-schema support for `ChannelMessage` implementations.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use channel_runtime::prelude::*;
//!
//! let controller = ControllerBuilder::new()
//!     .broker(MemoryBroker::new())
//!     .middleware(LoggingMiddleware::default())
//!     .build()?;
//!
//! controller
//!     .subscribe_to_channel("ping", |_ctx, ping: Ping| async move {
//!         tracing::info!(?ping, "Received ping");
//!         Ok(())
//!     })
//!     .await?;
//! controller.send_to_channel("ping", &Ping::new("hello")).await?;
//! ```

/// Broker subscriptions and the in-memory broker.
pub mod broker;

/// Envelope encoding helpers.
pub mod codec;

/// Errors, configuration, and the default logger and error handler.
pub mod common;

/// The channel controller and its builder.
pub mod controller;

/// Envelopes and message contexts.
pub mod message;

/// The middleware pipeline.
pub mod middleware;

/// Capability traits at the seams of the runtime.
pub mod traits;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## External Crates
/// *   [`async_trait::async_trait`](https://docs.rs/async-trait/latest/async_trait/attr.async_trait.html): The macro for implementing [`Middleware`](crate::traits::Middleware) and [`BrokerController`](crate::traits::BrokerController).
/// *   [`tokio_util::sync::CancellationToken`]: Cancels a [`wait_for_reply`](crate::controller::Controller::wait_for_reply).
///
/// ## Core Types
/// *   [`crate::controller::Controller`] / [`crate::controller::ControllerBuilder`]: the channel controller.
/// *   [`crate::controller::SubscriberSet`]: handlers subscribed together.
/// *   [`crate::broker::MemoryBroker`] / [`crate::broker::BrokerSubscription`]: broker plumbing.
/// *   [`crate::message::Envelope`], [`crate::message::AcknowledgeableEnvelope`], [`crate::message::MessageContext`].
/// *   [`crate::middleware::Next`], [`crate::middleware::Pipeline`], [`crate::middleware::LoggingMiddleware`].
/// *   [`crate::common::ControllerError`] / [`crate::common::BrokerError`], [`crate::common::RuntimeConfig`].
pub mod prelude {
    // External crate re-exports
    pub use async_trait::async_trait;
    pub use tokio_util::sync::CancellationToken;

    // Core types
    pub use crate::broker::{BrokerSubscription, MemoryBroker};
    pub use crate::codec::{decode_json, encode_json, OpenSchema};
    pub use crate::common::{
        BrokerError, ControllerError, LogErrorHandler, NoopLogger, RuntimeConfig, TracingLogger,
    };
    pub use crate::controller::{Controller, ControllerBuilder, SubscriberSet};
    pub use crate::message::{
        AcknowledgeableEnvelope, Acknowledger, Direction, Envelope, MessageContext, Outcome,
    };
    pub use crate::middleware::{LoggingMiddleware, Next, Pipeline};
    pub use crate::traits::{
        BrokerController, ChannelMessage, CorrelatedMessage, ErrorHandler, Logger, Middleware,
    };
}
