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

//! The channel controller: subscriptions, dispatch loops, publishing and request/reply.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use static_assertions::assert_impl_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

pub use builder::ControllerBuilder;
pub use subscriber_set::SubscriberSet;

use crate::broker::BrokerSubscription;
use crate::common::{ControllerError, RuntimeConfig};
use crate::message::{Direction, Envelope, MessageContext};
use crate::middleware::Pipeline;
use crate::traits::{BrokerController, ChannelMessage, CorrelatedMessage, ErrorHandler, Logger};
use dispatch::ChannelHandler;
use registry::{ActiveSubscription, SubscriptionRegistry};
use reply::{PendingGuard, ReplyKind, ReplyWaiters};

mod builder;
mod dispatch;
mod registry;
mod reply;
mod subscriber_set;

/// State shared between a controller and its dispatch tasks.
pub(crate) struct Shared {
    pub(crate) broker: Arc<dyn BrokerController>,
    pub(crate) pipeline: Pipeline,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) error_handler: Arc<dyn ErrorHandler>,
    pub(crate) provider: Arc<str>,
    pub(crate) version: Arc<str>,
    pub(crate) config: RuntimeConfig,
    pub(crate) waiters: ReplyWaiters,
    pub(crate) close_broker: bool,
    pub(crate) closed: AtomicBool,
}

impl Shared {
    /// A context for one message, with the envelope attached when envelope logging is on.
    pub(crate) fn context(
        &self,
        address: &str,
        direction: Direction,
        envelope: &Envelope,
    ) -> MessageContext {
        let ctx = self.lifecycle_context(address, direction);
        if self.config.behavior.log_envelopes {
            ctx.with_envelope(envelope)
        } else {
            ctx
        }
    }

    fn lifecycle_context(&self, address: &str, direction: Direction) -> MessageContext {
        MessageContext::new(
            address,
            direction,
            self.provider.clone(),
            self.version.clone(),
        )
    }
}

/// Connects typed channel handlers to a broker.
///
/// A controller owns one subscription per channel address it listens on, each consumed by a
/// dedicated dispatch task. Every received envelope runs through the middleware pipeline and
/// then the channel's handler; it is acknowledged on success and rejected otherwise, with the
/// failure reported to the [`ErrorHandler`]. Failures never stop a dispatch loop.
///
/// Subscribe and unsubscribe calls on the same address must not race each other.
///
/// Dropping a controller cancels all of its subscriptions without waiting for the dispatch
/// tasks; call [`close`](Self::close) for an orderly shutdown.
pub struct Controller {
    shared: Arc<Shared>,
    registry: SubscriptionRegistry,
}

impl Controller {
    /// Starts configuring a controller.
    #[must_use]
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    /// Subscribes `handler` to the channel at `address`.
    ///
    /// Envelopes published after this call returns are decoded into `M` and handed to
    /// `handler`.
    ///
    /// # Errors
    ///
    /// [`ControllerError::AlreadySubscribed`] when the controller already listens on
    /// `address`, or the broker error when the broker refuses the subscription.
    #[instrument(skip(self, handler), fields(provider = %self.shared.provider))]
    pub async fn subscribe_to_channel<M, H, Fut>(
        &self,
        address: &str,
        handler: H,
    ) -> Result<(), ControllerError>
    where
        M: ChannelMessage,
        H: Fn(MessageContext, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe_with(address, dispatch::typed_handler(handler))
            .await
    }

    async fn subscribe_with(
        &self,
        address: &str,
        handler: ChannelHandler,
    ) -> Result<(), ControllerError> {
        let already_subscribed = || ControllerError::AlreadySubscribed {
            address: address.to_string(),
        };
        if self.registry.contains(address) {
            return Err(already_subscribed());
        }

        let subscription = self.shared.broker.subscribe(address).await?;
        if self.registry.contains(address) {
            subscription.cancel();
            return Err(already_subscribed());
        }

        let active = self.spawn_dispatch(subscription, handler);
        if let Err(lost) = self.registry.insert(active) {
            lost.shutdown(Some(self.shared.config.close_timeout())).await;
            return Err(already_subscribed());
        }

        self.shared.logger.info(
            &self.shared.lifecycle_context(address, Direction::Reception),
            "Subscribed to channel",
        );
        Ok(())
    }

    fn spawn_dispatch(
        &self,
        subscription: BrokerSubscription,
        handler: ChannelHandler,
    ) -> ActiveSubscription {
        let address = subscription.address().to_string();
        let cancel = subscription.cancellation_token().drop_guard();
        let task = dispatch::spawn(self.shared.clone(), subscription, handler);
        ActiveSubscription::new(address, cancel, task)
    }

    /// Stops listening on `address` and waits for its dispatch task to finish the envelope
    /// it is processing. Does nothing when the controller is not subscribed.
    ///
    /// Must not be called from a handler of the same channel.
    #[instrument(skip(self), fields(provider = %self.shared.provider))]
    pub async fn unsubscribe_from_channel(&self, address: &str) {
        let Some(active) = self.registry.remove(address) else {
            trace!("Not subscribed, nothing to do");
            return;
        };
        active.shutdown(None).await;
        self.shared.logger.info(
            &self.shared.lifecycle_context(address, Direction::Reception),
            "Unsubscribed from channel",
        );
    }

    /// Subscribes every handler of `set`.
    ///
    /// If one subscription fails, the ones made by this call are removed again.
    ///
    /// # Errors
    ///
    /// [`ControllerError::MissingSubscriberSet`] for an empty set, otherwise the first
    /// subscription error.
    #[instrument(skip_all, fields(provider = %self.shared.provider, channels = set.len()))]
    pub async fn subscribe_to_all_channels(&self, set: SubscriberSet) -> Result<(), ControllerError> {
        if set.is_empty() {
            return Err(ControllerError::MissingSubscriberSet);
        }

        let mut subscribed: Vec<String> = Vec::with_capacity(set.len());
        for (address, handler) in set.handlers {
            if let Err(error) = self.subscribe_with(&address, handler).await {
                for done in &subscribed {
                    self.unsubscribe_from_channel(done).await;
                }
                return Err(error);
            }
            subscribed.push(address);
        }
        Ok(())
    }

    /// Unsubscribes every channel.
    #[instrument(skip(self), fields(provider = %self.shared.provider))]
    pub async fn unsubscribe_from_all_channels(&self) {
        self.shutdown_all(None).await;
    }

    async fn shutdown_all(&self, timeout: Option<Duration>) {
        let entries = self.registry.drain();
        if entries.is_empty() {
            return;
        }
        let count = entries.len();
        let joined = join_all(entries.into_iter().map(|entry| entry.shutdown(timeout))).await;
        let aborted = joined.iter().filter(|stopped| !**stopped).count();
        debug!(count, aborted, "Unsubscribed from all channels");
    }

    /// Encodes `message` and publishes it on `address` through the middleware pipeline.
    ///
    /// # Errors
    ///
    /// An encoding error, a middleware error, or the broker's publish error.
    pub async fn send_to_channel<M: ChannelMessage>(
        &self,
        address: &str,
        message: &M,
    ) -> Result<(), ControllerError> {
        let envelope = message.to_envelope()?;
        let ctx = self.shared.context(address, Direction::Publication, &envelope);
        let broker = &self.shared.broker;
        let envelope_ref = &envelope;

        trace!(address, "Publishing message");
        let result = self
            .shared
            .pipeline
            .execute(&ctx, &envelope, || async move {
                broker
                    .publish(address, envelope_ref.clone())
                    .await
                    .map_err(ControllerError::from)
            })
            .await;

        if let Err(error) = &result {
            self.shared
                .logger
                .error(&ctx, &format!("Failed to publish message: {error}"));
        }
        result
    }

    /// Publishes a request and waits for the reply carrying the same correlation identifier.
    ///
    /// If the request has no identifier, a UUID v4 is stamped into it. The reply channel at
    /// `address` is observed through the controller's own subscription when there is one;
    /// otherwise a subscription scoped to this call is opened before `publish` runs, and its
    /// envelopes are acknowledged. Replies carrying other identifiers are left alone.
    ///
    /// The pending wait is removed on every exit path, including this future being dropped.
    ///
    /// # Errors
    ///
    /// * [`ControllerError::Cancelled`] when `cancel` fires first.
    /// * [`ControllerError::TimedOut`] when the configured reply timeout elapses.
    /// * [`ControllerError::SubscriptionClosed`] when the reply stream ends first.
    /// * The error returned by `publish`, a broker error, or the reply's decoding error.
    #[instrument(skip(self, cancel, request, publish), fields(provider = %self.shared.provider))]
    pub async fn wait_for_reply<Req, Rep, P, Fut>(
        &self,
        address: &str,
        cancel: &CancellationToken,
        mut request: Req,
        publish: P,
    ) -> Result<Rep, ControllerError>
    where
        Req: CorrelatedMessage,
        Rep: CorrelatedMessage,
        P: FnOnce(Req) -> Fut + Send,
        Fut: Future<Output = Result<(), ControllerError>> + Send,
    {
        let scoped = if self.registry.contains(address) {
            None
        } else {
            let subscription = self.shared.broker.subscribe(address).await?;
            Some(self.spawn_dispatch(subscription, dispatch::passthrough()))
        };

        let id = if let Some(id) = request.correlation_id() {
            id.to_owned()
        } else {
            let id = Uuid::new_v4().to_string();
            request.set_correlation_id(id.clone());
            id
        };
        let ctx = self
            .shared
            .lifecycle_context(address, Direction::Reception)
            .with_correlation_id(id.clone());

        let receiver = self
            .shared
            .waiters
            .register(address, &id, ReplyKind::of::<Rep>());
        let pending = PendingGuard::new(&self.shared.waiters, address, id);

        let waiting = async {
            publish(request).await?;
            let reply = async {
                receiver.await.map_err(|_| ControllerError::SubscriptionClosed {
                    address: address.to_string(),
                })
            };
            match self.shared.config.reply_timeout() {
                Some(after) => tokio::time::timeout(after, reply)
                    .await
                    .unwrap_or(Err(ControllerError::TimedOut { after })),
                None => reply.await,
            }
        };
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ControllerError::Cancelled),
            outcome = waiting => outcome,
        };
        drop(pending);

        if let Some(scoped) = scoped {
            scoped
                .shutdown(Some(self.shared.config.close_timeout()))
                .await;
        }

        match outcome {
            Ok(envelope) => {
                self.shared.logger.info(&ctx, "Received reply");
                Rep::from_envelope(&envelope)
            }
            Err(error) => {
                self.shared
                    .logger
                    .warn(&ctx, &format!("Stopped waiting for reply: {error}"));
                Err(error)
            }
        }
    }

    /// `true` when the controller listens on `address`.
    #[must_use]
    pub fn is_subscribed(&self, address: &str) -> bool {
        self.registry.contains(address)
    }

    /// The addresses the controller listens on, sorted.
    #[must_use]
    pub fn subscribed_channels(&self) -> Vec<String> {
        self.registry.addresses()
    }

    /// Number of [`wait_for_reply`](Self::wait_for_reply) calls still waiting on `address`.
    #[must_use]
    pub fn pending_replies(&self, address: &str) -> usize {
        self.shared.waiters.pending_count(address)
    }

    /// Unsubscribes every channel, then closes the broker if the controller owns it.
    ///
    /// Dispatch tasks get the configured close timeout to finish; the ones still running
    /// afterwards are aborted. Calling `close` again only unsubscribes what was subscribed
    /// since.
    ///
    /// # Errors
    ///
    /// The broker's close error.
    #[instrument(skip(self), fields(provider = %self.shared.provider))]
    pub async fn close(&self) -> Result<(), ControllerError> {
        self.shutdown_all(Some(self.shared.config.close_timeout()))
            .await;

        if self.shared.close_broker && !self.shared.closed.swap(true, Ordering::AcqRel) {
            self.shared.broker.close().await?;
        }
        self.shared.logger.info(
            &self.shared.lifecycle_context("", Direction::Reception),
            "Closed controller",
        );
        Ok(())
    }
}

// Controllers are shared across tasks behind an `Arc`.
assert_impl_all!(Controller: Send, Sync);

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("provider", &self.shared.provider)
            .field("version", &self.shared.version)
            .field("pipeline", &self.shared.pipeline)
            .field("channels", &self.registry.addresses())
            .finish_non_exhaustive()
    }
}
