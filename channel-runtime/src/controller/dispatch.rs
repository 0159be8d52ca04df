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

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{trace, Instrument};

use super::Shared;
use crate::broker::BrokerSubscription;
use crate::common::ControllerError;
use crate::message::{Direction, Envelope, MessageContext};
use crate::traits::ChannelMessage;

/// A type-erased channel handler: decodes the envelope and returns the handling future.
pub(crate) type ChannelHandler = Arc<
    dyn Fn(MessageContext, &Envelope) -> BoxFuture<'static, Result<(), ControllerError>>
        + Send
        + Sync,
>;

/// Erases a typed handler. Decode failures surface as [`ControllerError::Decode`] before
/// the handler is called; handler errors become [`ControllerError::Handler`].
pub(crate) fn typed_handler<M, H, Fut>(handler: H) -> ChannelHandler
where
    M: ChannelMessage,
    H: Fn(MessageContext, M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx: MessageContext, envelope: &Envelope| {
        match M::from_envelope(envelope) {
            Ok(message) => handler(ctx, message).map(|r| r.map_err(ControllerError::from)).boxed(),
            Err(e) => future::ready(Err(e)).boxed(),
        }
    })
}

/// A handler that accepts everything, used by reply-scoped subscriptions.
pub(crate) fn passthrough() -> ChannelHandler {
    Arc::new(|_ctx: MessageContext, _envelope: &Envelope| future::ok(()).boxed())
}

/// Keeps one dispatch loop registered as an observer of its address.
///
/// Moved into the spawned future, so the registration ends whenever the future is dropped,
/// including when the task is aborted.
struct Observing {
    shared: Arc<Shared>,
    address: String,
}

impl Observing {
    fn attach(shared: Arc<Shared>, address: String) -> Self {
        shared.waiters.attach(&address);
        Self { shared, address }
    }
}

impl Drop for Observing {
    fn drop(&mut self) {
        self.shared.waiters.detach(&self.address);
    }
}

/// Spawns the dispatch loop of one subscription.
///
/// Each received envelope is offered to pending reply waits, then run through the pipeline
/// with the handler as terminal callback. Success acknowledges the envelope; failure goes to
/// the error handler and then rejects it. The loop ends once the stream is closed and drained.
pub(crate) fn spawn(
    shared: Arc<Shared>,
    mut subscription: BrokerSubscription,
    handler: ChannelHandler,
) -> JoinHandle<()> {
    let span = tracing::debug_span!(
        "dispatch",
        address = %subscription.address(),
        provider = %shared.provider
    );
    let observing = Observing::attach(shared, subscription.address().to_string());
    tokio::spawn(
        async move {
            let Observing { shared, address } = &observing;
            trace!("Dispatch loop started");
            while let Some(message) = subscription.next().await {
                let ctx = shared.context(address, Direction::Reception, message.envelope());
                shared.waiters.offer(address, message.envelope());

                let result = shared
                    .pipeline
                    .execute(&ctx, message.envelope(), || {
                        let handling = handler(ctx.clone(), message.envelope());
                        let message = &message;
                        async move {
                            handling.await?;
                            message.acknowledge();
                            Ok(())
                        }
                    })
                    .await;

                match result {
                    Ok(()) => {
                        message.acknowledge();
                    }
                    Err(error) => {
                        shared.error_handler.handle(&ctx, address, &message, &error);
                        message.reject();
                    }
                }
            }
            trace!("Dispatch loop ended");
        }
        .instrument(span),
    )
}
