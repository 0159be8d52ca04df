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

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::broker::BrokerSubscription;
use crate::common::{BrokerError, CONFIG};
use crate::message::{AcknowledgeableEnvelope, Acknowledger, Envelope};
use crate::traits::BrokerController;

/// An in-process [`BrokerController`].
///
/// Every publish is fanned out to all subscriptions registered on the address at that moment.
/// Each subscription has a bounded queue, so a slow consumer applies backpressure to
/// publishers on its channel. Acknowledgments and rejections are counted in
/// [`MemoryBrokerStats`].
///
/// Clones share the same broker.
#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

struct Inner {
    channels: DashMap<String, Vec<Subscriber>>,
    next_id: AtomicU64,
    capacity: usize,
    closed: CancellationToken,
    stats: Arc<MemoryBrokerStats>,
}

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<AcknowledgeableEnvelope>,
}

/// Delivery counters of a [`MemoryBroker`].
#[derive(Debug, Default)]
pub struct MemoryBrokerStats {
    published: AtomicUsize,
    delivered: AtomicUsize,
    dropped: AtomicUsize,
    acknowledged: AtomicUsize,
    rejected: AtomicUsize,
}

impl MemoryBrokerStats {
    /// Accepted publish calls.
    pub fn published(&self) -> usize {
        self.published.load(Ordering::Acquire)
    }

    /// Envelopes handed to a subscription queue.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Acquire)
    }

    /// Envelopes whose subscription went away before delivery.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Acquire)
    }

    /// Envelopes settled with an acknowledgment.
    pub fn acknowledged(&self) -> usize {
        self.acknowledged.load(Ordering::Acquire)
    }

    /// Envelopes settled with a rejection.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Acquire)
    }
}

struct MemoryAcknowledger {
    stats: Arc<MemoryBrokerStats>,
}

impl Acknowledger for MemoryAcknowledger {
    fn ack(&self) {
        self.stats.acknowledged.fetch_add(1, Ordering::AcqRel);
    }

    fn nak(&self) {
        self.stats.rejected.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    /// Creates a broker whose subscription queues hold `limits.subscription_buffer` envelopes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(CONFIG.limits.subscription_buffer)
    }

    /// Creates a broker with an explicit per-subscription queue capacity (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                channels: DashMap::new(),
                next_id: AtomicU64::new(0),
                capacity: capacity.max(1),
                closed: CancellationToken::new(),
                stats: Arc::new(MemoryBrokerStats::default()),
            }),
        }
    }

    /// Delivery counters.
    #[must_use]
    pub fn stats(&self) -> &MemoryBrokerStats {
        &self.inner.stats
    }

    /// Number of live subscriptions on `address`.
    #[must_use]
    pub fn subscriber_count(&self, address: &str) -> usize {
        self.inner
            .channels
            .get(address)
            .map_or(0, |subscribers| subscribers.len())
    }

    /// `true` once [`close`](BrokerController::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    fn remove(inner: &Inner, address: &str, id: u64) {
        let now_empty = inner.channels.get_mut(address).is_some_and(|mut subscribers| {
            subscribers.retain(|subscriber| subscriber.id != id);
            subscribers.is_empty()
        });
        if now_empty {
            inner
                .channels
                .remove_if(address, |_, subscribers| subscribers.is_empty());
        }
        trace!(address, id, "Removed memory subscription");
    }
}

#[async_trait]
impl BrokerController for MemoryBroker {
    #[instrument(skip(self, envelope), level = "trace")]
    async fn publish(&self, address: &str, envelope: Envelope) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }
        self.inner.stats.published.fetch_add(1, Ordering::AcqRel);

        // Collect senders first so no map guard is held across an await.
        let senders: Vec<_> = self
            .inner
            .channels
            .get(address)
            .map(|subscribers| subscribers.iter().map(|s| s.sender.clone()).collect())
            .unwrap_or_default();
        if senders.is_empty() {
            trace!(address, "No subscribers, envelope discarded");
            return Ok(());
        }

        let stats = &self.inner.stats;
        let sends = senders.into_iter().map(|sender| {
            let message = AcknowledgeableEnvelope::new(
                envelope.clone(),
                MemoryAcknowledger {
                    stats: stats.clone(),
                },
            );
            async move {
                match sender.send(message).await {
                    Ok(()) => {
                        stats.delivered.fetch_add(1, Ordering::AcqRel);
                    }
                    Err(mpsc::error::SendError(message)) => {
                        message.abandon();
                        stats.dropped.fetch_add(1, Ordering::AcqRel);
                    }
                }
            }
        });
        join_all(sends).await;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn subscribe(&self, address: &str) -> Result<BrokerSubscription, BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let cancel = self.inner.closed.child_token();
        self.inner
            .channels
            .entry(address.to_string())
            .or_default()
            .push(Subscriber { id, sender });

        let inner = self.inner.clone();
        let watched = cancel.clone();
        let watched_address = address.to_string();
        tokio::spawn(async move {
            watched.cancelled().await;
            Self::remove(&inner, &watched_address, id);
        });

        debug!(address, id, "Memory subscription opened");
        Ok(BrokerSubscription::new(address, receiver, cancel))
    }

    #[instrument(skip(self))]
    async fn close(&self) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Ok(());
        }
        self.inner.closed.cancel();
        self.inner.channels.clear();
        debug!("Memory broker closed");
        Ok(())
    }
}

impl fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBroker")
            .field("channels", &self.inner.channels.len())
            .field("capacity", &self.inner.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn fans_out_to_every_subscriber() {
        let broker = MemoryBroker::with_capacity(4);
        let mut first = broker.subscribe("orders").await.expect("subscribe");
        let mut second = broker.subscribe("orders").await.expect("subscribe");

        broker
            .publish("orders", Envelope::from_payload("hello"))
            .await
            .expect("publish");

        let a = first.next().await.expect("first receives");
        let b = second.next().await.expect("second receives");
        assert_eq!(a.payload(), b"hello");
        assert_eq!(b.payload(), b"hello");
        a.acknowledge();
        b.reject();

        assert_eq!(broker.stats().published(), 1);
        assert_eq!(broker.stats().delivered(), 2);
        assert_eq!(broker.stats().acknowledged(), 1);
        assert_eq!(broker.stats().rejected(), 1);
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let broker = MemoryBroker::with_capacity(1);
        broker
            .publish("nobody", Envelope::from_payload("x"))
            .await
            .expect("publish");
        assert_eq!(broker.stats().delivered(), 0);
    }

    #[tokio::test]
    async fn cancelled_subscription_is_removed() {
        let broker = MemoryBroker::with_capacity(1);
        let subscription = broker.subscribe("orders").await.expect("subscribe");
        assert_eq!(broker.subscriber_count("orders"), 1);

        subscription.cancel();
        tokio::time::timeout(Duration::from_secs(1), async {
            while broker.subscriber_count("orders") > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscription removed");
    }

    #[tokio::test]
    async fn close_ends_streams_and_rejects_operations() {
        let broker = MemoryBroker::with_capacity(1);
        let mut subscription = broker.subscribe("orders").await.expect("subscribe");

        broker.close().await.expect("close");
        broker.close().await.expect("close is idempotent");

        assert!(subscription.next().await.is_none());
        assert_eq!(
            broker.publish("orders", Envelope::from_payload("x")).await,
            Err(BrokerError::Closed)
        );
        assert_eq!(
            broker.subscribe("orders").await.map(|_| ()),
            Err(BrokerError::Closed)
        );
    }

    #[tokio::test]
    async fn close_keeps_queued_envelopes_deliverable() {
        let broker = MemoryBroker::with_capacity(4);
        let mut subscription = broker.subscribe("orders").await.expect("subscribe");
        broker
            .publish("orders", Envelope::from_payload("1"))
            .await
            .expect("publish");

        broker.close().await.expect("close");

        let queued = subscription.next().await.expect("queued envelope survives close");
        assert_eq!(queued.payload(), b"1");
        queued.acknowledge();
        assert!(subscription.next().await.is_none());
        assert_eq!(broker.stats().acknowledged(), broker.stats().delivered());
    }

    #[tokio::test]
    async fn dropped_subscription_rejects_its_queue() {
        let broker = MemoryBroker::with_capacity(4);
        let subscription = broker.subscribe("orders").await.expect("subscribe");
        for payload in ["1", "2"] {
            broker
                .publish("orders", Envelope::from_payload(payload))
                .await
                .expect("publish");
        }

        drop(subscription);

        assert_eq!(broker.stats().delivered(), 2);
        assert_eq!(broker.stats().rejected(), 2);
    }
}
