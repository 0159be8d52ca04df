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

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::message::AcknowledgeableEnvelope;

/// The receiving end of a broker subscription on one channel.
///
/// Yields envelopes until the stream is closed and drained. Cancelling through
/// [`cancel`](Self::cancel) or the shared [`cancellation_token`] stops new deliveries; the
/// envelopes already queued are still yielded. Dropping the subscription cancels it and
/// rejects whatever is left in the queue.
///
/// [`cancellation_token`]: Self::cancellation_token
pub struct BrokerSubscription {
    address: String,
    messages: mpsc::Receiver<AcknowledgeableEnvelope>,
    cancel: CancellationToken,
}

impl BrokerSubscription {
    /// Builds a subscription fed by `messages`.
    ///
    /// Broker drivers keep the sending half and watch `cancel` to learn when the consumer
    /// is gone.
    pub fn new(
        address: impl Into<String>,
        messages: mpsc::Receiver<AcknowledgeableEnvelope>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            address: address.into(),
            messages,
            cancel,
        }
    }

    /// The subscribed channel address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// A token cancelled when this subscription ends.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ends the subscription. Envelopes already queued are still yielded by [`next`](Self::next).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// `true` once the subscription has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits for the next envelope.
    ///
    /// Returns `None` once the stream is closed and every queued envelope has been yielded.
    pub async fn next(&mut self) -> Option<AcknowledgeableEnvelope> {
        if !self.cancel.is_cancelled() {
            tokio::select! {
                biased;
                message = self.messages.recv() => return message,
                () = self.cancel.cancelled() => {}
            }
        }
        // Closed receivers refuse new sends but still hand out what is buffered.
        self.messages.close();
        self.messages.recv().await
    }
}

impl Drop for BrokerSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.messages.close();
        let mut rejected = 0_usize;
        while let Ok(message) = self.messages.try_recv() {
            message.reject();
            rejected += 1;
        }
        if rejected > 0 {
            debug!(address = %self.address, rejected, "Rejected envelopes left in a dropped subscription");
        }
    }
}

impl fmt::Debug for BrokerSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerSubscription")
            .field("address", &self.address)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Envelope;

    #[tokio::test]
    async fn cancel_ends_the_stream() {
        let (tx, rx) = mpsc::channel(4);
        let mut subscription = BrokerSubscription::new("orders", rx, CancellationToken::new());
        tx.send(AcknowledgeableEnvelope::without_acknowledger(Envelope::from_payload("1")))
            .await
            .expect("receiver alive");

        let first = subscription.next().await.expect("one envelope");
        assert_eq!(first.payload(), b"1");

        subscription.cancel();
        assert!(subscription.next().await.is_none());
        assert!(subscription.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_still_yields_queued_envelopes() {
        let (tx, rx) = mpsc::channel(4);
        let mut subscription = BrokerSubscription::new("orders", rx, CancellationToken::new());
        for payload in ["1", "2"] {
            tx.send(AcknowledgeableEnvelope::without_acknowledger(Envelope::from_payload(payload)))
                .await
                .expect("receiver alive");
        }

        subscription.cancel();

        let first = subscription.next().await.expect("first queued envelope");
        let second = subscription.next().await.expect("second queued envelope");
        assert_eq!(first.payload(), b"1");
        assert_eq!(second.payload(), b"2");
        assert!(subscription.next().await.is_none());
        assert!(tx
            .send(AcknowledgeableEnvelope::without_acknowledger(Envelope::from_payload("3")))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn drop_cancels_the_token() {
        let (_tx, rx) = mpsc::channel(1);
        let subscription = BrokerSubscription::new("orders", rx, CancellationToken::new());
        let token = subscription.cancellation_token();

        drop(subscription);

        assert!(token.is_cancelled());
    }
}
