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

use async_trait::async_trait;

use crate::broker::BrokerSubscription;
use crate::common::BrokerError;
use crate::message::Envelope;

/// The capability a controller needs from a message broker.
///
/// Concrete drivers wrap a specific broker client library and implement this trait. The
/// runtime ships [`MemoryBroker`](crate::broker::MemoryBroker) as an in-process reference
/// implementation.
#[async_trait]
pub trait BrokerController: Send + Sync + 'static {
    /// Delivers one envelope to one channel.
    ///
    /// May suspend until the broker has accepted the envelope. A failure means nothing was
    /// delivered.
    async fn publish(&self, address: &str, envelope: Envelope) -> Result<(), BrokerError>;

    /// Registers interest in a channel.
    ///
    /// The returned subscription yields envelopes for publishes made after this call returns.
    /// Fails if the broker cannot establish the subscription.
    async fn subscribe(&self, address: &str) -> Result<BrokerSubscription, BrokerError>;

    /// Releases every broker-level resource.
    ///
    /// Called at most once, after the controllers using the broker cancelled their
    /// subscriptions.
    async fn close(&self) -> Result<(), BrokerError>;
}
