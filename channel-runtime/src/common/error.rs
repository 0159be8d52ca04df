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

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a [`BrokerController`](crate::traits::BrokerController) implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// The broker has been closed and accepts no further operations.
    #[error("broker is closed")]
    Closed,

    /// The broker could not be reached or refused the operation.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The broker refused to establish a subscription.
    #[error("cannot subscribe to channel {address:?}: {reason}")]
    Subscribe {
        /// The channel address.
        address: String,
        /// Broker-provided explanation.
        reason: String,
    },
}

/// Errors returned by controllers and reported to [`ErrorHandler`](crate::traits::ErrorHandler)s.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The controller was built without a broker.
    #[error("no broker controller was provided")]
    MissingBroker,

    /// Subscribe-all was called with a subscriber set holding no handlers.
    #[error("subscriber set has no channel handlers")]
    MissingSubscriberSet,

    /// The controller already holds a subscription on this address.
    #[error("controller is already subscribed on channel {address:?}")]
    AlreadySubscribed {
        /// The channel address.
        address: String,
    },

    /// An envelope payload could not be decoded into the expected message.
    #[error("cannot decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// A typed message could not be encoded into an envelope.
    #[error("cannot encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A handler or middleware returned an error.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    /// A reply wait was cancelled by its caller.
    #[error("wait for reply was cancelled")]
    Cancelled,

    /// No matching reply arrived before the configured timeout.
    #[error("no reply received within {after:?}")]
    TimedOut {
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The stream observed for a reply closed before a match arrived.
    #[error("subscription on channel {address:?} closed before a reply arrived")]
    SubscriptionClosed {
        /// The reply channel address.
        address: String,
    },

    /// The broker failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl ControllerError {
    /// Wraps any error raised by user code as a [`ControllerError::Handler`].
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(anyhow::Error::new(err))
    }

    /// `true` for the errors that end a reply wait without a broker or codec failure.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut { .. })
    }
}
