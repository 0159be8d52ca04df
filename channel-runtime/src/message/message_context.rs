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
use std::sync::Arc;

use static_assertions::assert_impl_all;

/// Which way a message is travelling through a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The message is being sent to the broker.
    Publication,
    /// The message was received from the broker.
    Reception,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publication => f.write_str("publication"),
            Self::Reception => f.write_str("reception"),
        }
    }
}

/// Read-only metadata attached to every message passing through a controller.
///
/// A `MessageContext` is handed to middleware, handlers, the [`Logger`](crate::traits::Logger)
/// and the [`ErrorHandler`](crate::traits::ErrorHandler). Its contents are informational:
/// nothing in the runtime depends on them for correctness.
#[derive(Clone, Debug)]
pub struct MessageContext {
    pub(crate) address: Arc<str>,
    pub(crate) direction: Direction,
    pub(crate) provider: Arc<str>,
    pub(crate) version: Arc<str>,
    pub(crate) envelope: Option<String>,
    pub(crate) correlation_id: Option<String>,
}

impl MessageContext {
    /// Creates a context for `address`.
    pub fn new(
        address: impl Into<Arc<str>>,
        direction: Direction,
        provider: impl Into<Arc<str>>,
        version: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            address: address.into(),
            direction,
            provider: provider.into(),
            version: version.into(),
            envelope: None,
            correlation_id: None,
        }
    }

    /// Returns this context with the rendered form of the current envelope attached.
    #[must_use]
    pub fn with_envelope(mut self, envelope: &impl fmt::Display) -> Self {
        self.envelope = Some(envelope.to_string());
        self
    }

    /// Returns this context tagged with the correlation identifier being waited on.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// The channel address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Publication or reception.
    #[inline]
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Name of the controller side that handles the message (e.g. `app` or `user`).
    #[inline]
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Version of the AsyncAPI document the controller was generated from.
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Rendered envelope, when envelope logging is enabled.
    #[must_use]
    pub fn envelope(&self) -> Option<&str> {
        self.envelope.as_deref()
    }

    /// Correlation identifier of a pending request, if any.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

// Contexts are shared by reference across the dispatch task and middleware futures.
assert_impl_all!(MessageContext: Send, Sync);
