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
use std::future::Future;

use super::dispatch::{typed_handler, ChannelHandler};
use crate::message::MessageContext;
use crate::traits::ChannelMessage;

/// A bundle of typed channel handlers subscribed together through
/// [`Controller::subscribe_to_all_channels`](super::Controller::subscribe_to_all_channels).
///
/// ```rust,ignore
/// let set = SubscriberSet::new()
///     .on("user.signup", |_ctx, msg: Signup| async move { greet(msg).await })
///     .on("user.deleted", |_ctx, msg: Deleted| async move { purge(msg).await });
/// controller.subscribe_to_all_channels(set).await?;
/// ```
#[derive(Default)]
pub struct SubscriberSet {
    pub(crate) handlers: Vec<(String, ChannelHandler)>,
}

impl SubscriberSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the handler for `address`. A later handler for the same address replaces the
    /// earlier one.
    #[must_use]
    pub fn on<M, H, Fut>(mut self, address: impl Into<String>, handler: H) -> Self
    where
        M: ChannelMessage,
        H: Fn(MessageContext, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let address = address.into();
        self.handlers.retain(|(existing, _)| *existing != address);
        self.handlers.push((address, typed_handler(handler)));
        self
    }

    /// Number of channels in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// `true` when no handler was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// The channel addresses, in insertion order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(address, _)| address.as_str())
    }
}

impl fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.addresses()).finish()
    }
}
