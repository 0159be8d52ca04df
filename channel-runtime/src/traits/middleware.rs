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

use crate::common::ControllerError;
use crate::message::{Envelope, MessageContext};
use crate::middleware::Next;

/// A stage of the middleware pipeline wrapping every sent and received message.
///
/// A middleware either calls [`Next::run`] to continue the chain, returns `Ok(())` to let the
/// pipeline continue on its own, or returns an error to stop it. Middleware run in the order
/// they were given to the [`ControllerBuilder`](crate::controller::ControllerBuilder), on both
/// the publication and the reception path.
///
/// # Example
///
/// ```rust,ignore
/// struct RequireHeader(&'static str);
///
/// #[async_trait]
/// impl Middleware for RequireHeader {
///     async fn handle(
///         &self,
///         _ctx: &MessageContext,
///         envelope: &Envelope,
///         next: Next<'_>,
///     ) -> Result<(), ControllerError> {
///         if envelope.header(self.0).is_none() {
///             return Err(anyhow::anyhow!("missing header {}", self.0).into());
///         }
///         next.run().await
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Processes one message.
    async fn handle(
        &self,
        ctx: &MessageContext,
        envelope: &Envelope,
        next: Next<'_>,
    ) -> Result<(), ControllerError>;
}
