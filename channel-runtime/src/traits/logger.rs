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

use crate::message::MessageContext;

/// Logging capability injected into a controller.
///
/// Controllers report lifecycle events (subscribed, unsubscribed, closed) and failures through
/// this trait. The default is [`NoopLogger`](crate::common::NoopLogger);
/// [`TracingLogger`](crate::common::TracingLogger) forwards to `tracing`.
pub trait Logger: Send + Sync + 'static {
    /// An informational event.
    fn info(&self, ctx: &MessageContext, message: &str);

    /// Something unexpected that does not stop processing.
    fn warn(&self, ctx: &MessageContext, message: &str);

    /// A failure.
    fn error(&self, ctx: &MessageContext, message: &str);
}
