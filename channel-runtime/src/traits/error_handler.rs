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

use crate::common::ControllerError;
use crate::message::{AcknowledgeableEnvelope, MessageContext};

/// Sink for failures raised inside a dispatch loop.
///
/// Dispatch loops run detached from the caller, so decode, middleware and handler errors
/// cannot be returned. They are passed here together with the channel address and the raw
/// envelope, after which the envelope is rejected. Implementations must not settle the
/// envelope themselves.
///
/// Any `Fn(&MessageContext, &str, &AcknowledgeableEnvelope, &ControllerError)` closure is an
/// `ErrorHandler`.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Reports one failed dispatch.
    fn handle(
        &self,
        ctx: &MessageContext,
        address: &str,
        envelope: &AcknowledgeableEnvelope,
        error: &ControllerError,
    );
}

impl<F> ErrorHandler for F
where
    F: Fn(&MessageContext, &str, &AcknowledgeableEnvelope, &ControllerError)
        + Send
        + Sync
        + 'static,
{
    fn handle(
        &self,
        ctx: &MessageContext,
        address: &str,
        envelope: &AcknowledgeableEnvelope,
        error: &ControllerError,
    ) {
        self(ctx, address, envelope, error);
    }
}
