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

use tracing::error;

use crate::common::ControllerError;
use crate::message::{AcknowledgeableEnvelope, MessageContext};
use crate::traits::ErrorHandler;

/// The default [`ErrorHandler`]: logs the failure and drops it.
///
/// The dispatch loop keeps running and the envelope is rejected afterwards regardless.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle(
        &self,
        ctx: &MessageContext,
        address: &str,
        envelope: &AcknowledgeableEnvelope,
        error: &ControllerError,
    ) {
        error!(
            address,
            provider = ctx.provider(),
            envelope = %envelope,
            error = %error,
            "Error while processing message"
        );
    }
}
