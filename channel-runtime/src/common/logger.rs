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

use tracing::{error, info, warn};

use crate::message::MessageContext;
use crate::traits::Logger;

/// A [`Logger`] that discards everything. The controller default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn info(&self, _ctx: &MessageContext, _message: &str) {}

    fn warn(&self, _ctx: &MessageContext, _message: &str) {}

    fn error(&self, _ctx: &MessageContext, _message: &str) {}
}

/// A [`Logger`] that emits `tracing` events carrying the context metadata as fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, ctx: &MessageContext, message: &str) {
        info!(
            address = ctx.address(),
            direction = %ctx.direction(),
            provider = ctx.provider(),
            version = ctx.version(),
            envelope = ctx.envelope(),
            "{message}"
        );
    }

    fn warn(&self, ctx: &MessageContext, message: &str) {
        warn!(
            address = ctx.address(),
            direction = %ctx.direction(),
            provider = ctx.provider(),
            version = ctx.version(),
            envelope = ctx.envelope(),
            "{message}"
        );
    }

    fn error(&self, ctx: &MessageContext, message: &str) {
        error!(
            address = ctx.address(),
            direction = %ctx.direction(),
            provider = ctx.provider(),
            version = ctx.version(),
            envelope = ctx.envelope(),
            "{message}"
        );
    }
}
