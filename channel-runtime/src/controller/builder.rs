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
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::reply::ReplyWaiters;
use super::{Controller, Shared};
use crate::common::{ControllerError, LogErrorHandler, NoopLogger, RuntimeConfig, CONFIG};
use crate::middleware::Pipeline;
use crate::traits::{BrokerController, ErrorHandler, Logger, Middleware};

/// Configures and builds a [`Controller`].
///
/// Only the broker is required. Defaults: provider `app`, empty version, [`NoopLogger`], no
/// middleware, [`LogErrorHandler`], the process-wide [`CONFIG`], and a broker left open on
/// [`Controller::close`].
pub struct ControllerBuilder {
    broker: Option<Arc<dyn BrokerController>>,
    provider: String,
    version: String,
    logger: Arc<dyn Logger>,
    middlewares: Vec<Arc<dyn Middleware>>,
    error_handler: Arc<dyn ErrorHandler>,
    config: Option<RuntimeConfig>,
    close_broker: bool,
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerBuilder {
    /// A builder with every option at its default and no broker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            broker: None,
            provider: "app".to_string(),
            version: String::new(),
            logger: Arc::new(NoopLogger),
            middlewares: Vec::new(),
            error_handler: Arc::new(LogErrorHandler),
            config: None,
            close_broker: false,
        }
    }

    /// The broker the controller publishes to and subscribes through.
    #[must_use]
    pub fn broker(mut self, broker: impl BrokerController) -> Self {
        self.broker = Some(Arc::new(broker));
        self
    }

    /// A broker already shared behind an `Arc`.
    #[must_use]
    pub fn shared_broker(mut self, broker: Arc<dyn BrokerController>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Which side of the contract this controller implements, usually `app` or `user`.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Version of the AsyncAPI document, reported in every [`MessageContext`](crate::message::MessageContext).
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Receives lifecycle and failure events.
    #[must_use]
    pub fn logger(mut self, logger: impl Logger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Appends a middleware. Middleware run in the order they were added.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Replaces the whole middleware list.
    #[must_use]
    pub fn middlewares(mut self, middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        self.middlewares = middlewares;
        self
    }

    /// Receives every failure raised inside a dispatch loop.
    #[must_use]
    pub fn error_handler(mut self, error_handler: impl ErrorHandler) -> Self {
        self.error_handler = Arc::new(error_handler);
        self
    }

    /// Overrides the process-wide configuration for this controller.
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Whether [`Controller::close`] also closes the broker.
    #[must_use]
    pub fn close_broker(mut self, close_broker: bool) -> Self {
        self.close_broker = close_broker;
        self
    }

    /// Builds the controller.
    ///
    /// # Errors
    ///
    /// [`ControllerError::MissingBroker`] when no broker was given.
    pub fn build(self) -> Result<Controller, ControllerError> {
        let broker = self.broker.ok_or(ControllerError::MissingBroker)?;
        Ok(Controller {
            shared: Arc::new(Shared {
                broker,
                pipeline: Pipeline::new(self.middlewares),
                logger: self.logger,
                error_handler: self.error_handler,
                provider: self.provider.into(),
                version: self.version.into(),
                config: self.config.unwrap_or_else(|| CONFIG.clone()),
                waiters: ReplyWaiters::default(),
                close_broker: self.close_broker,
                closed: AtomicBool::new(false),
            }),
            registry: Default::default(),
        })
    }
}

impl fmt::Debug for ControllerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBuilder")
            .field("has_broker", &self.broker.is_some())
            .field("provider", &self.provider)
            .field("version", &self.version)
            .field("middlewares", &self.middlewares.len())
            .field("config", &self.config)
            .field("close_broker", &self.close_broker)
            .finish_non_exhaustive()
    }
}
