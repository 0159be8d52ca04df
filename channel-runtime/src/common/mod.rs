//! Provides common types shared across the runtime: errors, configuration, and the default
//! logger and error handler implementations.
//!
//! # Key Re-exported Components:
//!
//! *   [`ControllerError`] / [`BrokerError`]: the error types of the runtime.
//! *   [`RuntimeConfig`]: TOML configuration loaded from XDG locations.
//! *   [`NoopLogger`] / [`TracingLogger`]: [`Logger`](crate::traits::Logger) implementations.
//! *   [`LogErrorHandler`]: the default [`ErrorHandler`](crate::traits::ErrorHandler).

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

// --- Public Re-exports ---
pub use config::{BehaviorConfig, LimitsConfig, RuntimeConfig, TimeoutConfig, CONFIG};
pub use error::{BrokerError, ControllerError};
pub use error_handler::LogErrorHandler;
pub use logger::{NoopLogger, TracingLogger};

// --- Submodules ---

/// Defines the configuration system.
mod config;
/// Defines [`ControllerError`] and [`BrokerError`].
mod error;
/// Defines [`LogErrorHandler`].
mod error_handler;
/// Defines the built-in loggers.
mod logger;
