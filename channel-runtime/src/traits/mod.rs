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

//! Defines the capability traits at the seams of the runtime.
//!
//! *   [`BrokerController`]: what a controller needs from a message broker.
//! *   [`ChannelMessage`] / [`CorrelatedMessage`]: typed message ⇄ envelope conversion.
//! *   [`Middleware`]: a stage of the message pipeline.
//! *   [`Logger`]: lifecycle and failure reporting.
//! *   [`ErrorHandler`]: sink for failures inside dispatch loops.

pub use broker::BrokerController;
pub use channel_message::{ChannelMessage, CorrelatedMessage};
pub use error_handler::ErrorHandler;
pub use logger::Logger;
pub use middleware::Middleware;

mod broker;
mod channel_message;
mod error_handler;
mod logger;
mod middleware;
