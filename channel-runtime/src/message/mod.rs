//! Defines the message structures that flow between controllers and brokers.
//!
//! # Key Components
//!
//! *   [`Envelope`]: the broker-neutral message, a flat header map plus payload bytes.
//! *   [`AcknowledgeableEnvelope`]: an envelope received from a broker together with its
//!     [`Acknowledger`], settled exactly once through `acknowledge` or `reject`.
//! *   [`MessageContext`]: read-only metadata (address, [`Direction`], provider, rendered
//!     envelope) attached to every message for middleware, loggers and error handlers.

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
pub use acknowledgeable::{AcknowledgeableEnvelope, Acknowledger, Outcome};
pub use envelope::Envelope;
pub use message_context::{Direction, MessageContext};

// --- Submodules ---

/// Defines [`AcknowledgeableEnvelope`] and the [`Acknowledger`] capability.
mod acknowledgeable;
/// Defines [`Envelope`].
mod envelope;
/// Defines [`MessageContext`] and [`Direction`].
mod message_context;
