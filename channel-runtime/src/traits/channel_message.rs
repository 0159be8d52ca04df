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
use crate::message::Envelope;

/// A typed message that travels on a channel.
///
/// Generated message types implement this trait to convert themselves to and from the
/// broker-neutral [`Envelope`]. The helpers in [`codec`](crate::codec) cover the usual
/// JSON payload plus flat header map layout.
///
/// Decoding must never panic: malformed input is reported as [`ControllerError::Decode`].
pub trait ChannelMessage: Sized + Send + 'static {
    /// Encodes the message into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Encode`] if the payload cannot be serialized.
    fn to_envelope(&self) -> Result<Envelope, ControllerError>;

    /// Decodes a message from an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Decode`] on malformed payload bytes.
    fn from_envelope(envelope: &Envelope) -> Result<Self, ControllerError>;
}

/// A message whose schema declares a correlation identifier.
///
/// Only these messages can take part in
/// [`Controller::wait_for_reply`](crate::controller::Controller::wait_for_reply). The identifier
/// is an opaque matching key: the requester sets it and the responder echoes it back.
pub trait CorrelatedMessage: ChannelMessage {
    /// The correlation identifier, if one has been set.
    fn correlation_id(&self) -> Option<&str>;

    /// Stamps a correlation identifier onto the message.
    fn set_correlation_id(&mut self, id: String);
}
