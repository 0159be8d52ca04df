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

use std::collections::HashMap;
use std::fmt;

/// The broker-neutral representation of a message: a flat header map plus payload bytes.
///
/// An `Envelope` is produced by encoding a typed message (see
/// [`ChannelMessage::to_envelope`](crate::traits::ChannelMessage::to_envelope)) and consumed by
/// decoding it back. Once built it cannot be modified; headers and payload are only exposed
/// through shared references.
///
/// The [`Display`](fmt::Display) rendering is the form attached to a
/// [`MessageContext`](crate::message::MessageContext) for observability. Header keys are
/// rendered in sorted order so that the output is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    headers: HashMap<String, Vec<u8>>,
    payload: Vec<u8>,
}

impl Envelope {
    /// Creates an envelope from an explicit header map and payload.
    #[must_use]
    pub fn new(headers: HashMap<String, Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            headers,
            payload: payload.into(),
        }
    }

    /// Creates an envelope with an empty header map.
    #[must_use]
    pub fn from_payload(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(HashMap::new(), payload)
    }

    /// Returns a copy of this envelope with one more header set.
    ///
    /// Construction helper; an existing value under the same key is replaced.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// The header map. Empty (never absent) when the message declares no headers.
    #[inline]
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, Vec<u8>> {
        &self.headers
    }

    /// Raw bytes of a single header.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers.get(key).map(Vec::as_slice)
    }

    /// A single header decoded as UTF-8, `None` if missing or not valid UTF-8.
    #[must_use]
    pub fn header_str(&self, key: &str) -> Option<&str> {
        self.header(key).and_then(|value| std::str::from_utf8(value).ok())
    }

    /// The encoded payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Splits the envelope into its header map and payload.
    #[must_use]
    pub fn into_parts(self) -> (HashMap<String, Vec<u8>>, Vec<u8>) {
        (self.headers, self.payload)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.headers.keys().collect();
        keys.sort();

        write!(f, "headers: {{")?;
        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {}", String::from_utf8_lossy(&self.headers[key]))?;
        }
        write!(f, "}}, payload: {}", String::from_utf8_lossy(&self.payload))
    }
}
