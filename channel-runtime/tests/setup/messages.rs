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
#![allow(unused)]

use std::collections::HashMap;

use channel_runtime::prelude::*;
use serde::{Deserialize, Serialize};

const CORRELATION_ID: &str = "correlationId";

fn headers(correlation_id: Option<&str>) -> HashMap<String, Vec<u8>> {
    correlation_id
        .map(|id| HashMap::from([(CORRELATION_ID.to_string(), id.as_bytes().to_vec())]))
        .unwrap_or_default()
}

fn correlation_id(envelope: &Envelope) -> Option<String> {
    envelope.header_str(CORRELATION_ID).map(str::to_owned)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
}

/// A request carrying its correlation identifier in a header.
#[derive(Debug, Clone, PartialEq)]
pub struct Ping {
    pub payload: Event,
    pub correlation_id: Option<String>,
}

impl Ping {
    pub fn new(event: &str) -> Self {
        Self {
            payload: Event {
                event: event.to_string(),
            },
            correlation_id: None,
        }
    }
}

impl ChannelMessage for Ping {
    fn to_envelope(&self) -> Result<Envelope, ControllerError> {
        encode_json(&self.payload, headers(self.correlation_id.as_deref()))
    }

    fn from_envelope(envelope: &Envelope) -> Result<Self, ControllerError> {
        Ok(Self {
            payload: decode_json(envelope)?,
            correlation_id: correlation_id(envelope),
        })
    }
}

impl CorrelatedMessage for Ping {
    fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    fn set_correlation_id(&mut self, id: String) {
        self.correlation_id = Some(id);
    }
}

/// The reply to a [`Ping`], echoing its correlation identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Pong {
    pub payload: Event,
    pub correlation_id: Option<String>,
}

impl Pong {
    pub fn answering(ping: &Ping) -> Self {
        Self::with_id(&format!("pong: {}", ping.payload.event), ping.correlation_id.as_deref())
    }

    pub fn with_id(event: &str, correlation_id: Option<&str>) -> Self {
        Self {
            payload: Event {
                event: event.to_string(),
            },
            correlation_id: correlation_id.map(str::to_owned),
        }
    }
}

impl ChannelMessage for Pong {
    fn to_envelope(&self) -> Result<Envelope, ControllerError> {
        encode_json(&self.payload, headers(self.correlation_id.as_deref()))
    }

    fn from_envelope(envelope: &Envelope) -> Result<Self, ControllerError> {
        Ok(Self {
            payload: decode_json(envelope)?,
            correlation_id: correlation_id(envelope),
        })
    }
}

impl CorrelatedMessage for Pong {
    fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    fn set_correlation_id(&mut self, id: String) {
        self.correlation_id = Some(id);
    }
}

/// A message with open-ended properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flags {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenFlags(pub OpenSchema<Flags>);

impl ChannelMessage for OpenFlags {
    fn to_envelope(&self) -> Result<Envelope, ControllerError> {
        encode_json(&self.0, HashMap::new())
    }

    fn from_envelope(envelope: &Envelope) -> Result<Self, ControllerError> {
        decode_json(envelope).map(Self)
    }
}
