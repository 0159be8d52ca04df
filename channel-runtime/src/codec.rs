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

//! JSON helpers for implementing [`ChannelMessage`](crate::traits::ChannelMessage).
//!
//! Generated message types carry a payload serialized as JSON and an optional set of headers
//! stored as flat string-keyed byte values. [`encode_json`] and [`decode_json`] cover the
//! payload half; header values are plain UTF-8 strings written with [`Envelope::with_header`]
//! and read back with [`Envelope::header_str`].
//!
//! Schemas that allow additional properties wrap their named fields in [`OpenSchema`], which
//! keeps every unrecognized key in a side map so that a decode/encode round trip loses nothing.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::common::ControllerError;
use crate::message::Envelope;

/// Serializes `payload` to JSON and wraps it with `headers`.
///
/// # Errors
///
/// Returns [`ControllerError::Encode`] if `payload` cannot be serialized.
pub fn encode_json<P>(payload: &P, headers: HashMap<String, Vec<u8>>) -> Result<Envelope, ControllerError>
where
    P: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(payload).map_err(ControllerError::Encode)?;
    Ok(Envelope::new(headers, bytes))
}

/// Deserializes the JSON payload of `envelope`.
///
/// # Errors
///
/// Returns [`ControllerError::Decode`] on malformed or mismatched payload bytes.
pub fn decode_json<P>(envelope: &Envelope) -> Result<P, ControllerError>
where
    P: DeserializeOwned,
{
    serde_json::from_slice(envelope.payload()).map_err(ControllerError::Decode)
}

/// A schema with statically known fields plus open-ended additional properties.
///
/// On decode, keys named by `T` populate `fields` and everything else lands in
/// `additional_properties`. On encode, the named fields are emitted first, followed by the
/// additional pairs. Key order among additional pairs is not preserved.
///
/// `T` must not use `#[serde(deny_unknown_fields)]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenSchema<T> {
    /// The statically known fields.
    #[serde(flatten)]
    pub fields: T,
    /// Every key not named by `T`.
    #[serde(flatten)]
    pub additional_properties: HashMap<String, serde_json::Value>,
}

impl<T> OpenSchema<T> {
    /// Wraps `fields` with no additional properties.
    pub fn new(fields: T) -> Self {
        Self {
            fields,
            additional_properties: HashMap::new(),
        }
    }

    /// Adds one additional property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.additional_properties.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TestMap {
        property: Option<String>,
    }

    #[test]
    fn decode_reports_malformed_payload() {
        let envelope = Envelope::from_payload(b"{not json".to_vec());
        let result = decode_json::<TestMap>(&envelope);
        assert!(matches!(result, Err(ControllerError::Decode(_))));
    }

    #[test]
    fn encode_keeps_explicit_empty_headers() {
        let envelope = encode_json(&TestMap::default(), HashMap::new()).expect("encodes");
        assert!(envelope.headers().is_empty());
        assert_eq!(envelope.payload(), br#"{"property":null}"#);
    }

    #[test]
    fn additional_properties_round_trip() {
        let raw = br#"{"zeta":"z","property":"named","alpha":"a"}"#.to_vec();
        let decoded: OpenSchema<TestMap> =
            decode_json(&Envelope::from_payload(raw)).expect("decodes");

        assert_eq!(decoded.fields.property.as_deref(), Some("named"));
        assert_eq!(decoded.additional_properties.len(), 2);
        assert_eq!(decoded.additional_properties["alpha"], "a");
        assert_eq!(decoded.additional_properties["zeta"], "z");

        let encoded = encode_json(&decoded, HashMap::new()).expect("encodes");
        let again: OpenSchema<TestMap> = decode_json(&encoded).expect("decodes again");
        assert_eq!(again, decoded);
    }

    #[test]
    fn named_fields_are_emitted_first() {
        let schema = OpenSchema::new(TestMap {
            property: Some("p".to_string()),
        })
        .with_property("extra", "e");

        let encoded = encode_json(&schema, HashMap::new()).expect("encodes");
        assert_eq!(encoded.payload(), br#"{"property":"p","extra":"e"}"#);
    }
}
