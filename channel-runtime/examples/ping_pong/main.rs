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

//! A user-side controller asks an app-side controller for a reply over an in-memory broker.

use std::collections::HashMap;

use channel_runtime::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Payload {
    text: String,
}

// Generated message types look like this: a payload plus a correlation header.
#[derive(Debug, Clone)]
struct Message {
    payload: Payload,
    correlation_id: Option<String>,
}

impl Message {
    fn new(text: impl Into<String>) -> Self {
        Self {
            payload: Payload { text: text.into() },
            correlation_id: None,
        }
    }
}

impl ChannelMessage for Message {
    fn to_envelope(&self) -> Result<Envelope, ControllerError> {
        let headers = self
            .correlation_id
            .as_ref()
            .map(|id| HashMap::from([("correlationId".to_string(), id.as_bytes().to_vec())]))
            .unwrap_or_default();
        encode_json(&self.payload, headers)
    }

    fn from_envelope(envelope: &Envelope) -> Result<Self, ControllerError> {
        Ok(Self {
            payload: decode_json(envelope)?,
            correlation_id: envelope.header_str("correlationId").map(str::to_owned),
        })
    }
}

impl CorrelatedMessage for Message {
    fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    fn set_correlation_id(&mut self, id: String) {
        self.correlation_id = Some(id);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // both sides share one broker; the user side owns it and closes it at the end
    let broker = MemoryBroker::new();

    let app = ControllerBuilder::new()
        .broker(broker.clone())
        .provider("app")
        .logger(TracingLogger)
        .build()?;
    let replier = broker.clone();
    app.subscribe_to_channel("ping", move |_ctx, ping: Message| {
        let replier = replier.clone();
        async move {
            let mut pong = Message::new(format!("pong to {}", ping.payload.text));
            // echo the correlation id so the requester can match the reply
            pong.correlation_id = ping.correlation_id;
            replier.publish("pong", pong.to_envelope()?).await?;
            anyhow::Ok(())
        }
    })
    .await?;

    let user = ControllerBuilder::new()
        .broker(broker)
        .provider("user")
        .logger(TracingLogger)
        .close_broker(true)
        .build()?;
    let sender = &user;
    let cancel = CancellationToken::new();
    let reply: Message = user
        .wait_for_reply("pong", &cancel, Message::new("hello"), move |ping: Message| async move {
            sender.send_to_channel("ping", &ping).await
        })
        .await?;

    println!(
        "Got {:?} (correlation id {})",
        reply.payload.text,
        reply.correlation_id.unwrap_or_default()
    );

    app.close().await?;
    user.close().await?;
    Ok(())
}
