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

//! Custom middleware around publication and reception, with a failing handler reported to a
//! closure error handler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use channel_runtime::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Order {
    id: u32,
    quantity: u32,
}

impl ChannelMessage for Order {
    fn to_envelope(&self) -> Result<Envelope, ControllerError> {
        encode_json(self, Default::default())
    }

    fn from_envelope(envelope: &Envelope) -> Result<Self, ControllerError> {
        decode_json(envelope)
    }
}

/// Reports how long the rest of the chain took.
struct Timing;

#[async_trait]
impl Middleware for Timing {
    async fn handle(
        &self,
        ctx: &MessageContext,
        _envelope: &Envelope,
        next: Next<'_>,
    ) -> Result<(), ControllerError> {
        let started = Instant::now();
        let result = next.run().await;
        println!(
            "[{}] {} took {:?}",
            ctx.direction(),
            ctx.address(),
            started.elapsed()
        );
        result
    }
}

/// Refuses to publish empty orders.
struct RejectEmpty;

#[async_trait]
impl Middleware for RejectEmpty {
    async fn handle(
        &self,
        ctx: &MessageContext,
        envelope: &Envelope,
        next: Next<'_>,
    ) -> Result<(), ControllerError> {
        if ctx.direction() == Direction::Publication {
            let order: Order = decode_json(envelope)?;
            if order.quantity == 0 {
                return Err(anyhow::anyhow!("order {} has no items", order.id).into());
            }
        }
        next.run().await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let failures = Arc::new(AtomicUsize::new(0));
    let counted = failures.clone();
    let controller = ControllerBuilder::new()
        .broker(MemoryBroker::new())
        .middleware(Timing)
        .middleware(RejectEmpty)
        .middleware(LoggingMiddleware::default())
        .error_handler(
            move |_ctx: &MessageContext,
                  address: &str,
                  envelope: &AcknowledgeableEnvelope,
                  error: &ControllerError| {
                counted.fetch_add(1, Ordering::SeqCst);
                println!("handler failed on {address}: {error} ({envelope})");
            },
        )
        .close_broker(true)
        .build()?;

    controller
        .subscribe_to_channel("orders", |_ctx, order: Order| async move {
            if order.id % 2 == 0 {
                anyhow::bail!("cannot ship order {}", order.id);
            }
            println!("shipping order {}", order.id);
            anyhow::Ok(())
        })
        .await?;

    for id in 1..=4 {
        controller
            .send_to_channel("orders", &Order { id, quantity: 1 })
            .await?;
    }
    if let Err(error) = controller
        .send_to_channel("orders", &Order { id: 5, quantity: 0 })
        .await
    {
        println!("not published: {error}");
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("{} orders failed", failures.load(Ordering::SeqCst));
    controller.close().await?;
    Ok(())
}
