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

use std::sync::Arc;

use async_trait::async_trait;

use crate::common::{ControllerError, TracingLogger};
use crate::message::{Envelope, MessageContext};
use crate::middleware::Next;
use crate::traits::{Logger, Middleware};

/// Logs every message passing through the pipeline, and the error if the rest of the chain
/// fails.
pub struct LoggingMiddleware {
    logger: Arc<dyn Logger>,
}

impl LoggingMiddleware {
    /// Logs through `logger`.
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new(Arc::new(TracingLogger))
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(
        &self,
        ctx: &MessageContext,
        _envelope: &Envelope,
        next: Next<'_>,
    ) -> Result<(), ControllerError> {
        self.logger.info(ctx, &format!("Processing {} message", ctx.direction()));
        let result = next.run().await;
        if let Err(error) = &result {
            self.logger.warn(ctx, &format!("Message processing failed: {error}"));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::message::Direction;
    use crate::middleware::Pipeline;

    #[derive(Default)]
    struct Captured(Mutex<Vec<(String, String)>>);

    impl Logger for Captured {
        fn info(&self, _ctx: &MessageContext, message: &str) {
            self.0.lock().push(("info".into(), message.into()));
        }

        fn warn(&self, _ctx: &MessageContext, message: &str) {
            self.0.lock().push(("warn".into(), message.into()));
        }

        fn error(&self, _ctx: &MessageContext, message: &str) {
            self.0.lock().push(("error".into(), message.into()));
        }
    }

    #[tokio::test]
    async fn logs_message_and_downstream_failure() {
        let captured = Arc::new(Captured::default());
        let pipeline = Pipeline::new(vec![Arc::new(LoggingMiddleware::new(captured.clone()))]);
        let ctx = MessageContext::new("orders", Direction::Reception, "app", "1.0.0");
        let envelope = Envelope::from_payload("{}");

        let result = pipeline
            .execute(&ctx, &envelope, || async {
                Err(ControllerError::from(anyhow::anyhow!("handler exploded")))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(
            *captured.0.lock(),
            vec![
                ("info".to_string(), "Processing reception message".to_string()),
                ("warn".to_string(), "Message processing failed: handler exploded".to_string()),
            ]
        );
    }
}
