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
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

use channel_runtime::prelude::*;
use parking_lot::Mutex;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub mod messages;

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for tests, writing to `logs/channel_tests.txt`.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "channel_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer is not dropped before process exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::new("trace")
            .add_directive("channel_runtime=trace".parse().unwrap())
            .add_directive("tokio=info".parse().unwrap())
            .add_directive(tracing_subscriber::filter::LevelFilter::TRACE.into());

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// Configuration with short timeouts so failing tests fail fast.
pub fn test_config() -> RuntimeConfig {
    RuntimeConfig::from_toml_str(
        r"
        [timeouts]
        reply_timeout_ms = 0
        close_timeout_ms = 1000
        ",
    )
    .expect("valid test config")
}

/// A builder on `broker` with the test configuration and a tracing logger.
pub fn controller_builder(broker: &MemoryBroker) -> ControllerBuilder {
    ControllerBuilder::new()
        .broker(broker.clone())
        .version("1.0.0")
        .logger(TracingLogger)
        .config(test_config())
}

/// One error-handler invocation.
#[derive(Debug, Clone)]
pub struct ReportedError {
    pub address: String,
    pub message: String,
    pub decode: bool,
}

/// An error handler that records what it receives.
#[derive(Clone, Default)]
pub struct ErrorRecorder {
    reported: Arc<Mutex<Vec<ReportedError>>>,
}

impl ErrorRecorder {
    pub fn reported(&self) -> Vec<ReportedError> {
        self.reported.lock().clone()
    }
}

impl ErrorHandler for ErrorRecorder {
    fn handle(
        &self,
        _ctx: &MessageContext,
        address: &str,
        envelope: &AcknowledgeableEnvelope,
        error: &ControllerError,
    ) {
        // Settlement belongs to the dispatch loop.
        assert!(envelope.outcome().is_none());
        self.reported.lock().push(ReportedError {
            address: address.to_string(),
            message: error.to_string(),
            decode: matches!(error, ControllerError::Decode(_)),
        });
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
