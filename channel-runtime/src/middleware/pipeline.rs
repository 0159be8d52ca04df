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

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::trace;

use crate::common::ControllerError;
use crate::message::{Envelope, MessageContext};
use crate::traits::Middleware;

type Terminal<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<(), ControllerError>> + Send + 'a>;

/// An ordered list of [`Middleware`] run in front of a terminal callback.
///
/// The pipeline itself is stateless: every [`execute`](Self::execute) builds a fresh chain
/// with one "entered" flag per stage, so it can be shared by every dispatch loop of a
/// controller and run concurrently.
///
/// For a single execution:
///
/// * each middleware and the terminal callback are entered at most once, in declared order;
/// * a middleware that calls [`Next::run`] runs the rest of the chain right there;
/// * a middleware that returns `Ok(())` without calling `next` does not stop the chain, the
///   pipeline continues with the following stage;
/// * a middleware that returns an error stops the chain, later stages do not run.
#[derive(Clone, Default)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    /// Creates a pipeline running `middlewares` in the given order.
    #[must_use]
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middlewares }
    }

    /// Number of middleware stages, not counting the terminal callback.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// `true` when the terminal callback runs directly.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs the middleware chain and then `terminal` for one envelope.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a middleware or by `terminal`.
    pub async fn execute<'a, F, Fut>(
        &'a self,
        ctx: &'a MessageContext,
        envelope: &'a Envelope,
        terminal: F,
    ) -> Result<(), ControllerError>
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<(), ControllerError>> + Send + 'a,
    {
        let terminal: Terminal<'a> = Box::new(move || terminal().boxed());
        let chain = Chain {
            middlewares: &self.middlewares,
            entered: (0..=self.middlewares.len())
                .map(|_| AtomicBool::new(false))
                .collect(),
            terminal: Mutex::new(Some(terminal)),
            ctx,
            envelope,
        };
        chain.run_from(0).await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// The continuation handed to a [`Middleware`].
///
/// Calling [`run`](Self::run) executes every remaining stage, terminal callback included.
/// `Next` is consumed by `run`, and a stage that was already entered is skipped with
/// `Ok(())`, so the downstream chain can never execute twice.
pub struct Next<'c> {
    chain: &'c (dyn Stages + 'c),
    index: usize,
}

impl Next<'_> {
    /// Runs the rest of the chain.
    ///
    /// # Errors
    ///
    /// Returns the first error raised downstream.
    pub async fn run(self) -> Result<(), ControllerError> {
        self.chain.run_from(self.index).await
    }

    /// Number of stages left after the current middleware, terminal callback included.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.stage_count() - self.index
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("index", &self.index).finish()
    }
}

trait Stages: Send + Sync {
    fn run_from(&self, index: usize) -> BoxFuture<'_, Result<(), ControllerError>>;

    fn stage_count(&self) -> usize;
}

struct Chain<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    // One flag per middleware plus the terminal callback.
    entered: Vec<AtomicBool>,
    terminal: Mutex<Option<Terminal<'a>>>,
    ctx: &'a MessageContext,
    envelope: &'a Envelope,
}

impl Chain<'_> {
    fn enter(&self, index: usize) -> bool {
        !self.entered[index].swap(true, Ordering::AcqRel)
    }
}

impl Stages for Chain<'_> {
    fn run_from(&self, index: usize) -> BoxFuture<'_, Result<(), ControllerError>> {
        async move {
            let mut index = index;
            while index < self.middlewares.len() {
                if !self.enter(index) {
                    trace!(stage = index, "Middleware already entered, skipping");
                    return Ok(());
                }
                let next = Next { chain: self, index: index + 1 };
                self.middlewares[index]
                    .handle(self.ctx, self.envelope, next)
                    .await?;
                // Continue with the following stage; it is a no-op if `next` already ran it.
                index += 1;
            }

            if !self.enter(index) {
                return Ok(());
            }
            let terminal = self.terminal.lock().take();
            match terminal {
                Some(terminal) => terminal().await,
                None => Ok(()),
            }
        }
        .boxed()
    }

    fn stage_count(&self) -> usize {
        self.middlewares.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::message::Direction;

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Copy)]
    enum Behavior {
        CallNext,
        SkipNext,
        FailBeforeNext,
        FailAfterNext,
        CallNextSwallowError,
    }

    struct Recording {
        name: String,
        log: Log,
        behavior: Behavior,
    }

    #[async_trait]
    impl Middleware for Recording {
        async fn handle(
            &self,
            _ctx: &MessageContext,
            _envelope: &Envelope,
            next: Next<'_>,
        ) -> Result<(), ControllerError> {
            self.log.lock().push(self.name.clone());
            match self.behavior {
                Behavior::CallNext => next.run().await,
                Behavior::SkipNext => Ok(()),
                Behavior::FailBeforeNext => Err(anyhow::anyhow!("{} failed", self.name).into()),
                Behavior::FailAfterNext => {
                    next.run().await?;
                    Err(anyhow::anyhow!("{} failed late", self.name).into())
                }
                Behavior::CallNextSwallowError => {
                    let _ = next.run().await;
                    Ok(())
                }
            }
        }
    }

    fn recording(name: &str, log: &Log, behavior: Behavior) -> Arc<dyn Middleware> {
        Arc::new(Recording {
            name: name.to_string(),
            log: log.clone(),
            behavior,
        })
    }

    fn context() -> MessageContext {
        MessageContext::new("test", Direction::Reception, "app", "")
    }

    async fn run(pipeline: &Pipeline, log: &Log) -> Result<(), ControllerError> {
        let ctx = context();
        let envelope = Envelope::from_payload("{}");
        let log = log.clone();
        pipeline
            .execute(&ctx, &envelope, move || async move {
                log.lock().push("terminal".to_string());
                Ok::<(), ControllerError>(())
            })
            .await
    }

    #[tokio::test]
    async fn every_stage_runs_once_in_order() {
        for n in 0..6 {
            for behavior in [Behavior::CallNext, Behavior::SkipNext] {
                let log = Log::default();
                let middlewares = (0..n)
                    .map(|i| recording(&format!("m{i}"), &log, behavior))
                    .collect();
                let pipeline = Pipeline::new(middlewares);

                run(&pipeline, &log).await.expect("pipeline succeeds");

                let mut expected: Vec<String> = (0..n).map(|i| format!("m{i}")).collect();
                expected.push("terminal".to_string());
                assert_eq!(*log.lock(), expected, "n = {n}");
            }
        }
    }

    #[tokio::test]
    async fn error_before_next_stops_the_chain() {
        let log = Log::default();
        let pipeline = Pipeline::new(vec![
            recording("first", &log, Behavior::CallNext),
            recording("failing", &log, Behavior::FailBeforeNext),
            recording("never", &log, Behavior::CallNext),
        ]);

        let err = run(&pipeline, &log).await.expect_err("pipeline fails");

        assert_eq!(err.to_string(), "failing failed");
        assert_eq!(*log.lock(), vec!["first", "failing"]);
    }

    #[tokio::test]
    async fn error_after_next_keeps_terminal_single() {
        let log = Log::default();
        let pipeline = Pipeline::new(vec![
            recording("late", &log, Behavior::FailAfterNext),
            recording("inner", &log, Behavior::SkipNext),
        ]);

        let err = run(&pipeline, &log).await.expect_err("pipeline fails");

        assert_eq!(err.to_string(), "late failed late");
        assert_eq!(*log.lock(), vec!["late", "inner", "terminal"]);
    }

    #[tokio::test]
    async fn swallowed_downstream_error_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let log = Log::default();
        let pipeline = Pipeline::new(vec![recording("swallow", &log, Behavior::CallNextSwallowError)]);
        let ctx = context();
        let envelope = Envelope::from_payload("{}");

        let counter = calls.clone();
        let result = pipeline
            .execute(&ctx, &envelope, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ControllerError::from(anyhow::anyhow!("handler failed")))
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn next_reports_remaining_stages() {
        struct Probe(Arc<Mutex<Vec<usize>>>);

        #[async_trait]
        impl Middleware for Probe {
            async fn handle(
                &self,
                _ctx: &MessageContext,
                _envelope: &Envelope,
                next: Next<'_>,
            ) -> Result<(), ControllerError> {
                self.0.lock().push(next.remaining());
                next.run().await
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            Arc::new(Probe(seen.clone())),
            Arc::new(Probe(seen.clone())),
        ]);
        run(&pipeline, &Log::default()).await.expect("pipeline succeeds");

        assert_eq!(*seen.lock(), vec![2, 1]);
    }
}
