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
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::DropGuard;
use tracing::{error, trace, warn};

/// One live channel subscription: the cancellation of its broker stream and the dispatch
/// task consuming it.
///
/// Dropping the entry cancels the stream; the task then exits on its own.
pub(crate) struct ActiveSubscription {
    address: String,
    cancel: DropGuard,
    task: JoinHandle<()>,
}

impl ActiveSubscription {
    pub(crate) fn new(address: impl Into<String>, cancel: DropGuard, task: JoinHandle<()>) -> Self {
        Self {
            address: address.into(),
            cancel,
            task,
        }
    }

    /// Cancels the stream and joins the dispatch task.
    ///
    /// An in-flight envelope is allowed to finish. With a `timeout`, a task still running
    /// when it elapses is aborted. Returns `false` in that case.
    pub(crate) async fn shutdown(self, timeout: Option<Duration>) -> bool {
        let Self {
            address,
            cancel,
            mut task,
        } = self;
        drop(cancel);

        let joined = match timeout {
            Some(after) => match tokio::time::timeout(after, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    warn!(address = %address, ?after, "Dispatch task did not stop in time, aborted");
                    return false;
                }
            },
            None => (&mut task).await,
        };

        if let Err(e) = joined {
            error!(address = %address, error = %e, "Dispatch task ended abnormally");
        }
        trace!(address = %address, "Dispatch task joined");
        true
    }
}

/// Address-keyed table of the subscriptions a controller owns.
///
/// Callers must not subscribe and unsubscribe the same address concurrently; the lock only
/// keeps the table itself consistent.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    entries: Mutex<HashMap<String, ActiveSubscription>>,
}

impl SubscriptionRegistry {
    pub(crate) fn contains(&self, address: &str) -> bool {
        self.entries.lock().contains_key(address)
    }

    /// Inserts `subscription` unless the address is taken, in which case it is handed back.
    pub(crate) fn insert(&self, subscription: ActiveSubscription) -> Result<(), ActiveSubscription> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&subscription.address) {
            return Err(subscription);
        }
        entries.insert(subscription.address.clone(), subscription);
        Ok(())
    }

    pub(crate) fn remove(&self, address: &str) -> Option<ActiveSubscription> {
        self.entries.lock().remove(address)
    }

    pub(crate) fn drain(&self) -> Vec<ActiveSubscription> {
        self.entries.lock().drain().map(|(_, entry)| entry).collect()
    }

    pub(crate) fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.entries.lock().keys().cloned().collect();
        addresses.sort_unstable();
        addresses
    }
}
