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

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::trace;

use crate::message::Envelope;
use crate::traits::CorrelatedMessage;

/// Reads the correlation identifier out of a candidate reply.
pub(crate) type Extractor = Arc<dyn Fn(&Envelope) -> Option<String> + Send + Sync>;

/// The reply type a wait expects and how to read its correlation identifier.
#[derive(Clone)]
pub(crate) struct ReplyKind {
    type_id: TypeId,
    extract: Extractor,
}

impl ReplyKind {
    /// Replies of type `R`: decode, then read the identifier.
    pub(crate) fn of<R: CorrelatedMessage>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            extract: Arc::new(|envelope: &Envelope| {
                R::from_envelope(envelope)
                    .ok()
                    .and_then(|reply| reply.correlation_id().map(str::to_owned))
            }),
        }
    }
}

struct PendingReply {
    type_id: TypeId,
    reply: oneshot::Sender<Envelope>,
}

/// The waits on one address. Extractors are shared by every wait of the same reply type and
/// counted so they leave with their last wait.
#[derive(Default)]
struct AddressWaits {
    kinds: HashMap<TypeId, (Extractor, usize)>,
    waits: HashMap<String, PendingReply>,
}

impl AddressWaits {
    fn insert(&mut self, id: &str, kind: ReplyKind, reply: oneshot::Sender<Envelope>) {
        let type_id = kind.type_id;
        if let Some(previous) = self
            .waits
            .insert(id.to_string(), PendingReply { type_id, reply })
        {
            self.release(previous.type_id);
        }
        self.kinds.entry(type_id).or_insert((kind.extract, 0)).1 += 1;
    }

    fn remove(&mut self, id: &str) -> Option<PendingReply> {
        let wait = self.waits.remove(id)?;
        self.release(wait.type_id);
        Some(wait)
    }

    fn release(&mut self, type_id: TypeId) {
        let unused = self.kinds.get_mut(&type_id).is_some_and(|(_, count)| {
            *count -= 1;
            *count == 0
        });
        if unused {
            self.kinds.remove(&type_id);
        }
    }
}

/// Pending reply waits, keyed by channel address and then by correlation identifier.
///
/// Dispatch loops [`offer`](Self::offer) every received envelope here before running the
/// pipeline. A match is removed and a copy of the envelope is sent to its waiter; the
/// original continues to the regular handler either way.
///
/// Waits on an address fail with a closed channel once the last dispatch loop observing that
/// address has ended.
#[derive(Default)]
pub(crate) struct ReplyWaiters {
    pending: DashMap<String, AddressWaits>,
    observers: DashMap<String, usize>,
}

impl ReplyWaiters {
    pub(crate) fn register(
        &self,
        address: &str,
        id: &str,
        kind: ReplyKind,
    ) -> oneshot::Receiver<Envelope> {
        let (reply, receiver) = oneshot::channel();
        self.pending
            .entry(address.to_string())
            .or_default()
            .insert(id, kind, reply);
        trace!(address, id, "Registered reply wait");
        receiver
    }

    pub(crate) fn deregister(&self, address: &str, id: &str) -> bool {
        let removed = self
            .pending
            .get_mut(address)
            .is_some_and(|mut waits| waits.remove(id).is_some());
        self.pending.remove_if(address, |_, waits| waits.waits.is_empty());
        removed
    }

    /// Hands a copy of `envelope` to the wait whose identifier it carries. Returns `true` on
    /// a match.
    ///
    /// Each reply type expected on the address decodes the envelope once, outside the map
    /// lock.
    pub(crate) fn offer(&self, address: &str, envelope: &Envelope) -> bool {
        let kinds: Vec<(TypeId, Extractor)> = match self.pending.get(address) {
            Some(waits) => waits
                .kinds
                .iter()
                .map(|(type_id, (extract, _))| (*type_id, extract.clone()))
                .collect(),
            None => return false,
        };
        let candidates: Vec<(TypeId, String)> = kinds
            .into_iter()
            .filter_map(|(type_id, extract)| extract(envelope).map(|id| (type_id, id)))
            .collect();
        if candidates.is_empty() {
            return false;
        }

        let matched = self.pending.get_mut(address).and_then(|mut waits| {
            candidates.into_iter().find_map(|(type_id, id)| {
                let expected = waits.waits.get(&id).is_some_and(|wait| wait.type_id == type_id);
                if expected {
                    waits.remove(&id).map(|wait| (id, wait))
                } else {
                    None
                }
            })
        });
        self.pending.remove_if(address, |_, waits| waits.waits.is_empty());

        match matched {
            Some((id, wait)) => {
                trace!(address, id = %id, "Reply matched pending wait");
                // The waiter may have given up in the meantime.
                let _ = wait.reply.send(envelope.clone());
                true
            }
            None => false,
        }
    }

    /// Records one more dispatch loop observing `address`.
    pub(crate) fn attach(&self, address: &str) {
        *self.observers.entry(address.to_string()).or_default() += 1;
    }

    /// Records the end of a dispatch loop. When it was the last one on `address`, every wait
    /// there is dropped so its receiver observes a closed channel.
    pub(crate) fn detach(&self, address: &str) {
        let last = self.observers.get_mut(address).is_some_and(|mut count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
        if !last {
            return;
        }
        self.observers.remove_if(address, |_, count| *count == 0);
        if let Some((_, waits)) = self.pending.remove(address) {
            trace!(address, count = waits.waits.len(), "Closed pending reply waits");
        }
    }

    pub(crate) fn pending_count(&self, address: &str) -> usize {
        self.pending.get(address).map_or(0, |waits| waits.waits.len())
    }
}

/// Removes a registered wait when the waiting future finishes or is dropped.
pub(crate) struct PendingGuard<'a> {
    waiters: &'a ReplyWaiters,
    address: &'a str,
    id: String,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(waiters: &'a ReplyWaiters, address: &'a str, id: String) -> Self {
        Self {
            waiters,
            address,
            id,
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.waiters.deregister(self.address, &self.id) {
            trace!(address = self.address, id = %self.id, "Deregistered unanswered reply wait");
        }
    }
}
