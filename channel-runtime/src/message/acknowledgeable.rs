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
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::{trace, warn};

use crate::message::Envelope;

const PENDING: u8 = 0;
const ACKNOWLEDGED: u8 = 1;
const REJECTED: u8 = 2;
const ABANDONED: u8 = 3;

/// Broker-side handle that receives the outcome of a delivered message.
///
/// Broker drivers implement this to translate [`AcknowledgeableEnvelope::acknowledge`] and
/// [`AcknowledgeableEnvelope::reject`] into their native ack/nak calls. The runtime guarantees
/// that at most one of the two methods is called per delivered envelope.
pub trait Acknowledger: Send + Sync + 'static {
    /// Signals successful processing.
    fn ack(&self);

    /// Signals failed processing. Redelivery policy is the broker's decision.
    fn nak(&self);
}

/// The settled outcome of an [`AcknowledgeableEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// [`AcknowledgeableEnvelope::acknowledge`] won.
    Acknowledged,
    /// [`AcknowledgeableEnvelope::reject`] won.
    Rejected,
}

/// An [`Envelope`] received from a broker together with its acknowledgment handle.
///
/// Exactly one outcome is recorded per envelope: the first call to either
/// [`acknowledge`](Self::acknowledge) or [`reject`](Self::reject) settles it and forwards the
/// signal to the broker's [`Acknowledger`]; every later call, of either kind, is a no-op that
/// returns `false`. Dropping an envelope that was never settled is logged as a warning since the
/// message stays unacknowledged at the broker.
///
/// Dereferences to the wrapped [`Envelope`].
pub struct AcknowledgeableEnvelope {
    envelope: Envelope,
    acknowledger: Option<Box<dyn Acknowledger>>,
    state: AtomicU8,
}

impl AcknowledgeableEnvelope {
    /// Wraps an envelope delivered by a broker that tracks acknowledgments.
    #[must_use]
    pub fn new(envelope: Envelope, acknowledger: impl Acknowledger) -> Self {
        Self {
            envelope,
            acknowledger: Some(Box::new(acknowledger)),
            state: AtomicU8::new(PENDING),
        }
    }

    /// Wraps an envelope from a broker without acknowledgment semantics.
    ///
    /// Outcomes are still recorded locally, they are just not forwarded anywhere.
    #[must_use]
    pub fn without_acknowledger(envelope: Envelope) -> Self {
        Self {
            envelope,
            acknowledger: None,
            state: AtomicU8::new(PENDING),
        }
    }

    /// The wrapped envelope.
    #[inline]
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Acknowledges the message. Returns `true` if this call settled the envelope.
    pub fn acknowledge(&self) -> bool {
        self.settle(ACKNOWLEDGED)
    }

    /// Rejects the message. Returns `true` if this call settled the envelope.
    pub fn reject(&self) -> bool {
        self.settle(REJECTED)
    }

    /// The recorded outcome, `None` while the envelope is still pending.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match self.state.load(Ordering::Acquire) {
            ACKNOWLEDGED => Some(Outcome::Acknowledged),
            REJECTED => Some(Outcome::Rejected),
            _ => None,
        }
    }

    /// Marks an envelope that never reached a consumer so that dropping it stays silent.
    pub(crate) fn abandon(self) {
        self.state.store(ABANDONED, Ordering::Release);
    }

    fn settle(&self, outcome: u8) -> bool {
        if self
            .state
            .compare_exchange(PENDING, outcome, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!(requested = outcome, "Envelope already settled, ignoring");
            return false;
        }

        if let Some(acknowledger) = &self.acknowledger {
            if outcome == ACKNOWLEDGED {
                acknowledger.ack();
            } else {
                acknowledger.nak();
            }
        }
        true
    }
}

impl Deref for AcknowledgeableEnvelope {
    type Target = Envelope;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.envelope
    }
}

impl Drop for AcknowledgeableEnvelope {
    fn drop(&mut self) {
        if self.acknowledger.is_some() && *self.state.get_mut() == PENDING {
            warn!(envelope = %self.envelope, "Envelope dropped without acknowledgment or rejection");
        }
    }
}

impl fmt::Debug for AcknowledgeableEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcknowledgeableEnvelope")
            .field("envelope", &self.envelope)
            .field("outcome", &self.outcome())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for AcknowledgeableEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.envelope.fmt(f)
    }
}
