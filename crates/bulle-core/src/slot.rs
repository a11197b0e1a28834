use std::collections::HashMap;
use std::sync::Arc;

use bulle_translator::{TranslateError, Translator};
use bulle_types::ResolvedPair;

/// A translator handed out for exactly one call; return it with [`TranslatorSlot::finish`]
#[derive(Clone)]
pub struct Lease {
    pub generation: u64,
    pub translator: Arc<dyn Translator>,
}

pub enum Acquire<W> {
    /// A configured translator is available for the work
    Ready(Lease, W),
    /// The work waits on a configuration already being created
    Queued,
    /// The work waits on a new configuration the caller must create
    Configure { generation: u64, pair: ResolvedPair },
}

pub enum Configured<W> {
    /// Leases for every piece of work that was waiting
    Ready(Vec<(Lease, W)>),
    Failed {
        error: TranslateError,
        waiting: Vec<W>,
    },
    /// Nobody waits for this configuration any more; the translator was closed
    Stale,
}

struct Entry {
    generation: u64,
    pair: ResolvedPair,
    translator: Arc<dyn Translator>,
    in_flight: usize,
}

impl Entry {
    fn lease(&mut self) -> Lease {
        self.in_flight += 1;
        Lease {
            generation: self.generation,
            translator: self.translator.clone(),
        }
    }
}

struct PendingConfig<W> {
    pair: ResolvedPair,
    waiting: Vec<W>,
    /// The pair changed while this configuration was being created
    invalidated: bool,
}

/// Owner of the shared translator.
///
/// Only the control loop touches the slot, so reconfiguration is serialized
/// with every call it hands out. A translator that is replaced while calls
/// are still running is parked and closed once the last of them finishes.
pub struct TranslatorSlot<W> {
    active: Option<Entry>,
    pending: HashMap<u64, PendingConfig<W>>,
    retired: HashMap<u64, Entry>,
    next_generation: u64,
}

impl<W> Default for TranslatorSlot<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> TranslatorSlot<W> {
    pub fn new() -> Self {
        Self {
            active: None,
            pending: HashMap::new(),
            retired: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Get a translator for `pair`, or queue `work` until one is configured
    pub fn acquire(&mut self, pair: &ResolvedPair, work: W) -> Acquire<W> {
        if self
            .active
            .as_ref()
            .is_some_and(|entry| entry.translator.is_closed())
        {
            tracing::debug!("[SLOT] active translator closed itself, retiring");
            self.retire_active();
        }

        if let Some(entry) = self.active.as_mut()
            && entry.pair == *pair
        {
            return Acquire::Ready(entry.lease(), work);
        }

        if let Some(pending) = self
            .pending
            .values_mut()
            .find(|pending| !pending.invalidated && pending.pair == *pair)
        {
            pending.waiting.push(work);
            return Acquire::Queued;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        tracing::debug!("[SLOT] configuring translator {} for {}", generation, pair);
        self.pending.insert(
            generation,
            PendingConfig {
                pair: pair.clone(),
                waiting: vec![work],
                invalidated: false,
            },
        );
        Acquire::Configure {
            generation,
            pair: pair.clone(),
        }
    }

    /// Deliver the outcome of creating configuration `generation`
    pub fn configured(
        &mut self,
        generation: u64,
        result: Result<Arc<dyn Translator>, TranslateError>,
    ) -> Configured<W> {
        let Some(pending) = self.pending.remove(&generation) else {
            if let Ok(translator) = result {
                translator.close();
            }
            return Configured::Stale;
        };

        let translator = match result {
            Ok(translator) => translator,
            Err(error) => {
                return Configured::Failed {
                    error,
                    waiting: pending.waiting,
                };
            }
        };

        let mut entry = Entry {
            generation,
            pair: pending.pair,
            translator,
            in_flight: 0,
        };
        let leases: Vec<(Lease, W)> = pending
            .waiting
            .into_iter()
            .map(|work| (entry.lease(), work))
            .collect();

        if pending.invalidated {
            // Serves the work that was waiting on it, then goes away
            self.park(entry);
        } else {
            self.retire_active();
            self.active = Some(entry);
        }

        Configured::Ready(leases)
    }

    /// One call made with a lease of `generation` has completed
    pub fn finish(&mut self, generation: u64) {
        if let Some(entry) = self.active.as_mut()
            && entry.generation == generation
        {
            entry.in_flight = entry.in_flight.saturating_sub(1);
            return;
        }

        let drained = match self.retired.get_mut(&generation) {
            Some(entry) => {
                entry.in_flight = entry.in_flight.saturating_sub(1);
                entry.in_flight == 0
            }
            None => false,
        };
        if drained && let Some(entry) = self.retired.remove(&generation) {
            tracing::debug!("[SLOT] closing drained translator {}", generation);
            entry.translator.close();
        }
    }

    /// The translator of `generation` reported itself closed
    pub fn invalidate(&mut self, generation: u64) {
        if self
            .active
            .as_ref()
            .is_some_and(|entry| entry.generation == generation)
        {
            tracing::debug!("[SLOT] translator {} invalidated", generation);
            self.retire_active();
        }
    }

    /// The language pair changed; nothing configured so far is reused
    pub fn invalidate_all(&mut self) {
        self.retire_active();
        for pending in self.pending.values_mut() {
            pending.invalidated = true;
        }
    }

    /// Close every translator, including ones with calls still running
    pub fn shutdown(&mut self) {
        if let Some(entry) = self.active.take() {
            entry.translator.close();
        }
        for (_, entry) in self.retired.drain() {
            entry.translator.close();
        }
        self.pending.clear();
    }

    pub fn active_generation(&self) -> Option<u64> {
        self.active.as_ref().map(|entry| entry.generation)
    }

    pub fn active_pair(&self) -> Option<&ResolvedPair> {
        self.active.as_ref().map(|entry| &entry.pair)
    }

    /// Replaced translators still waiting for calls to drain
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn retire_active(&mut self) {
        if let Some(entry) = self.active.take() {
            self.park(entry);
        }
    }

    fn park(&mut self, entry: Entry) {
        if entry.in_flight == 0 {
            entry.translator.close();
        } else {
            self.retired.insert(entry.generation, entry);
        }
    }
}
