//! In-flight registry for the data-service engine.
//!
//! Tracks one [`ExecutionRecord`] per outstanding backing-store call. Commands
//! carrying the same coalescing key attach to the existing record instead of
//! starting a new call; when the call completes the record is removed and the
//! outcome is delivered to every attached caller.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::types::command::ServiceCommand;

/// Completion sink of one waiting caller.
pub type Sink<T> = oneshot::Sender<T>;

/// Identifier of an execution record, unique per registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionId(u64);

/// A caller attached to a record. `None` stands for the record's own command.
struct Waiter<C, T> {
    command: Option<C>,
    sink: Sink<T>,
}

/// Bookkeeping for one in-flight command.
pub struct ExecutionRecord<C: ServiceCommand, T> {
    command: C,
    key: Option<C::Key>,
    waiters: Vec<Waiter<C, T>>,
    started: Instant,
}

impl<C: ServiceCommand, T: Clone> ExecutionRecord<C, T> {
    pub fn command(&self) -> &C {
        &self.command
    }

    /// Number of callers attached to this record.
    pub fn waiters(&self) -> usize {
        self.waiters.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Delivers `value` to every attached caller, returning how many were still
    /// listening. Callers that went away are skipped.
    pub fn resolve(self, value: T) -> usize {
        self.resolve_with(value, |_, shared| shared.clone())
    }

    /// Like [`resolve`](Self::resolve), but each caller receives
    /// `shape(command, &value)` computed from the command it submitted.
    pub fn resolve_with<F>(self, value: T, mut shape: F) -> usize
    where
        F: FnMut(&C, &T) -> T,
    {
        let mut delivered = 0;
        for waiter in self.waiters {
            let command = waiter.command.as_ref().unwrap_or(&self.command);
            if waiter.sink.send(shape(command, &value)).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

/// Table of in-flight executions, keyed by id and by coalescing key.
pub struct InFlightRegistry<C: ServiceCommand, T> {
    next_id: u64,
    by_key: HashMap<C::Key, ExecutionId>,
    records: HashMap<ExecutionId, ExecutionRecord<C, T>>,
}

impl<C: ServiceCommand, T: Clone> InFlightRegistry<C, T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            by_key: HashMap::new(),
            records: HashMap::new(),
        }
    }

    /// Attaches `command` and its `sink` to the record executing `key`, if
    /// there is one. Hands both back when nothing equivalent is in flight.
    pub fn join(
        &mut self,
        key: &C::Key,
        command: C,
        sink: Sink<T>,
    ) -> Result<ExecutionId, (C, Sink<T>)> {
        let Some(id) = self.by_key.get(key).copied() else {
            return Err((command, sink));
        };
        match self.records.get_mut(&id) {
            Some(record) => {
                record.waiters.push(Waiter {
                    command: Some(command),
                    sink,
                });
                Ok(id)
            }
            None => Err((command, sink)),
        }
    }

    /// Opens a record for a command that is about to hit the backing store.
    pub fn open(&mut self, command: C, sink: Sink<T>) -> ExecutionId {
        let id = ExecutionId(self.next_id);
        self.next_id += 1;

        let key = command.coalescing_key();
        if let Some(key) = &key {
            self.by_key.insert(key.clone(), id);
        }
        self.records.insert(
            id,
            ExecutionRecord {
                command,
                key,
                waiters: vec![Waiter {
                    command: None,
                    sink,
                }],
                started: Instant::now(),
            },
        );
        id
    }

    /// Removes and returns the record for `id`, freeing its key for new work.
    pub fn complete(&mut self, id: ExecutionId) -> Option<ExecutionRecord<C, T>> {
        let record = self.records.remove(&id)?;
        if let Some(key) = &record.key {
            if self.by_key.get(key) == Some(&id) {
                self.by_key.remove(key);
            }
        }
        Some(record)
    }

    /// Removes every record; used at teardown.
    pub fn drain(&mut self) -> Vec<ExecutionRecord<C, T>> {
        self.by_key.clear();
        self.records.drain().map(|(_, record)| record).collect()
    }

    pub fn is_in_flight(&self, key: &C::Key) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<C: ServiceCommand, T: Clone> Default for InFlightRegistry<C, T> {
    fn default() -> Self {
        Self::new()
    }
}
