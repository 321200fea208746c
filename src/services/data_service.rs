//! Concurrent data-service engine.
//!
//! A [`DataService`] is a cloneable handle to a single service task. The task
//! owns a [`DataHandler`] (the specialization's state and backing-store access)
//! together with the [`InFlightRegistry`]; all state mutation happens on that
//! task, one message at a time. Backing-store calls run as pending futures
//! polled by the same task, so equivalent commands can join an outstanding
//! call while unrelated calls proceed concurrently.
//!
//! Every consumption idiom (async, blocking, callback, stream) is a thin
//! wrapper over the same `oneshot` completion.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, FuturesUnordered, Stream, StreamExt};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use super::in_flight::{ExecutionId, InFlightRegistry, Sink};
use crate::types::command::ServiceCommand;
use crate::types::errors::{NoRuntime, ServiceStopped};

/// Result delivered to callers of a service built on `H`.
pub type Outcome<H> = Result<<H as DataHandler>::Data, <H as DataHandler>::Error>;

/// How a handler answers a command.
pub enum Execution<D, E> {
    /// Answered on the service task, no backing call needed.
    Ready(Result<D, E>),
    /// A backing call; equivalent commands join it until it completes.
    Pending(BoxFuture<'static, Result<D, E>>),
}

impl<D, E> Execution<D, E> {
    pub fn ready(outcome: Result<D, E>) -> Self {
        Execution::Ready(outcome)
    }

    pub fn pending<F>(call: F) -> Self
    where
        F: Future<Output = Result<D, E>> + Send + 'static,
    {
        Execution::Pending(call.boxed())
    }
}

/// Specialization plugged into the engine.
///
/// All methods run on the service task and may freely mutate `self`.
pub trait DataHandler: Send + 'static {
    type Command: ServiceCommand;
    type Data: Clone + Send + 'static;
    type Error: Clone + From<ServiceStopped> + Send + 'static;
    /// Result of the one-time background initialization.
    type Init: Send + 'static;

    /// Background work that must finish before the service is ready.
    fn initialize(&mut self) -> Option<BoxFuture<'static, Self::Init>> {
        None
    }

    /// Receives the initialization result; the service turns ready afterwards.
    fn initialized(&mut self, init: Self::Init) {
        let _ = init;
    }

    /// Starts executing a command nothing equivalent is in flight for.
    fn begin(&mut self, command: &Self::Command) -> Execution<Self::Data, Self::Error>;

    /// Called when a pending backing call completes, before the outcome is
    /// handed to the waiting callers.
    fn finish(
        &mut self,
        command: &Self::Command,
        outcome: Result<Self::Data, Self::Error>,
    ) -> Result<Self::Data, Self::Error> {
        let _ = command;
        outcome
    }

    /// Shapes the shared outcome of an execution for one attached caller.
    /// `command` is the command that caller submitted, which may differ from
    /// the one that started the execution outside its coalescing key.
    fn deliver(
        &self,
        command: &Self::Command,
        shared: &Result<Self::Data, Self::Error>,
    ) -> Result<Self::Data, Self::Error> {
        let _ = command;
        shared.clone()
    }
}

/// Lifecycle of a data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Initializing,
    Ready,
    Stopped,
}

/// Runtime the service task is spawned on. Chosen once at construction.
#[derive(Debug, Clone, Default)]
pub enum Executor {
    /// The runtime of the calling context.
    #[default]
    Current,
    /// An explicit runtime, for services built outside of async code.
    Handle(Handle),
}

impl Executor {
    fn handle(&self) -> Result<Handle, NoRuntime> {
        match self {
            Executor::Current => Handle::try_current().map_err(|_| NoRuntime),
            Executor::Handle(handle) => Ok(handle.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct EngineStats {
    in_flight: AtomicUsize,
    executions: AtomicU64,
    joined: AtomicU64,
}

enum Message<H: DataHandler> {
    Dispatch {
        command: H::Command,
        sink: Sink<Outcome<H>>,
    },
    Shutdown,
}

enum Event<H: DataHandler> {
    Completed {
        id: ExecutionId,
        outcome: Outcome<H>,
    },
    Initialized(H::Init),
}

/// Handle to a running data service.
pub struct DataService<H: DataHandler> {
    inbox: mpsc::UnboundedSender<Message<H>>,
    state: watch::Receiver<ServiceState>,
    stats: Arc<EngineStats>,
    runtime: Handle,
}

impl<H: DataHandler> Clone for DataService<H> {
    fn clone(&self) -> Self {
        Self {
            inbox: self.inbox.clone(),
            state: self.state.clone(),
            stats: self.stats.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<H: DataHandler> DataService<H> {
    /// Spawns the service task for `handler` and returns a handle to it.
    ///
    /// Fails with [`NoRuntime`] when `executor` is [`Executor::Current`] and
    /// the caller is not inside a tokio runtime.
    pub fn spawn(name: &'static str, handler: H, executor: &Executor) -> Result<Self, NoRuntime> {
        let runtime = executor.handle()?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ServiceState::Initializing);
        let stats = Arc::new(EngineStats::default());

        let task = ServiceTask {
            name,
            handler,
            registry: InFlightRegistry::new(),
            pending: FuturesUnordered::new(),
            inbox: inbox_rx,
            state: state_tx,
            stats: stats.clone(),
        };
        runtime.spawn(task.run());

        Ok(Self {
            inbox: inbox_tx,
            state: state_rx,
            stats,
            runtime,
        })
    }

    fn submit(&self, command: H::Command) -> oneshot::Receiver<Outcome<H>> {
        let (sink, receiver) = oneshot::channel();
        // A closed inbox drops the sink, which the receiver reports as stopped.
        let _ = self.inbox.send(Message::Dispatch { command, sink });
        receiver
    }

    /// Executes `command`, suspending until its outcome is available.
    pub async fn execute(&self, command: H::Command) -> Outcome<H> {
        settle::<H>(self.submit(command).await)
    }

    /// Executes `command`, blocking the current thread.
    ///
    /// Must not be called from within an async context (tokio panics there);
    /// it is meant for plain threads sitting next to the runtime.
    pub fn execute_blocking(&self, command: H::Command) -> Outcome<H> {
        settle::<H>(self.submit(command).blocking_recv())
    }

    /// Executes `command` and hands the outcome to `callback` on the service runtime.
    pub fn execute_with<F>(&self, command: H::Command, callback: F)
    where
        F: FnOnce(Outcome<H>) + Send + 'static,
    {
        let receiver = self.submit(command);
        self.runtime.spawn(async move {
            callback(settle::<H>(receiver.await));
        });
    }

    /// Executes `command` and exposes the outcome as a single-item stream.
    pub fn execute_stream(
        &self,
        command: H::Command,
    ) -> impl Stream<Item = Outcome<H>> + Send + 'static {
        let receiver = self.submit(command);
        stream::once(async move { settle::<H>(receiver.await) })
    }

    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Receiver that observes every lifecycle transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.state.clone()
    }

    /// Suspends until initialization finishes, returning the state reached.
    pub async fn wait_ready(&self) -> ServiceState {
        self.wait_until(|state| state != ServiceState::Initializing).await
    }

    /// Stops the service. Callers still waiting receive `ServiceStopped`,
    /// and so does every later command.
    pub async fn shutdown(&self) {
        let _ = self.inbox.send(Message::Shutdown);
        self.wait_until(|state| state == ServiceState::Stopped).await;
    }

    async fn wait_until(&self, reached: impl Fn(ServiceState) -> bool) -> ServiceState {
        let mut state = self.state.clone();
        loop {
            let current = *state.borrow_and_update();
            if reached(current) {
                return current;
            }
            if state.changed().await.is_err() {
                return ServiceState::Stopped;
            }
        }
    }

    /// Number of execution records currently open.
    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::Acquire)
    }

    /// Number of pending executions started since the service was spawned.
    pub fn executions_started(&self) -> u64 {
        self.stats.executions.load(Ordering::Acquire)
    }

    /// Number of commands that joined an execution already in flight.
    pub fn executions_joined(&self) -> u64 {
        self.stats.joined.load(Ordering::Acquire)
    }
}

fn settle<H: DataHandler>(
    received: Result<Outcome<H>, oneshot::error::RecvError>,
) -> Outcome<H> {
    received.unwrap_or_else(|_| Err(ServiceStopped.into()))
}

struct ServiceTask<H: DataHandler> {
    name: &'static str,
    handler: H,
    registry: InFlightRegistry<H::Command, Outcome<H>>,
    pending: FuturesUnordered<BoxFuture<'static, Event<H>>>,
    inbox: mpsc::UnboundedReceiver<Message<H>>,
    state: watch::Sender<ServiceState>,
    stats: Arc<EngineStats>,
}

impl<H: DataHandler> ServiceTask<H> {
    async fn run(mut self) {
        match self.handler.initialize() {
            Some(init) => self.pending.push(init.map(Event::Initialized).boxed()),
            None => {
                self.state.send_replace(ServiceState::Ready);
            }
        }
        info!(service = self.name, "data service started");

        loop {
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(Message::Dispatch { command, sink }) => self.dispatch(command, sink),
                    Some(Message::Shutdown) | None => break,
                },
                Some(event) = self.pending.next(), if !self.pending.is_empty() => {
                    self.on_event(event);
                }
            }
        }

        self.stop();
    }

    fn dispatch(&mut self, command: H::Command, sink: Sink<Outcome<H>>) {
        let (command, sink) = match command.coalescing_key() {
            Some(key) => match self.registry.join(&key, command, sink) {
                Ok(id) => {
                    self.stats.joined.fetch_add(1, Ordering::AcqRel);
                    debug!(service = self.name, ?key, ?id, "joined in-flight execution");
                    return;
                }
                Err(unjoined) => unjoined,
            },
            None => (command, sink),
        };

        match self.handler.begin(&command) {
            Execution::Ready(outcome) => {
                let _ = sink.send(outcome);
            }
            Execution::Pending(call) => {
                debug!(service = self.name, ?command, "starting backing call");
                let id = self.registry.open(command, sink);
                self.pending.push(
                    async move {
                        Event::Completed {
                            id,
                            outcome: call.await,
                        }
                    }
                    .boxed(),
                );
                self.stats.executions.fetch_add(1, Ordering::AcqRel);
                self.stats.in_flight.store(self.registry.len(), Ordering::Release);
            }
        }
    }

    fn on_event(&mut self, event: Event<H>) {
        match event {
            Event::Completed { id, outcome } => {
                let Some(record) = self.registry.complete(id) else {
                    return;
                };
                self.stats.in_flight.store(self.registry.len(), Ordering::Release);

                let outcome = self.handler.finish(record.command(), outcome);
                let elapsed = record.elapsed();
                let waiters = record.waiters();
                let handler = &self.handler;
                record.resolve_with(outcome, |command, shared| handler.deliver(command, shared));
                debug!(service = self.name, ?id, ?elapsed, waiters, "backing call completed");
            }
            Event::Initialized(init) => {
                self.handler.initialized(init);
                self.state.send_replace(ServiceState::Ready);
                info!(service = self.name, "data service ready");
            }
        }
    }

    fn stop(&mut self) {
        self.inbox.close();
        while let Ok(message) = self.inbox.try_recv() {
            if let Message::Dispatch { sink, .. } = message {
                let _ = sink.send(Err(ServiceStopped.into()));
            }
        }
        for record in self.registry.drain() {
            record.resolve(Err(ServiceStopped.into()));
        }
        self.pending.clear();
        self.stats.in_flight.store(0, Ordering::Release);
        self.state.send_replace(ServiceState::Stopped);
        info!(service = self.name, "data service stopped");
    }
}
