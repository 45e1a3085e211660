//! The per-connection RPC service.
//!
//! One [`Service`] sits on each end of a duplex connection. Both peers act
//! as caller and callee at the same time: [`Service::bind`] registers local
//! handlers, [`Service::call`] invokes remote ones, and the connection
//! owner feeds every inbound transport message to [`Service::dispatch`].
//!
//! ```text
//!             inbound frame
//!                  │
//!            Envelope::decode
//!                  │
//!        ┌─────────┴─────────┐
//!     caller?             callee?
//!        │                   │
//!  registry lookup     session table take
//!  invoke handler      fill reply destination
//!  queue reply         fire completion
//! ```
//!
//! Outbound frames from both paths funnel through a single write queue so
//! the transport sees at most one in-flight write, no matter how many tasks
//! are calling concurrently.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::calls::{PendingReply, SessionTable};
use crate::envelope::{Direction, Envelope};
use crate::queue::WriteQueue;
use crate::registry::HandlerRegistry;
use crate::transport::Transport;
use crate::{RpcError, SchemaMessage, TransportError};

/// Bidirectional RPC endpoint for one duplex connection.
///
/// Cloning is cheap; every clone refers to the same connection state, so
/// the owner's read loop, callers on other tasks, and handlers can all
/// share one service.
///
/// The service borrows the transport for its whole lifetime and never
/// closes it; teardown is the owner's responsibility. Dropping the service
/// does not fail outstanding calls, call [`Service::abort`] first when
/// deterministic completion matters.
pub struct Service<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Service<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<T> {
    transport: Arc<T>,
    runtime: Handle,
    registry: Mutex<HandlerRegistry>,
    sessions: Mutex<SessionTable>,
    writes: Mutex<WriteQueue>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // Bound handlers go; outstanding completions deliberately do not
        // fire here. Owners call `abort` first when they need them to.
        self.registry.lock().clear();
    }
}

/// Call slot backing [`Service::call`]: owns the reply destination until
/// the matching reply or an abort consumes it.
struct CallOp<Rep> {
    reply: Rep,
    completion: oneshot::Sender<Result<Rep, RpcError>>,
}

impl<Rep: SchemaMessage> PendingReply for CallOp<Rep> {
    fn fill(&mut self, payload: &[u8]) -> Result<(), RpcError> {
        self.reply = Rep::decode(payload).map_err(|_| RpcError::ParsePayloadFailed)?;
        Ok(())
    }

    fn complete(self: Box<Self>, result: Result<(), RpcError>) {
        let CallOp { reply, completion } = *self;
        // Sending wakes the caller's task on whatever runtime it is parked
        // on; user code never runs on the dispatch thread.
        let _ = completion.send(result.map(|()| reply));
    }
}

impl<T: Transport> Service<T> {
    /// Create a service over `transport`, spawning background work on the
    /// ambient tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime; use [`Service::with_runtime`] to
    /// pass a handle explicitly.
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_runtime(transport, Handle::current())
    }

    /// Create a service whose write pump runs on `runtime`.
    pub fn with_runtime(transport: Arc<T>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                runtime,
                registry: Mutex::new(HandlerRegistry::default()),
                sessions: Mutex::new(SessionTable::default()),
                writes: Mutex::new(WriteQueue::default()),
            }),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Runtime handle background work is spawned on.
    pub fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }

    /// Register the callee-side handler for the (Req, Rep) message pair.
    ///
    /// The handler runs synchronously on the dispatch thread; its reply is
    /// queued for write as soon as it returns. Binding the same request
    /// type again replaces the previous handler.
    pub fn bind<Req, Rep, F>(&self, handler: F)
    where
        Req: SchemaMessage,
        Rep: SchemaMessage,
        F: Fn(&Req, &mut Rep) + Send + Sync + 'static,
    {
        self.inner.registry.lock().bind::<Req, Rep, F>(handler);
    }

    /// Invoke the remote handler bound to `Req` and await its reply.
    ///
    /// Resolves when the matching reply arrives or when the session aborts;
    /// an abort fails every outstanding call with the causing error. No
    /// deadline is imposed here, a slot lives until its reply or an abort,
    /// so callers wanting a timeout race this future against a timer.
    pub async fn call<Req, Rep>(&self, request: &Req) -> Result<Rep, RpcError>
    where
        Req: SchemaMessage,
        Rep: SchemaMessage,
    {
        let (tx, rx) = oneshot::channel();
        let session = self.inner.sessions.lock().issue(Box::new(CallOp::<Rep> {
            reply: Rep::default(),
            completion: tx,
        }));

        tracing::debug!(session, request = Req::type_name(), "issuing call");

        self.send_envelope(Envelope {
            direction: Direction::Caller,
            session,
            message: Req::type_name().to_owned(),
            payload: request.encode_to_vec().into(),
        });

        match rx.await {
            Ok(result) => result,
            // The slot vanished without completing: the service went away
            // with the call still outstanding.
            Err(_) => Err(TransportError::Closed.into()),
        }
    }

    /// Feed one inbound frame. Returns the number of bytes consumed.
    ///
    /// Any error is fatal for the connection: every outstanding call
    /// completes with the error, bound handlers are dropped, and the error
    /// is returned. The transport's owner should close the connection.
    pub fn dispatch(&self, frame: &[u8]) -> Result<usize, RpcError> {
        match self.try_dispatch(frame) {
            Ok(()) => Ok(frame.len()),
            Err(err) => {
                tracing::warn!(error = %err, "dispatch failed, aborting session");
                self.abort(err.clone());
                Err(err)
            }
        }
    }

    fn try_dispatch(&self, frame: &[u8]) -> Result<(), RpcError> {
        let envelope = Envelope::decode(frame)?;
        match envelope.direction {
            Direction::Caller => self.dispatch_request(envelope),
            Direction::Callee => self.dispatch_reply(envelope),
        }
    }

    /// The peer is invoking a local handler.
    fn dispatch_request(&self, envelope: Envelope) -> Result<(), RpcError> {
        let handler = self.inner.registry.lock().lookup(&envelope.message)?;

        // Registry lock is released here; the user handler never runs
        // under it.
        let (reply_name, reply_payload) = handler.invoke(&envelope.payload)?;

        tracing::debug!(
            session = envelope.session,
            request = %envelope.message,
            reply = reply_name,
            "handled request"
        );

        self.send_envelope(Envelope {
            direction: Direction::Callee,
            session: envelope.session,
            message: reply_name.to_owned(),
            payload: reply_payload,
        });
        Ok(())
    }

    /// The peer is answering one of our outstanding calls.
    fn dispatch_reply(&self, envelope: Envelope) -> Result<(), RpcError> {
        let mut pending = self.inner.sessions.lock().take(envelope.session)?;

        if let Err(err) = pending.fill(&envelope.payload) {
            // The slot is already out of the table, so the abort below will
            // not reach it; completing it here keeps every completion
            // firing exactly once.
            pending.complete(Err(err.clone()));
            return Err(err);
        }

        tracing::debug!(
            session = envelope.session,
            reply = %envelope.message,
            "completed call"
        );
        pending.complete(Ok(()));
        Ok(())
    }

    /// Tear down every outstanding call with `error` and drop all bound
    /// handlers.
    ///
    /// Frames already queued for write are left for the transport to
    /// discover failure on its own.
    pub fn abort(&self, error: RpcError) {
        let pending = self.inner.sessions.lock().drain();
        if !pending.is_empty() {
            tracing::warn!(calls = pending.len(), error = %error, "failing outstanding calls");
        }
        for op in pending {
            op.complete(Err(error.clone()));
        }
        self.inner.registry.lock().clear();
    }

    /// Session ids of calls still awaiting replies.
    pub fn pending_sessions(&self) -> Vec<u32> {
        self.inner.sessions.lock().outstanding()
    }

    /// Recycled session ids awaiting reuse, most recently freed last.
    pub fn free_sessions(&self) -> Vec<u32> {
        self.inner.sessions.lock().free_ids()
    }

    /// Queue an envelope for write, starting the pump when the queue was
    /// idle.
    fn send_envelope(&self, envelope: Envelope) {
        let frame = envelope.encode();
        let start = self.inner.writes.lock().push(frame);
        if start {
            let service = self.clone();
            self.inner
                .runtime
                .spawn(async move { service.write_pump().await });
        }
    }

    /// Drain the write queue, one in-flight transport write at a time.
    async fn write_pump(self) {
        loop {
            // push() guarantees a head exists when the pump starts.
            let Some(frame) = self.inner.writes.lock().head() else {
                return;
            };
            if let Err(err) = self.inner.transport.send(frame).await {
                tracing::error!(error = %err, "transport write failed, aborting session");
                self.abort(err.into());
                return;
            }
            if self.inner.writes.lock().advance().is_none() {
                return;
            }
        }
    }
}
