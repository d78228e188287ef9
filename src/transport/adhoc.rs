//! Ad-hoc channel handler: one primary socket, extra sockets on demand.
//!
//! ```text
//!  sender                                   receiver
//!  ┌─────────────────┐   primary stream    ┌──────────────────────────┐
//!  │ send() ─ try ───┼────────────────────▶│ receive_multi() loop     │
//!  │   lock primary  │                     │ (calling thread)         │
//!  │                 │   auxiliary stream  │                          │
//!  │   busy? connect─┼────────────────────▶│ acceptor thread ─▶ one   │
//!  │   a new stream  │   (one call, then   │ thread per connection    │
//!  │                 │    dropped)         │                          │
//!  └─────────────────┘                     └──────────────────────────┘
//! ```
//!
//! A stream carries at most one request at a time and the response is read
//! before anything else is written, so responses always pair up with their
//! requests. When the primary stream is already in use, `send()` opens an
//! auxiliary stream to the same endpoint instead of waiting, so unrelated
//! calls from different threads never block each other.
//!
//! With ad-hoc channels disabled (the dedicated per-instance audio
//! channels), `send()` always waits for the primary stream and the
//! receiver spawns no threads at all.

use std::collections::HashMap;
use std::fs;
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use super::lock;
use crate::error::{Error, Result, TransportError};
use crate::wire::SerializationBuffer;

/// Callback serving one request on a stream: read it, handle it, write the
/// response.
pub trait ServeFn: Fn(&mut UnixStream, &mut SerializationBuffer) -> Result<()> + Send + Sync + 'static {}

impl<F> ServeFn for F where
    F: Fn(&mut UnixStream, &mut SerializationBuffer) -> Result<()> + Send + Sync + 'static
{
}

/// Primary plus on-demand auxiliary streams for one endpoint.
pub struct AdHocChannel {
    inner: Arc<Inner>,
}

struct Inner {
    endpoint: PathBuf,
    ad_hoc: bool,
    buffer_capacity: usize,
    /// Only set on the listening side until the primary is accepted.
    listener: Mutex<Option<UnixListener>>,
    primary: Mutex<Option<UnixStream>>,
    /// Second handle to the primary, used to shut it down while another
    /// thread is blocked on it.
    primary_control: OnceLock<UnixStream>,
    /// The socket file at `endpoint` was bound by this side and a thread
    /// may be blocked accepting on it. Only this side may remove the file.
    bound: AtomicBool,
    /// Live auxiliary connections, on either side.
    auxiliary: Mutex<HashMap<u64, UnixStream>>,
    next_auxiliary: AtomicU64,
    /// Auxiliary connections opened by `send()` on this side.
    auxiliary_opened: AtomicUsize,
    closed: AtomicBool,
}

impl AdHocChannel {
    /// Set up the channel. When `listen` is set the endpoint is bound right
    /// away so the other process can connect as soon as it starts; the
    /// connection is only accepted in [`connect`](Self::connect).
    pub fn new(endpoint: PathBuf, listen: bool, ad_hoc: bool, buffer_capacity: usize) -> Result<Self> {
        let listener = if listen {
            if let Some(parent) = endpoint.parent() {
                fs::create_dir_all(parent)?;
            }
            remove_stale(&endpoint);
            Some(UnixListener::bind(&endpoint)?)
        } else {
            None
        };

        Ok(Self {
            inner: Arc::new(Inner {
                endpoint,
                ad_hoc,
                buffer_capacity,
                listener: Mutex::new(listener),
                primary: Mutex::new(None),
                primary_control: OnceLock::new(),
                bound: AtomicBool::new(listen),
                auxiliary: Mutex::new(HashMap::new()),
                next_auxiliary: AtomicU64::new(0),
                auxiliary_opened: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn endpoint(&self) -> &Path {
        &self.inner.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of auxiliary streams `send()` has opened so far.
    pub fn auxiliary_connections(&self) -> usize {
        self.inner.auxiliary_opened.load(Ordering::SeqCst)
    }

    /// Establish the primary stream: accept it on the listening side,
    /// connect to it on the other.
    pub fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        let listener = lock(&inner.listener).take();
        let stream = match listener {
            Some(listener) => {
                let (stream, _) = listener.accept()?;
                // The file now points at a closed listener. On an ad-hoc
                // channel the receiving side rebinds it for auxiliary
                // connections; otherwise nothing ever connects to it again.
                if inner.bound.swap(false, Ordering::SeqCst) && !inner.ad_hoc {
                    remove_stale(&inner.endpoint);
                }
                stream
            }
            None => UnixStream::connect(&inner.endpoint)?,
        };
        if inner.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed.into());
        }

        let _ = inner.primary_control.set(stream.try_clone()?);
        *lock(&inner.primary) = Some(stream);
        debug!("connected primary stream on {}", inner.endpoint.display());
        Ok(())
    }

    /// Run `f` against a stream nobody else is using. Uses the primary
    /// stream when it is free; otherwise opens an auxiliary stream for the
    /// duration of the call (unless ad-hoc channels are disabled).
    pub fn send<T>(&self, f: impl FnOnce(&mut UnixStream) -> Result<T>) -> Result<T> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed.into());
        }

        if inner.ad_hoc {
            match inner.primary.try_lock() {
                Ok(mut guard) => return self.on_primary(&mut guard, f),
                Err(TryLockError::Poisoned(poisoned)) => {
                    return self.on_primary(&mut poisoned.into_inner(), f);
                }
                Err(TryLockError::WouldBlock) => match UnixStream::connect(&inner.endpoint) {
                    Ok(stream) => {
                        inner.auxiliary_opened.fetch_add(1, Ordering::SeqCst);
                        debug!("primary busy, using an auxiliary stream on {}", inner.endpoint.display());
                        return self.on_auxiliary(stream, f);
                    }
                    Err(e) => {
                        debug!("auxiliary connect failed ({e}), waiting for the primary stream");
                    }
                },
            }
        }

        let mut guard = lock(&inner.primary);
        self.on_primary(&mut guard, f)
    }

    fn on_primary<T>(
        &self,
        primary: &mut Option<UnixStream>,
        f: impl FnOnce(&mut UnixStream) -> Result<T>,
    ) -> Result<T> {
        let stream = primary.as_mut().ok_or(TransportError::NotConnected)?;
        let result = f(stream);
        if let Err(Error::Protocol(e)) = &result {
            warn!("protocol error on {}: {e}; closing the channel", self.inner.endpoint.display());
            self.close();
        }
        result
    }

    /// Run one call on a freshly connected auxiliary stream. The stream is
    /// tracked for the duration of the call so `close()` can interrupt it.
    fn on_auxiliary<T>(
        &self,
        mut stream: UnixStream,
        f: impl FnOnce(&mut UnixStream) -> Result<T>,
    ) -> Result<T> {
        let inner = &self.inner;
        let id = inner.track(&stream)?;
        // `close()` sets the flag before draining, so either it saw our
        // stream or we see the flag.
        if inner.closed.load(Ordering::SeqCst) {
            lock(&inner.auxiliary).remove(&id);
            return Err(TransportError::Closed.into());
        }
        let result = f(&mut stream);
        lock(&inner.auxiliary).remove(&id);
        result
    }

    /// Serve requests until the channel closes. Blocks the calling thread on
    /// the primary stream; with ad-hoc channels enabled an acceptor thread
    /// serves auxiliary connections alongside it.
    pub fn receive_multi<F: ServeFn>(&self, serve: F) -> Result<()> {
        let serve = Arc::new(serve);
        let acceptor = if self.inner.ad_hoc {
            let shared: Arc<dyn ServeFnDyn> = serve.clone();
            Some(self.spawn_acceptor(shared)?)
        } else {
            None
        };

        let result = {
            let mut guard = lock(&self.inner.primary);
            match guard.as_mut() {
                Some(stream) => serve_connection(stream, &*serve, &self.inner),
                None => Err(TransportError::NotConnected.into()),
            }
        };

        // Either we were closed, or the other side went away.
        self.close();
        if let Some(handle) = acceptor {
            if handle.join().is_err() {
                warn!("acceptor thread for {} panicked", self.inner.endpoint.display());
            }
        }
        result
    }

    fn spawn_acceptor(&self, serve: Arc<dyn ServeFnDyn>) -> Result<JoinHandle<()>> {
        let inner = Arc::clone(&self.inner);
        remove_stale(&inner.endpoint);
        let listener = UnixListener::bind(&inner.endpoint)?;
        inner.bound.store(true, Ordering::SeqCst);
        if inner.closed.load(Ordering::SeqCst) {
            // Closed while binding; `close()` may have missed the file.
            inner.release_endpoint();
        }

        let handle = thread::Builder::new()
            .name("bridgework-accept".into())
            .spawn(move || accept_loop(&listener, &inner, &serve))?;
        Ok(handle)
    }

    /// Close every stream of this channel. Threads blocked reading or
    /// writing the primary stream observe a transport failure. Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Drop for AdHocChannel {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl Inner {
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(stream) = self.primary_control.get() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        for (_, stream) in lock(&self.auxiliary).drain() {
            let _ = stream.shutdown(Shutdown::Both);
        }

        // A listener nobody is accepting on yet can simply be dropped.
        drop(lock(&self.listener).take());
        self.release_endpoint();
        debug!("closed channel {}", self.endpoint.display());
    }

    /// Wake whatever is blocked in `accept()` on our socket file, either the
    /// acceptor thread or a `connect()` waiting for the primary, and remove
    /// the file. Files bound by the other side are left alone.
    fn release_endpoint(&self) {
        if self.bound.swap(false, Ordering::SeqCst) {
            let _ = UnixStream::connect(&self.endpoint);
            remove_stale(&self.endpoint);
        }
    }

    /// Register a second handle to `stream` so `close()` can shut it down.
    fn track(&self, stream: &UnixStream) -> std::io::Result<u64> {
        let control = stream.try_clone()?;
        let id = self.next_auxiliary.fetch_add(1, Ordering::SeqCst);
        lock(&self.auxiliary).insert(id, control);
        Ok(id)
    }
}

/// Object-safe form of [`ServeFn`] so connections can share one callback.
trait ServeFnDyn: Send + Sync {
    fn call(&self, stream: &mut UnixStream, buffer: &mut SerializationBuffer) -> Result<()>;
}

/// Pause after a failed `accept()` so a persistent failure such as running
/// out of descriptors does not spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

impl<F: ServeFn> ServeFnDyn for F {
    fn call(&self, stream: &mut UnixStream, buffer: &mut SerializationBuffer) -> Result<()> {
        self(stream, buffer)
    }
}

fn accept_loop(listener: &UnixListener, inner: &Arc<Inner>, serve: &Arc<dyn ServeFnDyn>) {
    // `close()` only wakes us once it sees `bound`.
    if inner.closed.load(Ordering::SeqCst) {
        return;
    }
    for incoming in listener.incoming() {
        if inner.closed.load(Ordering::SeqCst) {
            break;
        }
        let mut stream = match incoming {
            Ok(stream) => stream,
            Err(e) => {
                warn!("accepting on {} failed: {e}", inner.endpoint.display());
                thread::sleep(ACCEPT_RETRY_DELAY);
                continue;
            }
        };

        let id = match inner.track(&stream) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("could not track auxiliary stream: {e}");
                None
            }
        };

        let connection = Arc::clone(inner);
        let serve = Arc::clone(serve);
        let spawned = thread::Builder::new()
            .name("bridgework-adhoc".into())
            .spawn(move || {
                if let Err(e) = serve_connection(&mut stream, &*serve, &connection) {
                    warn!("auxiliary connection on {} failed: {e}", connection.endpoint.display());
                }
                if let Some(id) = id {
                    lock(&connection.auxiliary).remove(&id);
                }
            });
        if let Err(e) = spawned {
            warn!("could not spawn a thread for an auxiliary connection: {e}");
            if let Some(id) = id {
                // The stream went down with the closure; drop our handle too.
                if let Some(control) = lock(&inner.auxiliary).remove(&id) {
                    let _ = control.shutdown(Shutdown::Both);
                }
            }
        }
    }
}

/// Serve requests on one stream until it closes. A clean hang-up, or any
/// failure after the channel was closed locally, ends the loop normally.
fn serve_connection(
    stream: &mut UnixStream,
    serve: &dyn ServeFnDyn,
    inner: &Inner,
) -> Result<()> {
    let mut buffer = SerializationBuffer::with_capacity(inner.buffer_capacity);
    loop {
        match serve.call(stream, &mut buffer) {
            Ok(()) => {}
            Err(Error::Transport(TransportError::Closed)) => return Ok(()),
            Err(_) if inner.closed.load(Ordering::SeqCst) => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

fn remove_stale(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove {}: {e}", path.display()),
    }
}
