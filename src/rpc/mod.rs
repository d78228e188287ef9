//! Typed message router.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Router                                │
//! │                                                              │
//! │  send_message(&T) ──▶ Tagged<T> ──▶ AdHocChannel::send ──┐   │
//! │       ▲                                                  │   │
//! │       └──── T::Response ◀── read_object ◀────────────────┘   │
//! │                                                              │
//! │  receive_messages(handler)                                   │
//! │    read_object::<Union> ──▶ Union::dispatch ──▶ handler.x()  │
//! │                                   │                          │
//! │                                   └──▶ Responder::respond    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each traffic class is a closed serde enum of request kinds, declared
//! with [`request_union!`](crate::request_union). Every request kind names
//! exactly one response type, so the sending side decodes the reply as the
//! right type without inspecting it, and the generated handler trait forces
//! the receiving side to return that same type.
//!
//! Requests are serialized by reference through [`Tagged`]: the union's
//! variant tag is written in front of the borrowed payload, so large
//! payloads never have to be moved into an enum value just to be sent.

pub mod sockets;

use core::fmt;
use core::marker::PhantomData;
use std::os::unix::net::UnixStream;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::logging::{Logging, RequestMeta};
use crate::transport::AdHocChannel;
use crate::wire::{SerializationBuffer, read_object, read_object_into, write_object};

pub use sockets::Sockets;

// ── Request kinds ────────────────────────────────────────────

/// One request kind of a traffic class.
pub trait Request: Serialize + fmt::Debug {
    /// The one response type this request is answered with.
    type Response: Serialize + DeserializeOwned + fmt::Debug;
    /// The traffic class this request belongs to.
    type Union: RequestUnion;
    /// Variant index within the union.
    const INDEX: u32;
    const NAME: &'static str;

    fn meta() -> RequestMeta {
        RequestMeta {
            union: <Self::Union as RequestUnion>::NAME,
            name: Self::NAME,
            high_frequency: <Self::Union as RequestUnion>::HIGH_FREQUENCY,
        }
    }
}

/// The closed set of request kinds valid on one traffic class.
pub trait RequestUnion: DeserializeOwned + fmt::Debug + Send + 'static {
    /// Handler trait with one method per request kind.
    type Handler: ?Sized + Send + Sync + 'static;
    const NAME: &'static str;
    /// Whether this class is called from the real-time audio path.
    const HIGH_FREQUENCY: bool;

    /// Call the handler method for this request's kind and write back its
    /// response.
    fn dispatch(self, handler: &Self::Handler, responder: &mut Responder<'_>) -> Result<()>;
}

/// A borrowed request wrapped in its union tag. Serializes exactly like
/// the corresponding union variant would.
pub struct Tagged<'a, T>(pub &'a T);

impl<T: Request> Serialize for Tagged<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_newtype_variant(
            <T::Union as RequestUnion>::NAME,
            T::INDEX,
            T::NAME,
            self.0,
        )
    }
}

/// Position of `name` in `variants`. Used by [`request_union!`] to derive
/// each request kind's tag from the declaration order.
///
/// [`request_union!`]: crate::request_union
pub const fn variant_index(variants: &[&str], name: &str) -> u32 {
    let mut i = 0;
    while i < variants.len() {
        if str_eq(variants[i], name) {
            return i as u32;
        }
        i += 1;
    }
    panic!("request kind is not a variant of its union");
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

// ── Receiving side ───────────────────────────────────────────

/// Writes the response for the request currently being dispatched.
pub struct Responder<'a> {
    stream: &'a mut UnixStream,
    buffer: &'a mut SerializationBuffer,
    logging: Option<&'a Logging>,
}

impl Responder<'_> {
    /// Ask the logging collaborator about an inbound request. Returns
    /// whether its response should be recorded.
    pub fn log_request<T: Request>(&self, request: &T) -> bool {
        self.logging.is_some_and(|l| l.request(T::meta(), request))
    }

    pub fn respond<T: Request>(&mut self, response: &T::Response, logged: bool) -> Result<()> {
        if logged {
            if let Some(logging) = self.logging {
                logging.response(T::meta(), &*response);
            }
        }
        write_object(&mut *self.stream, response, &mut *self.buffer)
    }
}

// ── Message handler ──────────────────────────────────────────

/// Sends and serves the requests of one traffic class over one channel.
pub struct MessageHandler<R> {
    channel: AdHocChannel,
    buffer_capacity: usize,
    _union: PhantomData<fn() -> R>,
}

impl<R: RequestUnion> MessageHandler<R> {
    pub fn new(channel: AdHocChannel, buffer_capacity: usize) -> Self {
        Self {
            channel,
            buffer_capacity,
            _union: PhantomData,
        }
    }

    pub fn channel(&self) -> &AdHocChannel {
        &self.channel
    }

    pub fn connect(&self) -> Result<()> {
        self.channel.connect()
    }

    pub fn close(&self) {
        self.channel.close();
    }

    /// Send `request` and block for its response.
    pub fn send_message<T>(&self, request: &T, logging: Option<&Logging>) -> Result<T::Response>
    where
        T: Request<Union = R>,
    {
        let mut buffer = SerializationBuffer::with_capacity(self.buffer_capacity);
        self.send_message_with(request, logging, &mut buffer)
    }

    /// [`send_message`](Self::send_message) with a caller-owned buffer.
    pub fn send_message_with<T>(
        &self,
        request: &T,
        logging: Option<&Logging>,
        buffer: &mut SerializationBuffer,
    ) -> Result<T::Response>
    where
        T: Request<Union = R>,
    {
        let logged = logging.is_some_and(|l| l.request(T::meta(), request));
        let response: T::Response = self.channel.send(|stream| {
            write_object(stream, &Tagged(request), buffer)?;
            read_object(stream, buffer)
        })?;
        if let Some(logging) = logging.filter(|_| logged) {
            logging.response(T::meta(), &response);
        }
        Ok(response)
    }

    /// Send `request` and decode its response into `response`, reusing the
    /// allocations already held there.
    pub fn receive_into<T>(
        &self,
        request: &T,
        response: &mut T::Response,
        logging: Option<&Logging>,
        buffer: &mut SerializationBuffer,
    ) -> Result<()>
    where
        T: Request<Union = R>,
    {
        let logged = logging.is_some_and(|l| l.request(T::meta(), request));
        self.channel.send(|stream| {
            write_object(stream, &Tagged(request), buffer)?;
            read_object_into(stream, response, buffer)
        })?;
        if let Some(logging) = logging.filter(|_| logged) {
            logging.response(T::meta(), &*response);
        }
        Ok(())
    }

    /// Serve inbound requests until the channel closes. Without
    /// `persistent_buffers` each connection's buffer is shrunk back to its
    /// initial capacity after every request.
    pub fn receive_messages(
        &self,
        logging: Option<Logging>,
        persistent_buffers: bool,
        handler: Arc<R::Handler>,
    ) -> Result<()> {
        let capacity = self.buffer_capacity;
        self.channel.receive_multi(move |stream: &mut UnixStream, buffer: &mut SerializationBuffer| {
            let request: R = read_object(stream, buffer)?;
            let mut responder = Responder {
                stream: &mut *stream,
                buffer: &mut *buffer,
                logging: logging.as_ref(),
            };
            request.dispatch(&handler, &mut responder)?;
            if !persistent_buffers {
                buffer.shrink_to(capacity);
            }
            Ok(())
        })
    }
}

// ── Union declaration ────────────────────────────────────────

/// Declare a traffic class: the request union, the [`Request`] impl of
/// every request kind and a handler trait with one method per kind.
///
/// ```ignore
/// request_union! {
///     /// Administrative calls.
///     pub enum ControlRequest in ControlHandler, high_frequency = false {
///         Construct: construct -> ConstructResponse,
///         Destruct: destruct -> Ack,
///     }
/// }
/// ```
///
/// Each variant is named after its request type, which must be in scope
/// and implement `Serialize`, `Deserialize` and `Debug`. The expanding
/// crate needs `serde` as a dependency.
#[macro_export]
macro_rules! request_union {
    (
        $(#[$meta:meta])*
        $vis:vis enum $union:ident in $handler:ident, high_frequency = $high_frequency:literal {
            $( $request:ident : $method:ident -> $response:ty ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, ::serde::Serialize, ::serde::Deserialize)]
        $vis enum $union {
            $( $request($request), )+
        }

        impl $union {
            #[doc(hidden)]
            pub const VARIANTS: &'static [&'static str] = &[$(stringify!($request)),+];
        }

        $(
            impl $crate::rpc::Request for $request {
                type Response = $response;
                type Union = $union;
                const INDEX: u32 =
                    $crate::rpc::variant_index($union::VARIANTS, stringify!($request));
                const NAME: &'static str = stringify!($request);
            }
        )+

        #[doc = concat!("Receiving side of [`", stringify!($union), "`].")]
        $vis trait $handler: Send + Sync {
            $( fn $method(&self, request: $request) -> $response; )+
        }

        impl $crate::rpc::RequestUnion for $union {
            type Handler = dyn $handler;
            const NAME: &'static str = stringify!($union);
            const HIGH_FREQUENCY: bool = $high_frequency;

            fn dispatch(
                self,
                handler: &Self::Handler,
                responder: &mut $crate::rpc::Responder<'_>,
            ) -> $crate::error::Result<()> {
                match self {
                    $(
                        Self::$request(request) => {
                            let logged = responder.log_request(&request);
                            let response = handler.$method(request);
                            responder.respond::<$request>(&response, logged)
                        }
                    )+
                }
            }
        }
    };
}
