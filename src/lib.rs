//! Bridgework library.
//!
//! Lets a native host use plugin objects that live in another process.
//! The native side ([`NativeBridge`]) holds [`PluginProxy`] objects; the
//! owning side ([`PluginHost`]) holds the real objects and serves the
//! requests the proxies make over Unix domain sockets.
//!
//! Layers, bottom up:
//!
//! - [`wire`]: length-prefixed postcard frames
//! - [`transport`]: endpoint naming and the ad-hoc socket channel
//! - [`rpc`]: typed request/response routing per traffic class
//! - [`interfaces`], [`discovery`], [`proxy`]: what gets proxied
//! - [`native`], [`host`]: the two ends of a bridge

#![deny(unused_must_use)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod host;
pub mod interfaces;
pub mod logging;
pub mod messages;
pub mod native;
pub mod proxy;
pub mod rpc;
pub mod transport;
pub mod wire;

pub use config::BridgeConfig;
pub use discovery::CapabilitySet;
pub use error::{Error, ProtocolError, Result, TransportError};
pub use host::{PluginFactory, PluginHost};
pub use interfaces::{ClassId, InstanceId, InterfaceKind, PluginObject, TResult};
pub use native::NativeBridge;
pub use proxy::{Capability, PluginProxy, ProxyState};
