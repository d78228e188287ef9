//! Every channel one bridge uses.
//!
//! ```text
//!  native side (listens)                 owning side (connects)
//!  ─────────────────────                 ──────────────────────
//!  control   send ───────────────────────▶ receive_messages
//!  callback  receive_messages ◀─────────── send
//!  audio[id] send (connect) ─────────────▶ receive_messages (listen)
//! ```
//!
//! Control and callback exist for the whole life of the bridge. Dedicated
//! audio channels come and go with the objects that need them; the map
//! holding them is the only shared state here and is only locked for
//! insert, lookup and removal.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, warn};

use super::{MessageHandler, Request};
use crate::error::{Error, Result};
use crate::interfaces::InstanceId;
use crate::logging::Logging;
use crate::messages::{AudioProcessorHandler, AudioProcessorRequest, CallbackRequest, ControlRequest};
use crate::transport::{AdHocChannel, Endpoints, lock};
use crate::wire::SerializationBuffer;

/// A dedicated channel plus the scratch buffer its single caller reuses.
struct AudioProcessorChannel {
    handler: MessageHandler<AudioProcessorRequest>,
    scratch: Mutex<SerializationBuffer>,
}

pub struct Sockets {
    endpoints: Endpoints,
    buffer_capacity: usize,
    pub control: MessageHandler<ControlRequest>,
    pub callback: MessageHandler<CallbackRequest>,
    audio_processors: Mutex<HashMap<InstanceId, Arc<AudioProcessorChannel>>>,
}

impl Sockets {
    /// Set up control and callback. With `listen` both endpoints are bound
    /// immediately so the other process can connect whenever it is ready.
    pub fn new(endpoints: Endpoints, listen: bool, buffer_capacity: usize) -> Result<Self> {
        let control = AdHocChannel::new(endpoints.control(), listen, true, buffer_capacity)?;
        let callback = AdHocChannel::new(endpoints.callback(), listen, true, buffer_capacity)?;
        Ok(Self {
            endpoints,
            buffer_capacity,
            control: MessageHandler::new(control, buffer_capacity),
            callback: MessageHandler::new(callback, buffer_capacity),
            audio_processors: Mutex::new(HashMap::new()),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Establish the primary streams, control first.
    pub fn connect(&self) -> Result<()> {
        self.control.connect()?;
        self.callback.connect()?;
        debug!("connected to {}", self.endpoints.base_dir().display());
        Ok(())
    }

    /// Close every channel. Threads blocked on any of them get a transport
    /// error. Each side removes only the socket files it bound itself; the
    /// endpoint directory goes away with whichever side closes last.
    pub fn close(&self) {
        self.control.close();
        self.callback.close();
        for (_, channel) in lock(&self.audio_processors).drain() {
            channel.handler.close();
        }

        let base_dir = self.endpoints.base_dir();
        match fs::remove_dir(base_dir) {
            Ok(()) => debug!("removed {}", base_dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
                debug!("{} still in use by the other side", base_dir.display());
            }
            Err(e) => warn!("could not remove {}: {e}", base_dir.display()),
        }
    }

    // ── Dedicated channels ───────────────────────────────────

    /// Native side: connect to the dedicated channel the owning side bound
    /// for `instance_id`.
    pub fn add_audio_processor_and_connect(&self, instance_id: InstanceId) -> Result<()> {
        let channel = AdHocChannel::new(
            self.endpoints.audio_processor(instance_id),
            false,
            false,
            self.buffer_capacity,
        )?;
        channel.connect()?;
        self.insert(instance_id, channel);
        Ok(())
    }

    /// Owning side: bind the dedicated channel for `instance_id` and serve
    /// it on a new thread. The endpoint is bound before this returns, so
    /// the other side may connect right away.
    pub fn add_audio_processor_and_listen(
        &self,
        instance_id: InstanceId,
        logging: Option<Logging>,
        handler: Arc<dyn AudioProcessorHandler>,
    ) -> Result<()> {
        let channel = AdHocChannel::new(
            self.endpoints.audio_processor(instance_id),
            true,
            false,
            self.buffer_capacity,
        )?;
        let channel = self.insert(instance_id, channel);

        thread::Builder::new()
            .name(format!("bridgework-audio-{instance_id}"))
            .spawn(move || {
                let served = channel
                    .handler
                    .connect()
                    .and_then(|()| channel.handler.receive_messages(logging, true, handler));
                if let Err(e) = served {
                    warn!("audio processor channel {instance_id} stopped: {e}");
                }
                debug!("audio processor channel {instance_id} closed");
            })?;
        Ok(())
    }

    fn insert(&self, instance_id: InstanceId, channel: AdHocChannel) -> Arc<AudioProcessorChannel> {
        let entry = Arc::new(AudioProcessorChannel {
            handler: MessageHandler::new(channel, self.buffer_capacity),
            scratch: Mutex::new(SerializationBuffer::with_capacity(self.buffer_capacity)),
        });
        if let Some(old) = lock(&self.audio_processors).insert(instance_id, Arc::clone(&entry)) {
            warn!("replacing the audio processor channel for instance {instance_id}");
            old.handler.close();
        }
        entry
    }

    pub fn has_audio_processor(&self, instance_id: InstanceId) -> bool {
        lock(&self.audio_processors).contains_key(&instance_id)
    }

    /// Close and forget the dedicated channel for `instance_id`. Returns
    /// whether there was one.
    pub fn remove_audio_processor(&self, instance_id: InstanceId) -> bool {
        let removed = lock(&self.audio_processors).remove(&instance_id);
        match removed {
            Some(channel) => {
                channel.handler.close();
                true
            }
            None => false,
        }
    }

    fn audio_processor(&self, instance_id: InstanceId) -> Result<Arc<AudioProcessorChannel>> {
        lock(&self.audio_processors)
            .get(&instance_id)
            .cloned()
            .ok_or(Error::UnknownInstance(instance_id))
    }

    /// Send a request over the dedicated channel for `instance_id`.
    pub fn send_audio_processor_message<T>(
        &self,
        instance_id: InstanceId,
        request: &T,
        logging: Option<&Logging>,
    ) -> Result<T::Response>
    where
        T: Request<Union = AudioProcessorRequest>,
    {
        let channel = self.audio_processor(instance_id)?;
        let mut scratch = lock(&channel.scratch);
        channel
            .handler
            .send_message_with(request, logging, &mut scratch)
    }

    /// Like [`send_audio_processor_message`](Self::send_audio_processor_message),
    /// decoding the response into `response`.
    pub fn receive_audio_processor_into<T>(
        &self,
        instance_id: InstanceId,
        request: &T,
        response: &mut T::Response,
        logging: Option<&Logging>,
    ) -> Result<()>
    where
        T: Request<Union = AudioProcessorRequest>,
    {
        let channel = self.audio_processor(instance_id)?;
        let mut scratch = lock(&channel.scratch);
        channel
            .handler
            .receive_into(request, response, logging, &mut scratch)
    }
}

impl Drop for Sockets {
    fn drop(&mut self) {
        self.close();
    }
}
