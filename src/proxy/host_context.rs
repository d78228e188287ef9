//! Owning-side stand-in for a host context.
//!
//! Plugin objects receive one of these from `initialize` or
//! `set_component_handler`. It exposes exactly the host interfaces the
//! native side discovered and turns every call into a callback request.
//! Plugin calls cannot fail with a bridge error, so transport failures are
//! logged and reported as `INTERNAL_ERROR`.

use std::sync::{Arc, Weak};

use log::error;

use crate::interfaces::host_context::{
    BeginEdit, EndEdit, HostGetName, PerformEdit, RestartComponent,
};
use crate::interfaces::{
    ComponentHandler, HostApplication, HostContext, HostContextArgs, HostInterfaceKind,
    InstanceId, TResult, Unavailable,
};
use crate::logging::Logging;
use crate::messages::CallbackRequest;
use crate::rpc::{Request, Sockets};

pub struct HostContextProxy {
    args: HostContextArgs,
    sockets: Weak<Sockets>,
    logging: Option<Logging>,
}

impl HostContextProxy {
    pub fn new(args: HostContextArgs, sockets: &Arc<Sockets>, logging: Option<Logging>) -> Self {
        Self {
            args,
            sockets: Arc::downgrade(sockets),
            logging,
        }
    }

    pub fn owner_instance_id(&self) -> InstanceId {
        self.args.owner_instance_id
    }

    pub fn args(&self) -> &HostContextArgs {
        &self.args
    }

    fn send<T>(&self, request: &T) -> T::Response
    where
        T: Request<Union = CallbackRequest>,
        T::Response: Unavailable,
    {
        let Some(sockets) = self.sockets.upgrade() else {
            error!("{} after the bridge shut down", T::NAME);
            return T::Response::unavailable(TResult::INTERNAL_ERROR);
        };
        match sockets.callback.send_message(request, self.logging.as_ref()) {
            Ok(response) => response,
            Err(e) => {
                error!("callback {} failed: {e}", T::NAME);
                T::Response::unavailable(TResult::INTERNAL_ERROR)
            }
        }
    }
}

impl HostContext for HostContextProxy {
    fn host_application(&self) -> Option<&dyn HostApplication> {
        self.args
            .supports(HostInterfaceKind::HostApplication)
            .then_some(self as &dyn HostApplication)
    }

    fn component_handler(&self) -> Option<&dyn ComponentHandler> {
        self.args
            .supports(HostInterfaceKind::ComponentHandler)
            .then_some(self as &dyn ComponentHandler)
    }
}

impl HostApplication for HostContextProxy {
    fn name(&self) -> Result<String, TResult> {
        self.send(&HostGetName {
            owner_instance_id: self.owner_instance_id(),
        })
    }
}

impl ComponentHandler for HostContextProxy {
    fn begin_edit(&self, id: u32) -> TResult {
        self.send(&BeginEdit {
            owner_instance_id: self.owner_instance_id(),
            id,
        })
    }

    fn perform_edit(&self, id: u32, value_normalized: f64) -> TResult {
        self.send(&PerformEdit {
            owner_instance_id: self.owner_instance_id(),
            id,
            value_normalized,
        })
    }

    fn end_edit(&self, id: u32) -> TResult {
        self.send(&EndEdit {
            owner_instance_id: self.owner_instance_id(),
            id,
        })
    }

    fn restart_component(&self, flags: i32) -> TResult {
        self.send(&RestartComponent {
            owner_instance_id: self.owner_instance_id(),
            flags,
        })
    }
}
