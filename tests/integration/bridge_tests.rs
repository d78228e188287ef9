//! End-to-end tests: a native bridge and a plugin host talking over real
//! sockets, with the mock objects from `mock_plugin`.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use bridgework::interfaces::{
    AttributeValue, AudioBusBuffers, ConstructInterface, HostContext, Message, ParameterChange,
    ProcessData, TResult, kinds,
};
use bridgework::messages::{Ack, Destruct};
use bridgework::{Error, InterfaceKind, PluginProxy, ProxyState, TransportError};

use crate::mock_plugin::{
    Bridge, CONTROLLER_CLASS, HostCall, LATE_AUDIO_CLASS, LATE_UNITS_CLASS, MockHost,
    PROCESSOR_CLASS, UNKNOWN_CLASS,
};

fn create(bridge: &Bridge, class_id: bridgework::ClassId) -> PluginProxy {
    let requested = if class_id == CONTROLLER_CLASS {
        ConstructInterface::EditController
    } else {
        ConstructInterface::Component
    };
    bridge
        .native
        .create_instance(class_id, requested)
        .unwrap()
        .unwrap()
}

fn stereo(samples: &[f32]) -> AudioBusBuffers {
    AudioBusBuffers {
        silence_flags: 0,
        channels: vec![samples.to_vec(), samples.to_vec()],
    }
}

// ── Construction and casts ────────────────────────────────────

#[test]
fn proxy_supports_exactly_the_discovered_interfaces() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, PROCESSOR_CLASS);

    let supported: Vec<_> = proxy.capabilities().kinds().collect();
    assert_eq!(
        supported,
        vec![
            InterfaceKind::PluginBase,
            InterfaceKind::Component,
            InterfaceKind::AudioProcessor,
            InterfaceKind::ConnectionPoint,
        ]
    );
    assert!(proxy.cast::<kinds::EditController>().is_none());
    assert_eq!(proxy.query_interface(InterfaceKind::EditController), TResult::NO_INTERFACE);
    assert_eq!(proxy.query_interface(InterfaceKind::Component), TResult::OK);

    drop(proxy);
    bridge.shutdown().unwrap();
}

#[test]
fn casts_agree_with_the_capability_set() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, CONTROLLER_CLASS);
    let capabilities = proxy.capabilities();

    for kind in InterfaceKind::ALL {
        assert_eq!(proxy.supports(kind), capabilities.supports(kind), "{kind:?}");
    }
    // Two casts to the same kind talk to the same object.
    let first = proxy.cast::<kinds::EditController>().unwrap();
    let second = proxy.cast::<kinds::EditController>().unwrap();
    assert_eq!(first.set_param_normalized(100, 0.25).unwrap(), TResult::OK);
    assert_eq!(second.normalized_param_value(100).unwrap(), 0.25);
    assert_eq!(first.instance_id(), second.instance_id());

    drop(proxy);
    bridge.shutdown().unwrap();
}

#[test]
fn static_metadata_is_answered_locally() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, PROCESSOR_CLASS);
    let component = proxy.cast::<kinds::Component>().unwrap();
    assert_eq!(component.controller_class_id(), Ok(CONTROLLER_CLASS));

    drop(proxy);
    bridge.shutdown().unwrap();
}

#[test]
fn factory_failures_come_back_as_result_codes() {
    let bridge = Bridge::start();
    let result = bridge
        .native
        .create_instance(UNKNOWN_CLASS, ConstructInterface::Component)
        .unwrap();
    assert_eq!(result.unwrap_err(), TResult::INVALID_ARGUMENT);
    assert_eq!(bridge.host.instance_count(), 0);
    bridge.shutdown().unwrap();
}

// ── Calls ─────────────────────────────────────────────────────

#[test]
fn remote_results_are_returned_verbatim() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, PROCESSOR_CLASS);
    let component = proxy.cast::<kinds::Component>().unwrap();

    assert_eq!(component.set_io_mode(1).unwrap(), TResult::NOT_IMPLEMENTED);
    assert_eq!(component.bus_count(0, 0).unwrap(), 1);
    let info = component.bus_info(0, 1, 0).unwrap().unwrap();
    assert_eq!((info.name.as_str(), info.direction), ("Main", 1));
    assert_eq!(component.bus_info(0, 1, 5).unwrap(), Err(TResult::INVALID_ARGUMENT));

    assert_eq!(component.set_state(b"preset").unwrap(), TResult::OK);
    assert_eq!(component.get_state().unwrap(), Ok(b"preset".to_vec()));

    drop(proxy);
    bridge.shutdown().unwrap();
}

#[test]
fn process_round_trips_audio_into_the_callers_buffers() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, PROCESSOR_CLASS);
    let processor = proxy.cast::<kinds::AudioProcessor>().unwrap();
    assert_eq!(processor.latency_samples().unwrap(), 64);

    let mut data = ProcessData {
        num_samples: 3,
        inputs: vec![stereo(&[0.5, -1.0, 0.25])],
        outputs: vec![stereo(&[0.0; 3])],
        input_parameter_changes: vec![ParameterChange {
            id: 100,
            sample_offset: 0,
            value: 0.75,
        }],
        ..ProcessData::default()
    };
    for _ in 0..3 {
        assert_eq!(processor.process(&mut data).unwrap(), TResult::OK);
    }

    assert_eq!(data.outputs, vec![stereo(&[1.0, -2.0, 0.5])]);
    assert_eq!(data.inputs, vec![stereo(&[0.5, -1.0, 0.25])]);
    assert_eq!(data.output_parameter_changes.len(), 1);

    drop(proxy);
    bridge.shutdown().unwrap();
}

#[test]
fn concurrent_control_calls_all_complete() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, CONTROLLER_CLASS);

    thread::scope(|scope| {
        for id in 0..8u32 {
            let proxy = proxy.clone();
            scope.spawn(move || {
                let controller = proxy.cast::<kinds::EditController>().unwrap();
                for step in 0..10 {
                    let value = f64::from(step) / 10.0;
                    assert_eq!(controller.set_param_normalized(id, value).unwrap(), TResult::OK);
                }
            });
        }
    });

    let controller = proxy.cast::<kinds::EditController>().unwrap();
    for id in 0..8u32 {
        assert_eq!(controller.normalized_param_value(id).unwrap(), 0.9);
    }
    assert_eq!(bridge.factory.object(0).with_state(|s| s.params.len()), 80);

    drop(proxy);
    bridge.shutdown().unwrap();
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn destruct_is_idempotent_and_leaves_other_instances_alone() {
    let bridge = Bridge::start();
    let first = create(&bridge, PROCESSOR_CLASS);
    let second = create(&bridge, CONTROLLER_CLASS);
    assert_eq!(bridge.host.instance_count(), 2);

    first.destruct().unwrap();
    first.destruct().unwrap();
    assert_eq!(first.state(), ProxyState::Destructed);
    assert!(!first.supports(InterfaceKind::Component));
    assert_eq!(bridge.host.instance_count(), 1);

    // A destruct for an id that never existed is acknowledged too.
    let ack = bridge
        .native
        .control()
        .send_message(&Destruct { instance_id: 4242 }, None)
        .unwrap();
    assert_eq!(ack, Ack);

    let controller = second.cast::<kinds::EditController>().unwrap();
    assert_eq!(controller.parameter_count().unwrap(), 1);

    drop((first, second));
    bridge.shutdown().unwrap();
}

#[test]
fn calls_after_destruct_fail_locally() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, CONTROLLER_CLASS);
    let alias = proxy.clone();
    proxy.destruct().unwrap();

    assert!(alias.cast::<kinds::EditController>().is_none());
    let id = alias.instance_id();
    assert!(matches!(
        alias.refresh_capabilities(),
        Err(Error::Destructed(destructed)) if destructed == id
    ));

    drop((proxy, alias));
    bridge.shutdown().unwrap();
}

#[test]
fn dropping_the_last_clone_releases_the_remote_object() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, PROCESSOR_CLASS);
    let clone = proxy.clone();

    drop(proxy);
    assert_eq!(bridge.host.instance_count(), 1);
    drop(clone);
    assert_eq!(bridge.host.instance_count(), 0);

    bridge.shutdown().unwrap();
}

#[test]
fn initialize_swaps_in_interfaces_exposed_afterwards() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, LATE_UNITS_CLASS);
    assert!(proxy.cast::<kinds::UnitInfo>().is_none());

    let host = MockHost::new(true);
    let base = proxy.cast::<kinds::PluginBase>().unwrap();
    assert_eq!(base.initialize(host.clone()).unwrap(), TResult::OK);
    assert_eq!(base.initialize(host).unwrap(), TResult::FALSE);

    let units = proxy.cast::<kinds::UnitInfo>().unwrap();
    assert_eq!(units.unit_count().unwrap(), 1);
    assert_eq!(units.unit_info(0).unwrap().unwrap().name, "Root");

    // Nothing changed since, so an explicit refresh is a no-op.
    let before = proxy.capabilities();
    assert_eq!(proxy.refresh_capabilities().unwrap(), TResult::OK);
    assert_eq!(*proxy.capabilities(), *before);

    drop(proxy);
    bridge.shutdown().unwrap();
}

#[test]
fn failed_channel_setup_keeps_the_previous_interfaces() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, LATE_AUDIO_CLASS);
    assert!(!proxy.supports(InterfaceKind::AudioProcessor));

    // Occupy the dedicated channel's socket path so neither side can use it.
    let blocked = bridge.native.endpoints().audio_processor(proxy.instance_id());
    std::fs::create_dir(&blocked).unwrap();

    let base = proxy.cast::<kinds::PluginBase>().unwrap();
    assert!(matches!(base.initialize(MockHost::new(true)), Err(Error::Transport(_))));
    assert!(proxy.cast::<kinds::AudioProcessor>().is_none());
    assert_eq!(proxy.query_interface(InterfaceKind::AudioProcessor), TResult::NO_INTERFACE);

    // Once the path is free again a refresh brings the channel up.
    std::fs::remove_dir(&blocked).unwrap();
    assert_eq!(proxy.refresh_capabilities().unwrap(), TResult::OK);
    let processor = proxy.cast::<kinds::AudioProcessor>().unwrap();
    assert_eq!(processor.latency_samples().unwrap(), 64);

    drop(proxy);
    bridge.shutdown().unwrap();
}

// ── Host callbacks ────────────────────────────────────────────

#[test]
fn plugin_callbacks_reach_the_registered_host_objects() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, CONTROLLER_CLASS);
    let host = MockHost::new(true);

    let base = proxy.cast::<kinds::PluginBase>().unwrap();
    assert_eq!(base.initialize(host.clone()).unwrap(), TResult::OK);
    let controller = proxy.cast::<kinds::EditController>().unwrap();
    assert_eq!(controller.set_component_handler(Some(host.clone())).unwrap(), TResult::OK);

    // Act as the plugin's own UI thread on the owning side.
    let real = bridge.factory.object(0);
    let context = real.with_state(|s| s.context.clone()).unwrap();
    let name = context.host_application().unwrap().name();
    assert_eq!(name, Ok("Mock Host".to_string()));

    let handler = real.with_state(|s| s.component_handler.clone()).unwrap();
    let edits = handler.component_handler().unwrap();
    assert_eq!(edits.begin_edit(100), TResult::OK);
    assert_eq!(edits.perform_edit(100, 0.5), TResult::OK);
    assert_eq!(edits.end_edit(100), TResult::OK);
    assert_eq!(
        host.calls(),
        vec![
            HostCall::BeginEdit(100),
            HostCall::PerformEdit(100, 0.5),
            HostCall::EndEdit(100),
        ]
    );

    drop(proxy);
    bridge.shutdown().unwrap();
}

#[test]
fn host_contexts_only_expose_implemented_interfaces() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, CONTROLLER_CLASS);
    let host: Arc<dyn HostContext> = MockHost::new(false);

    let base = proxy.cast::<kinds::PluginBase>().unwrap();
    assert_eq!(base.initialize(host).unwrap(), TResult::OK);

    let context = bridge
        .factory
        .object(0)
        .with_state(|s| s.context.clone())
        .unwrap();
    assert!(context.host_application().is_some());
    assert!(context.component_handler().is_none());

    drop(proxy);
    bridge.shutdown().unwrap();
}

#[test]
fn connected_objects_are_linked_directly_on_the_owning_side() {
    let bridge = Bridge::start();
    let processor = create(&bridge, PROCESSOR_CLASS);
    let controller = create(&bridge, CONTROLLER_CLASS);

    let point = processor.cast::<kinds::ConnectionPoint>().unwrap();
    assert_eq!(point.connect(&controller).unwrap(), TResult::OK);

    let real_processor = bridge.factory.object(0);
    let real_controller = bridge.factory.object(1);
    let peer = real_processor.with_state(|s| s.peer.clone()).unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&peer), Arc::as_ptr(&real_controller)));

    let message = Message::new("meter").with("level", AttributeValue::Float(-6.0));
    let target = controller.cast::<kinds::ConnectionPoint>().unwrap();
    assert_eq!(target.notify(message.clone()).unwrap(), TResult::OK);
    assert_eq!(real_controller.with_state(|s| s.notifications.clone()), vec![message]);

    assert_eq!(point.disconnect(&controller).unwrap(), TResult::OK);
    assert!(real_processor.with_state(|s| s.peer.is_none()));

    drop((processor, controller));
    bridge.shutdown().unwrap();
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_fails_outstanding_proxies_and_cleans_up() {
    let bridge = Bridge::start();
    let proxy = create(&bridge, CONTROLLER_CLASS);
    let base_dir = bridge.native.endpoints().base_dir().to_path_buf();
    let host = Arc::clone(&bridge.host);

    bridge.shutdown().unwrap();
    assert_eq!(host.instance_count(), 0);
    assert!(!base_dir.exists());

    let controller = proxy.cast::<kinds::EditController>().unwrap();
    assert!(matches!(
        controller.parameter_count(),
        Err(Error::Transport(TransportError::Closed))
    ));
}

#[test]
fn repeated_start_and_shutdown_never_hang() {
    for iteration in 0..20 {
        let (done, finished) = mpsc::channel();
        thread::spawn(move || {
            let bridge = Bridge::start();
            let proxy = create(&bridge, PROCESSOR_CLASS);
            let base_dir = bridge.native.endpoints().base_dir().to_path_buf();
            drop(proxy);
            let result = bridge.shutdown();
            let _ = done.send((result.is_ok(), base_dir.exists()));
        });

        let (clean, left_behind) = finished
            .recv_timeout(Duration::from_secs(5))
            .unwrap_or_else(|_| panic!("iteration {iteration}: shutdown did not finish"));
        assert!(clean, "iteration {iteration}: owning side failed");
        assert!(!left_behind, "iteration {iteration}: endpoint directory left behind");
    }
}
