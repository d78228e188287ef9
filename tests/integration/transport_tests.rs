//! Integration tests for the ad-hoc transport and the typed router on top
//! of it, using a small test traffic class.

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

use bridgework::rpc::MessageHandler;
use bridgework::transport::AdHocChannel;
use bridgework::{Error, TransportError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub marker: u32,
    pub payload: Vec<u32>,
}

/// Blocks on the server until two of these are being handled at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rendezvous {
    pub marker: u32,
}

bridgework::request_union! {
    pub enum TestRequest in TestHandler, high_frequency = false {
        Echo: echo -> Echo,
        Rendezvous: rendezvous -> u32,
    }
}

struct Server {
    barrier: Barrier,
}

impl TestHandler for Server {
    fn echo(&self, request: Echo) -> Echo {
        request
    }

    fn rendezvous(&self, request: Rendezvous) -> u32 {
        self.barrier.wait();
        request.marker
    }
}

type Handler = Arc<MessageHandler<TestRequest>>;

fn echo(marker: u32) -> Echo {
    Echo {
        marker,
        payload: vec![marker; 4096],
    }
}

/// A connected receiver/sender pair with the receiver already serving.
fn serving_pair(dir: &Path, ad_hoc: bool) -> (Handler, Handler, thread::JoinHandle<()>) {
    let endpoint = dir.join("test.sock");
    let receiver = Arc::new(MessageHandler::new(
        AdHocChannel::new(endpoint.clone(), true, ad_hoc, 64).unwrap(),
        64,
    ));
    let sender = Arc::new(MessageHandler::new(
        AdHocChannel::new(endpoint, false, ad_hoc, 64).unwrap(),
        64,
    ));

    let r = Arc::clone(&receiver);
    let accept = thread::spawn(move || r.connect());
    sender.connect().unwrap();
    accept.join().unwrap().unwrap();

    let r = Arc::clone(&receiver);
    let serving = thread::spawn(move || {
        let server: Arc<dyn TestHandler> = Arc::new(Server {
            barrier: Barrier::new(2),
        });
        r.receive_messages(None, false, server).unwrap();
    });

    // The first response proves the receiver has bound its acceptor.
    assert_eq!(sender.send_message(&echo(0), None).unwrap(), echo(0));
    (receiver, sender, serving)
}

#[test]
fn sequential_calls_stay_on_the_primary() {
    let dir = tempfile::tempdir().unwrap();
    let (_receiver, sender, serving) = serving_pair(dir.path(), true);

    for marker in 1..20 {
        assert_eq!(sender.send_message(&echo(marker), None).unwrap(), echo(marker));
    }
    assert_eq!(sender.channel().auxiliary_connections(), 0);

    sender.close();
    serving.join().unwrap();
}

#[test]
fn second_concurrent_caller_gets_exactly_one_auxiliary_channel() {
    let dir = tempfile::tempdir().unwrap();
    let (_receiver, sender, serving) = serving_pair(dir.path(), true);

    // Both calls block on the server until the other one arrives, so they
    // must be in flight at the same time.
    let callers: Vec<_> = [1, 2]
        .into_iter()
        .map(|marker| {
            let sender = Arc::clone(&sender);
            thread::spawn(move || sender.send_message(&Rendezvous { marker }, None).unwrap())
        })
        .collect();
    let mut markers: Vec<u32> = callers.into_iter().map(|c| c.join().unwrap()).collect();
    markers.sort_unstable();

    assert_eq!(markers, vec![1, 2]);
    assert_eq!(sender.channel().auxiliary_connections(), 1);

    sender.close();
    serving.join().unwrap();
}

#[test]
fn concurrent_responses_never_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let (_receiver, sender, serving) = serving_pair(dir.path(), true);

    let callers: Vec<_> = (1..=8)
        .map(|marker| {
            let sender = Arc::clone(&sender);
            thread::spawn(move || {
                for _ in 0..10 {
                    let response = sender.send_message(&echo(marker), None).unwrap();
                    assert_eq!(response.marker, marker);
                    assert!(response.payload.iter().all(|&m| m == marker));
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }

    sender.close();
    serving.join().unwrap();
}

#[test]
fn dedicated_channels_never_open_auxiliary_streams() {
    let dir = tempfile::tempdir().unwrap();
    let (_receiver, sender, serving) = serving_pair(dir.path(), false);

    let callers: Vec<_> = (1..=4)
        .map(|marker| {
            let sender = Arc::clone(&sender);
            thread::spawn(move || sender.send_message(&echo(marker), None).unwrap())
        })
        .collect();
    for (marker, caller) in (1..=4).zip(callers) {
        assert_eq!(caller.join().unwrap(), echo(marker));
    }
    assert_eq!(sender.channel().auxiliary_connections(), 0);

    sender.close();
    serving.join().unwrap();
}

#[test]
fn calls_after_close_fail_with_a_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let (receiver, sender, serving) = serving_pair(dir.path(), true);

    receiver.close();
    serving.join().unwrap();

    let result = sender.send_message(&echo(1), None);
    assert!(matches!(result, Err(bridgework::Error::Transport(_))));
}

/// A frame whose payload cannot be decoded as anything: a varint that
/// never terminates.
const GARBLED_FRAME: [u8; 5] = [1, 0, 0, 0, 0xff];

#[test]
fn garbled_response_on_the_primary_closes_the_channel() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = dir.path().join("test.sock");
    let peer = UnixListener::bind(&endpoint).unwrap();
    let sender = MessageHandler::<TestRequest>::new(
        AdHocChannel::new(endpoint, false, true, 64).unwrap(),
        64,
    );

    let answering = thread::spawn(move || {
        let (mut stream, _) = peer.accept().unwrap();
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).unwrap();
        let mut request = vec![0u8; u32::from_le_bytes(header) as usize];
        stream.read_exact(&mut request).unwrap();
        stream.write_all(&GARBLED_FRAME).unwrap();
        stream
    });
    sender.connect().unwrap();

    let result = sender.send_message(&echo(1), None);
    assert!(matches!(result, Err(Error::Protocol(_))));
    assert!(sender.channel().is_closed());

    let again = sender.send_message(&echo(2), None);
    assert!(matches!(again, Err(Error::Transport(TransportError::Closed))));
    drop(answering.join().unwrap());
}

#[test]
fn garbled_request_on_the_primary_ends_serving() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = dir.path().join("test.sock");
    let receiver = Arc::new(MessageHandler::<TestRequest>::new(
        AdHocChannel::new(endpoint.clone(), true, true, 64).unwrap(),
        64,
    ));

    let r = Arc::clone(&receiver);
    let serving = thread::spawn(move || {
        r.connect()?;
        let server: Arc<dyn TestHandler> = Arc::new(Server {
            barrier: Barrier::new(2),
        });
        r.receive_messages(None, false, server)
    });

    let mut peer = UnixStream::connect(&endpoint).unwrap();
    peer.write_all(&GARBLED_FRAME).unwrap();

    let served = serving.join().unwrap();
    assert!(matches!(served, Err(Error::Protocol(_))));
    assert!(receiver.channel().is_closed());

    // The receiver hung up instead of answering.
    let mut rest = Vec::new();
    peer.read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());
}
