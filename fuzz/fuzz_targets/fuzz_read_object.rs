//! Fuzz target: `read_object` / `decode_into`
//!
//! Feeds arbitrary byte streams through the frame reader for every traffic
//! class and asserts that whatever decodes re-encodes cleanly, and that
//! decoding in place over a used value yields the same payload again.
//!
//! cargo fuzz run fuzz_read_object

#![no_main]

use std::io::Cursor;

use bridgework::messages::{AudioProcessorRequest, CallbackRequest, ControlRequest};
use bridgework::wire::{SerializationBuffer, decode_into, encode, read_object};
use libfuzzer_sys::fuzz_target;
use serde::Serialize;
use serde::de::DeserializeOwned;

fn check<T>(data: &[u8])
where
    T: Serialize + DeserializeOwned,
{
    let mut buffer = SerializationBuffer::new();
    let mut reader = Cursor::new(data);
    while let Ok(mut object) = read_object::<_, T>(&mut reader, &mut buffer) {
        let payload = encode(&object).expect("decoded objects re-encode");
        decode_into(&payload, &mut object).expect("in-place decode of a valid payload");
        assert_eq!(encode(&object).expect("re-encode after in-place decode"), payload);
    }
}

fuzz_target!(|data: &[u8]| {
    check::<ControlRequest>(data);
    check::<CallbackRequest>(data);
    check::<AudioProcessorRequest>(data);
});
