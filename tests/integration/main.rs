//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one layer of the bridge
//! over real Unix domain sockets in a temporary directory. Both ends of
//! the bridge run in this process.

mod bridge_tests;
mod mock_plugin;
mod transport_tests;
