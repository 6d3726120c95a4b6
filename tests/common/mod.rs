//! Integration test common infrastructure.
//!
//! Provides an in-process mock IRC server, config fixtures, and fake
//! collaborators for driving CabalBot sessions end to end.

pub mod fixtures;
pub mod server;

#[allow(unused_imports)]
pub use fixtures::{FakeLookup, Recorded, RecordingHandler, TestEnv, session_config};
#[allow(unused_imports)]
pub use server::{MockServer, ServerConn};
