//! Integration test utilities for the gateway client
//!
//! `MockDiscord` serves the discovery endpoint, a websocket gateway and the
//! REST routes the client calls, recording everything it receives.

pub mod mock;

pub use mock::{
    dispatch, hello, ready, MockConnection, MockDiscord, RecordedRequest, WAIT,
};
