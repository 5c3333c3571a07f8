//! HTTP control surface for channel management.
//!
//! A deliberately tiny contract:
//!
//! ```text
//! GET /{secret}/CREATE_CHANNEL/{name}[/{name}...]  ->  200 "OK" | 404 "FAIL"
//! GET /{secret}/REMOVE_CHANNEL/{name}[/{name}...]  ->  200 "OK" | 404 "FAIL"
//! anything else                                    ->  404 "FAIL"
//! ```
//!
//! Callers learn success or failure, never why; the request log is the only
//! diagnostic channel. Whoever knows the secret can manage channels, which
//! is the entire authorization model.

mod server;

pub use server::{start_server, ControlState};
