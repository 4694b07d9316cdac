//! WebSocket layer: upgrade handler, session lifecycle, envelopes.
//!
//! The endpoint at `/ws` carries the chat: each text frame is an inbound
//! envelope answered with an ack, and accepted messages are broadcast to
//! every other live connection.

pub mod connection;
pub mod handler;
pub mod messages;
