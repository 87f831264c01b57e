// src/core/dispatch/mod.rs

//! Command and event forwarding logic (§4.4, §4.5): decides a `ForwardDecision`
//! without performing any I/O itself (§9, "transport decoupling").

pub mod command;
pub mod event;

pub use command::CommandDispatcher;
pub use event::EventForwarder;
