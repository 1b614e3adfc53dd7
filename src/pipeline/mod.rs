//! Voice command pipeline: capture worker, session gate, dispatcher and
//! speech output, wired together by the coordinator.

pub mod capture;
pub mod coordinator;
pub mod dispatch;
pub mod messages;
pub mod output;
pub mod phrases;
pub mod session;
pub mod signal;
