//! voxloop: a hands-free voice command loop.
//!
//! Listens continuously, wakes on a configurable phrase, routes each command
//! either to a smart-home device or to a conversational backend, and speaks
//! the reply. Saying a stop phrase while it talks cuts the reply short.
//!
//! # Architecture
//!
//! Two execution contexts connected by channels:
//! - **Capture worker**: an OS thread calling a blocking [`stt::SpeechRecognizer`]
//!   and routing utterances to the command or interrupt channel
//! - **Main loop**: [`PipelineCoordinator`], which owns the session, dispatches
//!   commands and drives [`tts::SpeechSynthesizer`] output
//!
//! The two share a single atomic [`pipeline::signal::OutputSignal`] so the
//! capture side knows when output is in flight and can request a stop.

pub mod config;
pub mod device;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod stt;
pub mod tts;

pub use config::VoxConfig;
pub use error::{Result, SpeechError};
pub use pipeline::coordinator::PipelineCoordinator;
