//! Main loop: owns the session, dispatches commands and drives speech output.
//!
//! The capture worker feeds two channels. This loop is the only consumer of
//! both and the only caller of [`SpeechOutput::speak`], so output is strictly
//! serialized and the session needs no locking.

use crate::config::VoxConfig;
use crate::device::DeviceController;
use crate::error::{Result, SpeechError};
use crate::llm::Completion;
use crate::pipeline::capture::CaptureWorker;
use crate::pipeline::dispatch::CommandDispatcher;
use crate::pipeline::messages::{Turn, Utterance};
use crate::pipeline::output::SpeechOutput;
use crate::pipeline::session::{GateDecision, Session};
use crate::pipeline::signal::OutputSignal;
use crate::stt::SpeechRecognizer;
use crate::tts::SpeechSynthesizer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Orchestrates the voice command loop.
pub struct PipelineCoordinator {
    config: VoxConfig,
    cancel: CancellationToken,
    signal: OutputSignal,
    session: Session,
    dispatcher: CommandDispatcher,
    output: SpeechOutput,
}

impl PipelineCoordinator {
    pub fn new(
        config: VoxConfig,
        synth: Box<dyn SpeechSynthesizer>,
        completion: Arc<dyn Completion>,
        device: Arc<dyn DeviceController>,
    ) -> Self {
        let signal = OutputSignal::new();
        let session = Session::new(&config.conversation, Instant::now());
        let dispatcher = CommandDispatcher::new(completion, device, &config.llm, &config.device);
        let output = SpeechOutput::new(synth, signal.clone());
        Self {
            config,
            cancel: CancellationToken::new(),
            signal,
            session,
            dispatcher,
            output,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal shared with the capture worker.
    pub fn signal(&self) -> OutputSignal {
        self.signal.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Spawn the capture worker for `recognizer` and run the loop until
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture thread cannot be started.
    pub async fn run(mut self, recognizer: Box<dyn SpeechRecognizer>) -> Result<()> {
        let (command_tx, command_rx) = mpsc::unbounded_channel::<Utterance>();
        let (interrupt_tx, interrupt_rx) = mpsc::unbounded_channel::<Utterance>();

        let worker = CaptureWorker::new(
            recognizer,
            self.signal.clone(),
            &self.config.listen,
            &self.config.barge_in,
            command_tx,
            interrupt_tx,
            self.cancel.clone(),
        );
        // Detached: the thread notices cancellation at its next listen boundary.
        let _capture = worker
            .spawn()
            .map_err(|e| SpeechError::Pipeline(format!("cannot start capture thread: {e}")))?;

        let result = self.serve(command_rx, interrupt_rx).await;
        self.cancel.cancel();
        result
    }

    /// The loop proper, fed by already-connected channels.
    ///
    /// Returns when cancelled or when the command channel closes.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for fatal stage errors.
    pub async fn serve(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<Utterance>,
        mut interrupts: mpsc::UnboundedReceiver<Utterance>,
    ) -> Result<()> {
        let poll_interval = Duration::from_millis(self.config.listen.poll_interval_ms.max(1));
        info!(
            "listening, say \"{}\" to start",
            self.config.conversation.wake_phrase
        );

        loop {
            let wait = self
                .session
                .time_until_timeout(Instant::now())
                .unwrap_or(poll_interval);

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    info!("main loop cancelled");
                    break;
                }
                received = tokio::time::timeout(wait, commands.recv()) => match received {
                    Ok(Some(utterance)) => self.handle_utterance(utterance, &mut interrupts).await,
                    Ok(None) => {
                        info!("command channel closed, stopping");
                        break;
                    }
                    Err(_) => {}
                },
            }

            if self
                .session
                .check_timeout(Instant::now(), self.signal.is_speaking())
            {
                let notice = self.config.conversation.timeout_notice.clone();
                self.say(&notice, &mut interrupts).await;
            }
        }

        Ok(())
    }

    async fn handle_utterance(
        &mut self,
        utterance: Utterance,
        interrupts: &mut mpsc::UnboundedReceiver<Utterance>,
    ) {
        debug!(
            "utterance \"{}\" queued for {:.0}ms",
            utterance.text,
            utterance.captured_at.elapsed().as_millis()
        );

        let command = match self.session.admit(&utterance.text, Instant::now()) {
            GateDecision::Discard => return,
            GateDecision::Opened { command } => {
                let greeting = self.config.conversation.greeting.clone();
                self.say(&greeting, interrupts).await;
                self.session.touch(Instant::now());
                command
            }
            GateDecision::Continue { command } => command,
        };

        let Some(command) = command else {
            return;
        };

        info!("command: \"{command}\"");
        let context = self
            .session
            .recent(self.config.conversation.context_turns);
        self.session.record(Turn::user(command.as_str()));

        let reply = self.dispatcher.dispatch(&command, &context).await;
        let interrupted = self.say(&reply.text, interrupts).await;

        self.session.record(Turn::assistant(reply.text, interrupted));
        self.session.touch(Instant::now());
    }

    /// Speak `text` and report whether the user barged in.
    async fn say(
        &mut self,
        text: &str,
        interrupts: &mut mpsc::UnboundedReceiver<Utterance>,
    ) -> bool {
        let stale = drain(interrupts);
        if stale > 0 {
            debug!("discarded {stale} stale interrupt(s)");
        }

        let outcome = self.output.speak(text).await;
        let raised = drain(interrupts) > 0;
        outcome.interrupted || raised
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Utterance>) -> usize {
    let mut count = 0;
    while rx.try_recv().is_ok() {
        count += 1;
    }
    count
}
