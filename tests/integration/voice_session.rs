//! End-to-end session behavior through the coordinator, with collaborators
//! mocked and the clock paused.

use crate::helpers::{
    CannedCompletion, CountingDevice, RecordingSynth, SpeechLog, spoken_texts, test_config,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use voxloop::PipelineCoordinator;
use voxloop::device::DeviceCommand;
use voxloop::pipeline::dispatch::NOT_UNDERSTOOD;
use voxloop::pipeline::messages::{Turn, Utterance};
use voxloop::pipeline::session::SessionState;

const GREETING: &str = "Hello! How can I help?";
const NOTICE: &str = "Going quiet now. Say hello when you need me.";

struct Session {
    coordinator: PipelineCoordinator,
    log: SpeechLog,
    completion: Arc<CannedCompletion>,
    device: Arc<CountingDevice>,
}

impl Session {
    fn new(reply: &str) -> Self {
        let (synth, log) = RecordingSynth::new();
        let completion = CannedCompletion::new(reply);
        let device = Arc::new(CountingDevice::default());
        let coordinator = PipelineCoordinator::new(
            test_config(),
            Box::new(synth),
            completion.clone(),
            device.clone(),
        );
        Self {
            coordinator,
            log,
            completion,
            device,
        }
    }

    /// Feed `lines` at t=0 and run the loop for `duration` of virtual time.
    async fn hear(&mut self, lines: &[&str], duration: Duration) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (_interrupt_tx, interrupt_rx) = mpsc::unbounded_channel();
        for line in lines {
            command_tx.send(Utterance::new(*line)).unwrap();
        }

        let cancel = self.coordinator.cancel_token();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            cancel.cancel();
        });

        self.coordinator
            .serve(command_rx, interrupt_rx)
            .await
            .unwrap();
        drop(command_tx);
    }

    fn history(&self) -> Vec<Turn> {
        self.coordinator
            .session()
            .history()
            .iter()
            .cloned()
            .collect()
    }

    fn device_calls(&self) -> Vec<DeviceCommand> {
        self.device
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }
}

#[tokio::test(start_paused = true)]
async fn hello_turn_on_lights_switches_device_on() {
    let mut s = Session::new("unused");
    s.hear(&["hello turn on lights"], Duration::from_secs(1))
        .await;

    assert_eq!(s.coordinator.session().state(), SessionState::Active);
    assert_eq!(
        s.device_calls(),
        vec![DeviceCommand {
            code: "switch_led".to_owned(),
            value: true
        }]
    );
    assert_eq!(s.device.calls.lock().unwrap()[0].0, "dev-1");
    assert_eq!(
        spoken_texts(&s.log),
        vec![GREETING, "Device turn on lights successfully"]
    );
}

#[tokio::test(start_paused = true)]
async fn hello_question_goes_to_completion() {
    let mut s = Session::new("It is sunny");
    s.hear(&["hello what is the weather"], Duration::from_secs(1))
        .await;

    assert_eq!(s.coordinator.session().state(), SessionState::Active);
    assert_eq!(
        s.history(),
        vec![
            Turn::user("what is the weather"),
            Turn::assistant("It is sunny", false)
        ]
    );
    let requests = s.completion.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0], vec![Turn::user("what is the weather")]);
}

#[tokio::test(start_paused = true)]
async fn unknown_device_phrase_is_not_understood() {
    let mut s = Session::new("unused");
    s.hear(&["hello", "turn on fan"], Duration::from_secs(1))
        .await;

    assert!(s.device_calls().is_empty());
    assert_eq!(spoken_texts(&s.log), vec![GREETING, NOT_UNDERSTOOD]);
}

#[tokio::test(start_paused = true)]
async fn idle_ignores_speech_without_wake_phrase() {
    let mut s = Session::new("unused");
    s.hear(
        &["turn on lights", "what is the weather", "othello is a play"],
        Duration::from_secs(1),
    )
    .await;

    assert_eq!(s.coordinator.session().state(), SessionState::Idle);
    assert!(s.history().is_empty());
    assert!(spoken_texts(&s.log).is_empty());
    assert!(s.device_calls().is_empty());
    assert!(s.completion.requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeated_command_is_executed_each_time() {
    let mut s = Session::new("unused");
    s.hear(
        &["hello", "turn on lights", "turn on lights"],
        Duration::from_secs(1),
    )
    .await;

    assert_eq!(s.device_calls().len(), 2);
    let history = s.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1], history[3]);
}

#[tokio::test(start_paused = true)]
async fn silent_minute_returns_to_idle_exactly_once() {
    let mut s = Session::new("It is sunny");
    s.hear(
        &["hello what is the weather"],
        Duration::from_secs(60 * 5),
    )
    .await;

    assert_eq!(s.coordinator.session().state(), SessionState::Idle);
    assert!(s.history().is_empty());
    let notices = spoken_texts(&s.log)
        .into_iter()
        .filter(|t| t == NOTICE)
        .count();
    assert_eq!(notices, 1);
}

#[tokio::test(start_paused = true)]
async fn session_stays_open_within_the_timeout() {
    let mut s = Session::new("It is sunny");
    s.hear(&["hello what is the weather"], Duration::from_secs(59))
        .await;

    assert_eq!(s.coordinator.session().state(), SessionState::Active);
    assert_eq!(s.history().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn completion_sees_only_the_configured_context_window() {
    let mut s = Session::new("ok");
    s.hear(&["hello q1", "q2", "q3", "q4"], Duration::from_secs(1))
        .await;

    let requests = s.completion.requests.lock().unwrap();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0], vec![Turn::user("q1")]);

    // Six turns of history exist before "q4"; the oldest one is left out.
    let last = &requests[3];
    assert_eq!(last.len(), 6);
    assert_eq!(last[0], Turn::assistant("ok", false));
    assert_eq!(last[1], Turn::user("q2"));
    assert_eq!(last[5], Turn::user("q4"));
}
