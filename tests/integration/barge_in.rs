//! Barge-in through a real capture thread: a stop phrase heard while a reply
//! is playing cuts the reply short and tags it in history.

use crate::helpers::{
    CannedCompletion, CountingDevice, RecordingSynth, scripted_recognizer, spoken_texts,
    test_config, wait_until,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use voxloop::PipelineCoordinator;
use voxloop::pipeline::capture::CaptureWorker;
use voxloop::pipeline::messages::{Speaker, Turn};

const STORY: &str = "Once upon a time there was a small lamp that lived on a desk \
    by the window and every evening it watched the sun go down over the hills \
    while the cat slept on the warm keyboard beside it";

#[tokio::test]
async fn stop_phrase_cuts_reply_and_tags_history() {
    let config = test_config();
    let (recognizer, feed) = scripted_recognizer();
    let (synth, log) = RecordingSynth::new();
    let synth = synth
        .with_word_delay(Duration::from_millis(10))
        .with_barge_in(feed.clone(), "stop", 20, 3);

    let completion = CannedCompletion::new(STORY);
    let mut coordinator = PipelineCoordinator::new(
        config.clone(),
        Box::new(synth),
        completion.clone(),
        Arc::new(CountingDevice::default()),
    );

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (interrupt_tx, interrupt_rx) = mpsc::unbounded_channel();
    let capture = CaptureWorker::new(
        Box::new(recognizer),
        coordinator.signal(),
        &config.listen,
        &config.barge_in,
        command_tx,
        interrupt_tx,
        coordinator.cancel_token(),
    )
    .spawn()
    .unwrap();

    feed.send("hello tell me a story".to_owned()).unwrap();

    let cancel = coordinator.cancel_token();
    let watch_log = Arc::clone(&log);
    tokio::spawn(async move {
        wait_until(|| watch_log.lock().unwrap().len() >= 2).await;
        cancel.cancel();
    });

    tokio::time::timeout(
        Duration::from_secs(10),
        coordinator.serve(command_rx, interrupt_rx),
    )
    .await
    .expect("loop should stop once the story was rendered")
    .unwrap();

    let rendered = log.lock().unwrap().clone();
    assert_eq!(rendered.len(), 2);
    assert!(!rendered[0].was_cut_short(), "greeting plays in full");
    assert!(rendered[1].was_cut_short(), "story stops early");
    assert!(rendered[1].words_rendered >= 3);

    let history: Vec<Turn> = coordinator.session().history().iter().cloned().collect();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], Turn::user("tell me a story"));
    assert_eq!(history[1].speaker, Speaker::Assistant);
    assert!(history[1].interrupted);

    // "stop" went to the interrupt channel, never to the dispatcher.
    assert_eq!(completion.requests.lock().unwrap().len(), 1);
    assert!(!spoken_texts(&log).iter().any(|t| t.contains("didn't understand")));

    drop(feed);
    capture.join().unwrap();
}

#[tokio::test]
async fn non_stop_speech_during_reply_is_ignored() {
    let config = test_config();
    let (recognizer, feed) = scripted_recognizer();
    let (synth, log) = RecordingSynth::new();
    let synth = synth
        .with_word_delay(Duration::from_millis(5))
        .with_barge_in(feed.clone(), "that sounds nice", 20, 3);

    let completion = CannedCompletion::new(STORY);
    let mut coordinator = PipelineCoordinator::new(
        config.clone(),
        Box::new(synth),
        completion.clone(),
        Arc::new(CountingDevice::default()),
    );

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (interrupt_tx, interrupt_rx) = mpsc::unbounded_channel();
    let capture = CaptureWorker::new(
        Box::new(recognizer),
        coordinator.signal(),
        &config.listen,
        &config.barge_in,
        command_tx,
        interrupt_tx,
        coordinator.cancel_token(),
    )
    .spawn()
    .unwrap();

    feed.send("hello tell me a story".to_owned()).unwrap();

    let cancel = coordinator.cancel_token();
    let watch_log = Arc::clone(&log);
    tokio::spawn(async move {
        wait_until(|| watch_log.lock().unwrap().len() >= 2).await;
        cancel.cancel();
    });

    tokio::time::timeout(
        Duration::from_secs(10),
        coordinator.serve(command_rx, interrupt_rx),
    )
    .await
    .expect("loop should stop once the story was rendered")
    .unwrap();

    let rendered = log.lock().unwrap().clone();
    assert!(!rendered[1].was_cut_short());
    let history: Vec<Turn> = coordinator.session().history().iter().cloned().collect();
    assert_eq!(history.len(), 2);
    assert!(!history[1].interrupted);

    drop(feed);
    capture.join().unwrap();
}
