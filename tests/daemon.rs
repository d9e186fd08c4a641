//! Daemon integration tests
//!
//! Runs the full loop against a scripted transport and assistant

use std::sync::Arc;
use std::time::Duration;

use herald::interpreter::ERROR_RESPONSE;
use herald::voice::TransportEvent;
use herald::{
    AssistantReply, CommandInterpreter, Daemon, HostAction, RecordingActions, Speaker,
};
use serde_json::json;

mod common;

use common::{ScriptedClient, ScriptedTransport, clock_at};

const TICK: Duration = Duration::from_millis(5);

fn daemon(
    client: &Arc<ScriptedClient>,
    transport: ScriptedTransport,
    actions: &Arc<RecordingActions>,
) -> Daemon<ScriptedTransport> {
    let interpreter = CommandInterpreter::new(client.clone())
        .with_clock(clock_at("2024-01-01T09:05:03Z"));
    Daemon::new(Arc::new(interpreter), transport, actions.clone()).with_poll_interval(TICK)
}

#[tokio::test]
async fn converses_until_input_closes() {
    let client = Arc::new(ScriptedClient::new().reply(AssistantReply::text("Hi there.")));
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) = ScriptedTransport::saying(&["hello", "what time is it"]);

    let transcript = daemon(&client, transport, &actions).run(true).await.unwrap();

    let texts: Vec<&str> = transcript.all().iter().map(|e| e.text()).collect();
    assert_eq!(
        texts,
        vec![
            "hello",
            "Hi there.",
            "what time is it",
            "The current time is 9:05:03 AM."
        ]
    );
    assert_eq!(client.prompts(), vec!["hello"]);

    let log = log.lock().unwrap();
    assert_eq!(log.spoken, vec!["Hi there.", "The current time is 9:05:03 AM."]);
    // Third capture finds the script exhausted
    assert_eq!(log.captures, 3);
    assert!(actions.performed().is_empty());
}

#[tokio::test]
async fn speaks_with_the_preferred_voice() {
    let client = Arc::new(ScriptedClient::new().reply(AssistantReply::text("Bonjour.")));
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) = ScriptedTransport::saying(&["hello"]);

    let d = daemon(&client, transport, &actions);
    assert_eq!(d.voice().map(|v| v.name.as_str()), Some("Samantha"));

    d.with_preferred_voice(Some("thomas")).run(true).await.unwrap();

    assert_eq!(log.lock().unwrap().voices, vec![Some("Thomas".to_string())]);
}

#[tokio::test]
async fn send_email_fires_host_action() {
    let client = Arc::new(ScriptedClient::new().reply(AssistantReply::call(
        "send_email",
        json!({"recipient": "a@b.com", "subject": "Hi", "body": "Yo"}),
    )));
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) = ScriptedTransport::saying(&["email a@b.com"]);

    daemon(&client, transport, &actions).run(true).await.unwrap();

    assert_eq!(
        actions.performed(),
        vec![HostAction::ComposeMail {
            recipient: "a@b.com".to_string(),
            subject: "Hi".to_string(),
            body: "Yo".to_string(),
        }]
    );
    let log = log.lock().unwrap();
    assert_eq!(
        log.spoken,
        vec!["I'm opening your email client to send a message to a@b.com."]
    );
    // Still active after speaking, so listening restarted
    assert_eq!(log.captures, 2);
}

#[tokio::test]
async fn remote_failure_stops_listening() {
    let client = Arc::new(ScriptedClient::new().fail("timeout"));
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) = ScriptedTransport::saying(&["tell me a joke", "unused"]);

    let transcript = daemon(&client, transport, &actions)
        .once(true)
        .run(true)
        .await
        .unwrap();

    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.last().map(|e| e.text()), Some(ERROR_RESPONSE));

    let log = log.lock().unwrap();
    assert_eq!(log.spoken, vec![ERROR_RESPONSE]);
    assert_eq!(log.captures, 1);
}

#[tokio::test]
async fn panicking_resolution_is_answered_with_apology() {
    let client = Arc::new(ScriptedClient::new().panicking());
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) = ScriptedTransport::saying(&["crash please", "unused"]);

    let transcript = daemon(&client, transport, &actions)
        .once(true)
        .run(true)
        .await
        .unwrap();

    let texts: Vec<&str> = transcript.all().iter().map(|e| e.text()).collect();
    assert_eq!(texts, vec!["crash please", ERROR_RESPONSE]);
    assert_eq!(client.prompts(), vec!["crash please"]);

    let log = log.lock().unwrap();
    assert_eq!(log.spoken, vec![ERROR_RESPONSE]);
    // The failure deactivates, so nothing else is captured
    assert_eq!(log.captures, 1);
}

#[tokio::test]
async fn capture_error_is_logged_but_not_spoken() {
    let client = Arc::new(ScriptedClient::new());
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) =
        ScriptedTransport::new(vec![Some(TransportEvent::CaptureError("no-speech".into()))]);

    let transcript = daemon(&client, transport, &actions)
        .once(true)
        .run(true)
        .await
        .unwrap();

    let entry = transcript.last().expect("error entry");
    assert_eq!(entry.speaker(), Speaker::Assistant);
    assert_eq!(entry.text(), "Speech recognition error: no-speech");
    assert!(log.lock().unwrap().spoken.is_empty());
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn once_exits_after_first_answer() {
    let client = Arc::new(
        ScriptedClient::new()
            .reply(AssistantReply::text("First."))
            .reply(AssistantReply::text("Second.")),
    );
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) = ScriptedTransport::saying(&["one", "two"]);

    let transcript = daemon(&client, transport, &actions)
        .once(true)
        .run(true)
        .await
        .unwrap();

    assert_eq!(transcript.len(), 2);
    assert_eq!(client.prompts(), vec!["one"]);
    // Relistened after speaking, then stopped on exit
    let log = log.lock().unwrap();
    assert_eq!(log.captures, 2);
    assert_eq!(log.stops, 1);
}

#[tokio::test]
async fn interrupt_deactivates_then_exits() {
    let client = Arc::new(ScriptedClient::new());
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) = ScriptedTransport::new(vec![None]);

    let d = daemon(&client, transport, &actions);
    let handle = d.handle();
    handle.interrupt();
    handle.interrupt();

    let transcript = d.run(true).await.unwrap();

    assert!(transcript.is_empty());
    let log = log.lock().unwrap();
    assert_eq!(log.captures, 1);
    assert_eq!(log.stops, 1);
}

#[tokio::test]
async fn shutdown_stops_an_active_session() {
    let client = Arc::new(ScriptedClient::new());
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) = ScriptedTransport::new(vec![None]);

    let d = daemon(&client, transport, &actions);
    d.handle().shutdown();
    d.run(true).await.unwrap();

    // Capture is released on the way out
    assert_eq!(log.lock().unwrap().stops, 1);
}

#[tokio::test]
async fn late_answer_after_toggle_off_is_spoken_once() {
    let client = Arc::new(
        ScriptedClient::new()
            .reply(AssistantReply::text("Slow answer."))
            .with_delay(Duration::from_millis(50)),
    );
    let actions = Arc::new(RecordingActions::new());
    let (transport, log) = ScriptedTransport::saying(&["slow question", "unused"]);

    let d = daemon(&client, transport, &actions).once(true);
    d.handle().toggle();

    let transcript = d.run(true).await.unwrap();

    assert_eq!(transcript.len(), 2);
    let log = log.lock().unwrap();
    assert_eq!(log.spoken, vec!["Slow answer."]);
    // No relisten after a deactivated turn
    assert_eq!(log.captures, 1);
}
