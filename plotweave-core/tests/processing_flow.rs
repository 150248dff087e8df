//! Upload, polling, and session startup tests.
//!
//! The poll loop is driven through the mock gateway with a zero interval,
//! so these run instantly and deterministically.

use std::time::Duration;

use plotweave_core::sample::sample_books;
use plotweave_core::testing::{book_at, line, ready_book, scene, script, MockGateway};
use plotweave_core::{
    BookStatus, EngineEvent, PollConfig, PollControl, PollError, ScriptGateway, SessionError,
    StorySession,
};

fn instant_poll() -> PollConfig {
    PollConfig::default().with_interval(Duration::ZERO)
}

fn error_book(id: &str, message: Option<&str>) -> plotweave_core::Book {
    let mut book = book_at(id, BookStatus::Error, 40);
    book.error = message.map(str::to_string);
    book
}

// =============================================================================
// POLLING
// =============================================================================

#[tokio::test]
async fn test_poll_reports_every_tick_and_resolves_on_ready() {
    let gateway = MockGateway::new()
        .queue_status(book_at("b1", BookStatus::Processing, 10))
        .queue_status(book_at("b1", BookStatus::Analyzing, 50))
        .queue_status(book_at("b1", BookStatus::Ready, 100));

    let mut ticks = Vec::new();
    let mut on_progress = |status: BookStatus, progress: u8| {
        ticks.push((status, progress));
        PollControl::Continue
    };

    let book = gateway
        .poll_until_ready("b1", &instant_poll(), &mut on_progress)
        .await
        .unwrap();

    assert_eq!(book.status, BookStatus::Ready);
    assert_eq!(
        ticks,
        vec![
            (BookStatus::Processing, 10),
            (BookStatus::Analyzing, 50),
            (BookStatus::Ready, 100),
        ]
    );
    assert_eq!(gateway.get_book_calls(), 3);
}

#[tokio::test]
async fn test_poll_fails_with_server_message() {
    let gateway = MockGateway::new()
        .queue_status(book_at("b1", BookStatus::Processing, 10))
        .queue_status(error_book("b1", Some("could not extract text")));

    let result = gateway
        .poll_until_ready("b1", &instant_poll(), &mut |_, _| PollControl::Continue)
        .await;

    match result {
        Err(PollError::Failed(message)) => assert_eq!(message, "could not extract text"),
        other => panic!("expected PollError::Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_fails_with_generic_message_when_server_gave_none() {
    let gateway = MockGateway::new().queue_status(error_book("b1", None));

    let result = gateway
        .poll_until_ready("b1", &instant_poll(), &mut |_, _| PollControl::Continue)
        .await;

    match result {
        Err(PollError::Failed(message)) => {
            assert_eq!(message, "An error occurred during processing")
        }
        other => panic!("expected PollError::Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_times_out_after_max_attempts() {
    // A single non-terminal status is sticky, so the book never readies.
    let gateway = MockGateway::new().queue_status(book_at("b1", BookStatus::Generating, 90));
    let config = instant_poll().with_max_attempts(Some(5));

    let mut ticks = 0usize;
    let result = gateway
        .poll_until_ready("b1", &config, &mut |_, _| {
            ticks += 1;
            PollControl::Continue
        })
        .await;

    match result {
        Err(PollError::TimedOut { attempts }) => assert_eq!(attempts, 5),
        other => panic!("expected PollError::TimedOut, got {other:?}"),
    }
    assert_eq!(ticks, 5);
    assert_eq!(gateway.get_book_calls(), 5);
}

#[tokio::test]
async fn test_poll_unknown_status_keeps_polling() {
    // A status string this client does not know must not end the loop.
    let gateway = MockGateway::new()
        .queue_status(book_at("b1", BookStatus::Unknown, 95))
        .queue_status(ready_book("b1"));

    let book = gateway
        .poll_until_ready("b1", &instant_poll(), &mut |_, _| PollControl::Continue)
        .await
        .unwrap();
    assert!(book.is_ready());
    assert_eq!(gateway.get_book_calls(), 2);
}

#[tokio::test]
async fn test_poll_cancellation_stops_before_next_request() {
    let gateway = MockGateway::new().queue_status(book_at("b1", BookStatus::Processing, 10));

    let mut ticks = 0usize;
    let result = gateway
        .poll_until_ready("b1", &instant_poll(), &mut |_, _| {
            ticks += 1;
            if ticks == 2 {
                PollControl::Cancel
            } else {
                PollControl::Continue
            }
        })
        .await;

    assert!(matches!(result, Err(PollError::Cancelled)));
    assert_eq!(gateway.get_book_calls(), 2);
}

// =============================================================================
// UPLOAD FLOW
// =============================================================================

#[tokio::test]
async fn test_upload_and_process_success() {
    let gateway = MockGateway::new()
        .with_upload(book_at("b7", BookStatus::Uploading, 0))
        .queue_status(book_at("b7", BookStatus::Processing, 30))
        .queue_status(ready_book("b7"));
    let mut session = StorySession::new(gateway).with_poll_config(instant_poll());

    let mut stages = Vec::new();
    let book = session
        .upload_and_process("Dracula", "Bram Stoker", "dracula.pdf", vec![1, 2, 3], &mut |s, _| {
            stages.push(s)
        })
        .await
        .unwrap();

    assert_eq!(book.id, "b7");
    assert!(book.is_ready());
    assert_eq!(stages, vec![BookStatus::Processing, BookStatus::Ready]);
}

#[tokio::test]
async fn test_upload_failure_surfaces_as_gateway_error() {
    let mut session =
        StorySession::new(MockGateway::new()).with_poll_config(instant_poll());

    let result = session
        .upload_and_process("T", "A", "t.pdf", vec![], &mut |_, _| {})
        .await;

    assert!(matches!(result, Err(SessionError::Gateway(_))));
}

#[tokio::test]
async fn test_session_cancellation_mid_poll() {
    let gateway = MockGateway::new()
        .with_upload(book_at("b1", BookStatus::Uploading, 0))
        .queue_status(book_at("b1", BookStatus::Processing, 10));
    let mut session = StorySession::new(gateway).with_poll_config(instant_poll());

    // Simulates the user leaving for the bookshelf while processing runs:
    // the progress callback invalidates the generation, and the next tick
    // cancels before any further request.
    let generation = session.generation();
    let mut ticks = 0usize;
    let result = session
        .upload_and_process("T", "A", "t.pdf", vec![], &mut |_, _| {
            ticks += 1;
            if ticks == 1 {
                generation.invalidate();
            }
        })
        .await;

    assert!(matches!(result, Err(SessionError::Poll(PollError::Cancelled))));
    assert_eq!(ticks, 1, "no progress after invalidation");
}

// =============================================================================
// OPENING BOOKS
// =============================================================================

#[tokio::test]
async fn test_open_sample_book_skips_backend() {
    let gateway = MockGateway::new();
    let mut session = StorySession::new(gateway.clone());
    let books = sample_books();

    let engine = session
        .open_book(&books[0], &mut |_, _| {})
        .await
        .unwrap();

    assert_eq!(engine.current_scene().id, "scene_1");
    assert_eq!(gateway.get_book_calls(), 0);
}

#[tokio::test]
async fn test_open_ready_book_fetches_script_without_polling() {
    let gateway = MockGateway::new().with_script(
        "b1",
        script("Dracula", vec![scene("scene_1", vec![line("Narrator", "Night falls.")])]),
    );
    let mut session = StorySession::new(gateway.clone()).with_poll_config(instant_poll());

    let engine = session
        .open_book(&ready_book("b1"), &mut |_, _| {})
        .await
        .unwrap();

    assert_eq!(engine.script().title, "Dracula");
    assert_eq!(gateway.get_book_calls(), 0);
}

#[tokio::test]
async fn test_open_unready_book_polls_first() {
    let gateway = MockGateway::new()
        .queue_status(book_at("b1", BookStatus::Generating, 80))
        .queue_status(ready_book("b1"))
        .with_script(
            "b1",
            script("Gatsby", vec![scene("scene_1", vec![line("Narrator", "West Egg.")])]),
        );
    let mut session = StorySession::new(gateway.clone()).with_poll_config(instant_poll());

    let engine = session
        .open_book(&book_at("b1", BookStatus::Generating, 80), &mut |_, _| {})
        .await
        .unwrap();

    assert_eq!(engine.script().title, "Gatsby");
    assert_eq!(gateway.get_book_calls(), 2);
}

#[tokio::test]
async fn test_open_book_script_failure_is_fatal() {
    let mut session =
        StorySession::new(MockGateway::new()).with_poll_config(instant_poll());

    let result = session.open_book(&ready_book("b1"), &mut |_, _| {}).await;

    assert!(matches!(result, Err(SessionError::Gateway(_))));
    let events = session.take_events();
    assert!(
        events.iter().any(|e| matches!(e, EngineEvent::FatalError(_))),
        "script load failure must surface a fatal error event"
    );
}

#[tokio::test]
async fn test_open_book_with_empty_script_is_fatal() {
    let gateway = MockGateway::new().with_script("b1", script("Hollow", vec![]));
    let mut session = StorySession::new(gateway).with_poll_config(instant_poll());

    let result = session.open_book(&ready_book("b1"), &mut |_, _| {}).await;

    assert!(matches!(result, Err(SessionError::Engine(_))));
    let events = session.take_events();
    assert!(events.iter().any(|e| matches!(e, EngineEvent::FatalError(_))));
}

// =============================================================================
// BOOKSHELF
// =============================================================================

#[tokio::test]
async fn test_bookshelf_uses_backend_books() {
    let gateway = MockGateway::new().with_books(vec![ready_book("b1"), ready_book("b2")]);
    let mut session = StorySession::new(gateway);

    let books = session.load_bookshelf().await;
    assert_eq!(books.len(), 2);
    assert!(session.take_events().is_empty());
}

#[tokio::test]
async fn test_bookshelf_falls_back_to_samples_when_empty() {
    let mut session = StorySession::new(MockGateway::new());

    let books = session.load_bookshelf().await;
    assert_eq!(books.len(), 4);
    assert!(books.iter().all(|b| b.id.starts_with("sample")));
    // An empty shelf is not an error; no warning is shown.
    assert!(session.take_events().is_empty());
}

#[tokio::test]
async fn test_bookshelf_falls_back_to_samples_on_failure_with_warning() {
    let mut session = StorySession::new(MockGateway::new().failing_books());

    let books = session.load_bookshelf().await;
    assert_eq!(books.len(), 4);
    let events = session.take_events();
    assert!(events.iter().any(|e| matches!(e, EngineEvent::UserWarning(_))));
}

#[tokio::test]
async fn test_connectivity_probe() {
    let session = StorySession::new(MockGateway::new());
    assert!(session.check_connectivity().await);

    let session = StorySession::new(MockGateway::new().offline());
    assert!(!session.check_connectivity().await);
}
