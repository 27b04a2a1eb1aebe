//! Playback engine integration tests
//!
//! Drive the engine through its handle with a fake audio backend and check
//! state, queue and status together.

mod helpers;

use helpers::TestPlayer;
use snowlander_common::events::{QueueAction, SnowEvent};
use snowlander_player::db::queue;
use snowlander_player::playback::{EngineSettings, RequestOutcome, SessionOutcome};
use snowlander_player::Error;
use std::time::Duration;

#[tokio::test]
async fn test_play_requires_connection() {
    let test = TestPlayer::start().await;
    let track = test.add_track("Aurora", "Borealis").await;

    let result = test.player.play_track(track).await;
    assert!(matches!(result, Err(Error::NotConnected)));
    assert!(test.backend.sessions().is_empty());
}

#[tokio::test]
async fn test_play_track_updates_status() {
    let test = TestPlayer::connected().await;
    let track = test.add_track("Aurora", "Borealis").await;

    test.player.play_track(track.clone()).await.unwrap();

    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(snapshot.is_connected);
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.position, 0.0);
    let current = snapshot.current_track.unwrap();
    assert_eq!(current.id, track.id);
    assert_eq!(current.play_count, 1);

    let session = test.backend.last_session();
    assert_eq!(session.request.track_id, track.id);
    assert_eq!(session.request.path.to_string_lossy(), track.filepath);
}

#[tokio::test]
async fn test_failed_launch_leaves_idle() {
    let test = TestPlayer::connected().await;
    let track = test.add_track("Missing", "Nobody").await;
    test.backend.fail_path(&track.filepath);

    let result = test.player.play_track(track).await;
    assert!(matches!(result, Err(Error::ExternalFailure(_))));

    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(!snapshot.is_playing);
    assert!(snapshot.current_track.is_none());

    // Idle: pause is rejected
    assert!(matches!(test.player.pause().await, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_failed_launch_stops_previous_session() {
    let test = TestPlayer::connected().await;
    let good = test.add_track("Good", "Band").await;
    let bad = test.add_track("Bad", "Band").await;
    test.backend.fail_path(&bad.filepath);

    test.player.play_track(good).await.unwrap();
    let first = test.backend.last_session().request.session_id;

    assert!(test.player.play_track(bad).await.is_err());
    assert!(test.backend.session(first).stopped);
    assert!(matches!(test.player.resume().await, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_pause_resume_keeps_current_track() {
    let test = TestPlayer::connected().await;
    let track = test.add_track("Aurora", "Borealis").await;
    test.player.play_track(track.clone()).await.unwrap();
    test.backend.set_position(42.0);

    test.player.pause().await.unwrap();
    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.position, 42.0);
    assert_eq!(snapshot.current_track.unwrap().id, track.id);
    assert!(test.backend.last_session().paused);

    // Paused: pause again is rejected
    assert!(matches!(test.player.pause().await, Err(Error::InvalidState(_))));

    test.player.resume().await.unwrap();
    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.current_track.unwrap().id, track.id);
    assert!(!test.backend.last_session().paused);

    assert!(matches!(test.player.resume().await, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_pause_while_idle_does_not_touch_status() {
    let test = TestPlayer::connected().await;
    let mut events = test.player.subscribe();

    let result = test.player.pause().await;
    assert!(matches!(result, Err(Error::InvalidState(_))));

    test.settle().await;
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_stop_is_noop_when_idle() {
    let test = TestPlayer::connected().await;
    let mut events = test.player.subscribe();

    test.player.stop().await.unwrap();
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_stop_clears_current_track() {
    let test = TestPlayer::connected().await;
    let track = test.add_track("Aurora", "Borealis").await;
    test.player.play_track(track).await.unwrap();

    test.player.stop().await.unwrap();

    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(!snapshot.is_playing);
    assert!(snapshot.current_track.is_none());
    assert!(test.backend.last_session().stopped);
    assert!(matches!(test.player.pause().await, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_completion_plays_next_in_queue() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let b = test.add_track("Beta", "Two").await;

    test.player.play_track(a.clone()).await.unwrap();
    let entry = test.player.enqueue(b.id, Some("42".into())).await.unwrap();
    assert_eq!(entry.position, 1);

    test.backend.complete_last().await;
    test.settle().await;

    assert_eq!(test.backend.started_tracks(), vec![a.id, b.id]);
    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.current_track.unwrap().id, b.id);
    assert_eq!(snapshot.queue_length, 0);
    assert!(queue::get_entry(&test.db, entry.id).await.unwrap().entry.played);

    // B completes with an empty queue: Idle
    test.backend.complete_last().await;
    test.settle().await;

    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(!snapshot.is_playing);
    assert!(snapshot.current_track.is_none());
    assert_eq!(test.backend.sessions().len(), 2);
}

#[tokio::test]
async fn test_failed_session_also_advances() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let b = test.add_track("Beta", "Two").await;

    test.player.play_track(a).await.unwrap();
    test.player.enqueue(b.id, None).await.unwrap();

    let id = test.backend.last_session().request.session_id;
    test.backend
        .finish(id, SessionOutcome::Failed("broken pipe".into()))
        .await;
    test.settle().await;

    let snapshot = test.player.current_snapshot().await.unwrap();
    assert_eq!(snapshot.current_track.unwrap().id, b.id);
}

#[tokio::test]
async fn test_auto_advance_skips_entries_that_fail_to_launch() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let broken = test.add_track("Broken", "Two").await;
    let c = test.add_track("Gamma", "Three").await;
    test.backend.fail_path(&broken.filepath);

    test.player.play_track(a.clone()).await.unwrap();
    let broken_entry = test.player.enqueue(broken.id, None).await.unwrap();
    test.player.enqueue(c.id, None).await.unwrap();

    test.backend.complete_last().await;
    test.settle().await;

    assert_eq!(test.backend.started_tracks(), vec![a.id, c.id]);
    assert!(queue::get_entry(&test.db, broken_entry.id).await.unwrap().entry.played);
    assert_eq!(queue::pending_count(&test.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stale_completion_is_ignored() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let b = test.add_track("Beta", "Two").await;
    let c = test.add_track("Gamma", "Three").await;

    test.player.play_track(a).await.unwrap();
    let first = test.backend.last_session().request.session_id;
    test.player.play_track(b.clone()).await.unwrap();
    test.player.enqueue(c.id, None).await.unwrap();

    // The replaced session reports its end late
    test.backend.finish(first, SessionOutcome::Stopped).await;
    test.settle().await;

    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.current_track.unwrap().id, b.id);
    assert_eq!(snapshot.queue_length, 1);
}

#[tokio::test]
async fn test_skip_advances_queue() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let b = test.add_track("Beta", "Two").await;

    test.player.play_track(a).await.unwrap();
    let first = test.backend.last_session().request.session_id;
    test.player.enqueue(b.id, None).await.unwrap();

    test.player.skip().await.unwrap();

    assert!(test.backend.session(first).stopped);
    let snapshot = test.player.current_snapshot().await.unwrap();
    assert_eq!(snapshot.current_track.unwrap().id, b.id);

    // The skipped session's own completion arrives afterwards and is stale
    test.backend.finish(first, SessionOutcome::Stopped).await;
    test.settle().await;
    assert_eq!(test.backend.sessions().len(), 2);
}

#[tokio::test]
async fn test_skip_while_idle_is_invalid() {
    let test = TestPlayer::connected().await;
    assert!(matches!(test.player.skip().await, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_connection_loss_goes_idle_and_keeps_queue() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let b = test.add_track("Beta", "Two").await;

    test.player.play_track(a).await.unwrap();
    test.player.enqueue(b.id, None).await.unwrap();

    test.player.connection_lost().await;
    test.settle().await;

    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(!snapshot.is_connected);
    assert!(!snapshot.is_playing);
    assert!(snapshot.current_track.is_none());
    assert_eq!(snapshot.queue_length, 1);
    assert!(test.backend.last_session().stopped);

    assert!(matches!(
        test.player.play_track(b).await,
        Err(Error::NotConnected)
    ));
}

#[tokio::test]
async fn test_completion_while_disconnected_does_not_advance() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let b = test.add_track("Beta", "Two").await;

    test.player.play_track(a).await.unwrap();
    test.player.enqueue(b.id, None).await.unwrap();
    let id = test.backend.last_session().request.session_id;

    test.player.disconnect().await.unwrap();
    test.backend.finish(id, SessionOutcome::Completed).await;
    test.settle().await;

    assert_eq!(test.backend.sessions().len(), 1);
    assert_eq!(queue::pending_count(&test.db).await.unwrap(), 1);

    let snapshot = test.player.current_snapshot().await.unwrap();
    assert!(snapshot.channel_id.is_none());
}

#[tokio::test]
async fn test_set_volume_clamps_and_applies_to_next_session() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let b = test.add_track("Beta", "Two").await;

    test.player.play_track(a).await.unwrap();
    assert_eq!(test.backend.last_session().request.volume, 0.5);

    assert_eq!(test.player.set_volume(1.7).await.unwrap(), 1.0);
    assert_eq!(test.player.set_volume(-0.2).await.unwrap(), 0.0);
    assert_eq!(test.player.set_volume(0.8).await.unwrap(), 0.8);
    assert!(matches!(
        test.player.set_volume(f32::NAN).await,
        Err(Error::InvalidState(_))
    ));

    // Running session keeps its volume
    assert_eq!(test.backend.sessions()[0].request.volume, 0.5);
    assert_eq!(test.player.current_snapshot().await.unwrap().volume, 0.8);

    test.player.play_track(b).await.unwrap();
    assert_eq!(test.backend.last_session().request.volume, 0.8);
}

#[tokio::test]
async fn test_request_plays_when_idle_and_queues_when_playing() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Snow Song", "Lander").await;
    let b = test.add_track("Rain Song", "Lander").await;

    match test.player.request("snow", Some("7".into())).await.unwrap() {
        RequestOutcome::Started(track) => assert_eq!(track.id, a.id),
        other => panic!("expected Started, got {:?}", other),
    }

    match test.player.request("rain", Some("7".into())).await.unwrap() {
        RequestOutcome::Queued { track, entry } => {
            assert_eq!(track.id, b.id);
            assert_eq!(entry.position, 1);
            assert_eq!(entry.requested_by.as_deref(), Some("7"));
        }
        other => panic!("expected Queued, got {:?}", other),
    }

    assert!(test.player.request("hail", None).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_enqueue_unknown_track() {
    let test = TestPlayer::connected().await;
    let result = test.player.enqueue(999, None).await;
    assert!(matches!(result, Err(Error::TrackNotFound(999))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enqueues_get_distinct_positions() {
    let test = TestPlayer::connected().await;
    let track_id = test.add_track("Aurora", "Borealis").await.id;

    let calls: Vec<_> = (0..20)
        .map(|i| {
            let player = test.player.clone();
            tokio::spawn(async move { player.enqueue(track_id, Some(format!("user-{}", i))).await })
        })
        .collect();

    let mut positions = Vec::new();
    for call in calls {
        positions.push(call.await.unwrap().unwrap().position);
    }
    positions.sort_unstable();

    assert_eq!(positions, (1..=20).collect::<Vec<i64>>());
    assert_eq!(queue::pending_count(&test.db).await.unwrap(), 20);
}

#[tokio::test]
async fn test_queue_events_precede_status_update() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let mut events = test.player.subscribe();

    let entry = test.player.enqueue(a.id, None).await.unwrap();

    match events.recv().await {
        Some(SnowEvent::QueueUpdate {
            action,
            data,
            queue_item_id,
        }) => {
            assert_eq!(action, QueueAction::Added);
            assert_eq!(queue_item_id, Some(entry.id));
            assert_eq!(data.unwrap().track.id, a.id);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    match events.recv().await {
        Some(SnowEvent::StatusUpdate { data }) => assert_eq!(data.queue_length, 1),
        other => panic!("unexpected event: {:?}", other),
    }

    assert!(test.player.remove_from_queue(entry.id).await.unwrap());
    assert_eq!(events.recv().await, Some(SnowEvent::queue_removed(entry.id)));
    match events.recv().await {
        Some(SnowEvent::StatusUpdate { data }) => assert_eq!(data.queue_length, 0),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_track_started_event() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    let mut events = test.player.subscribe();

    test.player.play_track(a.clone()).await.unwrap();

    match events.recv().await {
        Some(SnowEvent::TrackUpdate { data }) => assert_eq!(data.id, a.id),
        other => panic!("unexpected event: {:?}", other),
    }
    match events.recv().await {
        Some(SnowEvent::StatusUpdate { data }) => {
            assert!(data.is_playing);
            assert_eq!(data.current_track.unwrap().id, a.id);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_position_tick_updates_status() {
    let test = TestPlayer::start_with(EngineSettings {
        position_interval: Duration::from_millis(20),
        ..EngineSettings::default()
    })
    .await;
    test.player.connect("g", "c").await.unwrap();
    let a = test.add_track("Alpha", "One").await;
    test.player.play_track(a).await.unwrap();
    test.backend.set_position(3.5);

    let mut position = 0.0;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        position = test.player.current_snapshot().await.unwrap().position;
        if position > 0.0 {
            break;
        }
    }
    assert_eq!(position, 3.5);
}

#[tokio::test]
async fn test_shutdown_stops_engine() {
    let test = TestPlayer::connected().await;
    let a = test.add_track("Alpha", "One").await;
    test.player.play_track(a).await.unwrap();

    test.player.shutdown().await;
    test.engine_task.await.unwrap();

    assert!(test.backend.last_session().stopped);
    assert!(matches!(
        test.player.pause().await,
        Err(Error::EngineUnavailable)
    ));
}
