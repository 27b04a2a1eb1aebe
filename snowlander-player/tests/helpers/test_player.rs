//! Engine over an in-memory database

use super::fake_backend::FakeBackend;
use snowlander_common::db::{create_schema, NewTrack, Track};
use snowlander_player::db::tracks::insert_track;
use snowlander_player::playback::{EngineSettings, PlaybackEngine, PlayerHandle};
use snowlander_player::sse::EventFanout;
use snowlander_player::status::StatusAggregator;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct TestPlayer {
    pub player: PlayerHandle,
    pub backend: FakeBackend,
    pub db: Pool<Sqlite>,
    pub engine_task: JoinHandle<()>,
}

impl TestPlayer {
    pub async fn start() -> Self {
        Self::start_with(EngineSettings {
            // Keep the position tick out of the way unless a test wants it
            position_interval: Duration::from_secs(3600),
            ..EngineSettings::default()
        })
        .await
    }

    pub async fn start_with(settings: EngineSettings) -> Self {
        // One connection: every connection to :memory: is its own database
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&db).await.unwrap();

        let status = StatusAggregator::load(
            db.clone(),
            EventFanout::new(100),
            0.5,
            Duration::from_secs(2),
        )
        .await
        .unwrap();

        let backend = FakeBackend::new();
        let (player, engine_task) =
            PlaybackEngine::spawn(db.clone(), status, Box::new(backend.clone()), settings);

        Self {
            player,
            backend,
            db,
            engine_task,
        }
    }

    /// Start and connect to a voice channel
    pub async fn connected() -> Self {
        let test = Self::start().await;
        test.player.connect("guild-1", "channel-1").await.unwrap();
        test
    }

    pub async fn add_track(&self, title: &str, artist: &str) -> Track {
        let filename = format!("{}.mp3", title.to_lowercase().replace(' ', "_"));
        insert_track(
            &self.db,
            &NewTrack {
                filepath: format!("/music/{}", filename),
                filename,
                title: Some(title.to_string()),
                artist: Some(artist.to_string()),
                duration: Some(180.0),
                format: Some("mp3".to_string()),
                ..NewTrack::default()
            },
        )
        .await
        .unwrap()
    }

    /// Wait until the engine has handled everything sent before this call
    ///
    /// The mailbox is FIFO, so a round trip through it drains earlier
    /// messages. Removing a nonexistent entry has no side effects.
    pub async fn settle(&self) {
        assert!(!self.player.remove_from_queue(i64::MIN).await.unwrap());
    }
}
