//! External decoder backend
//!
//! Each session is one decoder process (ffmpeg by default) writing raw PCM
//! to stdout. A pump task copies that PCM into the configured sink and
//! counts the bytes, which gives the playback position. Pausing makes the
//! pump stop reading, so the decoder blocks on a full pipe until resumed.

use super::session::{AudioBackend, AudioSession, SessionNotifier, SessionOutcome, SessionRequest};
use crate::error::{Error, Result};
use snowlander_common::config::DecoderConfig;
use snowlander_common::time::pcm_bytes_to_secs;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

const PUMP_BUFFER_BYTES: usize = 16 * 1024;
const KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawns one decoder process per session
pub struct DecoderBackend {
    config: DecoderConfig,
}

impl DecoderBackend {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Expand the argument template for one session
    pub fn build_args(&self, request: &SessionRequest) -> Vec<String> {
        let path = request.path.to_string_lossy();
        let volume = format!("{}", request.volume);
        self.config
            .args
            .iter()
            .map(|arg| arg.replace("{path}", &path).replace("{volume}", &volume))
            .collect()
    }
}

impl AudioBackend for DecoderBackend {
    fn start(
        &mut self,
        request: SessionRequest,
        notifier: SessionNotifier,
    ) -> Result<Box<dyn AudioSession>> {
        if !request.path.is_file() {
            return Err(Error::ExternalFailure(format!(
                "Audio file not found: {}",
                request.path.display()
            )));
        }

        let args = self.build_args(&request);
        debug!("Spawning {} {:?}", self.config.program.display(), args);

        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::ExternalFailure(format!(
                    "Failed to start decoder {}: {}",
                    self.config.program.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ExternalFailure("Decoder stdout not captured".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let session_id = request.session_id;
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("Decoder (session {}): {}", session_id, line);
                }
            });
        }

        info!(
            "Session {} started for track {} ({})",
            request.session_id,
            request.track_id,
            request.path.display()
        );

        let (paused_tx, paused_rx) = watch::channel(false);
        let (stop_tx, stop_rx) = watch::channel(false);
        let delivered = Arc::new(AtomicU64::new(0));

        let pump = Pump {
            session_id: request.session_id,
            child,
            output: self.config.output.clone(),
            paused: paused_rx,
            stop: stop_rx,
            delivered: Arc::clone(&delivered),
        };
        tokio::spawn(async move {
            let outcome = pump.run(stdout).await;
            notifier.finished(outcome).await;
        });

        Ok(Box::new(DecoderSession {
            session_id: request.session_id,
            paused: paused_tx,
            stop: stop_tx,
            delivered,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
        }))
    }
}

/// Control side of a running decoder session
pub struct DecoderSession {
    session_id: u64,
    paused: watch::Sender<bool>,
    stop: watch::Sender<bool>,
    delivered: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSession for DecoderSession {
    fn session_id(&self) -> u64 {
        self.session_id
    }

    fn pause(&mut self) -> Result<()> {
        self.paused
            .send(true)
            .map_err(|_| Error::ExternalFailure("Decoder session already ended".to_string()))
    }

    fn resume(&mut self) -> Result<()> {
        self.paused
            .send(false)
            .map_err(|_| Error::ExternalFailure("Decoder session already ended".to_string()))
    }

    fn stop(&mut self) {
        // The pump may already be gone after a natural end
        if self.stop.send(true).is_err() {
            debug!("Session {} already finished", self.session_id);
        }
    }

    fn position_secs(&self) -> f64 {
        pcm_bytes_to_secs(
            self.delivered.load(Ordering::Relaxed),
            self.sample_rate,
            self.channels,
        )
    }
}

struct Pump {
    session_id: u64,
    child: Child,
    output: Option<PathBuf>,
    paused: watch::Receiver<bool>,
    stop: watch::Receiver<bool>,
    delivered: Arc<AtomicU64>,
}

impl Pump {
    async fn run<R: AsyncRead + Unpin>(mut self, mut stdout: R) -> SessionOutcome {
        let output = self.output.clone();
        let mut sink: Box<dyn AsyncWrite + Unpin + Send> = match &output {
            Some(path) => match tokio::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .await
            {
                Ok(file) => Box::new(file),
                Err(e) => {
                    self.terminate().await;
                    return SessionOutcome::Failed(format!(
                        "Failed to open audio sink {}: {}",
                        path.display(),
                        e
                    ));
                }
            },
            None => Box::new(tokio::io::sink()),
        };

        let mut buf = vec![0u8; PUMP_BUFFER_BYTES];
        loop {
            let paused = *self.paused.borrow_and_update();
            if paused {
                tokio::select! {
                    changed = self.paused.changed() => {
                        if changed.is_err() {
                            self.terminate().await;
                            return SessionOutcome::Stopped;
                        }
                    }
                    _ = self.stop.changed() => {
                        self.terminate().await;
                        return SessionOutcome::Stopped;
                    }
                }
                continue;
            }

            tokio::select! {
                _ = self.stop.changed() => {
                    self.terminate().await;
                    return SessionOutcome::Stopped;
                }
                changed = self.paused.changed() => {
                    if changed.is_err() {
                        self.terminate().await;
                        return SessionOutcome::Stopped;
                    }
                }
                read = stdout.read(&mut buf) => match read {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Err(e) = sink.write_all(&buf[..n]).await {
                            self.terminate().await;
                            return SessionOutcome::Failed(format!("Audio sink write failed: {}", e));
                        }
                        self.delivered.fetch_add(n as u64, Ordering::Relaxed);
                    }
                    Err(e) => {
                        self.terminate().await;
                        return SessionOutcome::Failed(format!("Decoder read failed: {}", e));
                    }
                },
            }
        }

        if let Err(e) = sink.flush().await {
            warn!("Session {}: flushing audio sink failed: {}", self.session_id, e);
        }

        match self.child.wait().await {
            Ok(status) if status.success() => {
                debug!("Session {} decoder finished", self.session_id);
                SessionOutcome::Completed
            }
            Ok(status) => SessionOutcome::Failed(format!("Decoder exited with {}", status)),
            Err(e) => SessionOutcome::Failed(format!("Failed to wait for decoder: {}", e)),
        }
    }

    /// Kill the decoder and reap it; failures are logged only
    async fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!("Session {}: failed to kill decoder: {}", self.session_id, e);
            return;
        }
        match tokio::time::timeout(KILL_TIMEOUT, self.child.wait()).await {
            Ok(Ok(_)) => debug!("Session {} decoder terminated", self.session_id),
            Ok(Err(e)) => warn!("Session {}: failed to reap decoder: {}", self.session_id, e),
            Err(_) => warn!(
                "Session {}: decoder did not exit within {:?}",
                self.session_id, KILL_TIMEOUT
            ),
        }
    }
}
