//! Host loop: delivers fixed-rate ticks with measured deltas to a plugin
//! and prints the projected model to stdout as JSON lines.

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use livesync_engine::core::{LivenessState, Projection};
use livesync_engine::{Deriver, EngineStatus, ExternalSource, HostPlugin, SyncEngine};
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior, interval};

/// Decides when a model update is worth printing: immediately on a liveness
/// change, otherwise at most once per `min_spacing` while the model changes.
pub struct Emitter<P> {
    min_spacing: Duration,
    last_model: Option<P>,
    last_liveness: Option<LivenessState>,
    last_emit: Option<Instant>,
}

impl<P: Clone + PartialEq> Emitter<P> {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_model: None,
            last_liveness: None,
            last_emit: None,
        }
    }

    pub fn should_emit(&mut self, now: Instant, liveness: LivenessState, model: &P) -> bool {
        let liveness_changed = self.last_liveness != Some(liveness);
        let model_changed = self.last_model.as_ref() != Some(model);
        let spaced = self
            .last_emit
            .is_none_or(|at| now.duration_since(at) >= self.min_spacing);

        if liveness_changed || (model_changed && spaced) {
            self.last_liveness = Some(liveness);
            self.last_model = Some(model.clone());
            self.last_emit = Some(now);
            return true;
        }
        false
    }
}

#[derive(Serialize)]
struct Update<'a, P> {
    status: EngineStatus,
    model: &'a P,
}

/// Drive `engine` until ctrl-c, SIGTERM or `run_for` elapses.
pub async fn run<S, D, P>(
    engine: &mut SyncEngine<S, D, P>,
    tick_rate_hz: f64,
    print_spacing: Duration,
    run_for: Option<Duration>,
) -> anyhow::Result<()>
where
    S: ExternalSource,
    D: Deriver,
    P: Projection<Payload = S::Payload, Artifact = D::Artifact> + Send + Clone + Serialize,
{
    let period = Duration::from_secs_f64(1.0 / tick_rate_hz);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = async {
        match run_for {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut emitter = Emitter::new(print_spacing);
    let stdout = std::io::stdout();

    tracing::info!(
        source = engine.source().name(),
        tick_rate_hz,
        "host loop started"
    );
    engine.on_activate();
    let mut last = Instant::now();

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                break Ok(());
            }
            _ = &mut deadline => {
                tracing::info!("run duration elapsed");
                break Ok(());
            }
            now = ticker.tick() => {
                let delta = now.duration_since(last).as_secs_f64();
                last = now;
                engine.on_host_tick(delta).await;

                if emitter.should_emit(now, engine.liveness(), engine.model()) {
                    let update = Update { status: engine.status(), model: engine.model() };
                    if let Err(e) = print_update(&stdout, &update) {
                        break Err(e);
                    }
                }
            }
        }
    };

    engine.on_deactivate();
    tracing::info!(status = ?engine.status(), "host loop stopped");
    result
}

fn print_update<P: Serialize>(stdout: &std::io::Stdout, update: &Update<'_, P>) -> anyhow::Result<()> {
    let line = serde_json::to_string(update).context("failed to encode model")?;
    let mut out = stdout.lock();
    writeln!(out, "{line}").context("failed to write to stdout")?;
    out.flush().context("failed to write to stdout")
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
