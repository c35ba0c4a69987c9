//! A controller run shared by the `run` and `simulate` commands.
//!
//! Owns the controller, the renderer task, and the accept/ignore tallies.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::args::ControllerArgs;
use crate::cli::render::{Renderer, spawn_renderer};
use crate::config::resolve_timing;
use crate::error::TrafficLightError;
use crate::phase::PhaseController;

/// A live controller wired to its renderer.
#[derive(Debug)]
pub struct Session {
    controller: PhaseController,
    renderer: Arc<Renderer>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    accepted: u64,
    ignored: u64,
}

impl Session {
    /// Resolves timing, starts metrics if requested, and brings up a
    /// controller at stable red with its renderer attached. `quiet` drops
    /// the human-readable lines.
    ///
    /// # Errors
    ///
    /// Returns a config error for a bad timing file, an I/O error if the
    /// event file cannot be opened, or a metrics error if the Prometheus
    /// listener cannot be started.
    pub fn start(args: &ControllerArgs, quiet: bool) -> Result<Self, TrafficLightError> {
        let timing = resolve_timing(args.config.as_deref())?;

        if let Some(port) = args.metrics_port {
            crate::observability::init_metrics(Some(port))?;
            tracing::info!(port, "Prometheus metrics endpoint started");
        }

        let renderer = Arc::new(Renderer::new(args.format, args.events.as_deref(), quiet)?);
        let controller = PhaseController::new(timing);

        // Subscribe before the first request so no change is missed.
        let cancel = CancellationToken::new();
        let task = spawn_renderer(
            controller.subscribe(),
            Arc::clone(&renderer),
            cancel.clone(),
        );

        renderer.started(&timing);
        tracing::info!(
            green_guard = ?timing.green_guard,
            red_guard = ?timing.red_guard,
            red_to_green_delay = ?timing.red_to_green_delay,
            green_to_red_delay = ?timing.green_to_red_delay,
            "controller started"
        );

        Ok(Self {
            controller,
            renderer,
            cancel,
            task,
            accepted: 0,
            ignored: 0,
        })
    }

    /// The controller being driven.
    #[must_use]
    pub const fn controller(&self) -> &PhaseController {
        &self.controller
    }

    /// Presses "Change" once. `offset` is the scripted time of the press,
    /// if any.
    pub fn press(&mut self, offset: Option<Duration>) -> bool {
        let controller = &self.controller;
        let accepted = self
            .renderer
            .press(offset, || controller.request_advance());
        if accepted {
            self.accepted += 1;
        } else {
            self.ignored += 1;
        }
        accepted
    }

    /// Waits for pending deferred halves unless `cancel` fires first, then
    /// ends the run with `reason`, or with `interrupted` if cancelled.
    pub async fn finish_or_interrupt(self, reason: &str, cancel: &CancellationToken) {
        let controller = self.controller.clone();
        tokio::select! {
            () = cancel.cancelled() => self.stop("interrupted").await,
            () = controller.settled() => self.finish(reason).await,
        }
    }

    /// Requests accepted so far.
    #[must_use]
    pub const fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Requests ignored so far.
    #[must_use]
    pub const fn ignored(&self) -> u64 {
        self.ignored
    }

    /// Lets pending deferred halves fire, drains the renderer, and reports
    /// the end of the run.
    pub async fn finish(self, reason: &str) {
        self.controller.settled().await;
        self.stop(reason).await;
    }

    /// Ends the run without waiting for pending deferred halves.
    pub async fn stop(self, reason: &str) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "renderer task failed");
        }
        self.renderer.stopped(reason, self.accepted, self.ignored);
        tracing::info!(
            reason,
            accepted = self.accepted,
            ignored = self.ignored,
            "controller stopped"
        );
    }
}
