//! Scripted `simulate` command
//!
//! Presses "Change" at fixed offsets from start and prints the resulting
//! timeline, then waits for every deferred half to land.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cli::args::SimulateArgs;
use crate::cli::session::Session;
use crate::error::TrafficLightError;

/// Run a scripted simulation.
///
/// # Errors
///
/// Returns an error if the session cannot start.
pub async fn run(
    args: &SimulateArgs,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<(), TrafficLightError> {
    let session = Session::start(&args.controller, quiet)?;
    play(session, &args.presses, &cancel).await;
    Ok(())
}

async fn play(mut session: Session, presses: &[Duration], cancel: &CancellationToken) {
    let mut script = presses.to_vec();
    script.sort_unstable();

    let start = Instant::now();
    for offset in script {
        tokio::select! {
            () = cancel.cancelled() => {
                session.stop("interrupted").await;
                return;
            }
            () = tokio::time::sleep(offset.saturating_sub(start.elapsed())) => {}
        }
        let accepted = session.press(Some(offset));
        tracing::debug!(?offset, accepted, "scripted press");
    }

    session.finish_or_interrupt("script complete", cancel).await;
}
