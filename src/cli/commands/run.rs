//! Interactive `run` command
//!
//! Every line read from stdin presses "Change". `q` or `quit` ends the
//! run, as does end of input. Cancellation ends it without waiting for
//! pending transitions.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::cli::args::{OutputFormat, RunArgs};
use crate::cli::session::Session;
use crate::error::TrafficLightError;

/// What a line of input asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Press,
    Quit,
}

fn parse_line(line: &str) -> Input {
    match line.trim() {
        "q" | "quit" => Input::Quit,
        _ => Input::Press,
    }
}

/// Run the light interactively on stdin.
///
/// # Errors
///
/// Returns an error if the session cannot start or stdin cannot be read.
pub async fn run(
    args: &RunArgs,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<(), TrafficLightError> {
    let session = Session::start(&args.controller, quiet)?;
    if args.controller.format == OutputFormat::Human && !quiet {
        eprintln!("Press Enter to push \"Change\", q to quit.");
    }
    drive(session, BufReader::new(tokio::io::stdin()), cancel).await
}

async fn drive<R>(
    mut session: Session,
    input: R,
    cancel: CancellationToken,
) -> Result<(), TrafficLightError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let reason = loop {
        let line = tokio::select! {
            () = cancel.cancelled() => {
                session.stop("interrupted").await;
                return Ok(());
            }
            line = lines.next_line() => line?,
        };
        match line {
            Some(line) => match parse_line(&line) {
                Input::Press => {
                    session.press(None);
                }
                Input::Quit => break "quit",
            },
            None => break "end of input",
        }
    };
    session.finish_or_interrupt(reason, &cancel).await;
    Ok(())
}
