//! Loading indicator for questions.
//!
//! While a question is in flight the user sees `thinking...`, then
//! `done in N ms`. Progress goes to **stderr** so stdout stays parseable
//! for scripts.

use std::io::Write;
use std::time::Duration;

/// A single progress event for a question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AskProgress {
    /// The prompt has been sent; no reply yet.
    Waiting,
    /// A reply (or an error) arrived after `elapsed`.
    Finished { elapsed: Duration },
}

/// Reports question progress.
pub trait AskProgressReporter: Send + Sync {
    fn report(&self, event: AskProgress);
}

/// Human-friendly progress on stderr.
pub struct StderrProgress;

impl AskProgressReporter for StderrProgress {
    fn report(&self, event: AskProgress) {
        let line = progress_line(&event);
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl AskProgressReporter for NoProgress {
    fn report(&self, _event: AskProgress) {}
}

fn progress_line(event: &AskProgress) -> String {
    match event {
        AskProgress::Waiting => "thinking...\n".to_string(),
        AskProgress::Finished { elapsed } => format!("done in {} ms\n", elapsed.as_millis()),
    }
}

/// Progress mode for the CLI: off or human (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn AskProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
        }
    }
}
