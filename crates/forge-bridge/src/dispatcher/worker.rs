//! Background half of a dispatched invocation.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::handle::{CancelSignal, InvocationId};
use crate::host::HostAdapter;
use crate::invoker::{OutputListener, OutputStream, ProcessInvoker};
use crate::registry::InvocationRegistry;
use crate::request::InvocationRequest;
use crate::result::InvocationResult;

use super::DISPATCH_TARGET;

/// Longest slice of an output line shown as progress.
const PROGRESS_LINE_LIMIT: usize = 100;

pub(super) struct Worker<I> {
    pub(super) invoker: Arc<I>,
    pub(super) registry: Arc<InvocationRegistry>,
    pub(super) host: Arc<dyn HostAdapter>,
    pub(super) request: InvocationRequest,
    pub(super) id: InvocationId,
    pub(super) signal: CancelSignal,
}

impl<I: ProcessInvoker> Worker<I> {
    /// Runs the invocation and delivers at most one notification.
    pub(super) fn run(self) {
        let target = self.request.target_path();
        let listener = ProgressListener {
            host: self.host.as_ref(),
            target,
        };
        let outcome = self.invoker.invoke(&self.request, &self.signal, &listener);

        let delivered = if self.registry.complete(target, self.id) {
            outcome
        } else {
            debug!(
                target: DISPATCH_TARGET,
                invocation_id = %self.id,
                discarded = outcome.kind(),
                "superseded result dropped"
            );
            InvocationResult::Cancelled
        };

        info!(
            target: DISPATCH_TARGET,
            path = %target.display(),
            invocation_id = %self.id,
            outcome = delivered.kind(),
            "invocation finished"
        );
        if let Some(notification) = delivered.notification() {
            notification.deliver(self.host.as_ref());
        }
    }
}

/// Forwards non-blank output lines to the host as progress text.
struct ProgressListener<'a> {
    host: &'a dyn HostAdapter,
    target: &'a Path,
}

impl OutputListener for ProgressListener<'_> {
    fn on_line(&self, _stream: OutputStream, line: &str) {
        if let Some(text) = progress_text(line) {
            self.host.report_progress(self.target, &text);
        }
    }
}

fn progress_text(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(PROGRESS_LINE_LIMIT).collect();
    let ellipsis = if chars.next().is_some() { "..." } else { "" };
    Some(format!("DataForge: {head}{ellipsis}"))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::progress_text;

    #[rstest]
    #[case("", None)]
    #[case("   \t", None)]
    #[case("  row 4 ok ", Some("DataForge: row 4 ok"))]
    fn formats_progress_lines(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(progress_text(line).as_deref(), expected);
    }

    #[test]
    fn long_lines_are_truncated_by_character() {
        let line = "é".repeat(150);
        let text = progress_text(&line).expect("progress text");
        assert_eq!(text, format!("DataForge: {}...", "é".repeat(100)));
    }
}
