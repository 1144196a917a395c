//! Pull-based view of an extraction run.
//!
//! The run executes on a worker thread and hands leaves over a bounded
//! channel, so at most `batch_size` extracted entries wait for the consumer
//! at any time.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::bounded;

use crate::ExtractionError;
use crate::ExtractorOptions;
use crate::Result;
use crate::entry::ExtractedEntry;
use crate::formats::DecoderRegistry;
use crate::report::ExtractionReport;
use crate::report::RunOutcome;
use crate::report::RunState;
use crate::security::CancellationToken;
use crate::source::ExtractionSource;

use super::engine::run;

enum Message {
    Entry(ExtractedEntry),
    Finished(RunOutcome),
}

/// Lazy, single-pass sequence of extracted leaves.
///
/// In lenient mode (the default) a run that stops early simply ends the
/// sequence; [`state`](Self::state) and [`error`](Self::error) tell why. In
/// strict mode the error that stopped the run is yielded as the last item.
///
/// Dropping an `Extraction` cancels the run and waits for the worker to let
/// go of its in-flight entry.
///
/// # Examples
///
/// ```
/// use nestex_core::{ExtractionSource, Extractor, ExtractorOptions, RunState};
/// use nestex_core::test_utils::create_test_zip;
///
/// let zip = create_test_zip(vec![("a.txt", b"alpha"), ("b.txt", b"bravo")]);
/// let extractor = Extractor::new(ExtractorOptions::default())?;
///
/// let mut extraction = extractor.extract(ExtractionSource::from_bytes("bundle.zip", zip))?;
/// let paths: Vec<String> = extraction
///     .by_ref()
///     .map(|entry| entry.map(|e| e.path().to_string()))
///     .collect::<Result<_, _>>()?;
///
/// assert_eq!(paths, ["bundle.zip/a.txt", "bundle.zip/b.txt"]);
/// assert_eq!(extraction.state(), RunState::Completed);
/// # Ok::<(), nestex_core::ExtractionError>(())
/// ```
pub struct Extraction {
    receiver: Option<Receiver<Message>>,
    worker: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    outcome: Option<RunOutcome>,
    strict: bool,
}

impl Extraction {
    pub(crate) fn spawn(
        options: Arc<ExtractorOptions>,
        decoders: DecoderRegistry,
        source: ExtractionSource,
    ) -> Result<Self> {
        let (sender, receiver) = bounded::<Message>(options.batch_size.max(1));
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let worker = thread::Builder::new()
            .name("nestex-extract".into())
            .spawn(move || {
                let mut sink = |entry: ExtractedEntry| match sender.send(Message::Entry(entry)) {
                    Ok(()) => ControlFlow::Continue(()),
                    // Consumer is gone
                    Err(_) => ControlFlow::Break(()),
                };
                let outcome = run(&options, &decoders, source, worker_cancel, &mut sink);
                let _ = sender.send(Message::Finished(outcome));
            })?;

        Ok(Self {
            receiver: Some(receiver),
            worker: Some(worker),
            cancel,
            outcome: None,
            strict: false,
        })
    }

    /// Yields the terminal error as the last item instead of ending quietly.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Asks the worker to stop. Entries already buffered are still yielded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// State of the run. `Running` until the sequence has ended.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.outcome
            .as_ref()
            .map_or(RunState::Running, |outcome| outcome.report.state)
    }

    /// Final report, once the sequence has ended.
    #[must_use]
    pub fn report(&self) -> Option<&ExtractionReport> {
        self.outcome.as_ref().map(|outcome| &outcome.report)
    }

    /// Error that stopped the run early, once the sequence has ended.
    ///
    /// In strict mode the error is moved into the last item, so this returns
    /// `None` after it was yielded.
    #[must_use]
    pub fn error(&self) -> Option<&ExtractionError> {
        self.outcome.as_ref().and_then(|outcome| outcome.error.as_ref())
    }

    /// Drains the sequence and returns the run outcome.
    ///
    /// Remaining entries are dropped.
    #[must_use]
    pub fn finish(mut self) -> RunOutcome {
        while self.next_entry().is_some() {}
        self.outcome.take().unwrap_or_else(|| RunOutcome {
            report: ExtractionReport::default(),
            error: None,
        })
    }

    fn next_entry(&mut self) -> Option<ExtractedEntry> {
        let receiver = self.receiver.as_ref()?;
        let message = receiver.recv();
        match message {
            Ok(Message::Entry(entry)) => Some(entry),
            Ok(Message::Finished(outcome)) => {
                self.close(outcome);
                None
            }
            Err(_) => {
                // The worker died without reporting
                let error = ExtractionError::Io(std::io::Error::other(
                    "extraction worker stopped unexpectedly",
                ));
                let report = ExtractionReport {
                    state: RunState::Failed,
                    termination_reason: Some(error.to_string()),
                    ..ExtractionReport::default()
                };
                self.close(RunOutcome {
                    report,
                    error: Some(error),
                });
                None
            }
        }
    }

    fn close(&mut self, outcome: RunOutcome) {
        self.receiver = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.outcome = Some(outcome);
    }
}

impl Iterator for Extraction {
    type Item = Result<ExtractedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entry) = self.next_entry() {
            return Some(Ok(entry));
        }
        if self.strict {
            return self.outcome.as_mut().and_then(|outcome| outcome.error.take()).map(Err);
        }
        None
    }
}

impl std::fmt::Debug for Extraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extraction")
            .field("state", &self.state())
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl Drop for Extraction {
    fn drop(&mut self) {
        self.cancel.cancel();
        // Disconnect first so a worker blocked on a full channel wakes up
        self.receiver = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
