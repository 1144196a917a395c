//! Recursive extraction controller.
//!
//! Containers are walked from an explicit work deque, never by call-stack
//! recursion. Leaves are handed on as soon as they are materialized. Nested
//! containers found while decoding a container are queued in front of the
//! pending work once that container is finished, which walks the tree
//! depth-first.
//!
//! With `parallel` set, up to `batch_size` pending containers are decoded at
//! once. The first container of a batch is decoded on the calling thread and
//! streams its leaves like a sequential run. The others are decoded on the
//! rayon pool against forks of the budget taken when the batch starts, and
//! buffer what they find. Their charges are committed to the run budget in
//! work-list order once the first container is done, so where a limit stops
//! the run does not depend on thread timing.

use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::panic;
use std::thread;

use rayon::prelude::*;

use crate::ExtractionError;
use crate::ExtractorOptions;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::Materializer;
use crate::entry::ExtractedEntry;
use crate::formats::ArchiveKind;
use crate::formats::Container;
use crate::formats::DecoderRegistry;
use crate::formats::RawEntry;
use crate::formats::detect::detect;
use crate::io::EntryContent;
use crate::report::ExtractionReport;
use crate::report::RunOutcome;
use crate::report::RunState;
use crate::security::CancellationToken;
use crate::security::ExtractionBudget;
use crate::source::ExtractionSource;

use super::fallback::FallbackDecision;
use super::fallback::decide;
use super::filters::EntryFilter;

/// Consumer of yielded leaves. `Break` stops the run as cancelled.
pub type EntrySink<'s> = dyn FnMut(ExtractedEntry) -> ControlFlow<()> + 's;

/// A container waiting to be decoded.
#[derive(Debug)]
struct WorkItem {
    path: String,
    kind: ArchiveKind,
    content: EntryContent,
    depth: usize,
    /// The bytes were already reserved when the item was materialized.
    charged: bool,
}

/// Something a container produced.
#[derive(Debug)]
enum Discovered {
    Leaf(ExtractedEntry),
    Container(WorkItem),
}

/// How a container ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerOutcome {
    Decoded,
    FellBack,
}

/// What a buffered branch found, with the bytes each item charged to the
/// branch's budget fork.
#[derive(Debug)]
struct Branch {
    found: Vec<(Discovered, u64)>,
    outcome: Result<ContainerOutcome>,
}

/// Read-only state shared by every branch of one run.
struct RunContext<'a> {
    options: &'a ExtractorOptions,
    decoders: &'a DecoderRegistry,
    budget: ExtractionBudget,
    cancel: CancellationToken,
}

impl RunContext<'_> {
    fn check_limits(&self) -> Result<()> {
        self.cancel.check()?;
        self.budget.check_timeout()
    }

    /// Classifies materialized bytes as a decodable container or a leaf.
    fn classify(&self, content: &mut EntryContent, name: &str) -> Result<ArchiveKind> {
        if self.options.is_raw_name(name) {
            return Ok(ArchiveKind::Raw);
        }
        let kind = detect(content, name)?;
        Ok(if self.decoders.supports(kind) {
            kind
        } else {
            ArchiveKind::Raw
        })
    }

    /// Decodes one container and reports every entry through `emit`.
    ///
    /// A container that fails to decode is either replaced by a fallback
    /// leaf or fails the branch, as the fallback policy decides.
    fn process_container(
        &self,
        item: WorkItem,
        emit: &mut dyn FnMut(Discovered) -> Result<()>,
    ) -> Result<ContainerOutcome> {
        self.check_limits()?;

        let WorkItem {
            path,
            kind,
            mut content,
            depth,
            charged,
        } = item;

        let decoder = self
            .decoders
            .get(kind)
            .ok_or_else(|| ExtractionError::decode(&path, kind, "no decoder registered"))?;

        tracing::debug!(path = %path, format = %kind, depth, "decoding container");

        let materializer = Materializer::new(
            &self.budget,
            &self.cancel,
            self.options.memory_stream_cutoff,
        );
        let mut buffer = CopyBuffer::new();

        let result = {
            let mut container = Container::new(&path, kind, &mut content)?;
            decoder.decode(&mut container, &mut |raw: RawEntry<'_>| {
                let discovered = self.visit_entry(&path, kind, depth, raw, materializer, &mut buffer)?;
                emit(discovered)
            })
        };

        let err = match result {
            Ok(()) => return Ok(ContainerOutcome::Decoded),
            Err(err) if err.is_recoverable() => err,
            Err(err) => return Err(err),
        };

        match decide(false, self.options.extract_self_on_fail) {
            FallbackDecision::EmitSelf => {
                tracing::warn!(path = %path, error = %err, "container failed to decode, yielding raw bytes");
                if !charged {
                    // A fallback never bypasses the cap
                    self.budget.try_reserve(content.len())?;
                }
                emit(Discovered::Leaf(ExtractedEntry::new(path, content, true)?))?;
                Ok(ContainerOutcome::FellBack)
            }
            FallbackDecision::Propagate | FallbackDecision::Proceed => Err(err),
        }
    }

    /// Decodes one container, yielding its leaves as they are found.
    ///
    /// Returns the nested containers to queue next.
    fn decode_streaming(
        &self,
        item: WorkItem,
        out: &mut Yielder<'_, '_>,
    ) -> Result<(ContainerOutcome, Vec<WorkItem>)> {
        let mut children = Vec::new();
        let outcome = self.process_container(item, &mut |discovered| match discovered {
            Discovered::Container(child) => {
                children.push(child);
                Ok(())
            }
            Discovered::Leaf(entry) => out.yield_leaf(&self.cancel, entry),
        })?;
        Ok((outcome, children))
    }

    /// Decodes one container against a fork of `snapshot`, buffering
    /// everything it finds.
    fn decode_buffered(
        &self,
        item: WorkItem,
        snapshot: &ExtractionBudget,
        halt: &CancellationToken,
    ) -> Branch {
        let view = RunContext {
            options: self.options,
            decoders: self.decoders,
            budget: snapshot.fork(),
            cancel: halt.clone(),
        };

        let mut found = Vec::new();
        let mut settled = view.budget.total_extracted();
        let outcome = view.process_container(item, &mut |discovered| {
            let total = view.budget.total_extracted();
            found.push((discovered, total - settled));
            settled = total;
            Ok(())
        });
        Branch { found, outcome }
    }

    fn visit_entry(
        &self,
        parent: &str,
        parent_kind: ArchiveKind,
        parent_depth: usize,
        raw: RawEntry<'_>,
        materializer: Materializer<'_>,
        buffer: &mut CopyBuffer,
    ) -> Result<Discovered> {
        self.check_limits()?;

        let RawEntry {
            name,
            size_hint,
            reader,
        } = raw;
        let path = join_path(parent, &name);

        // Failures of the entry stream are failures of the container
        let mut content = materializer.materialize(reader, size_hint, buffer, |e| {
            ExtractionError::decode(parent, parent_kind, e)
        })?;

        let kind = if self.options.recurse {
            self.classify(&mut content, &name)?
        } else {
            ArchiveKind::Raw
        };

        if !kind.is_container() {
            return Ok(Discovered::Leaf(ExtractedEntry::new(path, content, false)?));
        }

        let depth = parent_depth + 1;
        if depth > self.options.max_depth {
            return Err(ExtractionError::RecursionTooDeep {
                path,
                depth,
                max: self.options.max_depth,
            });
        }

        Ok(Discovered::Container(WorkItem {
            path,
            kind,
            content,
            depth,
            charged: true,
        }))
    }
}

/// Joins a container path and an entry name into a logical path.
fn join_path(parent: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    let name = name.strip_prefix("./").unwrap_or(name);
    format!("{parent}/{name}")
}

/// Delivers leaves to the consumer and keeps the counters.
struct Yielder<'s, 'e> {
    filter: EntryFilter,
    report: ExtractionReport,
    sink: &'s mut EntrySink<'e>,
}

impl Yielder<'_, '_> {
    fn yield_leaf(&mut self, cancel: &CancellationToken, entry: ExtractedEntry) -> Result<()> {
        if !self.filter.allows(entry.path()) {
            tracing::trace!(path = entry.path(), "entry filtered");
            self.report.entries_filtered += 1;
            return Ok(());
        }

        self.report.entries_yielded += 1;
        self.report.bytes_yielded += entry.length();
        if entry.is_failed_container() {
            self.report.failed_containers += 1;
        }

        match (self.sink)(entry) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => {
                cancel.cancel();
                Err(ExtractionError::Cancelled)
            }
        }
    }
}

/// Sequential side of a run: the work deque and the consumer.
struct Walker<'a, 's, 'e> {
    ctx: RunContext<'a>,
    out: Yielder<'s, 'e>,
    pending: VecDeque<WorkItem>,
}

impl Walker<'_, '_, '_> {
    fn note_depth(&mut self, depth: usize) {
        let report = &mut self.out.report;
        report.max_depth_reached = report.max_depth_reached.max(depth);
    }

    /// Queues the children of a finished container ahead of older work.
    fn finish_container(&mut self, outcome: ContainerOutcome, children: Vec<WorkItem>) {
        match outcome {
            ContainerOutcome::Decoded => {
                self.out.report.containers_decoded += 1;
                for child in children.into_iter().rev() {
                    self.pending.push_front(child);
                }
            }
            // The fallback entry already carries these bytes
            ContainerOutcome::FellBack => {}
        }
    }

    fn start(&mut self, source: ExtractionSource) -> Result<()> {
        let (name, mut content, _, forced) = source.into_parts();
        self.ctx.check_limits()?;

        let kind = match forced {
            Some(kind) if self.ctx.decoders.supports(kind) => kind,
            Some(_) => ArchiveKind::Raw,
            None => self.ctx.classify(&mut content, &name)?,
        };

        if kind.is_container() {
            self.pending.push_back(WorkItem {
                path: name,
                kind,
                content,
                depth: 0,
                charged: false,
            });
            return Ok(());
        }

        tracing::debug!(path = %name, "root is not a supported container, yielding as a leaf");
        self.ctx.budget.try_reserve(content.len())?;
        let entry = ExtractedEntry::new(name, content, false)?;
        self.out.yield_leaf(&self.ctx.cancel, entry)
    }

    fn walk_sequential(&mut self) -> Result<()> {
        while let Some(item) = self.pending.pop_front() {
            self.note_depth(item.depth);
            let (outcome, children) = self.ctx.decode_streaming(item, &mut self.out)?;
            self.finish_container(outcome, children);
        }
        Ok(())
    }

    fn walk_parallel(&mut self) -> Result<()> {
        let batch_size = self.ctx.options.batch_size.max(1);

        while let Some(first) = self.pending.pop_front() {
            let take = (batch_size - 1).min(self.pending.len());
            let rest: Vec<WorkItem> = self.pending.drain(..take).collect();
            self.note_depth(first.depth);
            for item in &rest {
                self.note_depth(item.depth);
            }
            tracing::debug!(containers = rest.len() + 1, "decoding batch in parallel");

            // Every buffered branch starts from the same committed total
            let snapshot = self.ctx.budget.fork();
            let halt = self.ctx.cancel.child();

            let Self { ctx, out, .. } = &mut *self;
            let ctx: &RunContext<'_> = ctx;
            let (first_result, branches) = thread::scope(|scope| {
                let helper = (!rest.is_empty()).then(|| {
                    let (snapshot, halt) = (&snapshot, &halt);
                    scope.spawn(move || {
                        rest.into_par_iter()
                            .map(|item| ctx.decode_buffered(item, snapshot, halt))
                            .collect::<Vec<Branch>>()
                    })
                });

                let first_result = ctx.decode_streaming(first, out);
                if first_result.is_err() {
                    halt.cancel();
                }

                let branches = helper.map_or_else(Vec::new, |handle| {
                    handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload))
                });
                (first_result, branches)
            });

            let (outcome, mut batch_children) = first_result?;
            if outcome == ContainerOutcome::Decoded {
                self.out.report.containers_decoded += 1;
            } else {
                batch_children.clear();
            }

            for branch in branches {
                let mut children = Vec::new();
                for (discovered, charge) in branch.found {
                    self.ctx.budget.try_reserve(charge)?;
                    match discovered {
                        Discovered::Container(child) => children.push(child),
                        Discovered::Leaf(entry) => self.out.yield_leaf(&self.ctx.cancel, entry)?,
                    }
                }
                if branch.outcome? == ContainerOutcome::Decoded {
                    self.out.report.containers_decoded += 1;
                    batch_children.extend(children);
                }
            }
            for child in batch_children.into_iter().rev() {
                self.pending.push_front(child);
            }
        }
        Ok(())
    }
}

/// Runs one extraction and pushes every yielded leaf into `sink`.
///
/// Never panics on malformed input and always returns a report. The error,
/// if any, says why the run ended before the work list was empty.
pub fn run(
    options: &ExtractorOptions,
    decoders: &DecoderRegistry,
    source: ExtractionSource,
    cancel: CancellationToken,
    sink: &mut EntrySink<'_>,
) -> RunOutcome {
    let original_size = source.declared_size();
    let budget = ExtractionBudget::new(original_size, options);
    let root = source.name().to_string();

    tracing::debug!(
        root = %root,
        original_size,
        parallel = options.parallel,
        "starting extraction"
    );

    let mut walker = Walker {
        ctx: RunContext {
            options,
            decoders,
            budget,
            cancel,
        },
        out: Yielder {
            filter: EntryFilter::from_options(options),
            report: ExtractionReport {
                original_size,
                ..ExtractionReport::default()
            },
            sink,
        },
        pending: VecDeque::new(),
    };

    let result = walker.start(source).and_then(|()| {
        if options.parallel {
            walker.walk_parallel()
        } else {
            walker.walk_sequential()
        }
    });

    let Walker { ctx, out, .. } = walker;
    let mut report = out.report;
    report.bytes_extracted = ctx.budget.total_extracted();
    report.duration = ctx.budget.elapsed();

    let error = match result {
        Ok(()) => {
            report.state = RunState::Completed;
            None
        }
        Err(err) => {
            report.state = err.terminal_state();
            report.termination_reason = Some(err.to_string());
            if matches!(err, ExtractionError::Cancelled) {
                tracing::debug!(root = %root, "extraction cancelled");
            } else {
                tracing::warn!(root = %root, state = %report.state, error = %err, "extraction stopped early");
            }
            Some(err)
        }
    };

    tracing::debug!(
        root = %root,
        state = %report.state,
        entries = report.entries_yielded,
        bytes = report.bytes_extracted,
        "extraction finished"
    );

    RunOutcome { report, error }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedDecoder;
    use crate::test_utils::TarTestBuilder;
    use crate::test_utils::create_corrupt_tar;
    use crate::test_utils::create_test_tar;
    use crate::test_utils::create_test_zip;

    fn collect(
        options: &ExtractorOptions,
        decoders: &DecoderRegistry,
        source: ExtractionSource,
    ) -> (Vec<ExtractedEntry>, RunOutcome) {
        let mut entries = Vec::new();
        let outcome = run(
            options,
            decoders,
            source,
            CancellationToken::new(),
            &mut |entry: ExtractedEntry| {
                entries.push(entry);
                ControlFlow::Continue(())
            },
        );
        (entries, outcome)
    }

    fn paths(entries: &[ExtractedEntry]) -> Vec<&str> {
        entries.iter().map(ExtractedEntry::path).collect()
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("a.zip", "b.txt"), "a.zip/b.txt");
        assert_eq!(join_path("a.zip", "/abs/b.txt"), "a.zip/abs/b.txt");
        assert_eq!(join_path("a.tar", "./dir/b.txt"), "a.tar/dir/b.txt");
    }

    #[test]
    fn test_children_follow_their_parent() {
        let tar = create_test_tar(vec![("inner.txt", b"inner")]);
        let zip = create_test_zip(vec![
            ("first.txt", b"1"),
            ("nested.tar", &tar),
            ("last.txt", b"2"),
        ]);

        let (entries, outcome) = collect(
            &ExtractorOptions::default(),
            &DecoderRegistry::with_defaults(),
            ExtractionSource::from_bytes("root.zip", zip),
        );

        assert_eq!(outcome.state(), RunState::Completed);
        // Leaves of a container come out while it is decoded
        assert_eq!(
            paths(&entries),
            [
                "root.zip/first.txt",
                "root.zip/last.txt",
                "root.zip/nested.tar/inner.txt"
            ]
        );
        assert_eq!(outcome.report.containers_decoded, 2);
        assert_eq!(outcome.report.max_depth_reached, 1);
    }

    #[test]
    fn test_recurse_disabled_yields_nested_archive() {
        let tar = create_test_tar(vec![("inner.txt", b"inner")]);
        let zip = create_test_zip(vec![("nested.tar", &tar)]);
        let options = ExtractorOptions::default().with_recurse(false);

        let (mut entries, outcome) = collect(
            &options,
            &DecoderRegistry::with_defaults(),
            ExtractionSource::from_bytes("root.zip", zip),
        );

        assert!(outcome.report.is_complete());
        assert_eq!(paths(&entries), ["root.zip/nested.tar"]);
        assert_eq!(entries[0].read_to_vec().unwrap(), tar);
    }

    #[test]
    fn test_raw_extension_is_not_decoded() {
        let tar = create_test_tar(vec![("inner.txt", b"inner")]);
        let zip = create_test_zip(vec![("keep.tar", &tar)]);
        let options = ExtractorOptions::default().with_raw_extensions(vec!["tar".into()]);

        let (entries, _) = collect(
            &options,
            &DecoderRegistry::with_defaults(),
            ExtractionSource::from_bytes("root.zip", zip),
        );
        assert_eq!(paths(&entries), ["root.zip/keep.tar"]);
        assert!(!entries[0].is_failed_container());
    }

    #[test]
    fn test_depth_limit() {
        let innermost = create_test_zip(vec![("leaf.txt", b"leaf")]);
        let middle = create_test_zip(vec![("c.zip", &innermost)]);
        let outer = create_test_zip(vec![("b.zip", &middle)]);
        let decoders = DecoderRegistry::with_defaults();

        let (entries, outcome) = collect(
            &ExtractorOptions::default().with_max_depth(2),
            &decoders,
            ExtractionSource::from_bytes("a.zip", outer.clone()),
        );
        assert_eq!(paths(&entries), ["a.zip/b.zip/c.zip/leaf.txt"]);
        assert_eq!(outcome.report.max_depth_reached, 2);

        let (entries, outcome) = collect(
            &ExtractorOptions::default().with_max_depth(1),
            &decoders,
            ExtractionSource::from_bytes("a.zip", outer),
        );
        assert!(entries.is_empty());
        assert_eq!(outcome.state(), RunState::Failed);
        match outcome.error {
            Some(ExtractionError::RecursionTooDeep { path, depth, max }) => {
                assert_eq!(path, "a.zip/b.zip/c.zip");
                assert_eq!(depth, 2);
                assert_eq!(max, 1);
            }
            other => panic!("expected RecursionTooDeep, got {other:?}"),
        }
    }

    #[test]
    fn test_root_fallback_is_charged() {
        let corrupt = create_corrupt_tar();
        let len = corrupt.len() as u64;

        let (entries, outcome) = collect(
            &ExtractorOptions::default(),
            &DecoderRegistry::with_defaults(),
            ExtractionSource::from_bytes("broken.tar", corrupt.clone()),
        );
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_failed_container());
        assert_eq!(outcome.report.bytes_extracted, len);
        assert_eq!(outcome.report.failed_containers, 1);

        // The fallback entry is held to the ratio cap like any other leaf
        let options = ExtractorOptions::default().with_max_extracted_bytes_ratio(1.0);
        let (entries, outcome) = collect(
            &options,
            &DecoderRegistry::with_defaults(),
            ExtractionSource::from_bytes("broken.tar", corrupt).with_declared_size(len - 1),
        );
        assert!(entries.is_empty());
        assert_eq!(outcome.state(), RunState::BudgetExceeded);
    }

    #[test]
    fn test_nested_fallback_is_charged_once() {
        let corrupt = create_corrupt_tar();
        let zip = create_test_zip(vec![("broken.tar", &corrupt), ("ok.txt", b"ok")]);

        let (entries, outcome) = collect(
            &ExtractorOptions::trusted(),
            &DecoderRegistry::with_defaults(),
            ExtractionSource::from_bytes("root.zip", zip),
        );

        assert_eq!(paths(&entries), ["root.zip/ok.txt", "root.zip/broken.tar"]);
        assert!(entries[1].is_failed_container());
        assert_eq!(outcome.report.bytes_extracted, corrupt.len() as u64 + 2);
    }

    #[test]
    fn test_failed_container_drops_queued_children() {
        let tar = create_test_tar(vec![("never.txt", b"never")]);
        let decoders = DecoderRegistry::with_defaults().with(
            ScriptedDecoder::new(ArchiveKind::Zip)
                .entry("a.txt", b"a".to_vec())
                .entry("inner.tar", tar)
                .fail_after(2),
        );
        let source = ExtractionSource::from_bytes("x.zip", vec![0u8; 4]).with_kind(ArchiveKind::Zip);

        let (entries, outcome) = collect(&ExtractorOptions::trusted(), &decoders, source);

        assert_eq!(outcome.state(), RunState::Completed);
        assert_eq!(paths(&entries), ["x.zip/a.txt", "x.zip"]);
        assert!(entries[1].is_failed_container());
        assert_eq!(outcome.report.containers_decoded, 0);
    }

    #[test]
    fn test_failure_without_fallback_propagates() {
        let decoders = DecoderRegistry::empty().with(
            ScriptedDecoder::new(ArchiveKind::Zip)
                .entry("a.txt", b"a".to_vec())
                .fail_after(1),
        );
        let source = ExtractionSource::from_bytes("x.zip", vec![0u8; 4]).with_kind(ArchiveKind::Zip);
        let options = ExtractorOptions::default().with_extract_self_on_fail(false);

        let (entries, outcome) = collect(&options, &decoders, source);

        // Entries yielded before the failure stay with the consumer
        assert_eq!(paths(&entries), ["x.zip/a.txt"]);
        assert_eq!(outcome.state(), RunState::Failed);
        assert!(matches!(
            outcome.error,
            Some(ExtractionError::DecodeFailure { .. })
        ));
    }

    #[test]
    fn test_unsupported_forced_kind_yields_raw_root() {
        let source = ExtractionSource::from_bytes("x.bin", b"plain".to_vec()).with_kind(ArchiveKind::SevenZip);
        let (entries, outcome) = collect(
            &ExtractorOptions::default(),
            &DecoderRegistry::empty(),
            source,
        );
        assert_eq!(paths(&entries), ["x.bin"]);
        assert_eq!(outcome.report.bytes_extracted, 5);
    }

    #[test]
    fn test_filtered_leaves_are_counted() {
        let zip = create_test_zip(vec![("keep.txt", b"keep"), ("drop.log", b"drop")]);
        let options = ExtractorOptions::default().with_deny_filters(vec!["*.log".into()]);

        let (entries, outcome) = collect(
            &options,
            &DecoderRegistry::with_defaults(),
            ExtractionSource::from_bytes("root.zip", zip),
        );
        assert_eq!(paths(&entries), ["root.zip/keep.txt"]);
        assert_eq!(outcome.report.entries_filtered, 1);
        assert_eq!(outcome.report.bytes_yielded, 4);
        // Filtered bytes were still read
        assert_eq!(outcome.report.bytes_extracted, 8);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let first = create_test_tar(vec![("1.txt", b"one"), ("2.txt", b"two")]);
        let second = create_test_tar(vec![("3.txt", b"three")]);
        let zip = create_test_zip(vec![("a.tar", &first), ("top.txt", b"top"), ("b.tar", &second)]);
        let decoders = DecoderRegistry::with_defaults();

        let (sequential, _) = collect(
            &ExtractorOptions::default(),
            &decoders,
            ExtractionSource::from_bytes("root.zip", zip.clone()),
        );
        for batch_size in [1, 2, 8] {
            let options = ExtractorOptions::default()
                .with_parallel(true)
                .with_batch_size(batch_size);
            let (parallel, outcome) = collect(
                &options,
                &decoders,
                ExtractionSource::from_bytes("root.zip", zip.clone()),
            );
            assert!(outcome.report.is_complete());
            assert_eq!(paths(&parallel), paths(&sequential), "batch size {batch_size}");
        }
    }

    #[test]
    fn test_sink_break_stops_run() {
        let zip = create_test_zip(vec![("a.txt", b"a"), ("b.txt", b"b")]);
        let mut seen = 0;
        let outcome = run(
            &ExtractorOptions::default(),
            &DecoderRegistry::with_defaults(),
            ExtractionSource::from_bytes("root.zip", zip),
            CancellationToken::new(),
            &mut |_entry: ExtractedEntry| {
                seen += 1;
                ControlFlow::Break(())
            },
        );
        assert_eq!(seen, 1);
        assert_eq!(outcome.state(), RunState::Cancelled);
    }

    /// Zip holding two tars of `files` 1000-byte files each.
    fn two_wide_tars(files: usize) -> Vec<u8> {
        let data = vec![b'x'; 1000];
        let wide = |prefix: &str| {
            (0..files)
                .fold(TarTestBuilder::new(), |builder, i| {
                    builder.add_file(&format!("{prefix}{i}.txt"), &data)
                })
                .build()
        };
        create_test_zip(vec![("a.tar", &wide("a")), ("b.tar", &wide("b"))])
    }

    #[test]
    fn test_parallel_budget_stop_is_repeatable() {
        let zip = two_wide_tars(200);
        let decoders = DecoderRegistry::with_defaults();
        let options = ExtractorOptions::trusted().with_max_extracted_bytes(900_000);

        let (sequential, outcome) = collect(
            &options,
            &decoders,
            ExtractionSource::from_bytes("root.zip", zip.clone()),
        );
        assert_eq!(outcome.state(), RunState::BudgetExceeded);
        // The cap falls inside the second tar
        assert!(sequential.len() > 200 && sequential.len() < 400);

        let parallel_options = options.with_parallel(true).with_batch_size(8);
        for _ in 0..20 {
            let (parallel, outcome) = collect(
                &parallel_options,
                &decoders,
                ExtractionSource::from_bytes("root.zip", zip.clone()),
            );
            assert_eq!(outcome.state(), RunState::BudgetExceeded);
            assert_eq!(paths(&parallel), paths(&sequential));
        }
    }

    #[test]
    fn test_parallel_break_stops_sibling_branches() {
        let zip = two_wide_tars(200);
        let decoders = DecoderRegistry::with_defaults();
        let first_only = |options: &ExtractorOptions| {
            run(
                options,
                &decoders,
                ExtractionSource::from_bytes("root.zip", zip.clone()),
                CancellationToken::new(),
                &mut |_entry: ExtractedEntry| ControlFlow::Break(()),
            )
        };

        let sequential = first_only(&ExtractorOptions::trusted());
        let parallel = first_only(&ExtractorOptions::trusted().with_parallel(true).with_batch_size(8));

        assert_eq!(parallel.state(), RunState::Cancelled);
        assert_eq!(parallel.report.entries_yielded, 1);
        // Nothing the sibling branch decoded was committed
        assert_eq!(
            parallel.report.bytes_extracted,
            sequential.report.bytes_extracted
        );
    }

    #[test]
    fn test_parallel_streams_first_container() {
        let zip = create_test_zip(vec![("a.txt", b"a"), ("b.txt", b"b")]);
        let options = ExtractorOptions::default().with_parallel(true);
        let mut seen = 0;

        let outcome = run(
            &options,
            &DecoderRegistry::with_defaults(),
            ExtractionSource::from_bytes("root.zip", zip),
            CancellationToken::new(),
            &mut |_entry: ExtractedEntry| {
                seen += 1;
                ControlFlow::Break(())
            },
        );

        assert_eq!(seen, 1);
        assert_eq!(outcome.state(), RunState::Cancelled);
        // The root stopped at its first leaf
        assert_eq!(outcome.report.bytes_extracted, 1);
    }
}
