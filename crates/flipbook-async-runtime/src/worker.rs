use crate::{DocumentBackend, DocumentId, FlipbookCommand, FlipbookUpdate, RunId};
use flipbook_core::{
    CancelToken, FlipbookError, ProcessingOptions, RenderedPage, Result, RunContext, release_pages,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Orders a run's outgoing updates against its cancellation.
///
/// Updates are sent while holding the lock and `cancel` takes it too, so once
/// `cancel` returns the run can only report `Cancelled`.
struct RunGate {
    token: CancelToken,
    send_lock: Mutex<()>,
}

impl RunGate {
    fn new(token: CancelToken) -> Self {
        Self {
            token,
            send_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.send_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self) {
        let _guard = self.lock();
        self.token.cancel();
    }
}

/// A processing run executing on the blocking pool
struct ActiveRun {
    run: RunId,
    doc_id: DocumentId,
    gate: Arc<RunGate>,
    handle: JoinHandle<()>,
}

struct WorkerState<B> {
    backend: Arc<B>,
    documents: HashMap<DocumentId, PathBuf>,
    active: Option<ActiveRun>,
    /// Cancelled runs that may still be winding down
    retired: Vec<JoinHandle<()>>,
    next_id: u64,
    next_run: u64,
}

impl<B> WorkerState<B> {
    fn allocate_run(&mut self) -> RunId {
        let run = RunId(self.next_run);
        self.next_run += 1;
        run
    }
}

/// Async worker task that processes flipbook commands and sends updates.
///
/// Returns once the command channel closes and every run has finished.
pub async fn worker_task<B: DocumentBackend>(
    backend: Arc<B>,
    mut command_rx: mpsc::UnboundedReceiver<FlipbookCommand>,
    update_tx: mpsc::UnboundedSender<FlipbookUpdate>,
) {
    let mut state = WorkerState {
        backend,
        documents: HashMap::new(),
        active: None,
        retired: Vec::new(),
        next_id: 1,
        next_run: 1,
    };

    while let Some(cmd) = command_rx.recv().await {
        let mut batch = vec![cmd];

        // Take everything queued behind a process request so only the newest one starts
        if matches!(batch[0], FlipbookCommand::Process { .. }) {
            while let Ok(next_cmd) = command_rx.try_recv() {
                batch.push(next_cmd);
            }
        }

        let newest = batch.iter().enumerate().rev().find_map(|(index, cmd)| match cmd {
            FlipbookCommand::Process { doc_id, .. } => Some((index, *doc_id)),
            _ => None,
        });

        for (index, cmd) in batch.into_iter().enumerate() {
            match (cmd, newest) {
                (FlipbookCommand::Process { doc_id, .. }, Some((newest_index, newest_doc)))
                    if index != newest_index =>
                {
                    discard_process(doc_id, newest_doc, &mut state, &update_tx);
                }
                (cmd, _) => process_command(cmd, &mut state, &update_tx).await,
            }
        }
    }

    // Let runs in flight deliver their results
    let handles: Vec<JoinHandle<()>> = state
        .active
        .take()
        .map(|run| run.handle)
        .into_iter()
        .chain(state.retired.drain(..))
        .collect();
    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Processing run failed to shut down: {}", e);
        }
    }
    log::debug!("Worker stopped");
}

async fn process_command<B: DocumentBackend>(
    cmd: FlipbookCommand,
    state: &mut WorkerState<B>,
    update_tx: &mpsc::UnboundedSender<FlipbookUpdate>,
) {
    match cmd {
        FlipbookCommand::Load { path } => {
            handle_load(path, state, update_tx).await;
        }
        FlipbookCommand::Process { doc_id, options } => {
            handle_process(doc_id, options, state, update_tx);
        }
        FlipbookCommand::Cancel { doc_id } => {
            if !cancel_active(Some(doc_id), state) {
                log::debug!("No active run to cancel for {:?}", doc_id);
            }
        }
        FlipbookCommand::Close { doc_id } => {
            cancel_active(Some(doc_id), state);
            if state.documents.remove(&doc_id).is_some() {
                let _ = update_tx.send(FlipbookUpdate::Closed { doc_id });
            } else {
                send_error(update_tx, Some(doc_id), format!("Unknown document {:?}", doc_id));
            }
        }
    }
}

/// Drop a queued process request that a newer one supersedes before it starts
fn discard_process<B>(
    doc_id: DocumentId,
    newest_doc: DocumentId,
    state: &mut WorkerState<B>,
    update_tx: &mpsc::UnboundedSender<FlipbookUpdate>,
) {
    if doc_id == newest_doc {
        log::debug!("Discarding queued processing run, using newer request");
    } else if state.documents.contains_key(&doc_id) {
        let run = state.allocate_run();
        log::debug!("Dropping queued {:?} for {:?}, another document was requested", run, doc_id);
        let _ = update_tx.send(FlipbookUpdate::Cancelled { doc_id, run });
    } else {
        send_error(update_tx, Some(doc_id), format!("Unknown document {:?}", doc_id));
    }
}

async fn handle_load<B: DocumentBackend>(
    path: PathBuf,
    state: &mut WorkerState<B>,
    update_tx: &mpsc::UnboundedSender<FlipbookUpdate>,
) {
    let backend = Arc::clone(&state.backend);
    let load_path = path.clone();

    // Decoding is CPU-bound, spawn blocking
    let result = tokio::task::spawn_blocking(move || backend.page_count(&load_path))
        .await
        .map_err(FlipbookError::from)
        .and_then(|count| count);

    match result {
        Ok(page_count) => {
            let doc_id = DocumentId(state.next_id);
            state.next_id += 1;
            log::info!("Loaded {} ({} pages) as {:?}", path.display(), page_count, doc_id);
            state.documents.insert(doc_id, path);
            let _ = update_tx.send(FlipbookUpdate::Loaded { doc_id, page_count });
        }
        Err(e) => send_error(update_tx, None, e.to_string()),
    }
}

fn handle_process<B: DocumentBackend>(
    doc_id: DocumentId,
    options: ProcessingOptions,
    state: &mut WorkerState<B>,
    update_tx: &mpsc::UnboundedSender<FlipbookUpdate>,
) {
    let Some(path) = state.documents.get(&doc_id).cloned() else {
        send_error(update_tx, Some(doc_id), format!("Unknown document {:?}", doc_id));
        return;
    };

    // Only one run executes at a time, whichever document it was for
    if cancel_active(None, state) {
        log::debug!("Superseding active run with a request for {:?}", doc_id);
    }

    let run = state.allocate_run();
    let context = RunContext::new();
    let gate = Arc::new(RunGate::new(context.cancel.clone()));
    let backend = Arc::clone(&state.backend);
    let update_tx = update_tx.clone();
    let _ = update_tx.send(FlipbookUpdate::Started { doc_id, run });

    let run_gate = Arc::clone(&gate);
    let handle = tokio::task::spawn_blocking(move || {
        let mut on_progress = |fraction: f32| {
            let _guard = run_gate.lock();
            if !run_gate.token.is_cancelled() {
                let _ = update_tx.send(FlipbookUpdate::Progress {
                    doc_id,
                    run,
                    fraction,
                });
            }
        };

        let result = backend.process(&path, &options, &context, &mut on_progress);
        finish_run(doc_id, run, result, &run_gate, &update_tx);
    });

    state.active = Some(ActiveRun {
        run,
        doc_id,
        gate,
        handle,
    });
}

/// Deliver a run's outcome. Results of a cancelled run are released, never sent.
fn finish_run(
    doc_id: DocumentId,
    run: RunId,
    result: Result<Vec<RenderedPage>>,
    gate: &RunGate,
    update_tx: &mpsc::UnboundedSender<FlipbookUpdate>,
) {
    let _guard = gate.lock();
    let update = match result {
        Ok(mut pages) if gate.token.is_cancelled() => {
            release_pages(&mut pages);
            FlipbookUpdate::Cancelled { doc_id, run }
        }
        Ok(pages) => FlipbookUpdate::Processed { doc_id, run, pages },
        Err(FlipbookError::Cancelled) => FlipbookUpdate::Cancelled { doc_id, run },
        Err(e) => {
            let message = format!("Processing failed: {}", e);
            log::error!("{:?} for {:?}: {}", run, doc_id, message);
            FlipbookUpdate::Error {
                doc_id: Some(doc_id),
                message,
            }
        }
    };

    // A closed channel hands the update back; dropping it releases any pages
    if update_tx.send(update).is_err() {
        log::debug!("Update channel closed, discarding result for {:?}", doc_id);
    }
}

/// Cancel the active run, restricted to `doc_id` when given.
/// Returns whether a run was still executing.
fn cancel_active<B>(doc_id: Option<DocumentId>, state: &mut WorkerState<B>) -> bool {
    state.retired.retain(|handle| !handle.is_finished());

    let belongs = state
        .active
        .as_ref()
        .is_some_and(|run| doc_id.is_none_or(|id| id == run.doc_id));
    if !belongs {
        return false;
    }

    match state.active.take() {
        Some(run) if !run.handle.is_finished() => {
            run.gate.cancel();
            log::debug!("Cancelled {:?} for {:?}", run.run, run.doc_id);
            state.retired.push(run.handle);
            true
        }
        _ => false,
    }
}

fn send_error(
    update_tx: &mpsc::UnboundedSender<FlipbookUpdate>,
    doc_id: Option<DocumentId>,
    message: String,
) {
    log::error!("{}", message);
    let _ = update_tx.send(FlipbookUpdate::Error { doc_id, message });
}
