use flipbook_async_runtime::*;
use flipbook_core::{
    MemoryDocument, RasterLedger, Result, RunContext, process_document_with,
};
use std::path::Path;
use std::sync::{Arc, Mutex, mpsc as std_mpsc};
use tokio::sync::mpsc;

const FIRST_DOC: DocumentId = DocumentId(1);

fn options(dpi: f32) -> ProcessingOptions {
    ProcessingOptions {
        dpi,
        ..Default::default()
    }
}

fn book() -> MemoryDocument {
    MemoryDocument::from_sizes(&[(60.0, 90.0), (120.0, 90.0), (60.0, 90.0)])
}

/// Queue `commands`, run the worker until they are all handled, and collect every update
async fn run_worker<B: DocumentBackend>(
    backend: B,
    commands: Vec<FlipbookCommand>,
) -> Vec<FlipbookUpdate> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();

    for cmd in commands {
        command_tx.send(cmd).unwrap();
    }
    drop(command_tx);

    worker_task(Arc::new(backend), command_rx, update_tx).await;

    let mut updates = Vec::new();
    while let Some(update) = update_rx.recv().await {
        updates.push(update);
    }
    updates
}

#[tokio::test(flavor = "multi_thread")]
async fn test_load_and_process() {
    let backend = MemoryBackend::new().with_document("book.pdf", book());
    let updates = run_worker(
        backend,
        vec![
            FlipbookCommand::Load {
                path: "book.pdf".into(),
            },
            FlipbookCommand::Process {
                doc_id: FIRST_DOC,
                options: options(72.0),
            },
        ],
    )
    .await;

    assert!(matches!(
        updates[0],
        FlipbookUpdate::Loaded {
            doc_id: FIRST_DOC,
            page_count: 3
        }
    ));

    assert!(matches!(
        updates[1],
        FlipbookUpdate::Started {
            doc_id: FIRST_DOC,
            run: RunId(1)
        }
    ));

    let progress: Vec<f32> = updates
        .iter()
        .filter_map(|u| match u {
            FlipbookUpdate::Progress { run, fraction, .. } => {
                assert_eq!(*run, RunId(1));
                Some(*fraction)
            }
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 3);
    assert_eq!(*progress.last().unwrap(), 1.0);

    match updates.last() {
        Some(FlipbookUpdate::Processed { doc_id, run, pages }) => {
            assert_eq!(*doc_id, FIRST_DOC);
            assert_eq!(*run, RunId(1));
            assert_eq!(pages.len(), 4);
            assert!(pages[1].is_left_half());
        }
        other => panic!("Expected Processed, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_queued_process_collapses_to_newest() {
    let backend = MemoryBackend::new().with_document("book.pdf", book());
    let updates = run_worker(
        backend,
        vec![
            FlipbookCommand::Load {
                path: "book.pdf".into(),
            },
            FlipbookCommand::Process {
                doc_id: FIRST_DOC,
                options: options(72.0),
            },
            FlipbookCommand::Process {
                doc_id: FIRST_DOC,
                options: options(144.0),
            },
        ],
    )
    .await;

    let processed: Vec<&Vec<RenderedPage>> = updates
        .iter()
        .filter_map(|u| match u {
            FlipbookUpdate::Processed { pages, .. } => Some(pages),
            _ => None,
        })
        .collect();
    assert_eq!(processed.len(), 1);
    // 60pt at 144 DPI
    assert_eq!(processed[0][0].width, 120);
    assert!(
        !updates
            .iter()
            .any(|u| matches!(u, FlipbookUpdate::Cancelled { .. }))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_newest_request_wins_across_documents() {
    let backend = MemoryBackend::new()
        .with_document("a.pdf", book())
        .with_document("b.pdf", book());
    let second_doc = DocumentId(2);
    let updates = run_worker(
        backend,
        vec![
            FlipbookCommand::Load {
                path: "a.pdf".into(),
            },
            FlipbookCommand::Load {
                path: "b.pdf".into(),
            },
            FlipbookCommand::Process {
                doc_id: FIRST_DOC,
                options: options(72.0),
            },
            FlipbookCommand::Process {
                doc_id: second_doc,
                options: options(72.0),
            },
            FlipbookCommand::Process {
                doc_id: FIRST_DOC,
                options: options(144.0),
            },
        ],
    )
    .await;

    let first_doc_results: Vec<u32> = updates
        .iter()
        .filter_map(|u| match u {
            FlipbookUpdate::Processed {
                doc_id: FIRST_DOC,
                pages,
                ..
            } => Some(pages[0].width),
            FlipbookUpdate::Cancelled {
                doc_id: FIRST_DOC, ..
            } => Some(0),
            _ => None,
        })
        .collect();
    // 60pt at 144 DPI, nothing else
    assert_eq!(first_doc_results, vec![120]);

    // The request for the other document was dropped before it started
    assert!(updates.iter().any(|u| matches!(
        u,
        FlipbookUpdate::Cancelled {
            doc_id: DocumentId(2),
            ..
        }
    )));
    assert!(!updates.iter().any(|u| matches!(
        u,
        FlipbookUpdate::Processed {
            doc_id: DocumentId(2),
            ..
        } | FlipbookUpdate::Started {
            doc_id: DocumentId(2),
            ..
        }
    )));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_process_unknown_document() {
    let updates = run_worker(
        MemoryBackend::new(),
        vec![FlipbookCommand::Process {
            doc_id: DocumentId(7),
            options: options(72.0),
        }],
    )
    .await;

    assert_eq!(updates.len(), 1);
    assert!(matches!(
        updates[0],
        FlipbookUpdate::Error {
            doc_id: Some(DocumentId(7)),
            ..
        }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_load_missing_document() {
    let updates = run_worker(
        MemoryBackend::new(),
        vec![FlipbookCommand::Load {
            path: "missing.pdf".into(),
        }],
    )
    .await;

    match &updates[..] {
        [FlipbookUpdate::Error { doc_id, message }] => {
            assert_eq!(*doc_id, None);
            assert!(message.contains("missing.pdf"));
        }
        other => panic!("Expected a single Error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_processing_error_is_reported() {
    let backend =
        MemoryBackend::new().with_document("bad.pdf", book().with_failing_page(2));
    let updates = run_worker(
        backend,
        vec![
            FlipbookCommand::Load {
                path: "bad.pdf".into(),
            },
            FlipbookCommand::Process {
                doc_id: FIRST_DOC,
                options: options(72.0),
            },
        ],
    )
    .await;

    match updates.last() {
        Some(FlipbookUpdate::Error { doc_id, message }) => {
            assert_eq!(*doc_id, Some(FIRST_DOC));
            assert!(message.contains("source page 3"));
        }
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_close_document() {
    let backend = MemoryBackend::new().with_document("book.pdf", book());
    let updates = run_worker(
        backend,
        vec![
            FlipbookCommand::Load {
                path: "book.pdf".into(),
            },
            FlipbookCommand::Close { doc_id: FIRST_DOC },
            FlipbookCommand::Process {
                doc_id: FIRST_DOC,
                options: options(72.0),
            },
        ],
    )
    .await;

    assert_eq!(updates.len(), 3);
    assert!(matches!(updates[1], FlipbookUpdate::Closed { doc_id: FIRST_DOC }));
    assert!(matches!(updates[2], FlipbookUpdate::Error { .. }));
}

/// Renders normally, then holds the finished pages until released by the test
struct GatedBackend {
    document: MemoryDocument,
    finished_tx: mpsc::UnboundedSender<()>,
    gate: Mutex<std_mpsc::Receiver<()>>,
    ledgers: Mutex<Vec<Arc<RasterLedger>>>,
}

impl DocumentBackend for GatedBackend {
    fn page_count(&self, _path: &Path) -> Result<usize> {
        Ok(3)
    }

    fn process(
        &self,
        _path: &Path,
        options: &ProcessingOptions,
        context: &RunContext,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<Vec<RenderedPage>> {
        self.ledgers.lock().unwrap().push(Arc::clone(&context.ledger));
        let pages = process_document_with(&self.document, options, context, on_progress)?;

        self.finished_tx.send(()).unwrap();
        self.gate.lock().unwrap().recv().unwrap();
        Ok(pages)
    }
}

/// A running worker over a `GatedBackend`
struct GatedWorker {
    backend: Arc<GatedBackend>,
    command_tx: mpsc::UnboundedSender<FlipbookCommand>,
    update_rx: mpsc::UnboundedReceiver<FlipbookUpdate>,
    finished_rx: mpsc::UnboundedReceiver<()>,
    gate_tx: std_mpsc::Sender<()>,
    worker: tokio::task::JoinHandle<()>,
}

fn start_gated_worker() -> GatedWorker {
    let (finished_tx, finished_rx) = mpsc::unbounded_channel();
    let (gate_tx, gate_rx) = std_mpsc::channel();
    let backend = Arc::new(GatedBackend {
        document: book(),
        finished_tx,
        gate: Mutex::new(gate_rx),
        ledgers: Mutex::new(Vec::new()),
    });

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(worker_task(Arc::clone(&backend), command_rx, update_tx));

    GatedWorker {
        backend,
        command_tx,
        update_rx,
        finished_rx,
        gate_tx,
        worker,
    }
}

impl GatedWorker {
    /// Close the command channel and collect every update once the worker stops
    async fn finish(self) -> (Arc<GatedBackend>, Vec<FlipbookUpdate>) {
        let GatedWorker {
            backend,
            command_tx,
            mut update_rx,
            worker,
            ..
        } = self;
        drop(command_tx);
        worker.await.unwrap();

        let mut updates = Vec::new();
        while let Some(update) = update_rx.recv().await {
            updates.push(update);
        }
        (backend, updates)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_new_request_supersedes_running_request() {
    let mut gated = start_gated_worker();
    gated
        .command_tx
        .send(FlipbookCommand::Load {
            path: "book.pdf".into(),
        })
        .unwrap();
    gated
        .command_tx
        .send(FlipbookCommand::Process {
            doc_id: FIRST_DOC,
            options: options(72.0),
        })
        .unwrap();

    // First run has rendered and is holding its pages
    gated.finished_rx.recv().await.unwrap();
    gated
        .command_tx
        .send(FlipbookCommand::Process {
            doc_id: FIRST_DOC,
            options: options(144.0),
        })
        .unwrap();
    gated.finished_rx.recv().await.unwrap();
    gated.gate_tx.send(()).unwrap();
    gated.gate_tx.send(()).unwrap();

    let (backend, updates) = gated.finish().await;

    assert!(updates.iter().any(|u| matches!(
        u,
        FlipbookUpdate::Cancelled {
            doc_id: FIRST_DOC,
            run: RunId(1)
        }
    )));
    let processed: Vec<(RunId, u32)> = updates
        .iter()
        .filter_map(|u| match u {
            FlipbookUpdate::Processed { run, pages, .. } => Some((*run, pages[0].width)),
            _ => None,
        })
        .collect();
    assert_eq!(processed, vec![(RunId(2), 120)]);

    let ledgers = backend.ledgers.lock().unwrap();
    assert_eq!(ledgers.len(), 2);
    assert_eq!(ledgers[0].allocated(), 4);
    assert_eq!(ledgers[0].live(), 0);
    // Delivered pages are still held by the collected updates
    assert_eq!(ledgers[1].live(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_new_document_abandons_running_request() {
    let second_doc = DocumentId(2);
    let mut gated = start_gated_worker();
    for path in ["a.pdf", "b.pdf"] {
        gated
            .command_tx
            .send(FlipbookCommand::Load { path: path.into() })
            .unwrap();
    }
    gated
        .command_tx
        .send(FlipbookCommand::Process {
            doc_id: FIRST_DOC,
            options: options(72.0),
        })
        .unwrap();

    gated.finished_rx.recv().await.unwrap();
    gated
        .command_tx
        .send(FlipbookCommand::Process {
            doc_id: second_doc,
            options: options(72.0),
        })
        .unwrap();
    gated.finished_rx.recv().await.unwrap();
    gated.gate_tx.send(()).unwrap();
    gated.gate_tx.send(()).unwrap();

    let (backend, updates) = gated.finish().await;

    assert!(updates.iter().any(|u| matches!(
        u,
        FlipbookUpdate::Cancelled {
            doc_id: FIRST_DOC,
            run: RunId(1)
        }
    )));
    let processed: Vec<(DocumentId, RunId)> = updates
        .iter()
        .filter_map(|u| match u {
            FlipbookUpdate::Processed { doc_id, run, .. } => Some((*doc_id, *run)),
            _ => None,
        })
        .collect();
    assert_eq!(processed, vec![(second_doc, RunId(2))]);

    let ledgers = backend.ledgers.lock().unwrap();
    assert_eq!(ledgers.len(), 2);
    assert_eq!(ledgers[0].allocated(), 4);
    assert_eq!(ledgers[0].live(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_run_is_released_and_never_sent() {
    let mut gated = start_gated_worker();
    gated
        .command_tx
        .send(FlipbookCommand::Load {
            path: "book.pdf".into(),
        })
        .unwrap();
    gated
        .command_tx
        .send(FlipbookCommand::Process {
            doc_id: FIRST_DOC,
            options: options(72.0),
        })
        .unwrap();

    // Rendering is done; cancel before the result is handed back
    gated.finished_rx.recv().await.unwrap();
    gated
        .command_tx
        .send(FlipbookCommand::Cancel { doc_id: FIRST_DOC })
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    gated.gate_tx.send(()).unwrap();

    let (backend, updates) = gated.finish().await;

    assert!(matches!(
        updates.last(),
        Some(FlipbookUpdate::Cancelled {
            doc_id: FIRST_DOC,
            run: RunId(1)
        })
    ));
    assert!(
        !updates
            .iter()
            .any(|u| matches!(u, FlipbookUpdate::Processed { .. }))
    );

    let ledgers = backend.ledgers.lock().unwrap();
    assert_eq!(ledgers.len(), 1);
    assert_eq!(ledgers[0].allocated(), 4);
    assert_eq!(ledgers[0].live(), 0);
}
