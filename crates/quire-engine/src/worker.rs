// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background engine worker.
//
// Commands flow in over one channel, completed results flow out over
// another; the presentation layer is only ever handed finished updates,
// never polled state. The worker owns at most one editing session at a
// time, which gives structural mutations their single-writer discipline.
// There is no cancellation: a command runs to completion or failure, and
// the caller is free to discard the resulting update.

use std::sync::Arc;

use quire_core::error::Result;
use quire_core::{Attachment, DocumentId, DocumentRecord, PageSelection, QuireError};
use quire_document::{EditSession, MergeInput};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::assembler::DocumentAssembler;

/// Commands sent from the presentation layer to the worker.
#[derive(Debug)]
pub enum EngineCommand {
    /// Compose attachments into a staged preview document.
    BuildPreview { attachments: Vec<Attachment> },
    /// Persist a staged preview as a durable document.
    PersistPreview { preview: DocumentRecord },
    /// Merge page subsets from several stored streams into a new document.
    Merge {
        sources: Vec<MergeInput>,
        title: String,
    },
    ListDocuments,
    DeleteDocument { id: DocumentId },

    /// Open an editing session over a stored document.
    SessionOpen { record: DocumentRecord },
    /// Delete the selected pages of the open session.
    SessionDeletePages { selection: PageSelection },
    /// Append a synthesized text page to the open session.
    SessionInsertTextPage { text: String },
    /// Extract the selected pages into a new persisted document.
    SessionExtract {
        selection: PageSelection,
        title: String,
    },
    /// Commit the open session and save it in place.
    SessionCommit,
}

/// Updates published from the worker to the presentation layer.
#[derive(Debug)]
pub enum EngineUpdate {
    PreviewReady { record: DocumentRecord },
    DocumentSaved { record: DocumentRecord },
    MergeComplete { record: DocumentRecord },
    Documents { records: Vec<DocumentRecord> },
    DocumentDeleted { id: DocumentId },

    SessionLoaded { page_count: usize },
    /// The session mutated and rebuilt; `bytes` is the fresh canonical form
    /// for redisplay.
    SessionChanged { page_count: usize, bytes: Vec<u8> },
    SessionSaved { record: DocumentRecord },

    Error { message: String },
}

/// The one live editing session and the record it belongs to.
struct ActiveSession {
    record: DocumentRecord,
    session: EditSession,
}

/// Spawn the worker task, returning its command sender and update receiver.
pub fn spawn_worker(
    assembler: Arc<DocumentAssembler>,
) -> (
    mpsc::UnboundedSender<EngineCommand>,
    mpsc::UnboundedReceiver<EngineUpdate>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    tokio::spawn(worker_task(assembler, command_rx, update_tx));
    (command_tx, update_rx)
}

/// Drain commands until every sender is dropped.
pub async fn worker_task(
    assembler: Arc<DocumentAssembler>,
    mut command_rx: mpsc::UnboundedReceiver<EngineCommand>,
    update_tx: mpsc::UnboundedSender<EngineUpdate>,
) {
    let mut session: Option<ActiveSession> = None;

    while let Some(command) = command_rx.recv().await {
        process_command(command, &assembler, &mut session, &update_tx).await;
    }

    info!("Engine worker stopped");
}

async fn process_command(
    command: EngineCommand,
    assembler: &Arc<DocumentAssembler>,
    session: &mut Option<ActiveSession>,
    update_tx: &mpsc::UnboundedSender<EngineUpdate>,
) {
    match command {
        EngineCommand::BuildPreview { attachments } => {
            match assembler.build_from_attachments(attachments).await {
                Ok(record) => send(update_tx, EngineUpdate::PreviewReady { record }),
                Err(err) => send_error(update_tx, &err),
            }
        }

        EngineCommand::PersistPreview { preview } => {
            match assembler.persist_preview(&preview).await {
                Ok(record) => send(update_tx, EngineUpdate::DocumentSaved { record }),
                Err(err) => send_error(update_tx, &err),
            }
        }

        EngineCommand::Merge { sources, title } => {
            match assembler.merge_subsets(sources, &title).await {
                Ok(record) => send(update_tx, EngineUpdate::MergeComplete { record }),
                Err(err) => send_error(update_tx, &err),
            }
        }

        EngineCommand::ListDocuments => match assembler.list_documents().await {
            Ok(records) => send(update_tx, EngineUpdate::Documents { records }),
            Err(err) => send_error(update_tx, &err),
        },

        EngineCommand::DeleteDocument { id } => match assembler.delete_document(id).await {
            Ok(()) => send(update_tx, EngineUpdate::DocumentDeleted { id }),
            Err(err) => send_error(update_tx, &err),
        },

        EngineCommand::SessionOpen { record } => {
            let location = record.location.clone();
            let config = assembler.config().clone();
            let outcome = tokio::task::spawn_blocking(move || -> Result<EditSession> {
                let bytes = std::fs::read(&location)?;
                EditSession::open(bytes, &config)
            })
            .await;

            match outcome {
                Ok(Ok(opened)) => {
                    let page_count = opened.page_count();
                    *session = Some(ActiveSession {
                        record,
                        session: opened,
                    });
                    send(update_tx, EngineUpdate::SessionLoaded { page_count });
                }
                Ok(Err(err)) => {
                    *session = None;
                    send_error(update_tx, &err);
                }
                Err(err) => {
                    *session = None;
                    send_error(update_tx, &QuireError::Background(err.to_string()));
                }
            }
        }

        EngineCommand::SessionDeletePages { selection } => {
            mutate_session(session, update_tx, move |s| {
                s.delete_pages(&selection)
            })
            .await;
        }

        EngineCommand::SessionInsertTextPage { text } => {
            mutate_session(session, update_tx, move |s| {
                s.insert_text_page(&text).map(|_| ())
            })
            .await;
        }

        EngineCommand::SessionExtract { selection, title } => {
            let Some(mut active) = session.take() else {
                send_no_session(update_tx);
                return;
            };
            let outcome = tokio::task::spawn_blocking(move || {
                let extracted = active.session.extract_subset(&selection);
                (active, extracted)
            })
            .await;

            match outcome {
                Ok((active, Ok(bytes))) => {
                    *session = Some(active);
                    match assembler
                        .merge_subsets(vec![MergeInput::all(bytes)], &title)
                        .await
                    {
                        Ok(record) => send(update_tx, EngineUpdate::MergeComplete { record }),
                        Err(err) => send_error(update_tx, &err),
                    }
                }
                Ok((active, Err(err))) => {
                    *session = Some(active);
                    send_error(update_tx, &err);
                }
                Err(err) => send_error(update_tx, &QuireError::Background(err.to_string())),
            }
        }

        EngineCommand::SessionCommit => {
            let Some(mut active) = session.take() else {
                send_no_session(update_tx);
                return;
            };
            let outcome = tokio::task::spawn_blocking(move || {
                let committed = active.session.commit();
                (active, committed)
            })
            .await;

            match outcome {
                Ok((mut active, Ok(bytes))) => {
                    match assembler.save_session(&active.record, bytes).await {
                        Ok(updated) => {
                            active.record = updated.clone();
                            *session = Some(active);
                            send(update_tx, EngineUpdate::SessionSaved { record: updated });
                        }
                        Err(err) => {
                            *session = Some(active);
                            send_error(update_tx, &err);
                        }
                    }
                }
                Ok((active, Err(err))) => {
                    *session = Some(active);
                    send_error(update_tx, &err);
                }
                Err(err) => send_error(update_tx, &QuireError::Background(err.to_string())),
            }
        }
    }
}

/// Run one mutation on the open session off the async thread, then publish
/// the rebuilt stream.
async fn mutate_session<F>(
    slot: &mut Option<ActiveSession>,
    update_tx: &mpsc::UnboundedSender<EngineUpdate>,
    mutate: F,
) where
    F: FnOnce(&mut EditSession) -> Result<()> + Send + 'static,
{
    let Some(mut active) = slot.take() else {
        send_no_session(update_tx);
        return;
    };

    let outcome = tokio::task::spawn_blocking(move || {
        let result = mutate(&mut active.session);
        (active, result)
    })
    .await;

    match outcome {
        Ok((active, Ok(()))) => {
            let update = EngineUpdate::SessionChanged {
                page_count: active.session.page_count(),
                bytes: active.session.bytes().to_vec(),
            };
            *slot = Some(active);
            send(update_tx, update);
        }
        Ok((active, Err(err))) => {
            *slot = Some(active);
            send_error(update_tx, &err);
        }
        Err(err) => send_error(update_tx, &QuireError::Background(err.to_string())),
    }
}

fn send(update_tx: &mpsc::UnboundedSender<EngineUpdate>, update: EngineUpdate) {
    // A dropped receiver just means the presentation layer went away.
    let _ = update_tx.send(update);
}

fn send_error(update_tx: &mpsc::UnboundedSender<EngineUpdate>, err: &QuireError) {
    warn!(%err, "Engine operation failed");
    send(
        update_tx,
        EngineUpdate::Error {
            message: err.to_string(),
        },
    );
}

fn send_no_session(update_tx: &mpsc::UnboundedSender<EngineUpdate>) {
    send_error(
        update_tx,
        &QuireError::NotFound("no editing session is open".into()),
    );
}
