// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembly orchestrator.
//
// Owns the two user-facing build operations (compose a new document from
// attachments; merge page subsets into a new document) plus the persistence
// flows around editing sessions. Collaborator stores are injected, never
// global. Heavy rendering runs under `spawn_blocking`; persistence is
// awaited per store call, and a partial failure (blob saved, record not
// saved) is reported, not retried — retry policy belongs to the caller.

use std::sync::Arc;

use chrono::Utc;
use quire_core::error::Result;
use quire_core::{Attachment, DocumentId, DocumentRecord, EngineConfig, QuireError};
use quire_document::{
    MergeInput, PageComposer, ThumbnailFormat, ThumbnailRenderer, merge_streams,
};
use quire_storage::{BlobStore, RecordStore};
use tracing::{info, instrument, warn};

use crate::titles::resolve_unique_title;

/// Extension tag for every page stream the engine produces.
const DOCUMENT_EXTENSION: &str = "pdf";

/// Coordinates composition, thumbnailing, and persistence.
pub struct DocumentAssembler {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    /// Transient home for unsaved previews.
    scratch: Arc<dyn BlobStore>,
    config: EngineConfig,
}

impl DocumentAssembler {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        scratch: Arc<dyn BlobStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            records,
            blobs,
            scratch,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- Building -------------------------------------------------------------

    /// Compose a new document from attachments and stage it as an unsaved
    /// preview in the scratch store.
    ///
    /// The returned record is transient: it carries a fresh identity and a
    /// temporary location, and is not inserted into the record store until
    /// the user persists it.
    #[instrument(skip_all, fields(attachments = attachments.len()))]
    pub async fn build_from_attachments(
        &self,
        attachments: Vec<Attachment>,
    ) -> Result<DocumentRecord> {
        let config = self.config.clone();
        let (bytes, thumbnail) =
            tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, Vec<u8>)> {
                let composer = PageComposer::new(config.clone());
                let bytes = composer.compose(&attachments)?;
                let thumbnail = ThumbnailRenderer::from_config(&config)
                    .render(&bytes, ThumbnailFormat::Png)
                    .unwrap_or_default();
                Ok((bytes, thumbnail))
            })
            .await
            .map_err(join_error)??;

        let id = DocumentId::new();
        let name = blob_name(id, DOCUMENT_EXTENSION);
        let scratch = Arc::clone(&self.scratch);
        let location = tokio::task::spawn_blocking(move || scratch.save(&bytes, &name))
            .await
            .map_err(join_error)??;

        info!(%id, "Preview staged");
        Ok(DocumentRecord {
            id,
            title: format!("Preview {}", id.short()),
            extension: DOCUMENT_EXTENSION.into(),
            created_at: Utc::now(),
            thumbnail,
            location,
        })
    }

    /// Persist a staged preview as a durable document: new identity, unique
    /// title, bytes copied into the durable blob store, record inserted.
    #[instrument(skip_all, fields(preview = %preview.id))]
    pub async fn persist_preview(&self, preview: &DocumentRecord) -> Result<DocumentRecord> {
        let location = preview.location.clone();
        let data = tokio::task::spawn_blocking(move || std::fs::read(&location))
            .await
            .map_err(join_error)?
            .map_err(QuireError::from)?;

        let title =
            resolve_unique_title(Arc::clone(&self.records), preview.title.clone()).await?;

        let id = DocumentId::new();
        let name = blob_name(id, &preview.extension);
        let blobs = Arc::clone(&self.blobs);
        let saved = tokio::task::spawn_blocking(move || blobs.save(&data, &name))
            .await
            .map_err(join_error)??;

        let record = DocumentRecord {
            id,
            title,
            extension: preview.extension.clone(),
            created_at: Utc::now(),
            thumbnail: preview.thumbnail.clone(),
            location: saved,
        };
        self.insert_record(record.clone()).await?;

        info!(%id, title = %record.title, "Preview persisted");
        Ok(record)
    }

    // -- Merging --------------------------------------------------------------

    /// Concatenate the selected pages of the given sources into a brand-new
    /// persisted document.
    ///
    /// Fails, discarding all partial output, when the concatenated result is
    /// empty or cannot be serialized.
    #[instrument(skip_all, fields(sources = sources.len(), title))]
    pub async fn merge_subsets(
        &self,
        sources: Vec<MergeInput>,
        title: &str,
    ) -> Result<DocumentRecord> {
        let config = self.config.clone();
        let quality = self.config.thumbnail_jpeg_quality;
        let (bytes, thumbnail) =
            tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, Vec<u8>)> {
                let bytes = merge_streams(&sources)?;
                let thumbnail = ThumbnailRenderer::from_config(&config)
                    .render(&bytes, ThumbnailFormat::Jpeg { quality })
                    .unwrap_or_default();
                Ok((bytes, thumbnail))
            })
            .await
            .map_err(join_error)??;

        let title = resolve_unique_title(Arc::clone(&self.records), title.to_owned()).await?;

        let id = DocumentId::new();
        let name = blob_name(id, DOCUMENT_EXTENSION);
        let blobs = Arc::clone(&self.blobs);
        let location = tokio::task::spawn_blocking(move || blobs.save(&bytes, &name))
            .await
            .map_err(join_error)??;

        let record = DocumentRecord {
            id,
            title,
            extension: DOCUMENT_EXTENSION.into(),
            created_at: Utc::now(),
            thumbnail,
            location,
        };
        self.insert_record(record.clone()).await?;

        info!(%id, title = %record.title, "Merge persisted");
        Ok(record)
    }

    // -- Session persistence --------------------------------------------------

    /// Save committed session bytes in place: same identity and title, later
    /// timestamp, fresh thumbnail, blob overwritten under the existing name,
    /// record replaced.
    #[instrument(skip_all, fields(id = %record.id, bytes = bytes.len()))]
    pub async fn save_session(
        &self,
        record: &DocumentRecord,
        bytes: Vec<u8>,
    ) -> Result<DocumentRecord> {
        let config = self.config.clone();
        let name = blob_name(record.id, &record.extension);
        let blobs = Arc::clone(&self.blobs);
        let (thumbnail, location) =
            tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, std::path::PathBuf)> {
                let thumbnail = ThumbnailRenderer::from_config(&config)
                    .render(&bytes, ThumbnailFormat::Png)
                    .unwrap_or_default();
                let location = blobs.save(&bytes, &name)?;
                Ok((thumbnail, location))
            })
            .await
            .map_err(join_error)??;

        let updated = DocumentRecord {
            id: record.id,
            title: record.title.clone(),
            extension: record.extension.clone(),
            created_at: Utc::now(),
            thumbnail,
            location,
        };
        self.insert_record(updated.clone()).await?;

        info!(id = %updated.id, "Session saved in place");
        Ok(updated)
    }

    // -- Catalogue ------------------------------------------------------------

    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let records = Arc::clone(&self.records);
        tokio::task::spawn_blocking(move || records.list_all())
            .await
            .map_err(join_error)?
    }

    /// Delete a document's record and, best-effort, its stored bytes.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_document(&self, id: DocumentId) -> Result<()> {
        let records = Arc::clone(&self.records);
        let found = tokio::task::spawn_blocking(move || -> Result<Option<DocumentRecord>> {
            Ok(records.list_all()?.into_iter().find(|r| r.id == id))
        })
        .await
        .map_err(join_error)??;

        let Some(record) = found else {
            return Err(QuireError::NotFound(format!("document {id}")));
        };

        let records = Arc::clone(&self.records);
        tokio::task::spawn_blocking(move || records.delete_by_id(id))
            .await
            .map_err(join_error)??;

        // The record is the source of truth; a stale blob is only wasted space.
        if let Err(err) = self.blobs.remove(&blob_name(id, &record.extension)) {
            warn!(%err, "Stored bytes could not be removed");
        }

        info!(%id, "Document deleted");
        Ok(())
    }

    async fn insert_record(&self, record: DocumentRecord) -> Result<()> {
        let records = Arc::clone(&self.records);
        tokio::task::spawn_blocking(move || records.insert(&record))
            .await
            .map_err(join_error)?
    }
}

fn blob_name(id: DocumentId, extension: &str) -> String {
    format!("{id}.{extension}")
}

fn join_error(err: tokio::task::JoinError) -> QuireError {
    QuireError::Background(err.to_string())
}
