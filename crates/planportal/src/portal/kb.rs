use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db::kb_repo;
use crate::error::{PortalError, Result};
use crate::model::{KbArticle, KbArticleInput, KbAttachment, KbKind, KbSection};
use crate::storage::{DataPaths, StoredFile};

use super::{file_name_of, Portal, Upload};

impl Portal {
    pub fn list_kb(&self, kind: KbKind) -> Result<Vec<KbSection>> {
        Ok(self.db.with_conn(|conn| kb_repo::list_sections(conn, kind))?)
    }

    /// Adds an article to the section named by `sectionId`, or to the
    /// section titled `sectionTitle`, which is created when missing.
    pub fn create_kb_article(
        &self,
        kind: KbKind,
        input: KbArticleInput,
        upload: Option<Upload>,
    ) -> Result<KbArticle> {
        let title = input
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or(PortalError::MissingField("title"))?;
        let section_id = input.section_id.filter(|s| !s.is_empty());
        let section_title = input.section_title.filter(|s| !s.trim().is_empty());
        if section_id.is_none() && section_title.is_none() {
            return Err(PortalError::MissingField("sectionId"));
        }

        let now = Utc::now();
        let mut article = KbArticle {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            content: input.content.unwrap_or_default(),
            attachment: None,
            created_at: now,
            updated_at: now,
        };

        let _guard = self.lock();
        let stored = match &upload {
            Some(upload) => Some(self.store_attachment(kind, &article.id, upload)?),
            None => None,
        };
        if let (Some(stored), Some(upload)) = (&stored, &upload) {
            article.attachment = Some(attachment(stored, upload, now));
        }

        let result = self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let section = resolve_section(&tx, kind, section_id.as_deref(), section_title.as_deref())?;
            kb_repo::upsert_article(&tx, kind, &section, &article)?;
            tx.commit()?;
            Ok::<_, PortalError>(section)
        });
        let section = self.settle(result, stored.as_ref())?;

        log::info!(
            "Added {} article {} to section {}",
            kind.as_str(),
            article.id,
            section
        );
        Ok(article)
    }

    /// Updates title and content, and replaces the attachment when a file
    /// is sent. The article stays in its section.
    pub fn update_kb_article(
        &self,
        kind: KbKind,
        id: &str,
        input: KbArticleInput,
        upload: Option<Upload>,
    ) -> Result<KbArticle> {
        let _guard = self.lock();
        let (section, mut article) = self.find_kb_article(kind, id)?;

        let now = Utc::now();
        if let Some(title) = input.title.filter(|t| !t.trim().is_empty()) {
            article.title = title;
        }
        if let Some(content) = input.content {
            article.content = content;
        }
        article.updated_at = now;

        let stored = match &upload {
            Some(upload) => Some(self.store_attachment(kind, &article.id, upload)?),
            None => None,
        };
        let mut replaced = None;
        if let (Some(stored), Some(upload)) = (&stored, &upload) {
            replaced = article.attachment.replace(attachment(stored, upload, now));
        }

        let result = self.db.with_conn(|conn| {
            kb_repo::upsert_article(conn, kind, &section, &article)?;
            Ok::<_, PortalError>(())
        });
        self.settle(result, stored.as_ref())?;

        if let Some(old) = replaced {
            self.files.remove_best_effort([old.stored_path.as_str()]);
        }
        Ok(article)
    }

    pub fn delete_kb_article(&self, kind: KbKind, id: &str) -> Result<()> {
        let _guard = self.lock();
        let (_, article) = self.find_kb_article(kind, id)?;
        self.db
            .with_conn(|conn| kb_repo::delete_article(conn, kind, id))?;
        if let Some(attachment) = &article.attachment {
            self.files.remove_best_effort([attachment.stored_path.as_str()]);
        }
        log::info!("Deleted {} article {}", kind.as_str(), id);
        Ok(())
    }

    /// An article's attachment and its location on disk.
    pub fn kb_article_file(&self, kind: KbKind, id: &str) -> Result<(KbAttachment, PathBuf)> {
        let (_, article) = self.find_kb_article(kind, id)?;
        let attachment = article
            .attachment
            .ok_or_else(|| PortalError::not_found("Attachment", id))?;
        let path = self.files.resolve(&attachment.stored_path)?;
        if !path.is_file() {
            log::warn!("Article {} attachment {} is missing", id, attachment.stored_path);
            return Err(PortalError::not_found("File", attachment.file_name.clone()));
        }
        Ok((attachment, path))
    }

    fn find_kb_article(&self, kind: KbKind, id: &str) -> Result<(String, KbArticle)> {
        self.db
            .with_conn(|conn| kb_repo::find_article(conn, kind, id))?
            .ok_or_else(|| PortalError::not_found("Article", id))
    }

    fn store_attachment(&self, kind: KbKind, article_id: &str, upload: &Upload) -> Result<StoredFile> {
        Ok(self.files.store(
            &upload.bytes,
            &DataPaths::kb_relative(kind),
            article_id,
            upload.extension().as_deref(),
        )?)
    }

    /// Removes a freshly stored attachment when the table write failed.
    fn settle<T>(&self, result: Result<T>, stored: Option<&StoredFile>) -> Result<T> {
        if result.is_err() {
            if let Some(stored) = stored {
                self.files.remove_best_effort([stored.relative.as_str()]);
            }
        }
        result
    }
}

fn resolve_section(
    conn: &Connection,
    kind: KbKind,
    section_id: Option<&str>,
    section_title: Option<&str>,
) -> Result<String> {
    if let Some(id) = section_id {
        if kb_repo::section_exists(conn, kind, id)? {
            return Ok(id.to_string());
        }
        if section_title.is_none() {
            return Err(PortalError::not_found("Section", id));
        }
    }
    let title = section_title.ok_or(PortalError::MissingField("sectionTitle"))?.trim();
    if let Some(existing) = kb_repo::find_section_by_title(conn, kind, title)? {
        return Ok(existing);
    }
    let id = uuid::Uuid::new_v4().to_string();
    kb_repo::insert_section(conn, kind, &id, title)?;
    log::info!("Created {} section {:?}", kind.as_str(), title);
    Ok(id)
}

fn attachment(stored: &StoredFile, upload: &Upload, at: DateTime<Utc>) -> KbAttachment {
    KbAttachment {
        file_name: file_name_of(&stored.relative),
        original_name: crate::sanitize::safe_file_name(&upload.file_name),
        stored_path: stored.relative.clone(),
        size: stored.size,
        content_type: upload.content_type(),
        uploaded_at: at,
    }
}
