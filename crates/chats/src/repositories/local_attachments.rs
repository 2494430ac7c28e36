//! Filesystem-backed attachment storage.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parley_config::AttachmentConfig;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::fs;
use tracing::{debug, error};

use crate::entities::{AttachmentRef, RawAttachment};
use crate::repositories::AttachmentStore;
use crate::types::{ChatError, ChatResult};
use crate::utils::Validator;

/// Characters left as-is in the URL path segment of a stored blob.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Writes each blob to `<root>/<cuid>-<file name>` and addresses it as
/// `<public base url>/<cuid>-<file name>`, with the last segment
/// percent-encoded.
#[derive(Debug, Clone)]
pub struct LocalAttachmentStore {
    root: PathBuf,
    public_base_url: String,
    max_size_bytes: u64,
}

impl LocalAttachmentStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>, max_size_bytes: u64) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_size_bytes,
        }
    }

    pub fn from_config(config: &AttachmentConfig) -> Self {
        Self::new(
            &config.storage_dir,
            config.public_base_url.clone(),
            config.max_size_bytes,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn url_for(&self, stored_name: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url,
            utf8_percent_encode(stored_name, SEGMENT)
        )
    }

    /// Map a URL issued by this store back to the file it names.
    fn path_for(&self, url: &str) -> ChatResult<PathBuf> {
        let segment = url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| ChatError::attachment(format!("{url} is not a local attachment")))?;

        let stored_name = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| ChatError::attachment(format!("{url} is not a local attachment")))?;
        Validator::file_name(&stored_name)?;

        Ok(self.root.join(stored_name.as_ref()))
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn store(&self, attachment: RawAttachment) -> ChatResult<AttachmentRef> {
        Validator::file_name(&attachment.file_name)?;
        Validator::file_size(attachment.data.len() as u64, self.max_size_bytes)?;

        fs::create_dir_all(&self.root).await.map_err(|e| {
            error!(root = %self.root.display(), error = %e, "failed to create attachment directory");
            ChatError::attachment(format!("attachment storage unavailable: {e}"))
        })?;

        let stored_name = format!("{}-{}", cuid2::create_id(), attachment.file_name);
        let path = self.root.join(&stored_name);

        fs::write(&path, &attachment.data).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to write attachment");
            ChatError::attachment(format!("failed to store {}: {e}", attachment.file_name))
        })?;

        debug!(path = %path.display(), bytes = attachment.data.len(), "stored attachment");

        Ok(AttachmentRef {
            url: self.url_for(&stored_name),
            media_type: attachment.media_type(),
            name: attachment.file_name,
        })
    }

    async fn remove(&self, attachment: &AttachmentRef) -> ChatResult<()> {
        let path = self.path_for(&attachment.url)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed attachment");
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to remove attachment");
                Err(ChatError::attachment(format!("failed to remove {}: {e}", attachment.name)))
            }
        }
    }
}
