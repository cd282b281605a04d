use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::DocumentFormat;

/// Where uploaded originals live.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, format: DocumentFormat) -> Result<(), AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Original uploaded files in the S3-compatible bucket.
#[derive(Clone)]
pub struct S3DocumentStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

/// `documents/{owner}/{document_id}.{ext}`; path separators in the owner are replaced.
pub fn storage_key(owner: &str, document_id: Uuid, format: DocumentFormat) -> String {
    let owner: String = owner
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("documents/{owner}/{document_id}.{}", format.as_str())
}

impl S3DocumentStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl DocumentStorage for S3DocumentStorage {
    async fn put(&self, key: &str, bytes: Bytes, format: DocumentFormat) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(format.content_type())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded document to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete failed: {e}")))?;

        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryDocumentStorage {
        objects: Mutex<HashMap<String, Bytes>>,
    }

    impl InMemoryDocumentStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn keys(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }
    }

    #[async_trait]
    impl DocumentStorage for InMemoryDocumentStorage {
        async fn put(
            &self,
            key: &str,
            bytes: Bytes,
            _format: DocumentFormat,
        ) -> Result<(), AppError> {
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), AppError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::InMemoryDocumentStorage;
    use super::*;

    #[test]
    fn test_storage_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            storage_key("user-1", id, DocumentFormat::Docx),
            "documents/user-1/00000000-0000-0000-0000-000000000000.docx"
        );
    }

    #[test]
    fn test_storage_key_owner_cannot_escape_prefix() {
        let key = storage_key("../other/user", Uuid::nil(), DocumentFormat::Pdf);
        assert!(key.starts_with("documents/.._other_user/"));
        assert_eq!(key.matches('/').count(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_put_then_delete() {
        let storage = InMemoryDocumentStorage::new();
        storage
            .put("documents/u/a.pdf", Bytes::from_static(b"%PDF"), DocumentFormat::Pdf)
            .await
            .unwrap();
        assert_eq!(storage.keys(), vec!["documents/u/a.pdf".to_string()]);
        storage.delete("documents/u/a.pdf").await.unwrap();
        assert!(storage.keys().is_empty());
    }
}
