// In-memory blob store for orchestrator tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use reqwest::StatusCode;

use crate::api::{BlobStore, ListBlobResult, PutBlobResult, PutOptions};
use crate::error::ApiError;

const BASE_URL: &str = "https://store.test/";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub options: PutOptions,
}

/// Keys are kept sorted, which is also the listing order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RefCell<BTreeMap<String, StoredObject>>,
    failing: BTreeSet<String>,
    fetches: RefCell<usize>,
}

impl MemoryStore {
    /// Puts and fetches of `key` fail with a server error.
    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn with_object(self, key: &str, body: &[u8]) -> Self {
        self.objects.borrow_mut().insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                options: PutOptions {
                    content_type: "application/octet-stream".into(),
                    access: crate::api::Access::Public,
                    multipart: false,
                    add_random_suffix: false,
                },
            },
        );
        self
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.borrow()
    }

    fn fail(&self, key: &str) -> Result<(), ApiError> {
        if self.failing.contains(key) {
            return Err(ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: Some("internal_server_error".into()),
                message: format!("cannot store {key}"),
            });
        }
        Ok(())
    }
}

impl BlobStore for MemoryStore {
    fn put(&self, key: &str, body: Vec<u8>, options: &PutOptions) -> Result<PutBlobResult, ApiError> {
        self.fail(key)?;
        self.objects.borrow_mut().insert(
            key.to_string(),
            StoredObject {
                body,
                options: options.clone(),
            },
        );
        Ok(PutBlobResult {
            url: format!("{BASE_URL}{key}"),
            download_url: format!("{BASE_URL}{key}?download=1"),
            pathname: key.to_string(),
            content_type: Some(options.content_type.clone()),
            content_disposition: None,
        })
    }

    fn list(&self, prefix: Option<&str>) -> Result<Vec<ListBlobResult>, ApiError> {
        Ok(self
            .objects
            .borrow()
            .iter()
            .filter(|(key, _)| prefix.map_or(true, |p| key.starts_with(p)))
            .map(|(key, object)| ListBlobResult {
                url: format!("{BASE_URL}{key}"),
                download_url: Some(format!("{BASE_URL}{key}?download=1")),
                pathname: key.clone(),
                size: Some(object.body.len() as u64),
                uploaded_at: None,
            })
            .collect())
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        *self.fetches.borrow_mut() += 1;
        let key = url.strip_prefix(BASE_URL).unwrap_or(url);
        self.fail(key)?;
        self.object(key)
            .map(|o| o.body)
            .ok_or_else(|| ApiError::Status {
                status: StatusCode::NOT_FOUND,
                code: None,
                message: "Not Found".into(),
            })
    }
}
