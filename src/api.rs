// Blob store client: a small blocking HTTP client for the Vercel Blob
// API. Uploads, listings and object fetches all go through here, behind
// the `BlobStore` trait so the orchestrators can be driven by a fake.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;

const API_VERSION: &str = "7";
/// Size of each part of a multipart upload.
pub const PART_SIZE: usize = 8 * 1024 * 1024;
/// Page size requested from the list endpoint.
const LIST_LIMIT: &str = "1000";

// Same set `encodeURIComponent` leaves alone.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
}

impl Access {
    fn as_str(self) -> &'static str {
        match self {
            Access::Public => "public",
        }
    }
}

/// How an object is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    pub access: Access,
    pub multipart: bool,
    /// Whether the store may append a random suffix to the key. Off means
    /// the key is used verbatim and re-uploads overwrite.
    pub add_random_suffix: bool,
}

/// Response to a successful put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutBlobResult {
    pub url: String,
    pub download_url: String,
    pub pathname: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_disposition: Option<String>,
}

/// One object from a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBlobResult {
    pub url: String,
    #[serde(default)]
    pub download_url: Option<String>,
    pub pathname: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    blobs: Vec<ListBlobResult>,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMultipartResponse {
    key: String,
    upload_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadPartResponse {
    etag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletedPart {
    part_number: u32,
    etag: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Remote object store capability used by the orchestrators.
pub trait BlobStore {
    /// Store `body` under `key`.
    fn put(&self, key: &str, body: Vec<u8>, options: &PutOptions) -> Result<PutBlobResult, ApiError>;

    /// Every object whose key starts with `prefix` (all objects if `None`),
    /// in store order.
    fn list(&self, prefix: Option<&str>) -> Result<Vec<ListBlobResult>, ApiError>;

    /// Contents of the object at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}

/// Blocking client for the Vercel Blob HTTP API.
#[derive(Clone)]
pub struct BlobClient {
    client: Client,
    api_url: Url,
    token: String,
}

impl BlobClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("blob-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(BlobClient {
            client,
            api_url: config.api_url.clone(),
            token: config.token.clone(),
        })
    }

    /// `path` resolved against the API root.
    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.api_url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{path}"));
        url.set_query(None);
        url
    }

    fn auth_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ApiError::Decode("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("x-api-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn put_headers(&self, options: &PutOptions) -> Result<HeaderMap, ApiError> {
        let mut headers = self.auth_headers()?;
        headers.insert("x-content-type", header_value(&options.content_type)?);
        headers.insert(
            "x-add-random-suffix",
            HeaderValue::from_static(if options.add_random_suffix { "1" } else { "0" }),
        );
        headers.insert(
            "x-vercel-blob-access",
            HeaderValue::from_static(options.access.as_str()),
        );
        Ok(headers)
    }

    fn put_single(&self, key: &str, body: Vec<u8>, options: &PutOptions) -> Result<PutBlobResult, ApiError> {
        let req = self
            .client
            .put(self.endpoint(""))
            .query(&[("pathname", key)])
            .headers(self.put_headers(options)?)
            .body(body);
        json(send(req)?)
    }

    fn put_multipart(&self, key: &str, body: Vec<u8>, options: &PutOptions) -> Result<PutBlobResult, ApiError> {
        let mpu_url = self.endpoint("mpu");
        let headers = self.put_headers(options)?;

        let created: CreateMultipartResponse = json(send(
            self.client
                .post(mpu_url.clone())
                .query(&[("pathname", key)])
                .headers(headers.clone())
                .header("x-mpu-action", "create"),
        )?)?;
        debug!(key, upload_id = %created.upload_id, size = body.len(), "created multipart upload");

        let mpu_headers = |action: &'static str| -> Result<HeaderMap, ApiError> {
            let mut h = headers.clone();
            h.insert("x-mpu-action", HeaderValue::from_static(action));
            h.insert(
                "x-mpu-key",
                header_value(&utf8_percent_encode(&created.key, KEY_ENCODE_SET).to_string())?,
            );
            h.insert("x-mpu-upload-id", header_value(&created.upload_id)?);
            Ok(h)
        };

        let mut parts = Vec::new();
        let mut chunks: Vec<&[u8]> = body.chunks(PART_SIZE).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }
        for (index, chunk) in chunks.into_iter().enumerate() {
            let part_number = index as u32 + 1;
            let uploaded: UploadPartResponse = json(send(
                self.client
                    .post(mpu_url.clone())
                    .query(&[("pathname", key)])
                    .headers(mpu_headers("upload")?)
                    .header("x-mpu-part-number", part_number.to_string())
                    .body(chunk.to_vec()),
            )?)?;
            debug!(key, part_number, "uploaded part");
            parts.push(CompletedPart {
                part_number,
                etag: uploaded.etag,
            });
        }

        json(send(
            self.client
                .post(mpu_url)
                .query(&[("pathname", key)])
                .headers(mpu_headers("complete")?)
                .json(&parts),
        )?)
    }
}

impl BlobStore for BlobClient {
    fn put(&self, key: &str, body: Vec<u8>, options: &PutOptions) -> Result<PutBlobResult, ApiError> {
        debug!(key, size = body.len(), multipart = options.multipart, "put");
        if options.multipart {
            self.put_multipart(key, body, options)
        } else {
            self.put_single(key, body, options)
        }
    }

    fn list(&self, prefix: Option<&str>) -> Result<Vec<ListBlobResult>, ApiError> {
        let mut blobs = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut query = vec![("limit", LIST_LIMIT.to_string())];
            if let Some(prefix) = prefix {
                query.push(("prefix", prefix.to_string()));
            }
            if let Some(cursor) = cursor.take() {
                query.push(("cursor", cursor));
            }

            let req = self
                .client
                .get(self.endpoint(""))
                .query(&query)
                .headers(self.auth_headers()?);
            let page: ListResponse = json(send(req)?)?;
            debug!(count = page.blobs.len(), has_more = page.has_more, "listed page");
            blobs.extend(page.blobs);

            match page.cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }
        Ok(blobs)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let res = send(self.client.get(url))?;
        Ok(res.bytes()?.to_vec())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|_| ApiError::Decode(format!("invalid header value {value:?}")))
}

/// Send `req`, turning non-success statuses into `ApiError::Status`.
fn send(req: RequestBuilder) -> Result<Response, ApiError> {
    let res = req.send()?;
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (
            body.error.code,
            body.error.message.unwrap_or_else(|| text.clone()),
        ),
        Err(_) => (None, text),
    };
    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        message
    };
    Err(ApiError::Status {
        status,
        code,
        message,
    })
}

fn json<T: serde::de::DeserializeOwned>(res: Response) -> Result<T, ApiError> {
    let text = res.text()?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}
