//! Synchronous client for a remote face-recognition service.
//!
//! # Overview
//! Covers face detection and comparison plus the person directory resource
//! (directories, persons, faces) and the identify / verify / find-similar
//! queries run against a directory. All recognition happens server-side;
//! this crate only shapes requests and interprets responses.
//!
//! # Design
//! - `ClientConfig` is validated once and never changes afterwards. A token
//!   provider is invoked during `build()` and its token is reused for the
//!   client's lifetime.
//! - `FaceServiceClient` pairs every operation with a pure `build_*` method,
//!   so the I/O boundary stays explicit and testable.
//! - `Transport` is the only trait seam; `UreqTransport` is the default.
//! - Results are the service's raw JSON (`serde_json::Value`); 204 yields
//!   `None`.

pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::{parse_response, ApiResult, FaceServiceClient};
pub use config::{ClientConfig, ClientConfigBuilder, Credential, DEFAULT_USER_AGENT};
pub use encoding::read_file_to_base64;
pub use error::{BoxError, FaceError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport, DEFAULT_BODY_LIMIT};
pub use types::{BoundingBox, Tags};
