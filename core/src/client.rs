//! Request builder, response interpreter and blocking client for the face
//! service.
//!
//! # Design
//! Every remote operation exists twice. `build_*` produces an `HttpRequest`
//! without touching the network, and the plain-named method sends that
//! request through the client's `Transport` and feeds the answer to
//! `parse_response`. Callers that run their own HTTP stack can use the
//! `build_*` half and `parse_response` directly.
//!
//! Response interpretation is uniform: 204 yields `None`, 200 and 201 yield
//! the parsed JSON body, anything else is a `FaceError::Api`. There is no
//! retry.

use std::fmt;

use log::{debug, error, info};
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::FaceError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    AddFaceBody, AddPersonBody, BoundingBox, CompareFacesBody, DetectFacesBody, FaceData,
    FaceQueryBody, PersonDirectoryBody, Tags, TargetedFaceSource, UpdateFaceBody,
    UpdatePersonBody,
};

/// Outcome of one operation: `None` for 204, the JSON body otherwise.
pub type ApiResult = Result<Option<Value>, FaceError>;

const JSON_CONTENT_TYPE: (&str, &str) = ("content-type", "application/json");

/// Synchronous client for the face detection, comparison and person
/// directory endpoints.
///
/// Holds only immutable configuration and a transport, so one instance can
/// serve any number of sequential calls.
#[derive(Clone)]
pub struct FaceServiceClient<T = UreqTransport> {
    config: ClientConfig,
    headers: Vec<(String, String)>,
    transport: T,
}

impl<T> fmt::Debug for FaceServiceClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceServiceClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FaceServiceClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T> FaceServiceClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let headers = config.headers();
        Self {
            config,
            headers,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // URL templates
    // -----------------------------------------------------------------------

    /// `{endpoint}/contentunderstanding/faces:{action}?api-version={version}`
    pub fn face_url(&self, action: &str) -> String {
        format!(
            "{}/contentunderstanding/faces:{action}?api-version={}",
            self.config.endpoint(),
            self.config.api_version()
        )
    }

    /// `{endpoint}/contentunderstanding/personDirectories[/{path}]?api-version={version}`
    ///
    /// `path` is inserted verbatim.
    pub fn person_directory_url(&self, path: Option<&str>) -> String {
        let mut url = format!(
            "{}/contentunderstanding/personDirectories",
            self.config.endpoint()
        );
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            url.push('/');
            url.push_str(path);
        }
        format!("{url}?api-version={}", self.config.api_version())
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest {
            method,
            url,
            headers: self.headers.clone(),
            body: None,
        }
    }

    fn json_request<B: Serialize>(
        &self,
        method: HttpMethod,
        url: String,
        body: &B,
    ) -> Result<HttpRequest, FaceError> {
        let body = serde_json::to_string(body).map_err(FaceError::Serialization)?;
        let mut headers = self.headers.clone();
        headers.push((JSON_CONTENT_TYPE.0.to_string(), JSON_CONTENT_TYPE.1.to_string()));
        Ok(HttpRequest {
            method,
            url,
            headers,
            body: Some(body),
        })
    }

    // -----------------------------------------------------------------------
    // Face actions
    // -----------------------------------------------------------------------

    pub fn build_detect_faces(
        &self,
        url: Option<&str>,
        data: Option<&str>,
    ) -> Result<HttpRequest, FaceError> {
        let body = DetectFacesBody { url, data };
        self.json_request(HttpMethod::Post, self.face_url("detect"), &body)
    }

    pub fn build_compare_faces(&self, data1: &str, data2: &str) -> Result<HttpRequest, FaceError> {
        let body = CompareFacesBody {
            face_source1: FaceData { data: data1 },
            face_source2: FaceData { data: data2 },
        };
        self.json_request(HttpMethod::Post, self.face_url("compare"), &body)
    }

    // -----------------------------------------------------------------------
    // Person directories
    // -----------------------------------------------------------------------

    pub fn build_list_person_directories(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.person_directory_url(None))
    }

    pub fn build_get_person_directory(&self, person_directory_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            self.person_directory_url(Some(person_directory_id)),
        )
    }

    pub fn build_create_person_directory(
        &self,
        person_directory_id: &str,
        description: Option<&str>,
        tags: Option<&Tags>,
    ) -> Result<HttpRequest, FaceError> {
        let body = PersonDirectoryBody { description, tags };
        self.json_request(
            HttpMethod::Put,
            self.person_directory_url(Some(person_directory_id)),
            &body,
        )
    }

    pub fn build_update_person_directory(
        &self,
        person_directory_id: &str,
        description: Option<&str>,
        tags: Option<&Tags>,
    ) -> Result<HttpRequest, FaceError> {
        let body = PersonDirectoryBody { description, tags };
        self.json_request(
            HttpMethod::Patch,
            self.person_directory_url(Some(person_directory_id)),
            &body,
        )
    }

    pub fn build_delete_person_directory(&self, person_directory_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Delete,
            self.person_directory_url(Some(person_directory_id)),
        )
    }

    // -----------------------------------------------------------------------
    // Persons
    // -----------------------------------------------------------------------

    pub fn build_list_persons(&self, person_directory_id: &str) -> HttpRequest {
        let path = format!("{person_directory_id}/persons");
        self.request(HttpMethod::Get, self.person_directory_url(Some(&path)))
    }

    pub fn build_get_person(&self, person_directory_id: &str, person_id: &str) -> HttpRequest {
        let path = format!("{person_directory_id}/persons/{person_id}");
        self.request(HttpMethod::Get, self.person_directory_url(Some(&path)))
    }

    /// `face_ids` is left out of the body when `None` or empty.
    pub fn build_add_person(
        &self,
        person_directory_id: &str,
        tags: Option<&Tags>,
        face_ids: Option<&[String]>,
    ) -> Result<HttpRequest, FaceError> {
        let path = format!("{person_directory_id}/persons");
        let body = AddPersonBody {
            tags,
            face_ids: face_ids.filter(|ids| !ids.is_empty()),
        };
        self.json_request(HttpMethod::Post, self.person_directory_url(Some(&path)), &body)
    }

    pub fn build_update_person(
        &self,
        person_directory_id: &str,
        person_id: &str,
        tags: Option<&Tags>,
        face_ids: Option<&[String]>,
    ) -> Result<HttpRequest, FaceError> {
        let path = format!("{person_directory_id}/persons/{person_id}");
        let body = UpdatePersonBody { tags, face_ids };
        self.json_request(HttpMethod::Patch, self.person_directory_url(Some(&path)), &body)
    }

    pub fn build_delete_person(&self, person_directory_id: &str, person_id: &str) -> HttpRequest {
        let path = format!("{person_directory_id}/persons/{person_id}");
        self.request(HttpMethod::Delete, self.person_directory_url(Some(&path)))
    }

    // -----------------------------------------------------------------------
    // Faces
    // -----------------------------------------------------------------------

    pub fn build_list_faces(&self, person_directory_id: &str) -> HttpRequest {
        let path = format!("{person_directory_id}/faces");
        self.request(HttpMethod::Get, self.person_directory_url(Some(&path)))
    }

    pub fn build_get_face(&self, person_directory_id: &str, face_id: &str) -> HttpRequest {
        let path = format!("{person_directory_id}/faces/{face_id}");
        self.request(HttpMethod::Get, self.person_directory_url(Some(&path)))
    }

    /// `person_id` is left out of the body when `None` or empty.
    pub fn build_add_face(
        &self,
        person_directory_id: &str,
        data: &str,
        person_id: Option<&str>,
    ) -> Result<HttpRequest, FaceError> {
        let path = format!("{person_directory_id}/faces");
        let body = AddFaceBody {
            face_source: FaceData { data },
            person_id: person_id.filter(|id| !id.is_empty()),
        };
        self.json_request(HttpMethod::Post, self.person_directory_url(Some(&path)), &body)
    }

    pub fn build_update_face(
        &self,
        person_directory_id: &str,
        face_id: &str,
        person_id: &str,
    ) -> Result<HttpRequest, FaceError> {
        let path = format!("{person_directory_id}/faces/{face_id}");
        let body = UpdateFaceBody { person_id };
        self.json_request(HttpMethod::Patch, self.person_directory_url(Some(&path)), &body)
    }

    pub fn build_delete_face(&self, person_directory_id: &str, face_id: &str) -> HttpRequest {
        let path = format!("{person_directory_id}/faces/{face_id}");
        self.request(HttpMethod::Delete, self.person_directory_url(Some(&path)))
    }

    // -----------------------------------------------------------------------
    // Recognition
    // -----------------------------------------------------------------------

    pub fn build_identify_person(
        &self,
        person_directory_id: &str,
        data: &str,
        target_bounding_box: Option<&BoundingBox>,
    ) -> Result<HttpRequest, FaceError> {
        let path = format!("{person_directory_id}/persons:identify");
        self.face_query(&path, data, target_bounding_box)
    }

    pub fn build_verify_person(
        &self,
        person_directory_id: &str,
        person_id: &str,
        data: &str,
        target_bounding_box: Option<&BoundingBox>,
    ) -> Result<HttpRequest, FaceError> {
        let path = format!("{person_directory_id}/persons/{person_id}:verify");
        self.face_query(&path, data, target_bounding_box)
    }

    pub fn build_find_similar_faces(
        &self,
        person_directory_id: &str,
        data: &str,
        target_bounding_box: Option<&BoundingBox>,
    ) -> Result<HttpRequest, FaceError> {
        let path = format!("{person_directory_id}/faces:find");
        self.face_query(&path, data, target_bounding_box)
    }

    fn face_query(
        &self,
        path: &str,
        data: &str,
        target_bounding_box: Option<&BoundingBox>,
    ) -> Result<HttpRequest, FaceError> {
        let body = FaceQueryBody {
            face_source: TargetedFaceSource {
                data,
                target_bounding_box,
            },
        };
        self.json_request(HttpMethod::Post, self.person_directory_url(Some(path)), &body)
    }

    /// Interpret a response for `operation`.
    pub fn parse_response(&self, operation: &str, response: HttpResponse) -> ApiResult {
        parse_response(operation, response)
    }
}

impl<T: Transport> FaceServiceClient<T> {
    fn execute(&self, operation: &str, request: HttpRequest) -> ApiResult {
        debug!("{operation}: {} {}", request.method, request.url);
        let response = self.transport.execute(request)?;
        parse_response(operation, response)
    }

    pub fn detect_faces(&self, url: Option<&str>, data: Option<&str>) -> ApiResult {
        self.execute("detect_faces", self.build_detect_faces(url, data)?)
    }

    pub fn compare_faces(&self, data1: &str, data2: &str) -> ApiResult {
        self.execute("compare_faces", self.build_compare_faces(data1, data2)?)
    }

    pub fn list_person_directories(&self) -> ApiResult {
        self.execute(
            "get_person_directories",
            self.build_list_person_directories(),
        )
    }

    pub fn get_person_directory(&self, person_directory_id: &str) -> ApiResult {
        self.execute(
            "get_person_directory",
            self.build_get_person_directory(person_directory_id),
        )
    }

    pub fn create_person_directory(
        &self,
        person_directory_id: &str,
        description: Option<&str>,
        tags: Option<&Tags>,
    ) -> ApiResult {
        let request = self.build_create_person_directory(person_directory_id, description, tags)?;
        self.execute("create_person_directory", request)
    }

    pub fn update_person_directory(
        &self,
        person_directory_id: &str,
        description: Option<&str>,
        tags: Option<&Tags>,
    ) -> ApiResult {
        let request = self.build_update_person_directory(person_directory_id, description, tags)?;
        self.execute("update_person_directory", request)
    }

    pub fn delete_person_directory(&self, person_directory_id: &str) -> ApiResult {
        self.execute(
            "delete_person_directory",
            self.build_delete_person_directory(person_directory_id),
        )
    }

    pub fn list_persons(&self, person_directory_id: &str) -> ApiResult {
        self.execute("list_persons", self.build_list_persons(person_directory_id))
    }

    pub fn get_person(&self, person_directory_id: &str, person_id: &str) -> ApiResult {
        self.execute(
            "get_person",
            self.build_get_person(person_directory_id, person_id),
        )
    }

    pub fn add_person(
        &self,
        person_directory_id: &str,
        tags: Option<&Tags>,
        face_ids: Option<&[String]>,
    ) -> ApiResult {
        let request = self.build_add_person(person_directory_id, tags, face_ids)?;
        self.execute("add_person", request)
    }

    pub fn update_person(
        &self,
        person_directory_id: &str,
        person_id: &str,
        tags: Option<&Tags>,
        face_ids: Option<&[String]>,
    ) -> ApiResult {
        let request = self.build_update_person(person_directory_id, person_id, tags, face_ids)?;
        self.execute("update_person", request)
    }

    pub fn delete_person(&self, person_directory_id: &str, person_id: &str) -> ApiResult {
        self.execute(
            "delete_person",
            self.build_delete_person(person_directory_id, person_id),
        )
    }

    pub fn list_faces(&self, person_directory_id: &str) -> ApiResult {
        self.execute("list_faces", self.build_list_faces(person_directory_id))
    }

    pub fn get_face(&self, person_directory_id: &str, face_id: &str) -> ApiResult {
        self.execute("get_face", self.build_get_face(person_directory_id, face_id))
    }

    pub fn add_face(
        &self,
        person_directory_id: &str,
        data: &str,
        person_id: Option<&str>,
    ) -> ApiResult {
        let request = self.build_add_face(person_directory_id, data, person_id)?;
        self.execute("add_face", request)
    }

    pub fn update_face(
        &self,
        person_directory_id: &str,
        face_id: &str,
        person_id: &str,
    ) -> ApiResult {
        let request = self.build_update_face(person_directory_id, face_id, person_id)?;
        self.execute("update_face", request)
    }

    pub fn delete_face(&self, person_directory_id: &str, face_id: &str) -> ApiResult {
        self.execute(
            "delete_face",
            self.build_delete_face(person_directory_id, face_id),
        )
    }

    /// Which persons in the directory the face most likely belongs to.
    pub fn identify_person(
        &self,
        person_directory_id: &str,
        data: &str,
        target_bounding_box: Option<&BoundingBox>,
    ) -> ApiResult {
        let request = self.build_identify_person(person_directory_id, data, target_bounding_box)?;
        self.execute("identify", request)
    }

    /// Whether the face belongs to `person_id`.
    pub fn verify_person(
        &self,
        person_directory_id: &str,
        person_id: &str,
        data: &str,
        target_bounding_box: Option<&BoundingBox>,
    ) -> ApiResult {
        let request =
            self.build_verify_person(person_directory_id, person_id, data, target_bounding_box)?;
        self.execute("verify", request)
    }

    pub fn find_similar_faces(
        &self,
        person_directory_id: &str,
        data: &str,
        target_bounding_box: Option<&BoundingBox>,
    ) -> ApiResult {
        let request =
            self.build_find_similar_faces(person_directory_id, data, target_bounding_box)?;
        self.execute("find_similar_faces", request)
    }
}

/// Map a response to the operation's result.
///
/// 204 is an empty success, 200 and 201 carry JSON, every other status is a
/// `FaceError::Api` with the body text verbatim.
pub fn parse_response(operation: &str, response: HttpResponse) -> ApiResult {
    match response.status {
        204 => {
            info!("{operation} completed successfully with status 204.");
            Ok(None)
        }
        200 | 201 => serde_json::from_str(&response.body)
            .map(Some)
            .map_err(FaceError::Deserialization),
        status => {
            error!("Error in {operation}: {status} - {}", response.body);
            Err(FaceError::Api {
                operation: operation.to_string(),
                status,
                body: response.body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::error::BoxError;

    const ENDPOINT: &str = "https://face.example.com";
    const VERSION: &str = "2025-05-01-preview";

    /// Records every request and answers with a fixed response.
    struct FakeTransport {
        status: u16,
        body: String,
        sent: RefCell<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                sent: RefCell::new(Vec::new()),
            }
        }

        fn last(&self) -> HttpRequest {
            self.sent.borrow().last().cloned().unwrap()
        }

        fn last_body(&self) -> Value {
            serde_json::from_str(self.last().body.as_deref().unwrap()).unwrap()
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FaceError> {
            self.sent.borrow_mut().push(request);
            Ok(HttpResponse {
                status: self.status,
                headers: Vec::new(),
                body: self.body.clone(),
            })
        }
    }

    type TestClient = FaceServiceClient<FakeTransport>;
    type Operation = fn(&TestClient) -> ApiResult;

    fn client(status: u16, body: &str) -> TestClient {
        let config = ClientConfig::builder()
            .endpoint(format!("{ENDPOINT}/"))
            .api_version(VERSION)
            .subscription_key("key-1")
            .build()
            .unwrap();
        FaceServiceClient::with_transport(config, FakeTransport::new(status, body))
    }

    fn url(path: &str) -> String {
        format!("{ENDPOINT}/contentunderstanding/{path}?api-version={VERSION}")
    }

    fn op(name: &'static str, f: Operation) -> (&'static str, Operation) {
        (name, f)
    }

    fn operations() -> Vec<(&'static str, Operation)> {
        vec![
            op("detect_faces", |c| c.detect_faces(None, Some("aW1n"))),
            op("compare_faces", |c| c.compare_faces("YQ==", "Yg==")),
            op("get_person_directories", |c| c.list_person_directories()),
            op("get_person_directory", |c| c.get_person_directory("dir")),
            op("create_person_directory", |c| {
                c.create_person_directory("dir", Some("staff"), None)
            }),
            op("update_person_directory", |c| {
                c.update_person_directory("dir", None, None)
            }),
            op("delete_person_directory", |c| c.delete_person_directory("dir")),
            op("list_persons", |c| c.list_persons("dir")),
            op("get_person", |c| c.get_person("dir", "p1")),
            op("add_person", |c| c.add_person("dir", None, None)),
            op("update_person", |c| c.update_person("dir", "p1", None, None)),
            op("delete_person", |c| c.delete_person("dir", "p1")),
            op("list_faces", |c| c.list_faces("dir")),
            op("get_face", |c| c.get_face("dir", "f1")),
            op("add_face", |c| c.add_face("dir", "aW1n", None)),
            op("update_face", |c| c.update_face("dir", "f1", "p1")),
            op("delete_face", |c| c.delete_face("dir", "f1")),
            op("identify", |c| c.identify_person("dir", "aW1n", None)),
            op("verify", |c| c.verify_person("dir", "p1", "aW1n", None)),
            op("find_similar_faces", |c| {
                c.find_similar_faces("dir", "aW1n", Some(&BoundingBox::new(1, 2, 3, 4)))
            }),
        ]
    }

    #[rstest]
    #[case(200)]
    #[case(201)]
    fn every_operation_returns_json_body(#[case] status: u16) {
        let body = r#"{"value":[{"faceId":"f1","nested":{"score":0.93}}],"count":1}"#;
        let expected: Value = serde_json::from_str(body).unwrap();
        for (name, op) in operations() {
            let c = client(status, body);
            assert_eq!(op(&c).unwrap(), Some(expected.clone()), "{name}");
            assert_eq!(c.transport().sent.borrow().len(), 1, "{name}: one request");
        }
    }

    #[test]
    fn every_operation_treats_204_as_empty_success() {
        for (name, op) in operations() {
            let c = client(204, "");
            assert_eq!(op(&c).unwrap(), None, "{name}");
        }
    }

    #[rstest]
    #[case(400, r#"{"error":{"code":"InvalidRequest"}}"#)]
    #[case(401, "unauthorized")]
    #[case(404, r#"{"error":{"code":"NotFound","message":"Person not found."}}"#)]
    #[case(409, "conflict")]
    #[case(500, "")]
    #[case(202, "accepted")]
    fn every_operation_reports_unexpected_status(#[case] status: u16, #[case] body: &str) {
        for (name, op) in operations() {
            let c = client(status, body);
            let err = op(&c).unwrap_err();
            match &err {
                FaceError::Api {
                    operation,
                    status: got,
                    body: got_body,
                } => {
                    assert_eq!(operation, name);
                    assert_eq!(*got, status);
                    assert_eq!(got_body, body);
                }
                other => panic!("{name}: expected Api error, got {other:?}"),
            }
            let message = err.to_string();
            assert!(message.contains(name), "{name}: {message}");
            assert!(message.contains(&status.to_string()), "{name}: {message}");
            assert!(message.contains(body), "{name}: {message}");
        }
    }

    #[test]
    fn labels_follow_service_operation_names() {
        let c = client(404, "missing");
        let label = |result: ApiResult| match result.unwrap_err() {
            FaceError::Api { operation, .. } => operation,
            other => panic!("expected Api error, got {other:?}"),
        };
        assert_eq!(label(c.list_person_directories()), "get_person_directories");
        assert_eq!(label(c.identify_person("dir", "aW1n", None)), "identify");
        assert_eq!(label(c.verify_person("dir", "p1", "aW1n", None)), "verify");
    }

    #[test]
    fn client_clones_and_debug_hides_credentials() {
        let config = ClientConfig::builder()
            .endpoint(ENDPOINT)
            .api_version(VERSION)
            .subscription_key("very-secret-key")
            .build()
            .unwrap();
        let c = FaceServiceClient::new(config);
        let copy = c.clone();
        assert_eq!(copy.config().endpoint(), ENDPOINT);
        assert_eq!(copy.build_list_persons("dir").url, c.build_list_persons("dir").url);

        let debug = format!("{c:?}");
        assert!(debug.contains("FaceServiceClient"));
        assert!(debug.contains(ENDPOINT));
        assert!(!debug.contains("very-secret-key"));
    }

    #[test]
    fn non_json_success_body_is_a_deserialization_error() {
        let c = client(200, "<html>oops</html>");
        let err = c.list_persons("dir").unwrap_err();
        assert!(matches!(err, FaceError::Deserialization(_)));
    }

    #[test]
    fn every_request_carries_auth_and_user_agent() {
        for (name, op) in operations() {
            let c = client(204, "");
            op(&c).unwrap();
            let req = c.transport().last();
            assert_eq!(req.header("Ocp-Apim-Subscription-Key"), Some("key-1"), "{name}");
            assert_eq!(req.header("x-ms-useragent"), Some("cu-face-sample-code"), "{name}");
            assert_eq!(req.header("Authorization"), None, "{name}");
            assert!(req.url.ends_with(&format!("?api-version={VERSION}")), "{name}");
        }
    }

    #[test]
    fn bearer_token_client_sends_authorization_header() {
        let config = ClientConfig::builder()
            .endpoint(ENDPOINT)
            .api_version(VERSION)
            .token_provider(|| Ok::<_, BoxError>("tok".to_string()))
            .build()
            .unwrap();
        let c = FaceServiceClient::with_transport(config, FakeTransport::new(204, ""));
        c.delete_face("dir", "f1").unwrap();
        let req = c.transport().last();
        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
        assert_eq!(req.header("Ocp-Apim-Subscription-Key"), None);
    }

    #[test]
    fn get_person_url() {
        let c = client(200, "{}");
        c.get_person("dir-1", "person-9").unwrap();
        let req = c.transport().last();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, url("personDirectories/dir-1/persons/person-9"));
        assert!(req.body.is_none());
    }

    #[test]
    fn list_person_directories_url_has_no_trailing_path() {
        let c = client(200, "{}");
        let req = c.build_list_person_directories();
        assert_eq!(req.url, url("personDirectories"));
    }

    #[test]
    fn face_action_urls() {
        let c = client(200, "{}");
        assert_eq!(c.face_url("detect"), url("faces:detect"));
        assert_eq!(
            c.build_compare_faces("a", "b").unwrap().url,
            url("faces:compare")
        );
    }

    #[test]
    fn detect_sends_both_fields_with_nulls() {
        let c = client(200, "{}");
        c.detect_faces(Some("https://img.example.com/a.jpg"), None).unwrap();
        let req = c.transport().last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(
            c.transport().last_body(),
            json!({"url": "https://img.example.com/a.jpg", "data": null})
        );
    }

    #[test]
    fn compare_wraps_each_source() {
        let c = client(200, "{}");
        c.compare_faces("YQ==", "Yg==").unwrap();
        assert_eq!(
            c.transport().last_body(),
            json!({"faceSource1": {"data": "YQ=="}, "faceSource2": {"data": "Yg=="}})
        );
    }

    #[test]
    fn create_person_directory_puts_description_and_tags() {
        let c = client(201, "{}");
        let tags = Tags::from([("team".to_string(), "blue".to_string())]);
        c.create_person_directory("dir", Some("staff"), Some(&tags)).unwrap();
        let req = c.transport().last();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, url("personDirectories/dir"));
        assert_eq!(
            c.transport().last_body(),
            json!({"description": "staff", "tags": {"team": "blue"}})
        );
    }

    #[test]
    fn update_person_directory_patches_with_explicit_nulls() {
        let c = client(200, "{}");
        c.update_person_directory("dir", Some("renamed"), None).unwrap();
        assert_eq!(c.transport().last().method, HttpMethod::Patch);
        assert_eq!(
            c.transport().last_body(),
            json!({"description": "renamed", "tags": null})
        );
    }

    #[test]
    fn add_person_omits_missing_or_empty_face_ids() {
        let c = client(201, "{}");
        c.add_person("dir", None, None).unwrap();
        assert_eq!(c.transport().last_body(), json!({"tags": null}));

        c.add_person("dir", None, Some(&[])).unwrap();
        assert_eq!(c.transport().last_body(), json!({"tags": null}));

        let ids = vec!["f1".to_string(), "f2".to_string()];
        c.add_person("dir", None, Some(&ids)).unwrap();
        assert_eq!(
            c.transport().last_body(),
            json!({"tags": null, "faceIds": ["f1", "f2"]})
        );
        assert_eq!(c.transport().last().url, url("personDirectories/dir/persons"));
    }

    #[test]
    fn update_person_keeps_null_fields() {
        let c = client(200, "{}");
        let tags = Tags::from([("role".to_string(), "admin".to_string())]);
        c.update_person("dir", "p1", Some(&tags), None).unwrap();
        assert_eq!(
            c.transport().last_body(),
            json!({"tags": {"role": "admin"}, "faceIds": null})
        );
    }

    #[test]
    fn add_face_includes_person_id_only_when_given() {
        let c = client(201, "{}");
        c.add_face("dir", "aW1n", None).unwrap();
        assert_eq!(c.transport().last_body(), json!({"faceSource": {"data": "aW1n"}}));

        c.add_face("dir", "aW1n", Some("p1")).unwrap();
        assert_eq!(
            c.transport().last_body(),
            json!({"faceSource": {"data": "aW1n"}, "personId": "p1"})
        );
        assert_eq!(c.transport().last().url, url("personDirectories/dir/faces"));
    }

    #[test]
    fn update_face_reassigns_person() {
        let c = client(200, "{}");
        c.update_face("dir", "f1", "p2").unwrap();
        let req = c.transport().last();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.url, url("personDirectories/dir/faces/f1"));
        assert_eq!(c.transport().last_body(), json!({"personId": "p2"}));
    }

    #[test]
    fn recognition_paths_and_bodies() {
        let c = client(200, "{}");
        let bbox = BoundingBox::new(5, 6, 70, 80);

        c.identify_person("dir", "aW1n", None).unwrap();
        assert_eq!(c.transport().last().url, url("personDirectories/dir/persons:identify"));
        assert_eq!(
            c.transport().last_body(),
            json!({"faceSource": {"data": "aW1n", "targetBoundingBox": null}})
        );

        c.verify_person("dir", "p1", "aW1n", Some(&bbox)).unwrap();
        assert_eq!(
            c.transport().last().url,
            url("personDirectories/dir/persons/p1:verify")
        );
        assert_eq!(
            c.transport().last_body()["faceSource"]["targetBoundingBox"],
            json!({"left": 5, "top": 6, "width": 70, "height": 80})
        );

        c.find_similar_faces("dir", "aW1n", None).unwrap();
        let req = c.transport().last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, url("personDirectories/dir/faces:find"));
    }

    #[test]
    fn deletes_have_no_body() {
        let c = client(204, "");
        for req in [
            c.build_delete_person_directory("dir"),
            c.build_delete_person("dir", "p1"),
            c.build_delete_face("dir", "f1"),
        ] {
            assert_eq!(req.method, HttpMethod::Delete);
            assert!(req.body.is_none());
            assert_eq!(req.header("content-type"), None);
        }
    }
}
