//! In-memory stand-in for the face service, used by end-to-end tests.
//!
//! Recognition is faked: two faces "match" when their base64 payloads are
//! byte-identical. Everything else (routes, verbs, status codes, auth and
//! `api-version` checks) follows the wire contract the client speaks.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub type Tags = BTreeMap<String, String>;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDirectory {
    pub person_directory_id: String,
    pub description: Option<String>,
    pub tags: Option<Tags>,
    #[serde(skip)]
    persons: HashMap<String, Person>,
    #[serde(skip)]
    faces: HashMap<String, Face>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub person_id: String,
    pub tags: Option<Tags>,
    pub face_ids: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    pub face_id: String,
    pub person_id: Option<String>,
    #[serde(skip)]
    data: Option<String>,
}

#[derive(Deserialize)]
pub struct DirectoryInput {
    pub description: Option<String>,
    pub tags: Option<Tags>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInput {
    pub tags: Option<Tags>,
    pub face_ids: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct FaceSource {
    pub data: Option<String>,
    pub url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFaceInput {
    pub face_source: FaceSource,
    pub person_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFaceInput {
    pub person_id: Option<String>,
}

#[derive(Deserialize)]
pub struct DetectInput {
    pub url: Option<String>,
    pub data: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareInput {
    pub face_source1: FaceSource,
    pub face_source2: FaceSource,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceQueryInput {
    pub face_source: FaceSource,
}

pub type Db = Arc<RwLock<HashMap<String, PersonDirectory>>>;

/// Error body in the service's `{"error": {"code", "message"}}` shape.
#[derive(Debug)]
pub struct ServiceError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ServiceError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn not_found(what: &str, id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NotFound", format!("{what} '{id}' not found."))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = json!({"error": {"code": self.code, "message": self.message}});
        (self.status, Json(body)).into_response()
    }
}

type ServiceResult<T> = Result<T, ServiceError>;

const DIRECTORIES: &str = "/contentunderstanding/personDirectories";

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/contentunderstanding/faces:detect", post(detect_faces))
        .route("/contentunderstanding/faces:compare", post(compare_faces))
        .route(DIRECTORIES, get(list_directories))
        .route(
            &format!("{DIRECTORIES}/{{dir_id}}"),
            get(get_directory)
                .put(create_directory)
                .patch(update_directory)
                .delete(delete_directory),
        )
        .route(
            &format!("{DIRECTORIES}/{{dir_id}}/persons"),
            get(list_persons).post(add_person),
        )
        .route(
            &format!("{DIRECTORIES}/{{dir_id}}/persons:identify"),
            post(identify_person),
        )
        .route(
            &format!("{DIRECTORIES}/{{dir_id}}/persons/{{person_ref}}"),
            get(get_person)
                .patch(update_person)
                .delete(delete_person)
                .post(verify_person),
        )
        .route(
            &format!("{DIRECTORIES}/{{dir_id}}/faces"),
            get(list_faces).post(add_face),
        )
        .route(
            &format!("{DIRECTORIES}/{{dir_id}}/faces:find"),
            post(find_similar_faces),
        )
        .route(
            &format!("{DIRECTORIES}/{{dir_id}}/faces/{{face_id}}"),
            get(get_face).patch(update_face).delete(delete_face),
        )
        .layer(middleware::from_fn(require_version_and_credentials))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_version_and_credentials(request: Request, next: Next) -> Response {
    let has_version = request.uri().query().is_some_and(|query| {
        query
            .split('&')
            .any(|pair| pair.strip_prefix("api-version=").is_some_and(|v| !v.is_empty()))
    });
    if !has_version {
        return ServiceError::new(
            StatusCode::BAD_REQUEST,
            "MissingApiVersion",
            "The api-version query parameter is required.",
        )
        .into_response();
    }

    let headers = request.headers();
    let has_key = headers
        .get("ocp-apim-subscription-key")
        .is_some_and(|v| !v.is_empty());
    let has_bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.is_empty());
    if !has_key && !has_bearer {
        return ServiceError::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "A subscription key or bearer token is required.",
        )
        .into_response();
    }

    next.run(request).await
}

// --- faces ---

async fn detect_faces(Json(input): Json<DetectInput>) -> ServiceResult<Json<Value>> {
    if input.url.is_none() && input.data.is_none() {
        return Err(ServiceError::new(
            StatusCode::BAD_REQUEST,
            "InvalidRequest",
            "Either url or data must be provided.",
        ));
    }
    Ok(Json(json!({
        "detectionResult": {
            "faces": [
                {"boundingBox": {"left": 0, "top": 0, "width": 100, "height": 100}}
            ]
        }
    })))
}

async fn compare_faces(Json(input): Json<CompareInput>) -> Json<Value> {
    let identical =
        input.face_source1.data.is_some() && input.face_source1.data == input.face_source2.data;
    Json(verification(identical))
}

fn verification(identical: bool) -> Value {
    let confidence = if identical { 1.0 } else { 0.0 };
    json!({
        "verificationResult": {
            "isIdentical": identical,
            "confidence": confidence
        }
    })
}

// --- person directories ---

async fn list_directories(State(db): State<Db>) -> Json<Value> {
    let dirs = db.read().await;
    let mut value: Vec<PersonDirectory> = dirs.values().cloned().collect();
    value.sort_by(|a, b| a.person_directory_id.cmp(&b.person_directory_id));
    Json(json!({ "value": value }))
}

async fn get_directory(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
) -> ServiceResult<Json<PersonDirectory>> {
    let dirs = db.read().await;
    dirs.get(&dir_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ServiceError::not_found("Person directory", &dir_id))
}

async fn create_directory(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
    Json(input): Json<DirectoryInput>,
) -> ServiceResult<(StatusCode, Json<PersonDirectory>)> {
    let mut dirs = db.write().await;
    if dirs.contains_key(&dir_id) {
        return Err(ServiceError::new(
            StatusCode::CONFLICT,
            "Conflict",
            format!("Person directory '{dir_id}' already exists."),
        ));
    }
    let dir = PersonDirectory {
        person_directory_id: dir_id.clone(),
        description: input.description,
        tags: input.tags,
        persons: HashMap::new(),
        faces: HashMap::new(),
    };
    dirs.insert(dir_id.clone(), dir.clone());
    log::info!("created person directory {dir_id}");
    Ok((StatusCode::CREATED, Json(dir)))
}

async fn update_directory(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
    Json(input): Json<DirectoryInput>,
) -> ServiceResult<Json<PersonDirectory>> {
    let mut dirs = db.write().await;
    let dir = directory_mut(&mut dirs, &dir_id)?;
    if let Some(description) = input.description {
        dir.description = Some(description);
    }
    if let Some(tags) = input.tags {
        dir.tags = Some(tags);
    }
    Ok(Json(dir.clone()))
}

async fn delete_directory(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
) -> ServiceResult<StatusCode> {
    let mut dirs = db.write().await;
    dirs.remove(&dir_id)
        .ok_or_else(|| ServiceError::not_found("Person directory", &dir_id))?;
    log::info!("deleted person directory {dir_id}");
    Ok(StatusCode::NO_CONTENT)
}

fn directory_mut<'a>(
    dirs: &'a mut HashMap<String, PersonDirectory>,
    dir_id: &str,
) -> ServiceResult<&'a mut PersonDirectory> {
    dirs.get_mut(dir_id)
        .ok_or_else(|| ServiceError::not_found("Person directory", dir_id))
}

fn directory<'a>(
    dirs: &'a HashMap<String, PersonDirectory>,
    dir_id: &str,
) -> ServiceResult<&'a PersonDirectory> {
    dirs.get(dir_id)
        .ok_or_else(|| ServiceError::not_found("Person directory", dir_id))
}

// --- persons ---

async fn list_persons(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
) -> ServiceResult<Json<Value>> {
    let dirs = db.read().await;
    let dir = directory(&dirs, &dir_id)?;
    let mut value: Vec<Person> = dir.persons.values().cloned().collect();
    value.sort_by(|a, b| a.person_id.cmp(&b.person_id));
    Ok(Json(json!({ "value": value })))
}

async fn get_person(
    State(db): State<Db>,
    Path((dir_id, person_id)): Path<(String, String)>,
) -> ServiceResult<Json<Person>> {
    let dirs = db.read().await;
    let dir = directory(&dirs, &dir_id)?;
    dir.persons
        .get(&person_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ServiceError::not_found("Person", &person_id))
}

async fn add_person(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
    Json(input): Json<PersonInput>,
) -> ServiceResult<(StatusCode, Json<Person>)> {
    let mut dirs = db.write().await;
    let dir = directory_mut(&mut dirs, &dir_id)?;
    let person_id = Uuid::new_v4().to_string();
    let face_ids = input.face_ids.unwrap_or_default();
    link_faces(dir, &person_id, &face_ids)?;
    let person = Person {
        person_id: person_id.clone(),
        tags: input.tags,
        face_ids,
    };
    dir.persons.insert(person_id.clone(), person.clone());
    log::info!("added person {person_id} to {dir_id}");
    Ok((StatusCode::CREATED, Json(person)))
}

async fn update_person(
    State(db): State<Db>,
    Path((dir_id, person_id)): Path<(String, String)>,
    Json(input): Json<PersonInput>,
) -> ServiceResult<Json<Person>> {
    let mut dirs = db.write().await;
    let dir = directory_mut(&mut dirs, &dir_id)?;
    if !dir.persons.contains_key(&person_id) {
        return Err(ServiceError::not_found("Person", &person_id));
    }
    if let Some(face_ids) = &input.face_ids {
        unlink_person(dir, &person_id);
        link_faces(dir, &person_id, face_ids)?;
    }
    let person = dir
        .persons
        .get_mut(&person_id)
        .ok_or_else(|| ServiceError::not_found("Person", &person_id))?;
    if let Some(tags) = input.tags {
        person.tags = Some(tags);
    }
    if let Some(face_ids) = input.face_ids {
        person.face_ids = face_ids;
    }
    Ok(Json(person.clone()))
}

async fn delete_person(
    State(db): State<Db>,
    Path((dir_id, person_id)): Path<(String, String)>,
) -> ServiceResult<StatusCode> {
    let mut dirs = db.write().await;
    let dir = directory_mut(&mut dirs, &dir_id)?;
    dir.persons
        .remove(&person_id)
        .ok_or_else(|| ServiceError::not_found("Person", &person_id))?;
    unlink_person(dir, &person_id);
    Ok(StatusCode::NO_CONTENT)
}

/// `POST .../persons/{id}:verify`; the verb suffix arrives inside the
/// captured segment.
async fn verify_person(
    State(db): State<Db>,
    Path((dir_id, person_ref)): Path<(String, String)>,
    Json(input): Json<FaceQueryInput>,
) -> ServiceResult<Json<Value>> {
    let person_id = person_ref.strip_suffix(":verify").ok_or_else(|| {
        ServiceError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "MethodNotAllowed",
            "POST on a person is only valid for :verify.",
        )
    })?;
    let dirs = db.read().await;
    let dir = directory(&dirs, &dir_id)?;
    let person = dir
        .persons
        .get(person_id)
        .ok_or_else(|| ServiceError::not_found("Person", person_id))?;
    let probe = query_data(&input)?;
    let identical = person
        .face_ids
        .iter()
        .filter_map(|id| dir.faces.get(id))
        .any(|face| face.data.as_deref() == Some(probe));
    Ok(Json(verification(identical)))
}

async fn identify_person(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
    Json(input): Json<FaceQueryInput>,
) -> ServiceResult<Json<Value>> {
    let dirs = db.read().await;
    let dir = directory(&dirs, &dir_id)?;
    let probe = query_data(&input)?;
    let mut candidates: Vec<&str> = dir
        .faces
        .values()
        .filter(|face| face.data.as_deref() == Some(probe))
        .filter_map(|face| face.person_id.as_deref())
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    let candidates: Vec<Value> = candidates
        .into_iter()
        .map(|id| json!({"personId": id, "confidence": 1.0}))
        .collect();
    Ok(Json(json!({ "personCandidates": candidates })))
}

fn query_data(input: &FaceQueryInput) -> ServiceResult<&str> {
    input.face_source.data.as_deref().ok_or_else(|| {
        ServiceError::new(
            StatusCode::BAD_REQUEST,
            "InvalidRequest",
            "faceSource.data must be provided.",
        )
    })
}

fn link_faces(dir: &mut PersonDirectory, person_id: &str, face_ids: &[String]) -> ServiceResult<()> {
    if let Some(missing) = face_ids.iter().find(|id| !dir.faces.contains_key(*id)) {
        return Err(ServiceError::new(
            StatusCode::BAD_REQUEST,
            "InvalidFaceId",
            format!("Face '{missing}' does not exist."),
        ));
    }
    for id in face_ids {
        if let Some(face) = dir.faces.get_mut(id) {
            face.person_id = Some(person_id.to_string());
        }
    }
    Ok(())
}

fn unlink_person(dir: &mut PersonDirectory, person_id: &str) {
    for face in dir.faces.values_mut() {
        if face.person_id.as_deref() == Some(person_id) {
            face.person_id = None;
        }
    }
}

// --- faces in a directory ---

async fn list_faces(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
) -> ServiceResult<Json<Value>> {
    let dirs = db.read().await;
    let dir = directory(&dirs, &dir_id)?;
    let mut value: Vec<Face> = dir.faces.values().cloned().collect();
    value.sort_by(|a, b| a.face_id.cmp(&b.face_id));
    Ok(Json(json!({ "value": value })))
}

async fn get_face(
    State(db): State<Db>,
    Path((dir_id, face_id)): Path<(String, String)>,
) -> ServiceResult<Json<Face>> {
    let dirs = db.read().await;
    let dir = directory(&dirs, &dir_id)?;
    dir.faces
        .get(&face_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ServiceError::not_found("Face", &face_id))
}

async fn add_face(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
    Json(input): Json<AddFaceInput>,
) -> ServiceResult<(StatusCode, Json<Face>)> {
    let mut dirs = db.write().await;
    let dir = directory_mut(&mut dirs, &dir_id)?;
    if input.face_source.data.is_none() && input.face_source.url.is_none() {
        return Err(ServiceError::new(
            StatusCode::BAD_REQUEST,
            "InvalidRequest",
            "faceSource must carry data or url.",
        ));
    }
    let face_id = Uuid::new_v4().to_string();
    if let Some(person_id) = &input.person_id {
        let person = dir
            .persons
            .get_mut(person_id)
            .ok_or_else(|| ServiceError::not_found("Person", person_id))?;
        person.face_ids.push(face_id.clone());
    }
    let face = Face {
        face_id: face_id.clone(),
        person_id: input.person_id,
        data: input.face_source.data,
    };
    dir.faces.insert(face_id.clone(), face.clone());
    log::info!("added face {face_id} to {dir_id}");
    Ok((StatusCode::CREATED, Json(face)))
}

async fn update_face(
    State(db): State<Db>,
    Path((dir_id, face_id)): Path<(String, String)>,
    Json(input): Json<UpdateFaceInput>,
) -> ServiceResult<Json<Face>> {
    let mut dirs = db.write().await;
    let dir = directory_mut(&mut dirs, &dir_id)?;
    let previous = dir
        .faces
        .get(&face_id)
        .ok_or_else(|| ServiceError::not_found("Face", &face_id))?
        .person_id
        .clone();
    if let Some(person_id) = &input.person_id {
        if !dir.persons.contains_key(person_id) {
            return Err(ServiceError::not_found("Person", person_id));
        }
    }

    if let Some(old) = previous {
        if let Some(person) = dir.persons.get_mut(&old) {
            person.face_ids.retain(|id| id != &face_id);
        }
    }
    if let Some(new) = &input.person_id {
        if let Some(person) = dir.persons.get_mut(new) {
            person.face_ids.push(face_id.clone());
        }
    }
    let face = dir
        .faces
        .get_mut(&face_id)
        .ok_or_else(|| ServiceError::not_found("Face", &face_id))?;
    face.person_id = input.person_id;
    Ok(Json(face.clone()))
}

async fn delete_face(
    State(db): State<Db>,
    Path((dir_id, face_id)): Path<(String, String)>,
) -> ServiceResult<StatusCode> {
    let mut dirs = db.write().await;
    let dir = directory_mut(&mut dirs, &dir_id)?;
    let face = dir
        .faces
        .remove(&face_id)
        .ok_or_else(|| ServiceError::not_found("Face", &face_id))?;
    if let Some(person_id) = face.person_id {
        if let Some(person) = dir.persons.get_mut(&person_id) {
            person.face_ids.retain(|id| id != &face_id);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn find_similar_faces(
    State(db): State<Db>,
    Path(dir_id): Path<String>,
    Json(input): Json<FaceQueryInput>,
) -> ServiceResult<Json<Value>> {
    let dirs = db.read().await;
    let dir = directory(&dirs, &dir_id)?;
    let probe = query_data(&input)?;
    let mut similar: Vec<&Face> = dir
        .faces
        .values()
        .filter(|face| face.data.as_deref() == Some(probe))
        .collect();
    similar.sort_by(|a, b| a.face_id.cmp(&b.face_id));
    let similar: Vec<Value> = similar
        .into_iter()
        .map(|face| json!({"faceId": face.face_id, "confidence": 1.0}))
        .collect();
    Ok(Json(json!({ "similarFaces": similar })))
}
