//! Request payloads for the face service.
//!
//! # Design
//! Bodies borrow from the caller's arguments and are serialized once per
//! request. Optional fields are sent as explicit JSON `null` unless the
//! service contract omits them; only `AddPersonBody::face_ids` and
//! `AddFaceBody::person_id` are skipped when unset.
//!
//! Responses are not modelled here: the client hands back the service's
//! JSON as `serde_json::Value`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// String-to-string tags attached to person directories and persons.
pub type Tags = BTreeMap<String, String>;

/// Rectangle selecting one face in an image that contains several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DetectFacesBody<'a> {
    pub url: Option<&'a str>,
    pub data: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FaceData<'a> {
    pub data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompareFacesBody<'a> {
    pub face_source1: FaceData<'a>,
    pub face_source2: FaceData<'a>,
}

/// Shared by create (PUT) and update (PATCH).
#[derive(Debug, Serialize)]
pub(crate) struct PersonDirectoryBody<'a> {
    pub description: Option<&'a str>,
    pub tags: Option<&'a Tags>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddPersonBody<'a> {
    pub tags: Option<&'a Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_ids: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdatePersonBody<'a> {
    pub tags: Option<&'a Tags>,
    pub face_ids: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddFaceBody<'a> {
    pub face_source: FaceData<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateFaceBody<'a> {
    pub person_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TargetedFaceSource<'a> {
    pub data: &'a str,
    pub target_bounding_box: Option<&'a BoundingBox>,
}

/// Body of identify, verify and find-similar.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FaceQueryBody<'a> {
    pub face_source: TargetedFaceSource<'a>,
}
