//! Persistence collaborator: the request/response convention and the
//! draft/publish sidecar contract.
//!
//! Every persisted site stores a `draft` sidecar next to its published
//! fields. Draft saves merge into the sidecar only; publishing writes the
//! published fields and clears the sidecar; draft-scope reads overlay the
//! sidecar and strip it from the response, so callers never see the raw
//! sidecar shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{merge_config_layers, merge_values, object_id};
use crate::error::{SiteError, SiteResult};
use crate::site::Site;

/// Which layer of a persisted site a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreScope {
    Draft,
    #[default]
    Publish,
}

/// Verb of a store request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreAction {
    Create,
    Retrieve,
    Update,
    SaveDraft,
    Delete,
}

/// Uniform request shape for persistence endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    #[serde(rename = "_action")]
    pub action: StoreAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<StoreScope>,
}

impl StoreRequest {
    pub fn new(action: StoreAction) -> Self {
        Self {
            action,
            site_id: None,
            fields: None,
            org_id: None,
            user_id: None,
            scope: None,
        }
    }

    /// Builder: Set target site id.
    pub fn with_site_id(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    /// Builder: Set fields payload.
    pub fn with_fields(mut self, fields: Value) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Builder: Set scope.
    pub fn with_scope(mut self, scope: StoreScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Builder: Set org id.
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }
}

/// Outcome status of a store request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreStatus {
    Success,
    Error,
}

/// Uniform response shape for persistence endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub status: StoreStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StoreResponse {
    pub fn success(data: Value) -> Self {
        Self {
            status: StoreStatus::Success,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StoreStatus::Error,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StoreStatus::Success
    }
}

/// Persistence endpoint for sites. The engine calls this; it never
/// implements server-side storage itself.
pub trait SiteStore {
    fn request(&mut self, request: StoreRequest) -> SiteResult<StoreResponse>;
}

#[derive(Debug, Clone, Default)]
struct StoredSite {
    published: Value,
    draft: Value,
}

/// In-memory reference implementation of the sidecar contract.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sites: HashMap<String, StoredSite>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_site_id(request: &StoreRequest) -> Option<String> {
        request.site_id.clone().or_else(|| {
            request
                .fields
                .as_ref()
                .and_then(|f| f.get("siteId"))
                .and_then(|v| v.as_str())
                .map(String::from)
        })
    }
}

impl SiteStore for MemoryStore {
    fn request(&mut self, request: StoreRequest) -> SiteResult<StoreResponse> {
        let scope = request.scope.unwrap_or_default();
        match request.action {
            StoreAction::Create => {
                let mut fields = request.fields.clone().unwrap_or(Value::Object(Map::new()));
                let site_id =
                    Self::resolve_site_id(&request).unwrap_or_else(|| object_id("ste"));
                if let Some(map) = fields.as_object_mut() {
                    map.insert("siteId".to_string(), Value::String(site_id.clone()));
                }
                self.sites.insert(
                    site_id,
                    StoredSite {
                        published: fields.clone(),
                        draft: Value::Object(Map::new()),
                    },
                );
                Ok(StoreResponse::success(fields))
            }
            StoreAction::Retrieve => {
                let Some(site_id) = Self::resolve_site_id(&request) else {
                    return Ok(StoreResponse::error("siteId required"));
                };
                let Some(stored) = self.sites.get(&site_id) else {
                    return Ok(StoreResponse::error(format!("site {site_id} not found")));
                };
                let mut data = match scope {
                    StoreScope::Draft => {
                        merge_config_layers(&[&stored.published, &stored.draft])
                    }
                    StoreScope::Publish => stored.published.clone(),
                };
                if let Some(map) = data.as_object_mut() {
                    map.remove("draft");
                }
                Ok(StoreResponse::success(data))
            }
            StoreAction::Update => {
                let Some(site_id) = Self::resolve_site_id(&request) else {
                    return Ok(StoreResponse::error("siteId required"));
                };
                let Some(stored) = self.sites.get_mut(&site_id) else {
                    return Ok(StoreResponse::error(format!("site {site_id} not found")));
                };
                if let Some(fields) = &request.fields {
                    merge_values(&mut stored.published, fields);
                }
                // publishing invalidates the draft overlay
                stored.draft = Value::Object(Map::new());
                Ok(StoreResponse::success(stored.published.clone()))
            }
            StoreAction::SaveDraft => {
                let Some(site_id) = Self::resolve_site_id(&request) else {
                    return Ok(StoreResponse::error("siteId required"));
                };
                let Some(stored) = self.sites.get_mut(&site_id) else {
                    return Ok(StoreResponse::error(format!("site {site_id} not found")));
                };
                if let Some(fields) = &request.fields {
                    merge_values(&mut stored.draft, fields);
                }
                Ok(StoreResponse::success(stored.draft.clone()))
            }
            StoreAction::Delete => {
                let Some(site_id) = Self::resolve_site_id(&request) else {
                    return Ok(StoreResponse::error("siteId required"));
                };
                match self.sites.remove(&site_id) {
                    Some(_) => Ok(StoreResponse::success(Value::Null)),
                    None => Ok(StoreResponse::error(format!("site {site_id} not found"))),
                }
            }
        }
    }
}

/// Persists a site snapshot through a store, draft or publish scope.
pub fn save_site(
    site: &Site,
    store: &mut dyn SiteStore,
    scope: StoreScope,
) -> SiteResult<StoreResponse> {
    let fields = site.to_config(&[])?;
    let action = match scope {
        StoreScope::Draft => StoreAction::SaveDraft,
        StoreScope::Publish => StoreAction::Update,
    };
    let response = store.request(
        StoreRequest::new(action)
            .with_site_id(site.site_id.clone())
            .with_fields(fields)
            .with_scope(scope),
    )?;
    if !response.is_success() {
        return Err(SiteError::store(
            response.message.unwrap_or_else(|| "save failed".to_string()),
        ));
    }
    Ok(response)
}
