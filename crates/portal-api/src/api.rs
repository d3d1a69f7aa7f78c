//! Abstract HTTP-facing surface over the lifecycle engine.
//!
//! Maps requests and typed engine errors onto status codes and the
//! `{"success": ..., "data"/"error": ...}` response envelope, independent
//! of any transport framework. The stdio binary and any future HTTP
//! listener both dispatch through here.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use grievance::{
    Attachment, Category, EngineError, GrievanceFilter, GrievanceRecord, LifecycleEngine,
    Location, NewGrievance, Status, UserRef,
};

/// Body of `POST /grievances`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: Location,
    #[serde(default)]
    pub attachments: Vec<AttachmentUpload>,
}

/// An attachment reference as uploaded by the client; the server stamps
/// the upload time.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentUpload {
    pub file_url: String,
}

/// Body of `PUT /grievances/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub status: Status,
    pub comment: String,
}

/// Query of `GET /grievances`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequest {
    pub status: Option<Status>,
    pub category: Option<Category>,
    pub village: Option<String>,
}

impl ListRequest {
    fn into_filter(self) -> GrievanceFilter {
        GrievanceFilter {
            status: self.status,
            category: self.category,
            village: self.village,
            submitter: None,
        }
    }
}

/// One request to the portal, tagged by operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// `POST /grievances`
    Submit {
        user: UserRef,
        #[serde(flatten)]
        body: SubmitRequest,
    },
    /// `PUT /grievances/:id`
    Update {
        user: UserRef,
        id: String,
        #[serde(flatten)]
        body: UpdateRequest,
    },
    /// `PUT /grievances/:id/assign`
    Assign {
        user: UserRef,
        id: String,
        assignee: String,
    },
    /// `GET /grievances/:id`
    Get { id: String },
    /// `GET /grievances`
    List {
        #[serde(flatten)]
        query: ListRequest,
    },
    /// On-demand SLA breach check for one grievance.
    CheckBreach { id: String },
}

/// A transport-agnostic response: HTTP-equivalent status plus envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn data(status: u16, data: Value) -> Self {
        Self {
            status,
            body: json!({ "success": true, "data": data }),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "success": false, "error": message.into() }),
        }
    }

    /// Map a malformed request onto a 400 before it reaches the engine.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(400, message)
    }
}

impl From<EngineError> for ApiResponse {
    fn from(err: EngineError) -> Self {
        Self::error(err.http_status(), err.to_string())
    }
}

fn record_json(record: &GrievanceRecord) -> Value {
    serde_json::to_value(record).unwrap_or_else(|err| {
        warn!(error = %err, "Failed to serialize grievance record");
        Value::Null
    })
}

/// The portal's request surface.
pub struct PortalApi {
    engine: Arc<LifecycleEngine>,
}

impl PortalApi {
    pub fn new(engine: Arc<LifecycleEngine>) -> Self {
        Self { engine }
    }

    /// Dispatch one request to its handler.
    pub async fn dispatch(&self, request: Request) -> ApiResponse {
        match request {
            Request::Submit { user, body } => self.submit_grievance(&user, body).await,
            Request::Update { user, id, body } => self.update_grievance(&user, &id, body).await,
            Request::Assign { user, id, assignee } => self.assign_grievance(&user, &id, assignee),
            Request::Get { id } => self.get_grievance(&id),
            Request::List { query } => self.list_grievances(query),
            Request::CheckBreach { id } => self.check_breach(&id),
        }
    }

    /// `POST /grievances` — 201 on success, 400 on validation failure.
    pub async fn submit_grievance(&self, user: &UserRef, body: SubmitRequest) -> ApiResponse {
        let now = Utc::now();
        let input = NewGrievance {
            title: body.title,
            description: body.description,
            category: body.category,
            location: body.location,
            attachments: body
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    file_url: a.file_url,
                    uploaded_at: now,
                })
                .collect(),
            submitter: user.id.clone(),
        };

        match self.engine.submit(input).await {
            Ok(record) => ApiResponse::data(201, record_json(&record)),
            Err(err) => err.into(),
        }
    }

    /// `PUT /grievances/:id` — 200, or 400/403/404/409 per error taxonomy.
    pub async fn update_grievance(
        &self,
        user: &UserRef,
        id: &str,
        body: UpdateRequest,
    ) -> ApiResponse {
        match self
            .engine
            .transition(id, user, body.status, &body.comment)
            .await
        {
            Ok(record) => ApiResponse::data(200, record_json(&record)),
            Err(err) => err.into(),
        }
    }

    /// `PUT /grievances/:id/assign` — 200, or 403/404/409.
    pub fn assign_grievance(&self, user: &UserRef, id: &str, assignee: String) -> ApiResponse {
        match self.engine.assign(id, user, assignee) {
            Ok(record) => ApiResponse::data(200, record_json(&record)),
            Err(err) => err.into(),
        }
    }

    /// `GET /grievances/:id` — 200 or 404.
    pub fn get_grievance(&self, id: &str) -> ApiResponse {
        match self.engine.get(id) {
            Ok(record) => ApiResponse::data(200, record_json(&record)),
            Err(err) => err.into(),
        }
    }

    /// `GET /grievances` — 200 with the matching records.
    pub fn list_grievances(&self, query: ListRequest) -> ApiResponse {
        match self.engine.list(&query.into_filter()) {
            Ok(records) => {
                let data: Vec<Value> = records.iter().map(record_json).collect();
                ApiResponse::data(200, Value::Array(data))
            }
            Err(err) => err.into(),
        }
    }

    /// On-demand breach check — 200 with the current flag, or 404.
    pub fn check_breach(&self, id: &str) -> ApiResponse {
        match self.engine.check_breach(id, Utc::now()) {
            Ok(is_breached) => ApiResponse::data(200, json!({ "is_breached": is_breached })),
            Err(err) => err.into(),
        }
    }
}
