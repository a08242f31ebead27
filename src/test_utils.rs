// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock Kubernetes API and a scripted cluster.

use crate::apply::{AppliedObject, ApplyAction};
use crate::config::Config;
use crate::error::{ApplyWaitError, Result};
use crate::kubernetes::ClusterOps;
use crate::manifest::ManifestDocument;
use crate::types::WorkloadStatus;
use crate::workload::WorkloadRef;
use async_trait::async_trait;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request seen by the mock API
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: String,
}

impl RecordedRequest {
    /// The request body parsed as JSON, `Null` when empty
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or_default()
    }
}

/// A mock HTTP service that answers from canned responses keyed by method and exact path.
/// Unmatched requests get a 404 Status.
#[derive(Clone, Default)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// All requests received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().unwrap_or_default().to_string();
        let (status, response) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, status_json(404, "NotFound", "not found")));
        let requests = self.requests.clone();

        Box::pin(async move {
            let body = req
                .into_body()
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path,
                query,
                body: String::from_utf8_lossy(&body).into_owned(),
            });

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(response.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
    .to_string()
}

/// Create a failure Status response
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// One scripted answer to a status read
#[derive(Clone, Debug)]
pub enum StatusStep {
    Missing,
    Status(WorkloadStatus),
    Error(String),
}

/// A `ClusterOps` implementation with scripted apply results and status sequences.
/// The last status step of a workload repeats forever.
#[derive(Clone, Default)]
pub struct FakeCluster {
    apply_results: Arc<Mutex<HashMap<String, std::result::Result<ApplyAction, String>>>>,
    statuses: Arc<Mutex<HashMap<WorkloadRef, VecDeque<StatusStep>>>>,
    namespace_error: Arc<Mutex<Option<String>>>,
    namespace_missing: Arc<Mutex<bool>>,
    cluster_scoped: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the apply result of the object named `kind/name`
    pub fn apply_result(self, kind: &str, name: &str, result: std::result::Result<ApplyAction, String>) -> Self {
        self.apply_results
            .lock()
            .unwrap()
            .insert(format!("{}/{}", kind, name), result);
        self
    }

    pub fn statuses(self, workload: WorkloadRef, steps: Vec<StatusStep>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(workload, steps.into_iter().collect());
        self
    }

    pub fn failing_namespace(self, message: &str) -> Self {
        *self.namespace_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// The target namespace does not exist yet
    pub fn missing_namespace(self) -> Self {
        *self.namespace_missing.lock().unwrap() = true;
        self
    }

    /// Report objects of this kind as cluster-scoped
    pub fn cluster_scoped(self, kind: &str) -> Self {
        self.cluster_scoped.lock().unwrap().push(kind.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        self.record(format!("namespace {}", namespace));
        match self.namespace_error.lock().unwrap().clone() {
            Some(message) => Err(ApplyWaitError::NamespaceError(message)),
            None => Ok(()),
        }
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        self.record(format!("namespace-check {}", namespace));
        match self.namespace_error.lock().unwrap().clone() {
            Some(message) => Err(ApplyWaitError::NamespaceError(message)),
            None => Ok(!*self.namespace_missing.lock().unwrap()),
        }
    }

    async fn is_namespaced(&self, doc: &ManifestDocument) -> Option<bool> {
        self.cluster_scoped
            .lock()
            .unwrap()
            .contains(&doc.kind)
            .then_some(false)
    }

    async fn apply_object(&self, doc: &ManifestDocument, config: &Config) -> Result<AppliedObject> {
        self.record(format!("apply {}/{} dry_run={}", doc.kind, doc.name, config.mode.dry_run));
        let key = format!("{}/{}", doc.kind, doc.name);
        let action = match self.apply_results.lock().unwrap().get(&key).cloned() {
            Some(Ok(action)) => action,
            Some(Err(message)) => return Err(ApplyWaitError::ApplyError(message)),
            None if config.mode.dry_run => ApplyAction::WouldChange,
            None => ApplyAction::Created,
        };
        let scoped = self.cluster_scoped.lock().unwrap().contains(&doc.kind);
        Ok(AppliedObject {
            namespace: (!scoped).then(|| doc.namespace_or(&config.namespace).to_string()),
            action,
        })
    }

    async fn read_status(&self, workload: &WorkloadRef) -> Result<Option<WorkloadStatus>> {
        self.record(format!("status {}", workload));
        let step = {
            let mut statuses = self.statuses.lock().unwrap();
            match statuses.get_mut(workload) {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().cloned(),
                None => None,
            }
        };
        match step {
            None | Some(StatusStep::Missing) => Ok(None),
            Some(StatusStep::Status(status)) => Ok(Some(status)),
            Some(StatusStep::Error(message)) => Err(ApplyWaitError::StatusError(message)),
        }
    }
}
