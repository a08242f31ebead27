// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! kube-rs backed implementation of the cluster capabilities

use crate::apply::{classify, AppliedObject};
use crate::config::Config;
use crate::constants::LAST_APPLIED_ANNOTATION;
use crate::error::Result;
use crate::kubernetes::{ensure_namespace_exists, namespace_exists, ClusterOps};
use crate::manifest::ManifestDocument;
use crate::types::WorkloadStatus;
use crate::workload::{WorkloadKind, WorkloadRef};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, DynamicObject, Patch, PatchParams, PostParams, ValidationDirective},
    core::GroupVersionKind,
    discovery::{self, ApiResource, Scope},
    Client, Resource,
};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Cluster access through a kube `Client`
pub struct KubeCluster {
    client: Client,
    /// Discovered API resources by `apiVersion/kind`, with their namespaced flag
    resources: Mutex<HashMap<String, (ApiResource, bool)>>,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resources: Mutex::new(HashMap::new()),
        }
    }

    fn resource_key(doc: &ManifestDocument) -> String {
        format!("{}/{}", doc.api_version, doc.kind)
    }

    async fn resolve(&self, doc: &ManifestDocument) -> Result<(ApiResource, bool)> {
        let key = Self::resource_key(doc);
        if let Some(found) = self.resources.lock().await.get(&key) {
            return Ok(found.clone());
        }

        let (group, version) = doc.group_version();
        let gvk = GroupVersionKind::gvk(group, version, &doc.kind);
        let (ar, caps) = discovery::pinned_kind(&self.client, &gvk).await?;
        let namespaced = matches!(caps.scope, Scope::Namespaced);
        debug!("Resolved {} to resource {} (namespaced={})", key, ar.plural, namespaced);

        self.resources
            .lock()
            .await
            .insert(key, (ar.clone(), namespaced));
        Ok((ar, namespaced))
    }

    async fn fetch_status<K>(&self, workload: &WorkloadRef) -> Result<Option<WorkloadStatus>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + std::fmt::Debug,
        <K as Resource>::DynamicType: Default,
        for<'a> WorkloadStatus: From<&'a K>,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), &workload.namespace);
        Ok(api
            .get_opt(&workload.name)
            .await?
            .as_ref()
            .map(WorkloadStatus::from))
    }
}

#[async_trait]
impl ClusterOps for KubeCluster {
    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        ensure_namespace_exists(&self.client, namespace).await
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        namespace_exists(&self.client, namespace).await
    }

    async fn is_namespaced(&self, doc: &ManifestDocument) -> Option<bool> {
        self.resources
            .lock()
            .await
            .get(&Self::resource_key(doc))
            .map(|(_, namespaced)| *namespaced)
    }

    #[instrument(skip(self, doc, config), fields(object = %format!("{}/{}", doc.kind, doc.name)))]
    async fn apply_object(&self, doc: &ManifestDocument, config: &Config) -> Result<AppliedObject> {
        let (ar, namespaced) = self.resolve(doc).await?;
        let namespace = namespaced.then(|| doc.namespace_or(&config.namespace).to_string());

        let api: Api<DynamicObject> = match &namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        };

        let body = with_namespace(&doc.body, namespace.as_deref());
        let live = match api.get_opt(&doc.name).await? {
            Some(obj) => Some(serde_json::to_value(&obj)?),
            None => None,
        };

        let mode = config.mode;
        let validation = if mode.validate {
            ValidationDirective::Strict
        } else {
            ValidationDirective::Ignore
        };

        let returned = if mode.server_side {
            let mut pp = PatchParams::apply(&config.field_manager);
            pp.field_validation = Some(validation);
            pp.dry_run = mode.dry_run;
            api.patch(&doc.name, &pp, &Patch::Apply(&body)).await?
        } else {
            let body = with_last_applied(&body)?;
            if live.is_some() {
                let pp = PatchParams {
                    dry_run: mode.dry_run,
                    field_manager: Some(config.field_manager.clone()),
                    field_validation: Some(validation),
                    ..Default::default()
                };
                api.patch(&doc.name, &pp, &Patch::Merge(&body)).await?
            } else {
                let pp = PostParams {
                    dry_run: mode.dry_run,
                    field_manager: Some(config.field_manager.clone()),
                };
                let obj: DynamicObject = serde_json::from_value(body)?;
                api.create(&pp, &obj).await?
            }
        };

        let returned = serde_json::to_value(&returned)?;
        Ok(AppliedObject {
            namespace,
            action: classify(live.as_ref(), &returned, mode.dry_run),
        })
    }

    #[instrument(skip(self), fields(workload = %workload))]
    async fn read_status(&self, workload: &WorkloadRef) -> Result<Option<WorkloadStatus>> {
        match workload.kind {
            WorkloadKind::Deployment => self.fetch_status::<Deployment>(workload).await,
            WorkloadKind::StatefulSet => self.fetch_status::<StatefulSet>(workload).await,
            WorkloadKind::DaemonSet => self.fetch_status::<DaemonSet>(workload).await,
            WorkloadKind::ReplicaSet => self.fetch_status::<ReplicaSet>(workload).await,
            WorkloadKind::Job => self.fetch_status::<Job>(workload).await,
        }
    }
}

/// Pin namespaced objects to the namespace they are applied into
fn with_namespace(body: &Json, namespace: Option<&str>) -> Json {
    let mut body = body.clone();
    if let (Some(ns), Some(meta)) = (
        namespace,
        body.get_mut("metadata").and_then(|m| m.as_object_mut()),
    ) {
        meta.insert("namespace".to_string(), Json::String(ns.to_string()));
    }
    body
}

/// Record the submitted manifest the way client-side apply tooling expects
fn with_last_applied(body: &Json) -> Result<Json> {
    let serialized = serde_json::to_string(body)?;
    let mut annotated = body.clone();
    if let Some(meta) = annotated.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        let annotations = meta
            .entry("annotations")
            .or_insert_with(|| Json::Object(Default::default()));
        if let Some(annotations) = annotations.as_object_mut() {
            annotations.insert(
                LAST_APPLIED_ANNOTATION.to_string(),
                Json::String(serialized),
            );
        }
    }
    Ok(annotated)
}
