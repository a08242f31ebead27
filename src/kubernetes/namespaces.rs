// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace management utilities

use crate::error::{ApplyWaitError, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client,
};
use tracing::{debug, info, instrument};

/// Read-only lookup used when nothing may be persisted
#[instrument(skip(client))]
pub async fn namespace_exists(client: &Client, namespace: &str) -> Result<bool> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let existing = namespaces.get_opt(namespace).await.map_err(|e| {
        ApplyWaitError::NamespaceError(format!("failed to look up namespace {}: {}", namespace, e))
    })?;
    Ok(existing.is_some())
}

/// Ensure the apply target namespace exists, creating it when absent.
/// Any failure is a `NamespaceError`, it is never retried.
#[instrument(skip(client))]
pub async fn ensure_namespace_exists(client: &Client, namespace: &str) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let existing = namespaces.get_opt(namespace).await.map_err(|e| {
        ApplyWaitError::NamespaceError(format!("failed to look up namespace {}: {}", namespace, e))
    })?;
    if existing.is_some() {
        debug!("Namespace {} already exists", namespace);
        return Ok(());
    }

    info!("Creating namespace {}", namespace);
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => {
            info!("Namespace {} created", namespace);
            Ok(())
        }
        // Created concurrently by someone else
        Err(kube::Error::Api(err)) if err.code == 409 => Ok(()),
        Err(e) => Err(ApplyWaitError::NamespaceError(format!(
            "failed to create namespace {}: {}",
            namespace, e
        ))),
    }
}
