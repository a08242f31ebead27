// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Structured manifest documents parsed from multi-document YAML.

use crate::error::{ApplyWaitError, Result};
use serde::Deserialize;
use serde_json::Value as Json;

/// One parsed API object from the manifest build output
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    pub api_version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    /// The complete object tree, as submitted to the cluster
    pub body: Json,
}

impl ManifestDocument {
    /// Build a document from a parsed object tree, `index` locates it in the stream
    pub fn from_value(body: Json, index: usize) -> Result<Self> {
        let field = |path: &[&str]| -> Option<String> {
            let mut node = &body;
            for key in path {
                node = node.get(key)?;
            }
            node.as_str().map(|s| s.to_string())
        };

        let missing = |what: &str| {
            ApplyWaitError::BuildError(format!("document {} is missing {}", index, what))
        };

        let api_version = field(&["apiVersion"]).ok_or_else(|| missing("apiVersion"))?;
        let kind = field(&["kind"]).ok_or_else(|| missing("kind"))?;
        let name = field(&["metadata", "name"])
            .filter(|n| !n.is_empty())
            .ok_or_else(|| missing("metadata.name"))?;
        let namespace = field(&["metadata", "namespace"]).filter(|n| !n.is_empty());

        Ok(ManifestDocument {
            api_version,
            kind,
            namespace,
            name,
            body,
        })
    }

    /// Split `apiVersion` into group and version, the core group is empty
    pub fn group_version(&self) -> (&str, &str) {
        match self.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        }
    }

    /// Namespace of the document, or `default` when the manifest omits one
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }
}

/// Parse a multi-document YAML stream into manifest documents, in stream order.
///
/// Empty documents are skipped, merge keys are resolved and `List` objects are
/// flattened into their items.
pub fn parse_documents(text: &str) -> Result<Vec<ManifestDocument>> {
    let mut documents = Vec::new();

    for (index, de) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let mut value = serde_yaml::Value::deserialize(de).map_err(|e| {
            ApplyWaitError::BuildError(format!("document {} is not valid YAML: {}", index, e))
        })?;
        value.apply_merge().map_err(|e| {
            ApplyWaitError::BuildError(format!("document {}: {}", index, e))
        })?;

        if value.is_null() {
            continue;
        }

        let json = serde_json::to_value(&value).map_err(|e| {
            ApplyWaitError::BuildError(format!("document {} cannot be converted: {}", index, e))
        })?;
        push_document(json, index, &mut documents)?;
    }

    Ok(documents)
}

fn push_document(json: Json, index: usize, out: &mut Vec<ManifestDocument>) -> Result<()> {
    if !json.is_object() {
        return Err(ApplyWaitError::BuildError(format!(
            "document {} is not a mapping",
            index
        )));
    }

    if is_list(&json) {
        if let Some(Json::Array(items)) = json.get("items") {
            for item in items {
                push_document(item.clone(), index, out)?;
            }
        }
        return Ok(());
    }

    out.push(ManifestDocument::from_value(json, index)?);
    Ok(())
}

fn is_list(json: &Json) -> bool {
    json.get("kind")
        .and_then(|k| k.as_str())
        .is_some_and(|k| k.ends_with("List"))
        && json.get("items").is_some_and(|i| i.is_array())
}
