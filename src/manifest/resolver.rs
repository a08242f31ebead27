// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolve an overlay or plain manifest directory into manifest documents

use crate::config::Config;
use crate::constants::overlay::{MANIFEST_EXTENSIONS, MARKER_FILES};
use crate::error::{ApplyWaitError, Result};
use crate::manifest::document::{parse_documents, ManifestDocument};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Capability that turns an overlay directory into rendered manifest text
#[async_trait]
pub trait OverlayBuilder: Send + Sync {
    async fn build(&self, dir: &Path) -> Result<String>;
}

/// Builds overlays by running an external build command with the directory as last argument
pub struct KustomizeBuilder {
    command: Vec<String>,
}

impl KustomizeBuilder {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl OverlayBuilder for KustomizeBuilder {
    #[instrument(skip(self), fields(command = %self.command.join(" ")))]
    async fn build(&self, dir: &Path) -> Result<String> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(ApplyWaitError::BuildError(
                "no overlay build command configured".to_string(),
            ));
        };

        let output = Command::new(program)
            .args(args)
            .arg(dir)
            .output()
            .await
            .map_err(|e| {
                ApplyWaitError::BuildError(format!("failed to run {}: {}", program, e))
            })?;

        if !output.status.success() {
            return Err(ApplyWaitError::BuildError(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| ApplyWaitError::BuildError(format!("build output is not UTF-8: {}", e)))
    }
}

/// Loads every manifest file of a plain directory, sorted by file name
pub struct DirectoryLoader;

#[async_trait]
impl OverlayBuilder for DirectoryLoader {
    async fn build(&self, dir: &Path) -> Result<String> {
        let mut files: Vec<PathBuf> = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_manifest = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| MANIFEST_EXTENSIONS.contains(&e));
            if is_manifest && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut text = String::new();
        for file in &files {
            debug!("Loading manifest file {}", file.display());
            text.push_str("\n---\n");
            text.push_str(&tokio::fs::read_to_string(file).await?);
        }
        Ok(text)
    }
}

/// Check if a directory is an overlay that needs building
pub fn is_overlay(dir: &Path) -> bool {
    MARKER_FILES.iter().any(|f| dir.join(f).is_file())
}

/// Manifest Resolver: produces the ordered manifest set for a directory
pub struct ManifestResolver {
    builder: Box<dyn OverlayBuilder>,
}

impl ManifestResolver {
    pub fn new(builder: Box<dyn OverlayBuilder>) -> Self {
        Self { builder }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Box::new(KustomizeBuilder::new(config.build_command.clone())))
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, dir: &Path) -> Result<Vec<ManifestDocument>> {
        if !dir.is_dir() {
            return Err(ApplyWaitError::BuildError(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let text = if is_overlay(dir) {
            info!("Building overlay {}", dir.display());
            self.builder.build(dir).await?
        } else {
            info!("Loading manifests from {}", dir.display());
            DirectoryLoader.build(dir).await.map_err(|e| {
                ApplyWaitError::BuildError(format!("failed to read {}: {}", dir.display(), e))
            })?
        };

        let documents = parse_documents(&text)?;
        info!("Resolved {} manifest documents", documents.len());
        Ok(documents)
    }
}
