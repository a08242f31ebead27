// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "applywait";

/// Annotation recording the submitted manifest in client-side apply mode
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// Overlay build configuration
pub mod overlay {
    /// File names that mark a directory as an overlay to be built
    pub const MARKER_FILES: &[&str] = &["kustomization.yaml", "kustomization.yml", "Kustomization"];
    /// Build command used when none is configured
    pub const DEFAULT_BUILD_COMMAND: &[&str] = &["kubectl", "kustomize"];
    /// Extensions loaded from plain manifest directories
    pub const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];
}

/// Readiness polling configuration
pub mod wait {
    /// Default global wait budget in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
    /// Fixed interval between poll cycles in seconds
    pub const POLL_INTERVAL_SECS: u64 = 2;
    /// Upper bound for a single cluster request in seconds
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}
