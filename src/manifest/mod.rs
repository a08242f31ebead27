// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Manifest resolution and structured document parsing.

pub mod document;
pub mod resolver;

pub use document::{parse_documents, ManifestDocument};
pub use resolver::{DirectoryLoader, KustomizeBuilder, ManifestResolver, OverlayBuilder};
