//! Build plan: the set of pages a build will produce.
//!
//! The plan is an immutable value. Registering a page consumes the plan and
//! returns a new one, and a finished plan is validated before anything is
//! rendered, so two sources can never silently race for the same output file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::assets::AssetSet;
use super::page::PageDescriptor;
use super::transform::TransformChain;

#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("output path collision:\n{}", format_collisions(.0))]
    OutputCollision(Vec<Collision>),
}

/// Several sources that map to the same output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub relative_output_path: String,
    pub sources: Vec<PathBuf>,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources = self
            .sources
            .iter()
            .map(|s| s.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "  {} <- {}", self.relative_output_path, sources)
    }
}

fn format_collisions(collisions: &[Collision]) -> String {
    collisions
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A single page registered for extraction to its own output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub descriptor: PageDescriptor,
    /// Transforms the source runs through
    pub transforms: TransformChain,
}

impl Registration {
    pub fn new(descriptor: PageDescriptor) -> Self {
        let transforms = descriptor.content_kind.transforms();
        Self {
            descriptor,
            transforms,
        }
    }

    /// Registrations are keyed by source path.
    pub fn key(&self) -> &Path {
        &self.descriptor.source_path
    }
}

/// The pages a build produces, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    registrations: Vec<Registration>,
    /// Source files the build must process
    entries: Vec<PathBuf>,
    /// Public asset path prefix
    public_path: String,
}

impl BuildPlan {
    /// Create an empty plan.
    pub fn new(public_path: impl Into<String>) -> Self {
        Self {
            registrations: Vec::new(),
            entries: Vec::new(),
            public_path: public_path.into(),
        }
    }

    /// Build and validate a plan from page descriptors.
    pub fn from_pages(
        descriptors: impl IntoIterator<Item = PageDescriptor>,
        public_path: impl Into<String>,
    ) -> Result<Self, PlanError> {
        let plan = descriptors
            .into_iter()
            .fold(Self::new(public_path), |plan, descriptor| {
                plan.register(descriptor)
            });
        plan.validate()?;
        Ok(plan)
    }

    /// Return a plan with one more page.
    pub fn register(mut self, descriptor: PageDescriptor) -> Self {
        self.entries.push(descriptor.source_path.clone());
        self.registrations.push(Registration::new(descriptor));
        self
    }

    /// Check that every output path is produced by exactly one source.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut by_output: BTreeMap<&str, Vec<PathBuf>> = BTreeMap::new();
        for registration in &self.registrations {
            by_output
                .entry(registration.descriptor.relative_output_path.as_str())
                .or_default()
                .push(registration.key().to_path_buf());
        }

        let collisions: Vec<Collision> = by_output
            .into_iter()
            .filter(|(_, sources)| sources.len() > 1)
            .map(|(output, sources)| Collision {
                relative_output_path: output.to_string(),
                sources,
            })
            .collect();

        if collisions.is_empty() {
            Ok(())
        } else {
            Err(PlanError::OutputCollision(collisions))
        }
    }

    /// Check that no asset is copied over a page's output file.
    pub fn validate_assets(&self, assets: &AssetSet) -> Result<(), PlanError> {
        let collisions: Vec<Collision> = self
            .registrations
            .iter()
            .filter(|r| assets.contains(&r.descriptor.relative_output_path))
            .map(|r| Collision {
                relative_output_path: r.descriptor.relative_output_path.clone(),
                sources: vec![
                    r.key().to_path_buf(),
                    assets.source_path(&r.descriptor.relative_output_path),
                ],
            })
            .collect();

        if collisions.is_empty() {
            Ok(())
        } else {
            Err(PlanError::OutputCollision(collisions))
        }
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn public_path(&self) -> &str {
        &self.public_path
    }

    /// Find the registration for a source file.
    pub fn find(&self, source: &Path) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.key() == source)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
