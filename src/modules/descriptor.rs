//! Module descriptors.
//!
//! A module is a named deployable unit that declares the modules it requires
//! and the packages it exports.

use crate::models::{BindingKind, Platform};
use serde::Serialize;

/// What role a module plays in the layered architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleKind {
    /// Shared statement-building and mapping runtime.
    Core,
    /// Binding-family runtime (`orm.jdbc`, `orm.r2dbc`).
    Runtime { binding: BindingKind },
    /// Product-specific SQL syntax and type mapping.
    Dialect { platform: Platform },
    /// Dialect adapter wired to one binding family.
    Adapter {
        platform: Platform,
        binding: BindingKind,
    },
    /// Third-party driver library. `provided_by` names the bundled driver
    /// implementation, or `None` when the driver is declared but not shipped.
    Driver { provided_by: Option<String> },
    Entity,
    Repository,
}

/// An edge in the module graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub module: String,
    /// Re-exported to anything that requires the declaring module.
    pub transitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: ModuleKind,
    pub requires: Vec<Requirement>,
    pub exports: Vec<String>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            requires: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// Add a non-transitive requirement.
    pub fn requires(mut self, module: impl Into<String>) -> Self {
        self.requires.push(Requirement {
            module: module.into(),
            transitive: false,
        });
        self
    }

    /// Add a requirement that is re-exported to consumers.
    pub fn requires_transitive(mut self, module: impl Into<String>) -> Self {
        self.requires.push(Requirement {
            module: module.into(),
            transitive: true,
        });
        self
    }

    pub fn exports(mut self, package: impl Into<String>) -> Self {
        self.exports.push(package.into());
        self
    }

    /// Find the requirement on `module`, if declared.
    pub fn requirement(&self, module: &str) -> Option<&Requirement> {
        self.requires.iter().find(|r| r.module == module)
    }

    pub fn is_adapter(&self) -> bool {
        matches!(self.kind, ModuleKind::Adapter { .. })
    }
}

impl std::fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.requires.is_empty() {
            let reqs: Vec<String> = self
                .requires
                .iter()
                .map(|r| {
                    if r.transitive {
                        format!("{} (transitive)", r.module)
                    } else {
                        r.module.clone()
                    }
                })
                .collect();
            write!(f, " requires {}", reqs.join(", "))?;
        }
        if !self.exports.is_empty() {
            write!(f, " exports {}", self.exports.join(", "))?;
        }
        Ok(())
    }
}
