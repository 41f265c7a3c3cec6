//! Module dependency graph.
//!
//! The graph is a directed set of `module -> required module` edges. It answers
//! two questions for the runtime: which adapter module serves a platform and
//! binding family, and which modules a consumer can see once it requires a
//! given module. `validate` checks the structural rules every deployment must
//! satisfy.

use super::descriptor::{ModuleDescriptor, ModuleKind};
use crate::error::{OrmError, OrmResult};
use crate::models::{BindingKind, Platform};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Module that provides entity-bean types to the repository layer.
pub const ENTITY_MODULE: &str = "entity.bean";

/// A rule broken by the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphViolation {
    /// A requirement names a module that is not registered.
    DanglingRequirement { module: String, missing: String },
    /// Modules that (directly or indirectly) require themselves.
    Cycle { path: Vec<String> },
    /// The same package is exported by more than one module.
    DuplicateExport { package: String, modules: Vec<String> },
    /// A reactive adapter that does not re-export the reactive runtime.
    RuntimeNotTransitive { module: String, runtime: String },
    /// A repository module that does not re-export the entity-bean module.
    EntityNotTransitive { module: String },
}

impl std::fmt::Display for GraphViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DanglingRequirement { module, missing } => {
                write!(f, "{} requires unknown module {}", module, missing)
            }
            Self::Cycle { path } => write!(f, "dependency cycle: {}", path.join(" -> ")),
            Self::DuplicateExport { package, modules } => write!(
                f,
                "package {} exported by {}",
                package,
                modules.join(", ")
            ),
            Self::RuntimeNotTransitive { module, runtime } => {
                write!(f, "{} must require {} transitively", module, runtime)
            }
            Self::EntityNotTransitive { module } => {
                write!(f, "{} must require {} transitively", module, ENTITY_MODULE)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: BTreeMap<String, ModuleDescriptor>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Names are unique.
    pub fn register(&mut self, module: ModuleDescriptor) -> OrmResult<()> {
        if self.modules.contains_key(&module.name) {
            return Err(OrmError::module("Module is already registered", &module.name));
        }
        self.modules.insert(module.name.clone(), module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// All modules in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    /// All adapter modules in name order.
    pub fn adapters(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values().filter(|m| m.is_adapter())
    }

    /// Find the adapter module serving `platform` over `binding`.
    pub fn adapter_for(
        &self,
        platform: Platform,
        binding: BindingKind,
    ) -> Option<&ModuleDescriptor> {
        self.adapters().find(|m| {
            matches!(
                m.kind,
                ModuleKind::Adapter { platform: p, binding: b } if p == platform && b == binding
            )
        })
    }

    /// The driver module an adapter requires directly.
    pub fn driver_of(&self, adapter: &str) -> Option<&ModuleDescriptor> {
        let module = self.get(adapter)?;
        module
            .requires
            .iter()
            .filter_map(|r| self.get(&r.module))
            .find(|m| matches!(m.kind, ModuleKind::Driver { .. }))
    }

    /// Modules visible to a consumer that requires `name`: the module itself
    /// plus everything reachable over transitive edges.
    pub fn readable_from(&self, name: &str) -> OrmResult<BTreeSet<String>> {
        if !self.modules.contains_key(name) {
            return Err(OrmError::module("Module is not registered", name));
        }

        let mut readable = BTreeSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if !readable.insert(current.clone()) {
                continue;
            }
            if let Some(module) = self.modules.get(&current) {
                stack.extend(
                    module
                        .requires
                        .iter()
                        .filter(|r| r.transitive)
                        .map(|r| r.module.clone()),
                );
            }
        }
        Ok(readable)
    }

    /// Every module that must be deployed alongside `name`, over all edges.
    pub fn dependencies_of(&self, name: &str) -> OrmResult<BTreeSet<String>> {
        let root = self
            .modules
            .get(name)
            .ok_or_else(|| OrmError::module("Module is not registered", name))?;

        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = root.requires.iter().map(|r| r.module.as_str()).collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.to_string()) {
                continue;
            }
            if let Some(module) = self.modules.get(current) {
                stack.extend(module.requires.iter().map(|r| r.module.as_str()));
            }
        }
        Ok(seen)
    }

    /// Check every structural rule and return all violations found.
    pub fn validate(&self) -> Vec<GraphViolation> {
        let mut violations = Vec::new();

        for module in self.modules.values() {
            for req in &module.requires {
                if !self.modules.contains_key(&req.module) {
                    violations.push(GraphViolation::DanglingRequirement {
                        module: module.name.clone(),
                        missing: req.module.clone(),
                    });
                }
            }

            match &module.kind {
                ModuleKind::Adapter {
                    binding: BindingKind::Reactive,
                    ..
                } => {
                    let runtime = BindingKind::Reactive.runtime_module();
                    if !module.requirement(runtime).is_some_and(|r| r.transitive) {
                        violations.push(GraphViolation::RuntimeNotTransitive {
                            module: module.name.clone(),
                            runtime: runtime.to_string(),
                        });
                    }
                }
                ModuleKind::Repository => {
                    if !module.requirement(ENTITY_MODULE).is_some_and(|r| r.transitive) {
                        violations.push(GraphViolation::EntityNotTransitive {
                            module: module.name.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        violations.extend(self.duplicate_exports());
        violations.extend(self.find_cycles());
        violations
    }

    fn duplicate_exports(&self) -> Vec<GraphViolation> {
        let mut exporters: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for module in self.modules.values() {
            for package in &module.exports {
                exporters
                    .entry(package.as_str())
                    .or_default()
                    .push(module.name.clone());
            }
        }
        exporters
            .into_iter()
            .filter(|(_, modules)| modules.len() > 1)
            .map(|(package, modules)| GraphViolation::DuplicateExport {
                package: package.to_string(),
                modules,
            })
            .collect()
    }

    /// Depth-first search with an explicit path; each back edge yields a cycle.
    fn find_cycles(&self) -> Vec<GraphViolation> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            graph: &'a ModuleGraph,
            name: &'a str,
            marks: &mut HashMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
            cycles: &mut Vec<GraphViolation>,
        ) {
            match marks.get(name) {
                Some(Mark::Done) => return,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|m| *m == name).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|m| m.to_string()).collect();
                    cycle.push(name.to_string());
                    cycles.push(GraphViolation::Cycle { path: cycle });
                    return;
                }
                None => {}
            }

            let Some(module) = graph.modules.get(name) else {
                return;
            };
            marks.insert(name, Mark::Visiting);
            path.push(name);
            for req in &module.requires {
                visit(graph, &req.module, marks, path, cycles);
            }
            path.pop();
            marks.insert(name, Mark::Done);
        }

        let mut marks = HashMap::new();
        let mut cycles = Vec::new();
        for name in self.modules.keys() {
            let mut path = Vec::new();
            visit(self, name, &mut marks, &mut path, &mut cycles);
        }
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(name: &str, platform: Platform, binding: BindingKind) -> ModuleDescriptor {
        ModuleDescriptor::new(name, ModuleKind::Adapter { platform, binding })
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut graph = ModuleGraph::new();
        graph
            .register(ModuleDescriptor::new("orm.core", ModuleKind::Core))
            .unwrap();
        let result = graph.register(ModuleDescriptor::new("orm.core", ModuleKind::Core));
        assert!(matches!(result, Err(OrmError::Module { .. })));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_dangling_requirement_detected() {
        let mut graph = ModuleGraph::new();
        graph
            .register(
                adapter("x.jdbc", Platform::H2, BindingKind::Blocking).requires("x.dialect"),
            )
            .unwrap();

        let violations = graph.validate();
        assert_eq!(
            violations,
            vec![GraphViolation::DanglingRequirement {
                module: "x.jdbc".to_string(),
                missing: "x.dialect".to_string(),
            }]
        );
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = ModuleGraph::new();
        graph
            .register(ModuleDescriptor::new("a", ModuleKind::Core).requires("b"))
            .unwrap();
        graph
            .register(ModuleDescriptor::new("b", ModuleKind::Core).requires("a"))
            .unwrap();

        let violations = graph.validate();
        assert_eq!(violations.len(), 1);
        match &violations[0] {
            GraphViolation::Cycle { path } => {
                assert_eq!(path, &vec!["a".to_string(), "b".to_string(), "a".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_export_detected() {
        let mut graph = ModuleGraph::new();
        graph
            .register(ModuleDescriptor::new("a", ModuleKind::Core).exports("pkg"))
            .unwrap();
        graph
            .register(ModuleDescriptor::new("b", ModuleKind::Core).exports("pkg"))
            .unwrap();

        let violations = graph.validate();
        assert!(violations.iter().any(|v| matches!(
            v,
            GraphViolation::DuplicateExport { package, modules }
                if package == "pkg" && modules.len() == 2
        )));
    }

    #[test]
    fn test_reactive_adapter_requires_runtime_transitively() {
        let mut graph = ModuleGraph::new();
        graph
            .register(ModuleDescriptor::new(
                "orm.r2dbc",
                ModuleKind::Runtime {
                    binding: BindingKind::Reactive,
                },
            ))
            .unwrap();
        graph
            .register(
                adapter("pg.r2dbc", Platform::PostgreSQL, BindingKind::Reactive)
                    .requires("orm.r2dbc"),
            )
            .unwrap();

        let violations = graph.validate();
        assert!(violations.contains(&GraphViolation::RuntimeNotTransitive {
            module: "pg.r2dbc".to_string(),
            runtime: "orm.r2dbc".to_string(),
        }));
    }

    #[test]
    fn test_readable_follows_only_transitive_edges() {
        let mut graph = ModuleGraph::new();
        graph
            .register(
                ModuleDescriptor::new("top", ModuleKind::Core)
                    .requires_transitive("mid")
                    .requires("hidden"),
            )
            .unwrap();
        graph
            .register(ModuleDescriptor::new("mid", ModuleKind::Core).requires_transitive("leaf"))
            .unwrap();
        graph
            .register(ModuleDescriptor::new("leaf", ModuleKind::Core))
            .unwrap();
        graph
            .register(ModuleDescriptor::new("hidden", ModuleKind::Core))
            .unwrap();

        let readable = graph.readable_from("top").unwrap();
        assert!(readable.contains("top"));
        assert!(readable.contains("mid"));
        assert!(readable.contains("leaf"));
        assert!(!readable.contains("hidden"));

        let deps = graph.dependencies_of("top").unwrap();
        assert!(deps.contains("hidden"));
        assert!(!deps.contains("top"));
    }

    #[test]
    fn test_readable_unknown_module() {
        let graph = ModuleGraph::new();
        assert!(graph.readable_from("nope").is_err());
    }
}
