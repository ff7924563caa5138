//! Deployment graph contracts and traversal.
//!
//! The graph is supplied from outside: a deployment holds sources, a source holds
//! environments, an environment holds a set of module declarations that must be
//! loaded before its modules can be enumerated.
//!
//! [`walk`] drives a [`DeploymentVisitor`] over that graph. Each stage decides with
//! [`Visit`] whether to descend. Failures never stop traversal: they are collected
//! into the returned [`Outcome`] and the walk moves on to the next sibling.

use crate::core::error::{MirrorSyncError, Result};
use log::error;
use std::path::Path;

/// A deployable unit: something with a name, a location and its own sync.
pub trait Module {
    fn name(&self) -> &str;

    fn path(&self) -> &Path;

    /// Signature currently checked out, known after a successful sync.
    fn signature(&self) -> Option<String>;

    fn sync(&mut self) -> Result<()>;
}

/// Parsed dependency declarations of one environment.
pub trait ModuleDeclarations {
    /// Parse the declarations. Calling it again is a no-op.
    fn load(&mut self) -> Result<()>;

    /// Declared modules. Empty until [`ModuleDeclarations::load`] succeeded.
    fn modules(&mut self) -> &mut [Box<dyn Module>];
}

pub trait Environment {
    /// Directory name of the environment, used by environment filters.
    fn dirname(&self) -> &str;

    fn path(&self) -> &Path;

    fn declarations(&mut self) -> &mut dyn ModuleDeclarations;
}

pub trait Source {
    fn name(&self) -> &str;

    fn environments(&mut self) -> Result<&mut [Box<dyn Environment>]>;
}

pub trait Deployment {
    fn sources(&mut self) -> &mut [Box<dyn Source>];
}

/// Decision of a traversal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Skip,
}

/// A failed node of the graph.
#[derive(Debug)]
pub struct Failure {
    /// Human readable location of the node, e.g. `production/apache`.
    pub node: String,
    pub error: MirrorSyncError,
}

/// Aggregate result of a traversal.
#[derive(Debug, Default)]
pub struct Outcome {
    pub failures: Vec<Failure>,
    pub deployed: Vec<String>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record_failure(&mut self, node: impl Into<String>, error: MirrorSyncError) {
        let node = node.into();
        error!("{node}: {error}");
        self.failures.push(Failure { node, error });
    }

    pub fn merge(&mut self, other: Outcome) {
        self.failures.extend(other.failures);
        self.deployed.extend(other.deployed);
    }
}

/// Per-stage hooks called by [`walk`].
///
/// Stages returning [`Visit::Skip`] are not descended into.
pub trait DeploymentVisitor {
    fn visit_deployment(&mut self, _deployment: &dyn Deployment) -> Visit {
        Visit::Continue
    }

    fn visit_source(&mut self, _source: &dyn Source) -> Visit {
        Visit::Continue
    }

    fn visit_environment(&mut self, _environment: &dyn Environment) -> Visit {
        Visit::Continue
    }

    fn visit_declarations(&mut self, declarations: &mut dyn ModuleDeclarations) -> Result<Visit> {
        declarations.load()?;
        Ok(Visit::Continue)
    }

    /// Act on one module. Returning `Ok(true)` marks it as deployed.
    fn visit_module(&mut self, module: &mut dyn Module) -> Result<bool>;
}

/// Walk the whole deployment and return the combined outcome.
pub fn walk(deployment: &mut dyn Deployment, visitor: &mut dyn DeploymentVisitor) -> Outcome {
    let mut outcome = Outcome::default();
    if visitor.visit_deployment(deployment) == Visit::Skip {
        return outcome;
    }

    for source in deployment.sources() {
        outcome.merge(walk_source(source.as_mut(), visitor));
    }
    outcome
}

fn walk_source(source: &mut dyn Source, visitor: &mut dyn DeploymentVisitor) -> Outcome {
    let mut outcome = Outcome::default();
    if visitor.visit_source(source) == Visit::Skip {
        return outcome;
    }

    let name = source.name().to_string();
    match source.environments() {
        Ok(environments) => {
            for environment in environments {
                outcome.merge(walk_environment(environment.as_mut(), visitor));
            }
        }
        Err(e) => outcome.record_failure(name, e),
    }
    outcome
}

fn walk_environment(
    environment: &mut dyn Environment,
    visitor: &mut dyn DeploymentVisitor,
) -> Outcome {
    let mut outcome = Outcome::default();
    if visitor.visit_environment(environment) == Visit::Skip {
        return outcome;
    }

    let env_name = environment.dirname().to_string();
    let declarations = environment.declarations();
    match visitor.visit_declarations(declarations) {
        Ok(Visit::Continue) => {}
        Ok(Visit::Skip) => return outcome,
        Err(e) => {
            outcome.record_failure(env_name, e);
            return outcome;
        }
    }

    for module in declarations.modules() {
        let node = format!("{env_name}/{}", module.name());
        match visitor.visit_module(module.as_mut()) {
            Ok(true) => outcome.deployed.push(node),
            Ok(false) => {}
            Err(e) => outcome.record_failure(node, e),
        }
    }
    outcome
}
