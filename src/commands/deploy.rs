use crate::core::cache::CacheRegistry;
use crate::core::config::DeploySettings;
use crate::core::deployment::{walk, Deployment, DeploymentVisitor, Environment, Module, Outcome, Visit};
use crate::core::error::Result;
use crate::core::lock::RunLock;
use crate::core::manifest::ConfiguredDeployment;
use crate::core::record::DeployRecord;
use crate::core::{print_error, print_section_header, print_success};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments of the "deploy module" action.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Only modules named here are deployed.
    pub modules: Vec<String>,
    /// Restrict the run to a single environment.
    pub environment: Option<String>,
}

/// Visitor deploying an explicit set of modules.
pub struct ModuleDeployer {
    modules: BTreeSet<String>,
    environment: Option<String>,
}

impl ModuleDeployer {
    pub fn new(options: &DeployOptions) -> Self {
        ModuleDeployer {
            modules: options.modules.iter().cloned().collect(),
            environment: options.environment.clone(),
        }
    }

    fn write_module_info(module: &dyn Module, started_at: chrono::DateTime<Utc>) -> Result<()> {
        let Some(signature) = module.signature() else {
            warn!(
                "Module {} reported no signature, skipping deploy record",
                module.name()
            );
            return Ok(());
        };

        let record = DeployRecord {
            module_name: module.name().to_string(),
            signature,
            started_at,
            finished_at: Utc::now(),
        };
        record.write(module.path())
    }
}

impl DeploymentVisitor for ModuleDeployer {
    fn visit_environment(&mut self, environment: &dyn Environment) -> Visit {
        match &self.environment {
            Some(only) if only != environment.dirname() => {
                debug!(
                    "Only updating modules in environment {only}, skipping environment {}",
                    environment.path().display()
                );
                Visit::Skip
            }
            _ => {
                debug!(
                    "Updating modules {:?} in environment {}",
                    self.modules,
                    environment.path().display()
                );
                Visit::Continue
            }
        }
    }

    fn visit_module(&mut self, module: &mut dyn Module) -> Result<bool> {
        if !self.modules.contains(module.name()) {
            debug!(
                "Only updating modules {:?}, skipping module {}",
                self.modules,
                module.name()
            );
            return Ok(false);
        }

        let started_at = Utc::now();
        info!("Deploying module {}", module.path().display());
        module.sync()?;

        Self::write_module_info(module, started_at)?;
        Ok(true)
    }
}

/// Run the deploy action over an already built deployment graph.
pub fn deploy_modules_in(deployment: &mut dyn Deployment, options: &DeployOptions) -> Outcome {
    let mut deployer = ModuleDeployer::new(options);
    walk(deployment, &mut deployer)
}

/// Run the deploy action described by `settings`.
///
/// Run-level failures (write lock, run lock) are returned as errors before anything
/// is touched. Per-module failures are collected in the returned [`Outcome`].
pub fn deploy_modules(settings: &DeploySettings, options: &DeployOptions) -> Result<Outcome> {
    settings.check_write_lock()?;

    let cache_root = settings.cache_root()?;
    let registry = Arc::new(CacheRegistry::new(&cache_root));
    let mut deployment = ConfiguredDeployment::new(settings, registry);

    let _lock = RunLock::acquire(&cache_root)?;
    Ok(deploy_modules_in(&mut deployment, options))
}

/// CLI entry point: returns whether every selected module deployed.
pub fn execute_deploy_module(config: Option<PathBuf>, options: DeployOptions) -> Result<bool> {
    let config_path = match config {
        Some(path) => path,
        None => DeploySettings::default_path()?,
    };
    let settings = DeploySettings::load(&config_path)?;

    let outcome = deploy_modules(&settings, &options)?;
    report(&outcome);
    Ok(outcome.is_success())
}

fn report(outcome: &Outcome) {
    if !outcome.deployed.is_empty() {
        print_section_header("Deployed");
        for node in &outcome.deployed {
            println!("   {node}");
        }
    }

    for failure in &outcome.failures {
        print_error(&format!("{}: {}", failure.node, failure.error));
    }

    let summary = summary(outcome);
    if outcome.is_success() {
        print_success(&format!("{summary}\n"));
    } else {
        print_error(&summary);
    }
}

/// One line naming how many modules deployed and how many nodes failed.
fn summary(outcome: &Outcome) -> String {
    let deployed = format!("Deployed {} module(s)", outcome.deployed.len());
    match outcome.failures.len() {
        0 => deployed,
        failed => format!("{deployed}, {failed} failed"),
    }
}
