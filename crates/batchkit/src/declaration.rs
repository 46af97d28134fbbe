//! Declaration file loading.
//!
//! The declaration is a YAML document with three optional, ordered
//! sections: `queues`, `compute_environments` and `job_definitions`.
//! String values may reference the process environment as `${env.NAME}`.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::resources::{ComputeEnvironment, JobDefinition, Queue};
use crate::types::EnvironmentType;

static ENV_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{env\.([A-Za-z_][A-Za-z0-9_]*)\}").expect("env token regex is valid")
});

/// Every resource declared in one file, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Declaration {
    pub queues: Vec<Queue>,
    pub compute_environments: Vec<ComputeEnvironment>,
    pub job_definitions: Vec<JobDefinition>,
}

impl Declaration {
    /// Load and validate a declaration file.
    ///
    /// With `import_env`, `${env.NAME}` tokens are replaced by the value of
    /// the environment variable `NAME`.
    pub fn from_path(path: &Path, import_env: bool) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        log::debug!("Loading declarations from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        if import_env {
            Self::parse(&content, |name| std::env::var(name).ok())
        } else {
            Self::parse(&content, |_| None)
        }
    }

    /// Parse a declaration, resolving `${env.NAME}` tokens through `lookup`.
    pub fn parse<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut tree: Value = serde_yaml::from_str(content)?;
        if tree.is_null() {
            return Ok(Self::default());
        }
        interpolate_tree(&mut tree, &lookup);
        let declaration: Self = serde_yaml::from_value(tree)?;
        declaration.validate()?;
        Ok(declaration)
    }

    /// Check constraints the YAML shape cannot express.
    pub fn validate(&self) -> Result<()> {
        for ce in &self.compute_environments {
            if ce.kind == EnvironmentType::Managed && ce.compute_resources.is_none() {
                return Err(Error::InvalidConfig(format!(
                    "compute environment '{}' is MANAGED but has no compute_resources",
                    ce.name
                )));
            }
        }
        Ok(())
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
            && self.compute_environments.is_empty()
            && self.job_definitions.is_empty()
    }
}

/// Replace `${env.NAME}` tokens whose variable `lookup` knows.
///
/// Unknown variables leave the token untouched.
pub fn interpolate_env<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_TOKEN
        .replace_all(text, |caps: &Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn interpolate_tree<F>(value: &mut Value, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) if s.contains("${env.") => {
            *s = interpolate_env(s, lookup);
        }
        Value::Sequence(items) => {
            for item in items {
                interpolate_tree(item, lookup);
            }
        }
        Value::Mapping(map) => {
            for item in map.values_mut() {
                interpolate_tree(item, lookup);
            }
        }
        Value::Tagged(tagged) => interpolate_tree(&mut tagged.value, lookup),
        _ => {}
    }
}
