//! Service declarations and their normalized form.
//!
//! Descriptors declare services either as a structured table or with the
//! compact shorthand
//!
//! ```text
//! module/path << dep1, ::library, dep2 << true
//! └─ module ─┘   └──── requirements ────┘   └ async
//! ```
//!
//! Both are normalized into a [`ServiceConfig`] when the container is built,
//! so malformed declarations are reported before anything resolves.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::requirement::{Requirement, RequirementSpec};
use crate::value::Factory;

/// Separator between shorthand segments.
pub const SHORTHAND_SEPARATOR: &str = "<<";

// ─── ServiceConfig ────────────────────────────────────────────────────────────

/// Where a service's factory comes from.
#[derive(Debug, Clone)]
pub enum FactorySource {
    /// A module path resolved by the [`ModuleLoader`](crate::ModuleLoader)
    /// relative to the owning plugin's path.
    Module(String),
    /// A factory supplied directly.
    Func(Factory),
}

/// Normalized declaration of a single service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub factory: FactorySource,
    /// Positional order of the factory's arguments.
    pub requirements: Vec<Requirement>,
    /// Whether the factory's output must be awaited.
    pub is_async: bool,
}

impl ServiceConfig {
    pub fn module(path: impl Into<String>) -> Self {
        Self {
            factory: FactorySource::Module(path.into()),
            requirements: Vec::new(),
            is_async: false,
        }
    }

    pub fn func(factory: Factory) -> Self {
        Self {
            factory: FactorySource::Func(factory),
            requirements: Vec::new(),
            is_async: false,
        }
    }

    pub fn require(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn set_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    /// Names of the services (not libraries) this service requires.
    pub fn service_requirements(&self) -> impl Iterator<Item = &str> {
        self.requirements.iter().filter_map(|r| match r {
            Requirement::Service(name) => Some(name.as_str()),
            Requirement::External(_) => None,
        })
    }
}

/// Parses the compact `module << deps << async` form.
pub fn parse_shorthand(declaration: &str) -> Result<ServiceConfig, ConfigurationError> {
    let segments: Vec<&str> = declaration
        .split(SHORTHAND_SEPARATOR)
        .map(str::trim)
        .collect();

    if segments.len() > 3 {
        return Err(ConfigurationError::TooManySegments {
            declaration: declaration.to_string(),
        });
    }

    let module = segments[0];
    if module.is_empty() {
        return Err(ConfigurationError::EmptyModulePath {
            declaration: declaration.to_string(),
        });
    }

    let requirements = match segments.get(1) {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Requirement::parse)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let is_async = match segments.get(2) {
        Some(flag) if flag.eq_ignore_ascii_case("true") => true,
        Some(flag) if flag.eq_ignore_ascii_case("false") => false,
        Some(flag) => {
            return Err(ConfigurationError::InvalidAsyncFlag {
                declaration: declaration.to_string(),
                flag: flag.to_string(),
            });
        }
        None => false,
    };

    Ok(ServiceConfig {
        factory: FactorySource::Module(module.to_string()),
        requirements,
        is_async,
    })
}

// ─── ServiceSpec ──────────────────────────────────────────────────────────────

/// Structured service declaration as written in a descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDecl {
    /// Module path resolved relative to the plugin path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Factory supplied in code; never read from files.
    #[serde(skip)]
    pub func: Option<Factory>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<RequirementSpec>,

    #[serde(default, rename = "async")]
    pub is_async: bool,
}

impl ServiceDecl {
    pub fn normalize(&self, service: &str) -> Result<ServiceConfig, ConfigurationError> {
        let factory = match (&self.module, &self.func) {
            (Some(module), None) => {
                let module = module.trim();
                if module.is_empty() {
                    return Err(ConfigurationError::EmptyModulePath {
                        declaration: service.to_string(),
                    });
                }
                FactorySource::Module(module.to_string())
            }
            (None, Some(func)) => FactorySource::Func(func.clone()),
            (None, None) => {
                return Err(ConfigurationError::MissingFactory {
                    service: service.to_string(),
                });
            }
            (Some(_), Some(_)) => {
                return Err(ConfigurationError::ConflictingFactory {
                    service: service.to_string(),
                });
            }
        };

        let requirements = self
            .require
            .iter()
            .map(RequirementSpec::normalize)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ServiceConfig {
            factory,
            requirements,
            is_async: self.is_async,
        })
    }
}

/// A service declaration in either form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceSpec {
    Shorthand(String),
    Declared(ServiceDecl),
}

impl ServiceSpec {
    /// Normalizes this declaration for the service called `service`.
    pub fn normalize(&self, service: &str) -> Result<ServiceConfig, ConfigurationError> {
        match self {
            Self::Shorthand(s) => parse_shorthand(s),
            Self::Declared(decl) => decl.normalize(service),
        }
    }
}

impl From<&str> for ServiceSpec {
    fn from(s: &str) -> Self {
        Self::Shorthand(s.to_string())
    }
}

impl From<ServiceDecl> for ServiceSpec {
    fn from(decl: ServiceDecl) -> Self {
        Self::Declared(decl)
    }
}

impl From<ServiceConfig> for ServiceSpec {
    fn from(config: ServiceConfig) -> Self {
        let (module, func) = match config.factory {
            FactorySource::Module(m) => (Some(m), None),
            FactorySource::Func(f) => (None, Some(f)),
        };
        Self::Declared(ServiceDecl {
            module,
            func,
            require: config.requirements.into_iter().map(Into::into).collect(),
            is_async: config.is_async,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_of(config: &ServiceConfig) -> &str {
        match &config.factory {
            FactorySource::Module(m) => m,
            FactorySource::Func(_) => panic!("expected a module factory"),
        }
    }

    #[test]
    fn test_shorthand_full_form() {
        let config = parse_shorthand("./a << timeout, ::winston , B.a << true").unwrap();
        assert_eq!(module_of(&config), "./a");
        assert_eq!(
            config.requirements,
            vec![
                Requirement::service("timeout"),
                Requirement::external("winston"),
                Requirement::service("B.a"),
            ]
        );
        assert!(config.is_async);
    }

    #[test]
    fn test_shorthand_module_only() {
        let config = parse_shorthand("  ./timeout  ").unwrap();
        assert_eq!(module_of(&config), "./timeout");
        assert!(config.requirements.is_empty());
        assert!(!config.is_async);

        let config = parse_shorthand("./b << ").unwrap();
        assert!(config.requirements.is_empty());
    }

    #[test]
    fn test_shorthand_rejects_malformed() {
        assert!(matches!(
            parse_shorthand(" << a"),
            Err(ConfigurationError::EmptyModulePath { .. })
        ));
        assert!(matches!(
            parse_shorthand("./a << b << yes"),
            Err(ConfigurationError::InvalidAsyncFlag { flag, .. }) if flag == "yes"
        ));
        assert!(matches!(
            parse_shorthand("./a << b << true << x"),
            Err(ConfigurationError::TooManySegments { .. })
        ));
        assert!(matches!(
            parse_shorthand("./a << b, :: "),
            Err(ConfigurationError::EmptyRequirement)
        ));
    }

    #[test]
    fn test_declared_requires_exactly_one_factory() {
        let decl = ServiceDecl::default();
        assert!(matches!(
            decl.normalize("a"),
            Err(ConfigurationError::MissingFactory { .. })
        ));

        let decl = ServiceDecl {
            module: Some("./a".into()),
            func: Some(Factory::constant(crate::ServiceValue::new(1_u8))),
            ..Default::default()
        };
        assert!(matches!(
            decl.normalize("a"),
            Err(ConfigurationError::ConflictingFactory { .. })
        ));
    }

    #[test]
    fn test_declared_normalizes_requirements_in_order() {
        let decl = ServiceDecl {
            module: Some("./a.js".into()),
            require: vec![
                RequirementSpec::Library { lib: "winston".into() },
                "B.a".into(),
            ],
            ..Default::default()
        };
        let config = decl.normalize("A.a").unwrap();
        assert_eq!(
            config.requirements,
            vec![Requirement::external("winston"), Requirement::service("B.a")]
        );
        assert_eq!(config.service_requirements().collect::<Vec<_>>(), ["B.a"]);
    }
}
