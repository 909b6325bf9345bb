// Tool registry and trait definition
//
// Lookup table from ToolKind to the per-tool parameter declaration and
// command builder

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::errors::ValidationError;
use crate::tools::implementations::{EagleEyeTool, SocialMapperTool, TheHarvesterTool};
use crate::tools::types::{CommandSpec, Params, ToolKind, ToolRequest};

/// Shape of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Non-empty string
    Text,
    /// Non-empty list of non-empty strings, comma-joined at build time
    TextList,
    /// Positive integer
    Integer,
}

impl ParamKind {
    fn expected(&self) -> &'static str {
        match self {
            ParamKind::Text => "a non-empty string",
            ParamKind::TextList => "a non-empty list of strings without commas",
            ParamKind::Integer => "a positive integer",
        }
    }
}

/// Declared parameter of a tool
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    /// None means required
    pub default: Option<fn() -> Value>,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, default: fn() -> Value) -> Self {
        Self {
            name,
            kind,
            default: Some(default),
        }
    }

    fn check(&self, value: &Value) -> Result<(), ValidationError> {
        let ok = match self.kind {
            ParamKind::Text => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            ParamKind::TextList => value.as_array().is_some_and(|items| {
                !items.is_empty()
                    && items.iter().all(|item| {
                        item.as_str()
                            .is_some_and(|s| !s.trim().is_empty() && !s.contains(','))
                    })
            }),
            ParamKind::Integer => value.as_u64().is_some_and(|n| n > 0),
        };

        if ok {
            Ok(())
        } else {
            Err(ValidationError::Invalid {
                field: self.name,
                expected: self.kind.expected(),
            })
        }
    }
}

/// Check a raw body against declared parameters and fill in defaults
///
/// Undeclared keys are dropped, so they never reach the fingerprint.
pub fn validate(specs: &[ParamSpec], raw: &Map<String, Value>) -> Result<Params, ValidationError> {
    let mut params = Params::new();

    for spec in specs {
        let value = match raw.get(spec.name) {
            Some(Value::Null) | None => match spec.default {
                Some(default) => default(),
                None => return Err(ValidationError::Missing { field: spec.name }),
            },
            Some(value) => {
                spec.check(value)?;
                value.clone()
            }
        };
        params.insert(spec.name.to_string(), value);
    }

    Ok(params)
}

/// Per-tool command builder
pub trait ToolCommand: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// Declared parameters (required and optional with defaults)
    fn params(&self) -> &'static [ParamSpec];

    /// Fixed wall-clock bound, not overridable by callers
    fn timeout(&self) -> Duration;

    /// Installation directory, used as the working directory
    fn install_dir(&self) -> &Path;

    /// Literal argv for an already-validated request
    fn argv(&self, request: &ToolRequest) -> Result<Vec<String>, ValidationError>;

    fn validate(&self, raw: &Map<String, Value>) -> Result<ToolRequest, ValidationError> {
        Ok(ToolRequest::new(self.kind(), validate(self.params(), raw)?))
    }

    fn build(&self, request: &ToolRequest) -> Result<CommandSpec, ValidationError> {
        Ok(CommandSpec {
            argv: self.argv(request)?,
            cwd: self.install_dir().to_path_buf(),
            timeout: self.timeout(),
        })
    }
}

/// Fetch a required string from a validated request
pub(crate) fn required_text(request: &ToolRequest, field: &'static str) -> Result<String, ValidationError> {
    request
        .text(field)
        .map(str::to_string)
        .ok_or(ValidationError::Missing { field })
}

/// Fetch a list parameter already joined with commas
pub(crate) fn required_list(request: &ToolRequest, field: &'static str) -> Result<String, ValidationError> {
    request
        .joined(field)
        .filter(|joined| !joined.is_empty())
        .ok_or(ValidationError::Missing { field })
}

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Box<dyn ToolCommand>>,
}

impl ToolRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the three supported tools wired to configured paths
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SocialMapperTool::new(
            config.python_bin.clone(),
            config.social_mapper_path.clone(),
        )));
        registry.register(Box::new(EagleEyeTool::new(
            config.python_bin.clone(),
            config.eagleeye_path.clone(),
        )));
        registry.register(Box::new(TheHarvesterTool::new(
            config.python_bin.clone(),
            config.theharvester_path.clone(),
        )));
        registry
    }

    /// Register a tool (replaces any previous one of the same kind)
    pub fn register(&mut self, tool: Box<dyn ToolCommand>) {
        self.tools.insert(tool.kind(), tool);
    }

    /// Get tool by kind
    pub fn get(&self, kind: ToolKind) -> Option<&dyn ToolCommand> {
        self.tools.get(&kind).map(|b| b.as_ref())
    }

    /// Installation presence per tool, for health reporting
    pub fn presence(&self) -> Vec<(ToolKind, PathBuf, bool)> {
        let mut entries: Vec<_> = self
            .tools
            .values()
            .map(|t| {
                let dir = t.install_dir().to_path_buf();
                let exists = dir.exists();
                (t.kind(), dir, exists)
            })
            .collect();
        entries.sort_by_key(|(kind, _, _)| *kind);
        entries
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
