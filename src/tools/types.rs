// Core types for tool dispatch
//
// Request/response envelopes shared by the dispatcher, the cache and the HTTP layer

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Normalized parameter mapping (keys are kept sorted)
pub type Params = BTreeMap<String, Value>;

/// Closed set of external tools the gateway can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolKind {
    /// Social Mapper - face recognition across social networks
    #[serde(rename = "social-mapper")]
    SocialMapper,
    /// EagleEye - reverse image search
    #[serde(rename = "eagleeye")]
    EagleEye,
    /// theHarvester - domain reconnaissance
    #[serde(rename = "theharvester")]
    TheHarvester,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::SocialMapper,
        ToolKind::EagleEye,
        ToolKind::TheHarvester,
    ];

    /// Identifier used in routes, responses and fingerprints
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::SocialMapper => "social-mapper",
            ToolKind::EagleEye => "eagleeye",
            ToolKind::TheHarvester => "theharvester",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

/// A validated request for one tool
///
/// Built from the default-filled parameter set, so two requests that only
/// differ in omitted-vs-explicit defaults are the same request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    tool: ToolKind,
    params: Params,
}

impl ToolRequest {
    pub fn new(tool: ToolKind, params: Params) -> Self {
        Self { tool, params }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// String parameter (validated requests always carry required ones)
    pub fn text(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// List parameter joined with the tools' comma delimiter
    pub fn joined(&self, name: &str) -> Option<String> {
        let items = self.params.get(name)?.as_array()?;
        let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
        Some(parts.join(","))
    }

    pub fn integer(&self, name: &str) -> Option<u64> {
        self.params.get(name).and_then(Value::as_u64)
    }
}

/// Fully resolved subprocess invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Literal argument vector; argv[0] is the executable
    pub argv: Vec<String>,
    /// Working directory for the child process
    pub cwd: PathBuf,
    /// Wall-clock bound for the whole run
    pub timeout: Duration,
}

impl CommandSpec {
    /// Printable form for logs only (never executed through a shell)
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// API-facing result envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool: ToolKind,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    pub fn success(tool: ToolKind, results: String) -> Self {
        Self {
            tool,
            success: true,
            results: Some(results),
            error: None,
        }
    }

    pub fn failure(tool: ToolKind, error: String) -> Self {
        Self {
            tool,
            success: false,
            results: None,
            error: Some(error),
        }
    }
}
