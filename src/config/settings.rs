// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tools::ToolKind;

/// Default shared secret; startup warns when it is still in use
pub const DEFAULT_API_KEY: &str = "secret-key-change-me";

/// Which store backs the result cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
    Disabled,
}

/// Gateway configuration
///
/// Field names double as (case-insensitive) environment variable names,
/// e.g. `REDIS_HOST` sets `redis_host`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Shared secret expected in `X-API-Key` or `?api_key=`
    pub api_key: String,

    /// Listen host
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Interpreter used to launch the tools
    pub python_bin: String,

    /// Social Mapper installation directory
    pub social_mapper_path: PathBuf,

    /// EagleEye installation directory
    pub eagleeye_path: PathBuf,

    /// theHarvester installation directory
    pub theharvester_path: PathBuf,

    /// Where uploaded images are stored
    pub uploads_dir: PathBuf,

    /// Scratch directory for tool output
    pub results_dir: PathBuf,

    pub cache_backend: CacheBackend,
    pub redis_host: String,
    pub redis_port: u16,

    /// Request body limit for `/api/upload`
    pub max_upload_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            python_bin: "python3".to_string(),
            social_mapper_path: PathBuf::from("/app/tools/social-mapper"),
            eagleeye_path: PathBuf::from("/app/tools/eagleeye"),
            theharvester_path: PathBuf::from("/app/tools/theharvester"),
            uploads_dir: PathBuf::from("/app/uploads"),
            results_dir: PathBuf::from("/app/results"),
            cache_backend: CacheBackend::Redis,
            redis_host: "redis".to_string(),
            redis_port: 6379,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl GatewayConfig {
    /// Bind address for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }

    /// Installation directory of a tool
    pub fn tool_path(&self, tool: ToolKind) -> &PathBuf {
        match tool {
            ToolKind::SocialMapper => &self.social_mapper_path,
            ToolKind::EagleEye => &self.eagleeye_path,
            ToolKind::TheHarvester => &self.theharvester_path,
        }
    }

    pub fn uses_default_api_key(&self) -> bool {
        self.api_key == DEFAULT_API_KEY
    }
}
