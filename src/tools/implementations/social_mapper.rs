// Social Mapper - locates social media profiles by face recognition
//
// Slowest of the three tools, so it gets the largest time bound.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ValidationError;
use crate::tools::registry::{required_list, required_text, ParamKind, ParamSpec, ToolCommand};
use crate::tools::types::{ToolKind, ToolRequest};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("imagePath", ParamKind::Text),
    ParamSpec::optional("platforms", ParamKind::TextList, default_platforms),
];

fn default_platforms() -> Value {
    json!(["linkedin", "facebook", "twitter"])
}

pub struct SocialMapperTool {
    python_bin: String,
    install_dir: PathBuf,
}

impl SocialMapperTool {
    pub fn new(python_bin: String, install_dir: PathBuf) -> Self {
        Self {
            python_bin,
            install_dir,
        }
    }
}

impl ToolCommand for SocialMapperTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SocialMapper
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(600)
    }

    fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    fn argv(&self, request: &ToolRequest) -> Result<Vec<String>, ValidationError> {
        Ok(vec![
            self.python_bin.clone(),
            "social_mapper.py".to_string(),
            "-f".to_string(),
            required_text(request, "imagePath")?,
            "-m".to_string(),
            "fast".to_string(),
            "-a".to_string(),
            required_list(request, "platforms")?,
        ])
    }
}
