// theHarvester - domain reconnaissance (emails, hosts, subdomains)

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ValidationError;
use crate::tools::registry::{required_list, required_text, ParamKind, ParamSpec, ToolCommand};
use crate::tools::types::{ToolKind, ToolRequest};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("domain", ParamKind::Text),
    ParamSpec::optional("sources", ParamKind::TextList, default_sources),
    ParamSpec::optional("limit", ParamKind::Integer, default_limit),
];

fn default_sources() -> Value {
    json!(["google", "bing"])
}

fn default_limit() -> Value {
    json!(500)
}

pub struct TheHarvesterTool {
    python_bin: String,
    install_dir: PathBuf,
}

impl TheHarvesterTool {
    pub fn new(python_bin: String, install_dir: PathBuf) -> Self {
        Self {
            python_bin,
            install_dir,
        }
    }
}

impl ToolCommand for TheHarvesterTool {
    fn kind(&self) -> ToolKind {
        ToolKind::TheHarvester
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(300)
    }

    fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    fn argv(&self, request: &ToolRequest) -> Result<Vec<String>, ValidationError> {
        let limit = request
            .integer("limit")
            .ok_or(ValidationError::Missing { field: "limit" })?;

        Ok(vec![
            self.python_bin.clone(),
            "theHarvester.py".to_string(),
            "-d".to_string(),
            required_text(request, "domain")?,
            "-b".to_string(),
            required_list(request, "sources")?,
            "-l".to_string(),
            limit.to_string(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> TheHarvesterTool {
        TheHarvesterTool::new("python3".to_string(), PathBuf::from("/app/tools/theharvester"))
    }

    #[test]
    fn test_domain_only_uses_defaults() {
        let tool = tool();
        let request = tool
            .validate(json!({"domain": "example.com"}).as_object().unwrap())
            .unwrap();
        let command = tool.build(&request).unwrap();

        assert_eq!(
            command.argv,
            vec!["python3", "theHarvester.py", "-d", "example.com", "-b", "google,bing", "-l", "500"]
        );
        assert_eq!(command.cwd, PathBuf::from("/app/tools/theharvester"));
        assert_eq!(command.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_explicit_sources_and_limit() {
        let tool = tool();
        let body = json!({"domain": "example.com", "sources": ["crtsh", "dnsdumpster", "otx"], "limit": 50});
        let request = tool.validate(body.as_object().unwrap()).unwrap();
        let argv = tool.build(&request).unwrap().argv;

        assert!(argv.windows(2).any(|w| w == ["-b", "crtsh,dnsdumpster,otx"]));
        assert!(argv.windows(2).any(|w| w == ["-l", "50"]));
    }

    #[test]
    fn test_domain_is_a_single_argument() {
        let tool = tool();
        let body = json!({"domain": "example.com; rm -rf /"});
        let request = tool.validate(body.as_object().unwrap()).unwrap();
        let argv = tool.build(&request).unwrap().argv;

        assert_eq!(argv[3], "example.com; rm -rf /");
        assert_eq!(argv.len(), 8);
    }

    #[test]
    fn test_missing_domain() {
        let err = tool()
            .validate(&serde_json::Map::<String, Value>::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "domain is required");
    }
}
