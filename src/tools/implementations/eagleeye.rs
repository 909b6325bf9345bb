// EagleEye - reverse image search across search engines

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ValidationError;
use crate::tools::registry::{required_list, required_text, ParamKind, ParamSpec, ToolCommand};
use crate::tools::types::{ToolKind, ToolRequest};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("imagePath", ParamKind::Text),
    ParamSpec::optional("engines", ParamKind::TextList, default_engines),
];

fn default_engines() -> Value {
    json!(["google", "yandex", "bing"])
}

pub struct EagleEyeTool {
    python_bin: String,
    install_dir: PathBuf,
}

impl EagleEyeTool {
    pub fn new(python_bin: String, install_dir: PathBuf) -> Self {
        Self {
            python_bin,
            install_dir,
        }
    }
}

impl ToolCommand for EagleEyeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::EagleEye
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
        Ok(vec![
            self.python_bin.clone(),
            "eagleeye.py".to_string(),
            "--image".to_string(),
            required_text(request, "imagePath")?,
            "--engines".to_string(),
            required_list(request, "engines")?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engines() {
        let tool = EagleEyeTool::new("python3".to_string(), PathBuf::from("/app/tools/eagleeye"));
        let request = tool
            .validate(json!({"imagePath": "/app/uploads/abc.jpg"}).as_object().unwrap())
            .unwrap();
        let command = tool.build(&request).unwrap();

        assert_eq!(
            command.argv,
            vec!["python3", "eagleeye.py", "--image", "/app/uploads/abc.jpg", "--engines", "google,yandex,bing"]
        );
        assert_eq!(command.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_engines_must_be_a_list() {
        let tool = EagleEyeTool::new("python3".to_string(), PathBuf::from("/app/tools/eagleeye"));
        let err = tool
            .validate(json!({"imagePath": "/a.jpg", "engines": "google"}).as_object().unwrap())
            .unwrap_err();
        assert_eq!(err.field(), Some("engines"));
    }
}
