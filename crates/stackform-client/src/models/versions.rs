use serde::{Deserialize, Serialize};

/// Version and health of one stack module, as listed by `GET /versions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub name: String,
    pub version: String,
    pub health: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    #[serde(default)]
    pub versions: Vec<ModuleVersion>,
}

impl VersionsResponse {
    /// First entry named `module`.
    pub fn module(&self, module: &str) -> Option<&ModuleVersion> {
        self.versions.iter().find(|v| v.name == module)
    }
}
