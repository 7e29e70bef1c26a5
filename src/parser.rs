use serde::Deserialize;

use crate::suite::SuiteKind;

/// Contents of the optional `livros-smoke.toml`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub setup: Setup,
    #[serde(default)]
    pub probe: Probe,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Setup {
    pub base_url: Option<String>,
    pub suite: Option<SuiteKind>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Probe {
    pub attempts: Option<i64>,
    pub delay_ms: Option<i64>,
    pub timeout_ms: Option<i64>,
}
