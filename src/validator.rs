use std::time::Duration;

use miette::Diagnostic;
use miette::NamedSource;
use miette::SourceSpan;
use thiserror::Error;
use url::Url;

use crate::parser::Settings;
use crate::probe::ProbePolicy;
use crate::suite::SuiteKind;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/livros";

// Error messages for parsing URLs
const BASE_URL_ENDS_WITH: &str =
    "The base URL can't end with a /, it must point at the collection, e.g. http://localhost:3000/api/livros";

/// Everything a run needs, checked and typed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub base_url: Url,
    pub suite: SuiteKind,
    pub probe: ProbePolicy,
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub suite: Option<SuiteKind>,
}

pub struct Validator {
    settings: Settings,
    toml_src: String,
    file_name: String,
}

#[derive(Debug, Error, Diagnostic)]
#[error("Invalid field `{field}`: {message}")]
pub struct ValidationError {
    field: String,
    message: String,
    #[source_code]
    src: Option<NamedSource<String>>,
    #[label("invalid value here")]
    span: Option<SourceSpan>,
}

macro_rules! validation_err {
    ($field:expr, $msg:expr, $self:expr, $span:expr) => {
        ValidationError {
            field: $field.to_string(),
            message: $msg.to_string(),
            src: Some(NamedSource::new(
                $self.file_name.clone(),
                $self.toml_src.clone(),
            )),
            span: $span,
        }
    };
}

impl Validator {
    pub fn new(settings: &Settings, toml_src: &str, file_name: &str) -> Self {
        Self {
            settings: settings.clone(),
            toml_src: toml_src.into(),
            file_name: file_name.into(),
        }
    }

    pub fn validate(&self, overrides: &Overrides) -> miette::Result<RunConfig, ValidationError> {
        let base_url = self.validate_base_url(overrides)?;

        let suite = overrides
            .suite
            .or(self.settings.setup.suite)
            .unwrap_or_default();

        let probe = self.validate_probe(suite.probe_policy())?;

        Ok(RunConfig {
            base_url,
            suite,
            probe,
        })
    }

    fn validate_base_url(&self, overrides: &Overrides) -> Result<Url, ValidationError> {
        if let Some(raw) = &overrides.base_url {
            return parse_url(raw).map_err(|e| ValidationError {
                field: "--base-url".into(),
                message: e.to_string(),
                src: None,
                span: None,
            });
        }

        match &self.settings.setup.base_url {
            Some(raw) => parse_url(raw).map_err(|e| {
                validation_err!(
                    "setup.base_url",
                    e,
                    self,
                    find_value_span(&self.toml_src, raw)
                )
            }),
            None => parse_url(DEFAULT_BASE_URL).map_err(|e| ValidationError {
                field: "base_url".into(),
                message: e.to_string(),
                src: None,
                span: None,
            }),
        }
    }

    fn validate_probe(&self, mut policy: ProbePolicy) -> Result<ProbePolicy, ValidationError> {
        let probe = &self.settings.probe;

        if let Some(attempts) = probe.attempts {
            policy.attempts = u32::try_from(attempts)
                .ok()
                .filter(|a| *a >= 1)
                .ok_or_else(|| {
                    validation_err!(
                        "probe.attempts",
                        format!("must be at least 1, got {attempts}"),
                        self,
                        find_key_span(&self.toml_src, "attempts")
                    )
                })?;
        }

        if let Some(delay_ms) = probe.delay_ms {
            let delay_ms = u64::try_from(delay_ms).map_err(|_| {
                validation_err!(
                    "probe.delay_ms",
                    format!("can't be negative, got {delay_ms}"),
                    self,
                    find_key_span(&self.toml_src, "delay_ms")
                )
            })?;
            policy.delay = Duration::from_millis(delay_ms);
        }

        if let Some(timeout_ms) = probe.timeout_ms {
            let timeout_ms = u64::try_from(timeout_ms)
                .ok()
                .filter(|t| *t >= 1)
                .ok_or_else(|| {
                    validation_err!(
                        "probe.timeout_ms",
                        format!("must be at least 1, got {timeout_ms}"),
                        self,
                        find_key_span(&self.toml_src, "timeout_ms")
                    )
                })?;
            policy.timeout = Duration::from_millis(timeout_ms);
        }

        Ok(policy)
    }
}

#[derive(Debug, Error, PartialEq)]
enum ParseUrlError {
    #[error("{}", BASE_URL_ENDS_WITH)]
    EndsWithSlash,
    #[error("The base URL can't carry a query string or a fragment")]
    QueryOrFragment,
    #[error("The base URL must use http or https, got `{0}`")]
    UnsupportedScheme(String),
    #[error("Failed to parse URL: {0}")]
    ParseIntoUrlFailed(#[from] url::ParseError),
}

fn parse_url(base_url: &str) -> Result<Url, ParseUrlError> {
    if base_url.ends_with('/') {
        return Err(ParseUrlError::EndsWithSlash);
    }

    let url = Url::parse(base_url)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ParseUrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(ParseUrlError::QueryOrFragment);
    }

    // A bare host parses with a `/` path.
    if url.as_str().ends_with('/') {
        return Err(ParseUrlError::EndsWithSlash);
    }

    Ok(url)
}

fn find_value_span(toml_src: &str, value: &str) -> Option<SourceSpan> {
    toml_src
        .find(value)
        .map(|start| SourceSpan::new(start.into(), value.len()))
}

fn find_key_span(toml_src: &str, key: &str) -> Option<SourceSpan> {
    let start = toml_src.find(key)?;
    Some(SourceSpan::new(start.into(), key.len()))
}
