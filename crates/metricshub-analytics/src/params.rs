//! Report window parameters shared by the dashboard endpoints.

use std::fmt;
use std::str::FromStr;

use metricshub_cache::CacheKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DAYS: u32 = 30;
pub const MAX_DAYS: u32 = 365;
pub const DEFAULT_PROPERTY: &str = "8020rei";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    All,
    Internal,
    External,
}

impl UserType {
    pub fn as_str(self) -> &'static str {
        match self {
            UserType::All => "all",
            UserType::Internal => "internal",
            UserType::External => "external",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(UserType::All),
            "internal" => Ok(UserType::Internal),
            "external" => Ok(UserType::External),
            other => Err(ParamError::UserType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("days must be an integer between 1 and 365, got {0:?}")]
    Days(String),

    #[error("userType must be one of all, internal, external, got {0:?}")]
    UserType(String),

    #[error("property must not be empty")]
    EmptyProperty,

    #[error("property may only contain ASCII letters, digits and underscores, got {0:?}")]
    Property(String),
}

/// Reporting window: the last `days` days for one analytics property,
/// optionally restricted to internal or external users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportParams {
    pub days: u32,
    pub user_type: UserType,
    pub property: String,
}

impl Default for ReportParams {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            user_type: UserType::All,
            property: DEFAULT_PROPERTY.to_string(),
        }
    }
}

impl ReportParams {
    /// Parses query-string pairs (`days`, `userType`, `property`). Unknown
    /// keys are ignored; a repeated key keeps its last value.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ParamError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key {
                "days" => params.days = parse_days(value)?,
                "userType" | "user_type" => params.user_type = value.parse()?,
                "property" => {
                    let value = value.trim();
                    if value.is_empty() {
                        return Err(ParamError::EmptyProperty);
                    }
                    // spliced into a dataset identifier
                    if !is_identifier(value) {
                        return Err(ParamError::Property(value.to_string()));
                    }
                    params.property = value.to_string();
                }
                _ => {}
            }
        }
        Ok(params)
    }

    /// Cache key `{endpoint}-v{version}:{days}:{userType}`, with the
    /// property appended when it is not the default one.
    pub fn cache_key(&self, endpoint: &str, version: u32) -> CacheKey {
        let key = CacheKey::new(endpoint)
            .version(version)
            .param(self.days)
            .param(self.user_type);
        if self.property == DEFAULT_PROPERTY {
            key
        } else {
            key.param(&self.property)
        }
    }
}

fn is_identifier(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn parse_days(value: &str) -> Result<u32, ParamError> {
    match value.trim().parse::<u32>() {
        Ok(days) if (1..=MAX_DAYS).contains(&days) => Ok(days),
        _ => Err(ParamError::Days(value.to_string())),
    }
}
