use crate::config::ExtractorConfig;
use crate::errors::ExtractorResult;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "apexlog.toml";
pub const ENV_PREFIX: &str = "APEXLOG_";

/// Defaults, then the TOML file (if present), then `APEXLOG_*` variables.
pub fn figment(path: Option<&Path>) -> Figment {
    let file = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("APEXLOG_CONFIG").map(Into::into))
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());

    Figment::from(Serialized::defaults(ExtractorConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["CONFIG"]).split("__"))
}

pub fn load_config(path: Option<&Path>) -> ExtractorResult<ExtractorConfig> {
    let config: ExtractorConfig = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}
