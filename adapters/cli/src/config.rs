use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use castaway_system_genmap::GenerationTuning;

const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    version: u32,
    #[serde(default)]
    generation: GenerationTuning,
}

/// Reads generator tuning from `path`, or the defaults when no file is given.
pub(crate) fn load_tuning(path: Option<&Path>) -> Result<GenerationTuning> {
    let Some(path) = path else {
        return Ok(GenerationTuning::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid config file {}", path.display()))
}

fn parse_config(contents: &str) -> Result<GenerationTuning> {
    let config: ConfigFile =
        toml::from_str(contents).context("failed to parse config toml contents")?;
    if config.version != SUPPORTED_CONFIG_VERSION {
        bail!(
            "unsupported config version {}; expected {}",
            config.version,
            SUPPORTED_CONFIG_VERSION
        );
    }

    let tuning = config.generation;
    if !(0.0..=1.0).contains(&tuning.land_probability) {
        bail!(
            "land_probability must lie in 0..=1, got {}",
            tuning.land_probability
        );
    }
    Ok(tuning)
}
