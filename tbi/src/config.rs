use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spinbot::evaluation::WeightProfile;

const HEADER: &str = "\
# Settings for the tbi adapter. Delete this file to get the defaults back.
#
# profile is one of: default, right_well_flat, stable_stack, cc_standard_like, cc_fast_like
";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub verbose: bool,
    pub engine: spinbot::Options,
}

/// Reads the config file, writing the defaults out first if it doesn't exist. The flag is true
/// when the file was created.
pub fn load_config(path: &Path) -> Result<(Config, bool)> {
    match std::fs::read_to_string(path) {
        Ok(options) => {
            let config = serde_yaml::from_str(&options)
                .with_context(|| format!("malformed config file {}", path.display()))?;
            Ok((config, false))
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                let ser = serde_yaml::to_string(&Config::default())?;
                let mut s = HEADER.to_owned();
                s.push_str(&ser);
                std::fs::write(path, &s)
                    .with_context(|| format!("couldn't write {}", path.display()))?;
                Ok((Config::default(), true))
            } else {
                Err(e).with_context(|| format!("couldn't read {}", path.display()))
            }
        }
    }
}

/// Reads a JSON weight profile, checking that it has every coefficient.
pub fn load_weights(path: &Path) -> Result<WeightProfile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("couldn't read {}", path.display()))?;
    let profile: WeightProfile = serde_json::from_str(&text)
        .with_context(|| format!("malformed weight profile {}", path.display()))?;
    profile
        .to_weights()
        .with_context(|| format!("bad weight profile {}", path.display()))?;
    Ok(profile)
}
