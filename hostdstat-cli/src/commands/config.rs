//! Effective configuration command.

use std::path::Path;

use hostdstat_core::Settings;

use crate::error::CliError;
use crate::util::load_settings;

/// Print the merged configuration as TOML
pub fn cmd_config(config_path: Option<&Path>) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    match config_path.map(Path::to_path_buf).or_else(Settings::default_path) {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory, showing defaults"),
    }
    print!("{}", settings.to_toml()?);
    Ok(())
}
