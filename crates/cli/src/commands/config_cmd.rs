//! `codecoach config`: Print the effective configuration.

use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_unvalidated(config_path)?;

    println!("# Effective configuration (file + environment)");
    println!("{}", config.to_redacted_toml());

    if let Err(e) = config.validate() {
        println!("# warning: {e}");
    }

    Ok(())
}
