//! `codecoach doctor`: Diagnose configuration and upstream reachability.

use std::path::Path;

use codecoach_core::Provider;
use codecoach_providers::OpenAiCompatProvider;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Code Coach Doctor");
    println!("=================\n");

    let mut issues = 0;

    let config = match super::load_unvalidated(config_path) {
        Ok(config) => {
            println!("  ok    Config loaded");
            config
        }
        Err(e) => {
            println!("  FAIL  Config could not be loaded: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ok    OPENAI_API_KEY is set");
    } else {
        println!("  FAIL  OPENAI_API_KEY is not set; the server will refuse to start");
        issues += 1;
    }

    match config.validate() {
        Ok(()) => println!("  ok    Settings valid (model {})", config.model),
        Err(e) => {
            // A missing key was already reported
            if config.has_api_key() {
                println!("  FAIL  {e}");
                issues += 1;
            }
        }
    }

    if config.has_api_key() {
        match OpenAiCompatProvider::from_config(&config) {
            Ok(provider) => match provider.health_check().await {
                Ok(true) => println!("  ok    Upstream reachable at {}", config.api_url),
                Ok(false) => {
                    println!("  WARN  Upstream at {} answered but rejected the check", config.api_url);
                    issues += 1;
                }
                Err(e) => {
                    println!("  FAIL  Upstream unreachable: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  FAIL  HTTP client could not be built: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
