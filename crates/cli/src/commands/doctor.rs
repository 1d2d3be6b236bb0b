//! `shiksha doctor`: Diagnose system health.

use super::{CliResult, open_catalog, open_vector_store};
use shiksha_config::AppConfig;

pub async fn run() -> CliResult {
    println!("🩺 Shiksha Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — using defaults (run `shiksha onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    // Providers
    for (name, section) in [("Primary", &config.primary), ("Fallback", &config.fallback)] {
        if section.is_configured() {
            println!("  ✅ {name} provider configured ({})", section.model);
        } else {
            println!("  ⚠️  {name} provider has no api_key");
        }
    }
    if !config.has_any_provider() {
        println!("  ❌ No LLM provider configured — every reply would be the apology message");
        issues += 1;
    }

    // Curriculum catalog
    match open_catalog(&config) {
        Ok(catalog) => println!(
            "  ✅ Curriculum catalog loaded ({} textbooks)",
            catalog.textbooks().len()
        ),
        Err(e) => {
            println!("  ⚠️  Curriculum catalog unavailable: {e}");
            issues += 1;
        }
    }

    // Vector store
    match open_vector_store(&config).await {
        Ok(store) => match store.list_collections().await {
            Ok(collections) => {
                println!(
                    "  ✅ Vector store '{}' open ({} collections)",
                    store.name(),
                    collections.len()
                );
                if !collections.contains(&config.vector_store.pedagogy_collection_name) {
                    println!(
                        "  ⚠️  Pedagogy collection '{}' not indexed yet",
                        config.vector_store.pedagogy_collection_name
                    );
                }
            }
            Err(e) => {
                println!("  ❌ Vector store unreadable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Reachability
    if let Ok(dispatcher) = shiksha_providers::build_dispatcher(&config) {
        let health = dispatcher.health_check().await;
        for (name, state) in [("Primary", health.primary), ("Fallback", health.fallback)] {
            match state {
                Some(true) => println!("  ✅ {name} provider reachable"),
                Some(false) => {
                    println!("  ❌ {name} provider unreachable");
                    issues += 1;
                }
                None => {}
            }
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
