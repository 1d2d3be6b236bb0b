//! `shiksha onboard`: First-time setup.

use super::CliResult;
use shiksha_config::AppConfig;

pub async fn run() -> CliResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("📚 Shiksha — First-Time Setup");
    println!("=============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());

    let defaults = AppConfig::default();
    println!("\n📝 Next steps:");
    println!(
        "   1. Add a primary or fallback api_key to {} (or set PRIMARY_PROVIDER_KEY / FALLBACK_PROVIDER_KEY)",
        config_path.display()
    );
    println!(
        "   2. Place the curriculum catalog at {}",
        defaults.curriculum.resolved_path().display()
    );
    println!("   3. Run: shiksha doctor");
    println!("   4. Run: shiksha tutor --topic \"Real Numbers\" --subject Mathematics --grade 10\n");

    Ok(())
}
