//! `pawline onboard`: first-time setup.

use pawline_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Pawline setup");
    println!("=============\n");

    if !config_dir.exists() {
        tokio::fs::create_dir_all(&config_dir).await?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run onboard.\n");
        return Ok(());
    }

    tokio::fs::write(&config_path, AppConfig::default_toml()).await?;
    println!("Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set PAWLINE_API_KEY (or api_key in {})", config_path.display());
    println!("  2. Point retrieval.seed_file at a JSON list of dogs");
    println!("  3. Run: pawline scheduler");
    println!("  4. In another shell: pawline chat --session <name>\n");

    Ok(())
}
