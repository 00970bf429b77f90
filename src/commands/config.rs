use std::path::Path;

use anyhow::Result;
use calgrid_core::config::CalgridConfig;
use owo_colors::OwoColorize;

pub fn run(config_path: &Path, config: &CalgridConfig) -> Result<()> {
    let store_path = config.store_path()?;

    println!("{}", "Paths".bold());
    println!("  Config:  {}", config_path.display());
    println!("  Store:   {}", store_path.display());

    println!();
    println!("{}", "Settings".bold());
    println!("  Time zone:        {}", config.timezone()?);
    println!("  Week starts on:   {}", config.week_start);
    println!(
        "  Event duration:   {}",
        humantime::format_duration(config.event_duration()?.to_std()?)
    );
    match config.default_calendar() {
        Some(id) => println!("  Default calendar: {id}"),
        None => println!("  Default calendar: {}", "first calendar".dimmed()),
    }

    Ok(())
}
