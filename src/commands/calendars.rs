use anyhow::Result;
use calgrid_core::config::CalgridConfig;
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::session::Session;

pub async fn run(config: &CalgridConfig) -> Result<()> {
    let session = Session::open(config).await?;
    let calendars = session.screen.calendars();

    if calendars.is_empty() {
        println!("{}", "No calendars found".dimmed());
        return Ok(());
    }

    for calendar in &calendars {
        println!("{}", calendar.render());
    }

    Ok(())
}
