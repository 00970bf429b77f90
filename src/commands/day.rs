use anyhow::Result;
use calgrid_core::config::CalgridConfig;
use calgrid_core::date_range::parse_date;

use crate::render::render_day;
use crate::session::Session;

pub async fn run(config: &CalgridConfig, date: Option<&str>) -> Result<()> {
    let date = date.map(parse_date).transpose()?;

    let mut session = Session::open(config).await?;
    if let Some(date) = date {
        session.select(date).await?;
    }

    let tz = session.screen.settings().timezone;
    println!(
        "{}",
        render_day(session.screen.selected(), &session.screen.day_list(), &tz)
    );

    Ok(())
}
