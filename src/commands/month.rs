use anyhow::Result;
use calgrid_core::config::CalgridConfig;
use calgrid_core::date_range::{first_of_month, parse_date, parse_month};

use crate::render::{render_day, render_month};
use crate::session::Session;

pub async fn run(config: &CalgridConfig, month: Option<&str>, select: Option<&str>) -> Result<()> {
    let month = month.map(parse_month).transpose()?;
    let select = select.map(parse_date).transpose()?;

    if let (Some(month), Some(day)) = (month, select) {
        if first_of_month(day) != month {
            anyhow::bail!(
                "{} is not in {}",
                day.format("%Y-%m-%d"),
                month.format("%Y-%m")
            );
        }
    }

    let mut session = Session::open(config).await?;

    match (month, select) {
        (_, Some(day)) => session.select(day).await?,
        (Some(month), None) => session.show_month(month).await?,
        (None, None) => {}
    }

    let tz = session.screen.settings().timezone;
    println!("{}", render_month(&session.screen));
    println!();
    println!(
        "{}",
        render_day(session.screen.selected(), &session.screen.day_list(), &tz)
    );

    Ok(())
}
