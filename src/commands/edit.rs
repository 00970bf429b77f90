use anyhow::Result;
use calgrid_core::config::CalgridConfig;
use calgrid_core::screen::{Gesture, Intent};
use calgrid_core::EventId;
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::session::Session;

pub async fn run(config: &CalgridConfig, id: i64, title: &str) -> Result<()> {
    let mut session = Session::open(config).await?;

    let Intent::EditEvent(id) = session.screen.dispatch(Gesture::TapEvent(EventId(id))) else {
        return Ok(());
    };

    let mut outcome = session.screen.edit_event(id, title).await;
    if session.should_retry(outcome.as_ref()).await? {
        outcome = session.screen.edit_event(id, title).await;
        session.settle().await?;
    }

    match outcome {
        Some(outcome) if outcome.is_success() => println!("{}", outcome.render()),
        Some(_) => {}
        None => println!("{}", "Title cannot be empty".yellow()),
    }

    Ok(())
}
