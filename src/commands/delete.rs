use anyhow::Result;
use calgrid_core::config::CalgridConfig;
use calgrid_core::screen::{Gesture, Intent};
use calgrid_core::EventId;

use crate::render::Render;
use crate::session::Session;

pub async fn run(config: &CalgridConfig, id: i64) -> Result<()> {
    let mut session = Session::open(config).await?;

    let Intent::DeleteEvent(id) = session.screen.dispatch(Gesture::LongPressEvent(EventId(id))) else {
        return Ok(());
    };

    let mut outcome = session.screen.delete_event(id).await;
    if session.should_retry(Some(&outcome)).await? {
        outcome = session.screen.delete_event(id).await;
        session.settle().await?;
    }

    if outcome.is_success() {
        println!("{}", outcome.render());
    }

    Ok(())
}
