use anyhow::Result;
use calgrid_core::config::CalgridConfig;
use calgrid_core::store::Permissions;
use owo_colors::OwoColorize;

use crate::session::open_store;

pub async fn run(config: &CalgridConfig, grant: bool) -> Result<()> {
    let store = open_store(config).await?;

    if grant {
        store.set_permissions(Permissions::ALL).await?;
        println!("{}", "Calendar access granted".green());
    } else {
        store.set_permissions(Permissions::NONE).await?;
        println!("{}", "Calendar access revoked".yellow());
    }

    Ok(())
}
