use gitrank::db;
use gitrank::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&store).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
            } else {
                Migrator::up(&store, None).await?;
                println!("Applied {pending} migration(s).");
            }
        }
        MigrateAction::Down => {
            Migrator::down(&store, Some(1)).await?;
            println!("Reverted the latest migration.");
        }
        MigrateAction::Status => {
            let applied = Migrator::get_applied_migrations(&store).await?.len();
            let pending = Migrator::get_pending_migrations(&store).await?.len();
            println!("{applied} applied, {pending} pending");
            Migrator::status(&store).await?;
        }
        MigrateAction::Fresh => {
            Migrator::fresh(&store).await?;
            println!("Dropped every table and rebuilt the schema.");
        }
    }

    Ok(())
}
