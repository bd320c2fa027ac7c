use chrono::Utc;
use gitrank::archive::ArchiveManager;
use gitrank::connect_and_migrate;
use gitrank::delta;

use crate::config::Config;

pub(crate) async fn handle_deltas(
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = connect_and_migrate(database_url).await?;
    let archive = ArchiveManager::new(&config.output.data_dir);
    let today = Utc::now().date_naive();

    for report in delta::compute_all(&db, &archive, today).await? {
        match report.baseline {
            Some(baseline) if report.snapshot_found => println!(
                "{:>4}: {} repositories updated against {} ({} not in store, {} malformed)",
                report.window.to_string(),
                report.updated,
                baseline,
                report.archived_only,
                report.malformed,
            ),
            Some(baseline) => println!(
                "{:>4}: no snapshot archived for {}",
                report.window.to_string(),
                baseline
            ),
            None => println!("{:>4}: baseline date out of range", report.window.to_string()),
        }
    }

    Ok(())
}
