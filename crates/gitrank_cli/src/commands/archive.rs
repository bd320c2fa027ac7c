use gitrank::archive::ArchiveManager;

use crate::ArchiveAction;
use crate::config::Config;

pub(crate) fn handle_archive(
    action: &ArchiveAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = ArchiveManager::new(&config.output.data_dir);

    match action {
        ArchiveAction::Reindex => {
            let index = manager.rebuild_index()?;
            println!(
                "Indexed {} day(s) into {}",
                index.len(),
                manager.index_path().display()
            );
            if let (Some(first), Some(last)) = (index.dates().next(), index.dates().last()) {
                println!("Range: {first} .. {last}");
            }
        }
    }

    Ok(())
}
