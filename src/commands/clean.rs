use crate::CleanArgs;

pub async fn run(args: &CleanArgs) -> Result<(), anyhow::Error> {
    let config_path = super::config_path(args.config_file.as_deref())?;
    let builder = super::load_builder(&config_path)?;

    // Delete the generated site folder
    let site_path = builder.output_dir();
    if site_path.exists() {
        if args.dry_run {
            println!("Would delete {}", site_path.display());
        } else {
            tokio::fs::remove_dir_all(&site_path).await?;
            println!("Deleted {}", site_path.display());
        }
    } else {
        println!("Nothing to clean at {}", site_path.display());
    }

    Ok(())
}
