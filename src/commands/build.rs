use log::debug;

use crate::BuildArgs;

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let config_path = super::config_path(args.config_file.as_deref())?;
    let builder = super::load_builder(&config_path)?;

    let result = builder.build()?;
    for page in &result.pages {
        debug!(
            "{} -> {}",
            page.descriptor.filename,
            page.output_path.display()
        );
    }

    let display_output = result
        .output_dir
        .canonicalize()
        .unwrap_or(result.output_dir.clone());
    println!(
        "Built {} page(s) and {} asset(s) to {}",
        result.pages.len(),
        result.assets.len(),
        display_output.display()
    );

    Ok(())
}
