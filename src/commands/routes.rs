use crate::RoutesArgs;

pub async fn run(args: &RoutesArgs) -> Result<(), anyhow::Error> {
    let config_path = super::config_path(args.config_file.as_deref())?;
    let builder = super::load_builder(&config_path)?;

    let plan = builder.plan()?;
    if plan.is_empty() {
        println!("No pages found in {}", builder.pages_dir().display());
        return Ok(());
    }

    for registration in plan.registrations() {
        let page = &registration.descriptor;
        let transforms: Vec<String> = registration
            .transforms
            .in_order()
            .map(|id| id.to_string())
            .collect();
        println!("{}", page.filename);
        println!("  output: {}", page.relative_output_path);
        println!("  url:    {}", page.public_url);
        println!("  chain:  {}", transforms.join(" > "));
    }
    println!(
        "{} page(s), assets served from {}",
        plan.len(),
        plan.public_path()
    );

    Ok(())
}
