use std::path::Path;

use crate::{
    InitArgs,
    commands::DEFAULT_CONFIG_FILE,
    config::{SiteConfig, SiteSettings},
};

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  {% block locals %}{% endblock locals %}
  <meta charset="utf-8">
  <title>{% if title %}{{ title }} | {% endif %}{{ site.name | default(value="") }}</title>
  <link rel="canonical" href="{{ url | safe }}">
  <link rel="stylesheet" href="{{ site.cdn_url | safe }}highlight.css">
</head>
<body>
  {% block main %}{% endblock main %}
</body>
</html>
"#;

const INDEX_PAGE: &str = r#"---
locals:
  title: Home
---
# Welcome

This page was rendered from Markdown.
"#;

const ABOUT_PAGE: &str = r#"---
locals:
  title: About
---
# About

Template pages are Markdown too, rendered inside the layout.
"#;

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            println!("Created directory {path}", path = path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    let config_file = path.join(DEFAULT_CONFIG_FILE);
    if config_file.exists() {
        return Err(anyhow::anyhow!(
            "Config file already exists: {config_file}",
            config_file = config_file.display()
        ));
    }

    let default_config = SiteConfig {
        site: SiteSettings {
            name: Some("My Pagemill Site".into()),
            ..SiteSettings::default()
        },
        ..SiteConfig::default()
    };

    println!("Initializing project in {}", path.display());

    let config_text = serde_yaml::to_string(&default_config)?;
    tokio::fs::write(&config_file, config_text).await?;
    println!(
        "Created config file {config_file}",
        config_file = config_file.display()
    );

    let templates = path.join(&default_config.templates);
    write_new(&templates.join(&default_config.layout), LAYOUT).await?;

    let pages = path.join(&default_config.pages);
    write_new(&pages.join("index.md"), INDEX_PAGE).await?;
    write_new(&pages.join("about").join("index.tera"), ABOUT_PAGE).await?;

    Ok(())
}

/// Write a scaffold file, leaving existing files untouched.
async fn write_new(path: &Path, content: &str) -> Result<(), anyhow::Error> {
    if path.exists() {
        println!("Skipped existing {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    println!("Created {}", path.display());
    Ok(())
}
