use crate::{CleanArgs, config::Config};

pub async fn run(args: &CleanArgs) -> Result<(), anyhow::Error> {
    let root = super::project_root(args.project.as_deref())?;
    let config = Config::load(&root)?;

    // Delete the generated site folder
    let site_path = root.join(&config.paths.output);
    if !site_path.exists() {
        println!("Nothing to clean at {}", site_path.display());
        return Ok(());
    }
    if root.starts_with(&site_path) {
        anyhow::bail!(
            "refusing to delete {}: it contains the project",
            site_path.display()
        );
    }

    if args.dry_run {
        println!("Would delete {}", site_path.display());
    } else {
        tokio::fs::remove_dir_all(&site_path).await?;
        println!("Deleted {}", site_path.display());
    }

    Ok(())
}
