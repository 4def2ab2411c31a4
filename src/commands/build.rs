use crate::{
    BuildArgs,
    build::{BuildOverrides, Builder},
    config::Config,
};

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let root = super::project_root(args.project.as_deref())?;
    let config = Config::load(&root)?;

    let overrides = BuildOverrides {
        prerender: args.prerender_override(),
        static_copy: args.no_static_copy.then_some(false),
        base_path: args.base_path.clone(),
    };
    let builder = Builder::new(config, root, overrides)?;

    let result = match builder.build().await {
        Ok(result) => result,
        Err(e) => {
            if let Some(failure) = e.pipeline_failure() {
                let step = failure.state.failed_step().unwrap_or("unknown");
                eprintln!("build failed in step '{}': {}", step, failure.error.step_error());
                for diagnostic in failure.error.diagnostics() {
                    eprintln!("  {diagnostic}");
                }
                anyhow::bail!("build failed");
            }
            return Err(e.into());
        }
    };

    println!(
        "Built site to {} ({} pages, {} static files)",
        result.output_dir.display(),
        result.pages,
        result.static_files
    );
    for (step, elapsed) in &result.timings {
        println!("  {:<20} {:>8.1?}", step, elapsed);
    }
    // Parallel steps overlap, so this is not the sum of the lines above
    println!("  {:<20} {:>8.1?}", "total (wall clock)", result.total);

    Ok(())
}
