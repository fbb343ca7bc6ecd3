use anyhow::Context as _;

use crate::cli::{InitArgs, Profile};
use crate::plan_yaml;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_HEALTH_PATH: &str = "/actuator/health";

pub async fn init(args: InitArgs) -> anyhow::Result<()> {
    let root = &args.dir;
    tokio::fs::create_dir_all(root)
        .await
        .with_context(|| format!("failed to create dir: {}", root.display()))?;

    let path = root.join(&args.file);
    if !args.force && tokio::fs::try_exists(&path).await.unwrap_or(false) {
        anyhow::bail!(
            "refusing to overwrite {} (use --force to replace it)",
            path.display()
        );
    }

    let plan = scaffold_plan(args.profile)?;
    let doc = plan_yaml::doc_from_plan(&plan);
    plan_yaml::write_yaml_file(&path, &doc).await?;

    println!("wrote {}", path.display());
    println!("run it with: rampr run {}", path.display());
    Ok(())
}

fn scaffold_plan(profile: Profile) -> anyhow::Result<rampr_core::LoadPlan> {
    let catalog = rampr_core::LoadPlan::reference_catalog().context("invalid default catalog")?;

    let plan = match profile {
        Profile::Performance => rampr_core::LoadPlan::performance(DEFAULT_BASE_URL, catalog),
        Profile::Stress => rampr_core::LoadPlan::stress(DEFAULT_BASE_URL, catalog),
    }
    .context("invalid default plan")?;

    Ok(plan.with_health_path(DEFAULT_HEALTH_PATH))
}
