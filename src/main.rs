mod config;
mod tasks;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use huntdraw_artifact::{FsStore, Store};
use huntdraw_compiler::TaskChainCompiler;
use huntdraw_config::GraphDef;
use huntdraw_draw::{
  DrawConfig, DrawMetrics, DrawSort, read_applicants, read_hunt_codes, run_draw, write_applicants,
  write_hunt_codes, write_metrics,
};
use huntdraw_engine::ExecutionStatus;
use huntdraw_orchestrator::{BuildContext, BuildOrchestrator};
use huntdraw_store::{EntityStore, SqliteStore, WorkflowInstance, WorkflowJob};

use crate::config::AppConfig;

/// Huntdraw - compile draw workflows and run permit draws
#[derive(Parser)]
#[command(name = "huntdraw")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.huntdraw)
  #[arg(long, global = true, env = "HUNTDRAW_DATA_DIR")]
  data_dir: Option<PathBuf>,

  /// SQLite database URL (default: sqlite://<data-dir>/huntdraw.db)
  #[arg(long, global = true, env = "HUNTDRAW_DATABASE_URL")]
  database_url: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile a workflow graph and print the task-chain definition
  Compile {
    /// Path to the graph file (JSON nodes, edges and documents)
    graph_file: PathBuf,
  },

  /// Build a workflow instance from a graph and trigger one job
  Build {
    /// Path to the graph file (JSON nodes, edges and documents)
    graph_file: PathBuf,

    #[arg(long, default_value = "default")]
    organization: String,

    #[arg(long, default_value = "draw")]
    workflow: String,
  },

  /// Run a draw over local files
  Draw {
    #[arg(long)]
    hunt_codes: PathBuf,

    #[arg(long)]
    applicants: PathBuf,

    /// Draw config JSON
    #[arg(long)]
    config: PathBuf,

    /// Draw sort JSON (default: the config's sortRef, relative to the config)
    #[arg(long)]
    sort: Option<PathBuf>,

    /// Directory the result CSVs are written to
    #[arg(long, default_value = ".")]
    out: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".huntdraw"),
  };

  match cli.command {
    Some(Commands::Compile { graph_file }) => compile(&graph_file, &data_dir)?,
    Some(Commands::Build {
      graph_file,
      organization,
      workflow,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(build(
        &graph_file,
        &data_dir,
        cli.database_url,
        organization,
        workflow,
      ))?;
    }
    Some(Commands::Draw {
      hunt_codes,
      applicants,
      config,
      sort,
      out,
    }) => draw(&hunt_codes, &applicants, &config, sort.as_deref(), &out)?,
    None => {
      println!("huntdraw - use --help to see available commands");
    }
  }

  Ok(())
}

fn read_graph(graph_file: &Path) -> Result<GraphDef> {
  let content = std::fs::read_to_string(graph_file)
    .with_context(|| format!("failed to read graph file: {}", graph_file.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse graph file: {}", graph_file.display()))
}

fn compile(graph_file: &Path, data_dir: &Path) -> Result<()> {
  let graph = read_graph(graph_file)?;
  let config = AppConfig::load(data_dir)?;
  let compiler = TaskChainCompiler::new(config.registry()?);

  let definition = compiler
    .compile(&graph.nodes, &graph.edges, &graph.documents)
    .with_context(|| format!("failed to compile {}", graph_file.display()))?;

  eprintln!("Compiled {} tasks", definition.len());
  println!("{}", serde_json::to_string_pretty(&definition)?);
  Ok(())
}

async fn build(
  graph_file: &Path,
  data_dir: &Path,
  database_url: Option<String>,
  organization: String,
  workflow: String,
) -> Result<()> {
  let graph = read_graph(graph_file)?;
  let config = AppConfig::load(data_dir)?;
  let registry = config.registry()?;

  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
  let database_url =
    database_url.unwrap_or_else(|| format!("sqlite://{}", data_dir.join("huntdraw.db").display()));
  let store = Arc::new(
    SqliteStore::connect(&database_url)
      .await
      .with_context(|| format!("failed to open database: {}", database_url))?,
  );
  let blobs: Arc<dyn Store> = Arc::new(FsStore::new(data_dir.join("blobs")));

  // Documents whose key names a file next to the graph are uploaded first.
  let graph_dir = graph_file.parent().unwrap_or(Path::new("."));
  for document in &graph.documents {
    let path = graph_dir.join(&document.key);
    if !path.is_file() {
      continue;
    }
    let data = tokio::fs::read(&path)
      .await
      .with_context(|| format!("failed to read document: {}", path.display()))?;
    tasks::upload(blobs.as_ref(), &document.key, data, &document.content_type)
      .await
      .with_context(|| format!("failed to upload document: {}", document.key))?;
    info!(key = %document.key, "uploaded document");
  }

  let instance = WorkflowInstance::new(&organization, &workflow);
  store.save_instance(&instance).await?;
  store.save_graph(&instance.id, &graph).await?;
  let job = WorkflowJob::new(&instance.id);
  store.save_job(&job).await?;

  let engine = Arc::new(tasks::local_engine(blobs.clone(), &registry, 1));
  let poll_interval = config.orchestrator.poll_interval;
  let orchestrator = BuildOrchestrator::new(
    store.clone(),
    blobs,
    engine.clone(),
    TaskChainCompiler::new(registry),
    config.orchestrator,
  );

  let cancel = CancellationToken::new();
  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      ctrl_c.cancel();
    }
  });

  let ctx = BuildContext::new(&organization, &workflow, &instance.id).with_job(&job.id);
  let outcome = match orchestrator.build(&ctx, &cancel).await {
    Ok(outcome) => outcome,
    Err(err) => {
      for log in store.list_job_logs(&job.id).await.unwrap_or_default() {
        eprintln!("job log: {} {}", log.message_key, log.params.0);
      }
      return Err(err).context("build failed");
    }
  };
  eprintln!("Instance {} ready", instance.id);

  let Some(execution) = outcome.execution_handle else {
    return Ok(());
  };
  eprintln!("Started execution {}", execution);

  let status = engine
    .wait_for_execution(&execution, poll_interval)
    .await
    .context("failed to poll execution")?;
  match status {
    ExecutionStatus::Succeeded => {
      let output = engine
        .take_execution_output(&execution)
        .await
        .unwrap_or_default();
      println!("{}", serde_json::to_string_pretty(&output)?);
      Ok(())
    }
    ExecutionStatus::Failed { error } => bail!("execution failed: {}", error),
    ExecutionStatus::Running => {
      warn!(%execution, "execution still running");
      Ok(())
    }
  }
}

fn draw(
  hunt_codes: &Path,
  applicants: &Path,
  config_file: &Path,
  sort_file: Option<&Path>,
  out: &Path,
) -> Result<()> {
  let read = |path: &Path| {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
  };

  let config: DrawConfig = serde_json::from_slice(&read(config_file)?)
    .with_context(|| format!("failed to parse draw config: {}", config_file.display()))?;

  let sort_file = match (sort_file, &config.sort_ref) {
    (Some(path), _) => path.to_path_buf(),
    (None, Some(sort_ref)) => config_file
      .parent()
      .unwrap_or(Path::new("."))
      .join(sort_ref),
    (None, None) => bail!("no draw sort given and the config has no sortRef"),
  };
  let sort: DrawSort = serde_json::from_slice(&read(&sort_file)?)
    .with_context(|| format!("failed to parse draw sort: {}", sort_file.display()))?;

  let codes = read_hunt_codes(&read(hunt_codes)?).context("failed to parse hunt codes")?;
  let applicants = read_applicants(&read(applicants)?).context("failed to parse applicants")?;

  let result = run_draw(&codes, &applicants, &sort, &config).context("draw failed")?;
  let metrics = DrawMetrics::from_result(&result);

  std::fs::create_dir_all(out)
    .with_context(|| format!("failed to create output directory: {}", out.display()))?;
  let outputs = [
    ("hunt-codes.csv", write_hunt_codes(&result.hunt_code_results)?),
    ("applicants.csv", write_applicants(&result.applicant_results)?),
    ("metrics.csv", write_metrics(&metrics.rows())?),
  ];
  for (name, body) in outputs {
    let path = out.join(name);
    std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
  }

  println!("{}", serde_json::to_string_pretty(&metrics)?);
  Ok(())
}
