use crate::{
    catalog,
    config::Config,
    datacenter::DatacenterCatalog,
    mapping::{self, MappingTable},
    pipeline::Planner,
    refine,
    report::PlanReport,
    util::{ensure_dir, hash_file, now_rfc3339, sha256_hex},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "atlas-plan")]
#[command(about = "Deterministic latency-measurement planner (probe classification + datacenter mapping + job batching)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./atlas-plan.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify the probe catalog and print counts per connection type.
    Classify {
        #[arg(long)]
        probes: PathBuf,
    },
    /// Print the refined mapping rows as JSON.
    Map {
        #[arg(long)]
        probes: PathBuf,
        #[arg(long)]
        datacenters: PathBuf,
    },
    /// Full run: mapping, batches and request bodies written to a run directory.
    Plan {
        #[arg(long)]
        probes: PathBuf,
        #[arg(long)]
        datacenters: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Re-apply scenario refinement to an existing mapping CSV.
    Refine {
        #[arg(long)]
        mapping: PathBuf,
        /// Defaults to overwriting the input.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Classify { probes } => {
            let _guard = init_logging(&args, &cfg, None)?;
            classify(&cfg, probes)
        }
        Command::Map {
            probes,
            datacenters,
        } => {
            let _guard = init_logging(&args, &cfg, None)?;
            map(&cfg, probes, datacenters)
        }
        Command::Plan {
            probes,
            datacenters,
            out_dir,
        } => plan(&args, &cfg, probes, datacenters, out_dir.as_deref()),
        Command::Refine { mapping, output } => {
            let _guard = init_logging(&args, &cfg, None)?;
            refine_file(mapping, output.as_deref())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("atlas-plan.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("atlas-plan.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn classify(cfg: &Config, probes: &Path) -> Result<()> {
    let raw = catalog::load_probes(probes)
        .with_context(|| format!("loading probes: {}", probes.display()))?;
    let classified = catalog::classify(&raw, &cfg.classification)?;

    let mut report = PlanReport {
        raw_probes: raw.len(),
        ..Default::default()
    };
    for p in &classified.probes {
        *report.classified.entry(p.connection_type).or_insert(0) += 1;
    }
    report.record_skips(&classified.skipped);

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": probes,
            "raw_probes": report.raw_probes,
            "classified": report.classified,
            "skipped": report.skipped,
        }))?
    );
    Ok(())
}

fn load_inputs(
    probes: &Path,
    datacenters: &Path,
) -> Result<(Vec<catalog::RawProbe>, DatacenterCatalog)> {
    let raw = catalog::load_probes(probes)
        .with_context(|| format!("loading probes: {}", probes.display()))?;
    let dcs = DatacenterCatalog::load(datacenters)
        .with_context(|| format!("loading datacenters: {}", datacenters.display()))?;
    if dcs.is_empty() {
        return Err(anyhow!("datacenter catalog is empty: {}", datacenters.display()));
    }
    Ok((raw, dcs))
}

fn map(cfg: &Config, probes: &Path, datacenters: &Path) -> Result<()> {
    let (raw, dcs) = load_inputs(probes, datacenters)?;
    let out = Planner::new(cfg, &dcs).run(&raw)?;
    println!("{}", serde_json::to_string_pretty(&out.mapping.rows)?);
    Ok(())
}

fn plan(
    args: &Args,
    cfg: &Config,
    probes: &Path,
    datacenters: &Path,
    out_override: Option<&Path>,
) -> Result<()> {
    let cfg_hash = sha256_hex(cfg.normalized_for_hash().as_bytes());
    let probes_hash = hash_file(probes)
        .with_context(|| format!("hashing probes: {}", probes.display()))?;
    let dcs_hash = hash_file(datacenters)
        .with_context(|| format!("hashing datacenters: {}", datacenters.display()))?;
    let run_id = sha256_hex(format!("{}:{}:{}", cfg_hash, probes_hash, dcs_hash).as_bytes());

    let out_root = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let run_dir = out_root.join(&run_id);

    if run_dir.exists() && !cfg.global.resume {
        return Err(anyhow!(
            "run_dir already exists and resume=false: {}",
            run_dir.display()
        ));
    }

    ensure_dir(&run_dir)?;
    ensure_dir(&run_dir.join("logs"))?;

    let log_path = resolve_log_path(cfg, &run_dir);
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!("run_id={run_id} out={}", run_dir.display());

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(run_dir.join("effective-config.toml"), raw)?;
    }

    let started = now_rfc3339();
    let (raw, dcs) = load_inputs(probes, datacenters)?;
    let out = Planner::new(cfg, &dcs).run(&raw)?;

    if cfg.output.write_mapping_csv {
        out.mapping
            .write_csv(&run_dir.join(&cfg.output.mapping_filename))
            .with_context(|| "writing mapping CSV")?;
    }

    if cfg.output.write_jobs_json {
        std::fs::write(
            run_dir.join(&cfg.output.jobs_filename),
            serde_json::to_string_pretty(&out.requests)?,
        )?;
    }

    if cfg.output.write_report_json {
        std::fs::write(
            run_dir.join(&cfg.output.report_filename),
            serde_json::to_string_pretty(&out.report)?,
        )?;
    }

    if cfg.output.write_index_json {
        let index = serde_json::json!({
            "run_id": run_id,
            "run_name": cfg.global.run_name,
            "started": started,
            "finished": now_rfc3339(),
            "mapping": cfg.output.mapping_filename,
            "jobs": cfg.output.jobs_filename,
            "report": cfg.output.report_filename,
            "batches": out.batches.iter().map(|b| serde_json::json!({
                "target": b.target,
                "description": b.description,
                "probes": b.probe_ids.len(),
            })).collect::<Vec<_>>(),
        });
        std::fs::write(run_dir.join("index.json"), serde_json::to_string_pretty(&index)?)?;
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "run_id": run_id,
                "run_dir": run_dir,
                "rows": out.report.mapping_rows,
                "batches": out.report.batches,
                "skipped": out.report.skipped,
                "status": "ok"
            }))?
        );
    }

    Ok(())
}

fn refine_file(input: &Path, output: Option<&Path>) -> Result<()> {
    let rows = mapping::read_rows(input)
        .with_context(|| format!("reading mapping: {}", input.display()))?;
    let (rows, changed) = refine::refine_all(&rows);
    let target = output.unwrap_or(input);
    let table = MappingTable {
        rows,
        skipped: Vec::new(),
    };
    table
        .write_csv(target)
        .with_context(|| format!("writing mapping: {}", target.display()))?;
    info!(
        "refined {} of {} rows -> {}",
        changed,
        table.rows.len(),
        target.display()
    );
    Ok(())
}

fn resolve_log_path(cfg: &Config, run_dir: &Path) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(run_dir.join("logs").join("atlas-plan.log"))
}
