use std::ffi::OsStr;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use simple_deps::cache::{CachePaths, GitProvider};
use simple_deps::config::save_modified;
use simple_deps::manifest::{self, DependencyInfo, LineTemplate};
use simple_deps::resolve::{DEFAULT_WORKING_DIR, ResolveOptions, Resolver};
use simple_deps::types::DependencySet;

const USE_HEAD_ENV: &str = "SIMPLE_USE_HEAD";
const WRITE_ENV: &str = "SIMPLE_DEPS_WRITE";
const CACHE_ENV: &str = "SIMPLE_DEPS_CACHE";

#[derive(Parser)]
#[command(
    name = "simple-deps",
    version,
    about = "Resolve git dependencies into checkouts and a build manifest"
)]
struct Cli {
    /// Dependency config file (repeatable)
    #[arg(long = "config", value_name = "FILE")]
    config: Vec<PathBuf>,

    /// More config files, processed after --config
    #[arg(value_name = "CONFIGS")]
    configs: Vec<PathBuf>,

    /// Per-project working-copy directory
    #[arg(long, value_name = "DIR", default_value = DEFAULT_WORKING_DIR)]
    dir: PathBuf,

    /// Lay out working copies by URL path instead of by name
    #[arg(long)]
    nested: bool,

    /// Pull to the latest head and record it as the new pin
    #[arg(long)]
    use_head: bool,

    /// Use sibling ../<name> directories as overrides
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    allow_local: bool,

    /// Rewrite every config file, not only modified ones
    #[arg(long)]
    write: bool,

    /// Global cache directory [default: ~/.simple-deps]
    #[arg(long, value_name = "DIR")]
    cache: Option<PathBuf>,

    /// Manifest template [default: dependencies.cmake.template beside the executable]
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Also print the resolved dependencies as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_paths: Vec<&PathBuf> = cli.config.iter().chain(&cli.configs).collect();
    if config_paths.is_empty() {
        return Err("no config files given (use --config <FILE> or pass them as arguments)".into());
    }

    let mut deps = DependencySet::new();
    for path in config_paths {
        deps.read(path)?;
    }
    log::debug!("{} dependencies", deps.len());

    let cache = match cli.cache.or_else(|| std::env::var_os(CACHE_ENV).map(PathBuf::from)) {
        Some(root) => CachePaths::new(root),
        None => CachePaths::default(),
    };
    log::debug!("Cache at {}", cache.root().display());

    let options = ResolveOptions {
        working_dir: cli.dir,
        use_head: cli.use_head || env_flag(USE_HEAD_ENV),
        allow_local: cli.allow_local,
        nested_layout: cli.nested,
        ..ResolveOptions::default()
    };

    let resolver = Resolver::new(GitProvider::new(), cache, options);
    let resolved = resolver.resolve_all(&mut deps)?;

    save_modified(&deps, cli.write || env_flag(WRITE_ENV))?;

    let infos: Vec<DependencyInfo> = resolved.iter().map(DependencyInfo::from).collect();
    let template = LineTemplate::select(cli.template.as_deref())?;
    manifest::write_manifest(&manifest::manifest_dir(&deps), &template, &infos)?;

    if cli.json {
        println!("{}", manifest::to_json(&infos)?);
    }

    Ok(())
}

/// Any non-empty value turns the flag on.
fn env_flag(name: &str) -> bool {
    std::env::var_os(name).is_some_and(|value| value != OsStr::new(""))
}
