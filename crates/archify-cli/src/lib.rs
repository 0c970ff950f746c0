//! `archify` command line
//!
//! - `sanitize <file>`: clean a scene document against a profile
//! - `inspect <file>`: per-layer element counts and content fingerprint
//! - `restore --store-dir <dir>`: run the startup restore against a
//!   directory-backed store

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use anyhow::{bail, Context, Result};
use archify_persist::{AutosaveConfig, FileStore, PersistenceAdapter};
use archify_scene::{AllowList, AllowListProfile, SceneDocument, Sanitized, Sanitizer};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command definition
#[must_use]
pub fn cli() -> Command {
    Command::new("archify")
        .version(archify_scene::VERSION)
        .about("Sanitize, inspect and restore floor-plan scene documents")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Autosave configuration (TOML)"),
        )
        .subcommand(
            Command::new("sanitize")
                .about("Remove unrepresentable elements and repair references")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Scene JSON file"),
                )
                .arg(
                    Arg::new("profile")
                        .long("profile")
                        .default_value("autosave")
                        .value_parser(["autosave", "import", "external-import"])
                        .help("Allow-list profile"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the document here instead of stdout"),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .action(ArgAction::SetTrue)
                        .help("Print the removal report as JSON to stderr"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print element counts and fingerprint")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Scene JSON file"),
                ),
        )
        .subcommand(
            Command::new("restore")
                .about("Restore the autosave slot from a directory-backed store")
                .arg(
                    Arg::new("store-dir")
                        .long("store-dir")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Store directory"),
                )
                .arg(
                    Arg::new("key")
                        .long("key")
                        .help("Store key (defaults to the configured autosave key)"),
                ),
        )
}

/// Execute parsed arguments
///
/// # Errors
/// Unreadable inputs, bad configuration, or an unreadable store.
pub async fn run(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches.get_one::<PathBuf>("config"))?;

    match matches.subcommand() {
        Some(("sanitize", args)) => {
            let file = required_path(args, "file")?;
            let profile: AllowListProfile = args
                .get_one::<String>("profile")
                .map_or("autosave", String::as_str)
                .parse()?;
            let allow = allow_list_for(profile, &config);
            let sanitized = sanitize_file(file, &allow)?;

            if args.get_flag("report") {
                eprintln!("{}", serde_json::to_string_pretty(&sanitized.report)?);
            }
            let text = serde_json::to_string_pretty(&sanitized.document)?;
            match args.get_one::<PathBuf>("output") {
                Some(out) => std::fs::write(out, text)
                    .with_context(|| format!("cannot write {}", out.display()))?,
                None => println!("{text}"),
            }
            Ok(())
        }
        Some(("inspect", args)) => {
            let file = required_path(args, "file")?;
            let text = read(file)?;
            let document = SceneDocument::from_json_str(&text).with_context(|| {
                format!(
                    "{} is not a well-formed scene document; try `archify sanitize` first",
                    file.display()
                )
            })?;
            print!("{}", render_inspect(&document)?);
            Ok(())
        }
        Some(("restore", args)) => {
            let dir = required_path(args, "store-dir")?;
            let key = args
                .get_one::<String>("key")
                .map_or(config.autosave_key.as_str(), String::as_str);
            match restore_from_dir(dir, key, &config).await? {
                Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
                None => println!("no document"),
            }
            Ok(())
        }
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("no command given"),
    }
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing <{name}>"))
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Configuration from `path`, or defaults
///
/// # Errors
/// Unreadable or invalid configuration file.
pub fn load_config(path: Option<&PathBuf>) -> Result<AutosaveConfig> {
    match path {
        Some(path) => AutosaveConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(AutosaveConfig::default()),
    }
}

/// Allow-list for `profile`, honouring custom lists in `config`
#[must_use]
pub fn allow_list_for(profile: AllowListProfile, config: &AutosaveConfig) -> AllowList {
    match profile {
        AllowListProfile::Autosave => config.restore_allow_list(),
        AllowListProfile::ExternalImport => config.import_allow_list(),
    }
}

/// Sanitize the JSON document in `path`
///
/// # Errors
/// Unreadable file or text that is not JSON.
pub fn sanitize_file(path: &Path, allow: &AllowList) -> Result<Sanitized> {
    let text = read(path)?;
    let raw: Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not JSON", path.display()))?;
    let sanitized = Sanitizer::new(allow).sanitize(&raw);
    tracing::info!(
        file = %path.display(),
        profile = %allow.name,
        removed = sanitized.report.removed_count(),
        "sanitized"
    );
    Ok(sanitized)
}

/// Human-readable summary of a document
///
/// # Errors
/// The document cannot be encoded for fingerprinting.
pub fn render_inspect(document: &SceneDocument) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "fingerprint  {}", document.fingerprint()?)?;
    writeln!(
        out,
        "{:<16} {:>8} {:>6} {:>6} {:>6} {:>6}",
        "layer", "vertices", "lines", "holes", "items", "areas"
    )?;
    for (id, layer) in &document.layers {
        let s = layer.stats();
        writeln!(
            out,
            "{:<16} {:>8} {:>6} {:>6} {:>6} {:>6}",
            id, s.vertices, s.lines, s.holes, s.items, s.areas
        )?;
    }
    let t = document.stats();
    writeln!(
        out,
        "{:<16} {:>8} {:>6} {:>6} {:>6} {:>6}",
        "total", t.vertices, t.lines, t.holes, t.items, t.areas
    )?;
    Ok(out)
}

/// Run the startup restore against a directory-backed store
///
/// A corrupt stored document is deleted and reported as `None`.
///
/// # Errors
/// The store cannot be read.
pub async fn restore_from_dir(
    dir: &Path,
    key: &str,
    config: &AutosaveConfig,
) -> Result<Option<SceneDocument>> {
    let store = Arc::new(FileStore::new(dir));
    let adapter = PersistenceAdapter::with_config(store, config.clone())?;
    match adapter.restore(key).await {
        Ok(document) => Ok(document),
        Err(archify_persist::RestoreError::CorruptData(e)) => {
            tracing::warn!(key, error = %e, "stored document was corrupt and has been removed");
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("restoring {key} from {}", dir.display())),
    }
}
