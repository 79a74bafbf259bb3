//! chunkdoc-dump - inspect raw property dumps as chunked documents.
//!
//! Input is a JSON object mapping owners to their raw properties:
//!
//! ```text
//! {
//!   "world": { "spawn_0": "[12,64,", "spawn_1": "-40]" },
//!   "e1":    { "hp_0": "20" }
//! }
//! ```
//!
//! `world` is the world store, every other top-level name is an entity id.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chunkdoc_core::{
    DocumentConfig, DocumentRegistry, EntityId, MemoryHost, MemoryStore, Owner, PropertyStore,
    PropertyValue, Raw,
};
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug, warn};
use tracing_subscriber::EnvFilter;

const WORLD_OWNER: &str = "world";

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "chunkdoc-dump",
    about = "Reassemble chunked documents from a raw property dump",
    version
)]
struct Cli {
    /// Path to the JSON property dump.
    path: PathBuf,

    /// Only show this owner ("world" or an entity id).
    #[arg(long)]
    owner: Option<String>,

    /// Only show this logical key.
    #[arg(long)]
    key: Option<String>,

    /// Print joined strings without JSON-decoding them.
    #[arg(long)]
    raw: bool,

    /// Output as JSON.
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is warn level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let host = match load_dump(&cli.path) {
        Ok(host) => host,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.path.display());
            std::process::exit(1);
        }
    };

    let report = build_report(
        host,
        cli.owner.as_deref(),
        cli.key.as_deref(),
        !cli.raw,
    );

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print_report(&report);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["chunkdoc_dump", "chunkdoc_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ── Loading ──────────────────────────────────────────────────────────────────

/// Reads a dump file into an in-memory host.
fn load_dump(path: &Path) -> Result<MemoryHost, String> {
    let data = fs::read_to_string(path).map_err(|e| e.to_string())?;
    parse_dump(&data)
}

fn parse_dump(data: &str) -> Result<MemoryHost, String> {
    let owners: BTreeMap<String, BTreeMap<String, PropertyValue>> =
        serde_json::from_str(data).map_err(|e| format!("invalid dump: {e}"))?;

    let host = MemoryHost::new();
    for (owner, properties) in owners {
        debug!(owner = %owner, properties = properties.len(), "loaded owner");
        if owner == WORLD_OWNER {
            for (name, value) in properties {
                host.world()
                    .set_property(&name, Some(value))
                    .map_err(|e| e.to_string())?;
            }
        } else {
            host.insert_entity(owner, Arc::new(MemoryStore::from_properties(properties)));
        }
    }
    Ok(host)
}

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, PartialEq)]
struct KeyReport {
    chunks: usize,
    chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

type Report = BTreeMap<String, BTreeMap<String, KeyReport>>;

fn build_report(
    host: MemoryHost,
    owner_filter: Option<&str>,
    key_filter: Option<&str>,
    decode_json: bool,
) -> Report {
    let mut owners = vec![WORLD_OWNER.to_string()];
    owners.extend(host.entity_ids().into_iter().map(|id| id.to_string()));

    let registry = DocumentRegistry::new(Arc::new(host), DocumentConfig::default());
    let mut report = Report::new();

    for name in owners {
        if owner_filter.is_some_and(|f| f != name) {
            continue;
        }
        let owner = if name == WORLD_OWNER {
            Owner::World
        } else {
            Owner::Entity(EntityId::new(name.as_str()))
        };
        let doc = match registry.document(&owner) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(owner = %owner, error = %e, "skipping owner");
                continue;
            }
        };

        let mut keys = BTreeMap::new();
        for (key, joined) in doc.entries_with(&Raw) {
            if key_filter.is_some_and(|f| f != key) {
                continue;
            }
            let chunks = doc.chunk_names(&key).len();
            let entry = match joined {
                Ok(Some(s)) => describe_value(chunks, &s, decode_json),
                Ok(None) => KeyReport {
                    chunks,
                    chars: 0,
                    value: None,
                    error: Some("not a chunked value".to_string()),
                },
                Err(e) => KeyReport {
                    chunks,
                    chars: 0,
                    value: None,
                    error: Some(e.to_string()),
                },
            };
            keys.insert(key, entry);
        }
        report.insert(name, keys);
    }
    report
}

fn describe_value(chunks: usize, joined: &str, decode_json: bool) -> KeyReport {
    let chars = joined.chars().count();
    if !decode_json {
        return KeyReport {
            chunks,
            chars,
            value: Some(serde_json::Value::String(joined.to_string())),
            error: None,
        };
    }
    match serde_json::from_str(joined) {
        Ok(value) => KeyReport {
            chunks,
            chars,
            value: Some(value),
            error: None,
        },
        Err(e) => KeyReport {
            chunks,
            chars,
            value: Some(serde_json::Value::String(joined.to_string())),
            error: Some(format!("not JSON: {e}")),
        },
    }
}

fn print_report(report: &Report) {
    for (owner, keys) in report {
        println!("{owner} ({} keys)", keys.len());
        for (key, entry) in keys {
            let value = entry
                .value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_default();
            match &entry.error {
                Some(err) => println!(
                    "  {:<24} {:>3} chunks {:>8} chars  {}  [{}]",
                    key, entry.chunks, entry.chars, value, err
                ),
                None => println!(
                    "  {:<24} {:>3} chunks {:>8} chars  {}",
                    key, entry.chunks, entry.chars, value
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const DUMP: &str = r#"{
        "world": {
            "spawn_0": "[12,64,",
            "spawn_1": "-40]",
            "motd_0": "\"hi\"",
            "flag": true
        },
        "e1": { "hp_0": "20", "hp_1": 3 },
        "e2": { "note_0": "free text" }
    }"#;

    #[test]
    fn test_load_dump_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DUMP.as_bytes()).unwrap();

        let host = load_dump(file.path()).unwrap();
        assert_eq!(host.world().len(), 4);
        assert_eq!(host.entity_ids(), vec![EntityId::new("e1"), EntityId::new("e2")]);
    }

    #[test]
    fn test_load_dump_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dump(&dir.path().join("missing.json")).is_err());
        assert!(parse_dump("[1, 2]").is_err());
    }

    #[test]
    fn test_report_reassembles_chunks() {
        let report = build_report(parse_dump(DUMP).unwrap(), None, None, true);

        let world = &report["world"];
        assert_eq!(world["spawn"].chunks, 2);
        assert_eq!(world["spawn"].value, Some(json!([12, 64, -40])));
        assert_eq!(world["motd"].value, Some(json!("hi")));
        assert!(world["flag"].error.is_some());

        let e1 = &report["e1"];
        assert_eq!(e1["hp"].chunks, 2);
        assert!(e1["hp"].error.as_deref().unwrap().contains("not a string"));

        let e2 = &report["e2"];
        assert!(e2["note"].error.as_deref().unwrap().starts_with("not JSON"));
        assert_eq!(e2["note"].value, Some(json!("free text")));
    }

    #[test]
    fn test_report_filters() {
        let report = build_report(parse_dump(DUMP).unwrap(), Some("world"), Some("spawn"), false);
        assert_eq!(report.len(), 1);
        assert_eq!(report["world"].len(), 1);
        assert_eq!(report["world"]["spawn"].value, Some(json!("[12,64,-40]")));
        assert_eq!(report["world"]["spawn"].chars, 11);
    }
}
