use {
    crate::{
        Cli, Command,
        cache::{FileStore, SeriesCache},
        config::{CacheSettings, PERSISTENCE},
        data::{NormalizeReport, Normalized, RawPayload, normalize_payload},
        diagnostics::{self, render_inventory, take_inventory},
        utils::epoch_ms_to_utc,
    },
    anyhow::Context,
    serde_json::Value,
    std::{fs, io::Write, path::PathBuf},
};

/// Runs one operator command against the file-backed store, printing to stdout.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    execute(cli, &mut stdout.lock())
}

fn open_cache(cli: &Cli) -> anyhow::Result<SeriesCache<FileStore>> {
    let directory = cli
        .store_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(PERSISTENCE.file_store.directory));
    let capacity = cli
        .capacity_bytes
        .unwrap_or(PERSISTENCE.file_store.capacity_bytes);
    let store = FileStore::open(&directory)
        .with_context(|| format!("opening cache store at {}", directory.display()))?
        .with_capacity(capacity);
    Ok(SeriesCache::new(store, CacheSettings::default()))
}

fn execute(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match &cli.command {
        Command::Stats => {
            let cache = open_cache(&cli)?;
            let inventory = take_inventory(&cache);
            let now_ms = cache.now_ms();
            writeln!(
                out,
                "Cache at {} as of {} UTC",
                cache.store().directory().display(),
                epoch_ms_to_utc(now_ms)
            )?;
            writeln!(out, "{}", render_inventory(&inventory, now_ms))?;
        }
        Command::Purge => {
            let cache = open_cache(&cli)?;
            let removed = cache.evict_expired();
            writeln!(out, "Purged {} expired or unreadable entries", removed)?;
        }
        Command::Clear { dataset } => {
            let cache = open_cache(&cli)?;
            let removed = diagnostics::clear_dataset(&cache, dataset);
            writeln!(out, "Cleared {} entries of {}", removed, dataset)?;
        }
        Command::ClearAll => {
            let cache = open_cache(&cli)?;
            let removed = diagnostics::clear_all(&cache);
            writeln!(out, "Cleared {} entries", removed)?;
        }
        Command::Normalize { path, kind } => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let value: Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {} as JSON", path.display()))?;
            let payload = match kind {
                Some(kind) => RawPayload::from_json_as(value, *kind),
                None => RawPayload::from_json(value),
            };
            let Normalized { series, report } = normalize_payload(payload);
            writeln!(out, "{}", serde_json::to_string_pretty(&series)?)?;
            writeln!(out, "{}", summarize(series.len(), &report))?;
        }
    }
    Ok(())
}

fn summarize(kept: usize, report: &NormalizeReport) -> String {
    let mut summary = format!(
        "kept {} records, dropped {}, superseded {}, repaired {}, incomplete {}",
        kept,
        report.dropped.len(),
        report.superseded,
        report.repaired,
        report.incomplete
    );
    for record in &report.dropped {
        summary.push_str(&format!(
            "\n  {}#{}: {}",
            record
                .series
                .as_deref()
                .map(|name| format!("{} ", name))
                .unwrap_or_default(),
            record.index,
            record.reason
        ));
    }
    summary
}
