use {
    crate::{
        diagnostics::inventory::{CacheInventory, DatasetUsage},
        utils::format_duration,
    },
    tabled::{Table, Tabled, settings::Style},
};

#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "Dataset")]
    dataset: String,
    #[tabled(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Oldest")]
    oldest: String,
    #[tabled(rename = "Newest")]
    newest: String,
}

impl UsageRow {
    fn new(dataset: &str, usage: &DatasetUsage, now_ms: i64) -> Self {
        let age = |written_at: Option<i64>| {
            written_at.map_or_else(|| "-".to_string(), |at| format_duration(now_ms - at))
        };
        Self {
            dataset: dataset.to_string(),
            entries: usage.entries,
            size: format_bytes(usage.bytes),
            oldest: age(usage.oldest_written_at),
            newest: age(usage.newest_written_at),
        }
    }
}

pub fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{} B", bytes)
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KiB", bytes_f / KIB)
    } else {
        format!("{:.2} MiB", bytes_f / (KIB * KIB))
    }
}

/// Operator table: one row per dataset plus a total row. Ages are relative to `now_ms`.
pub fn render_inventory(inventory: &CacheInventory, now_ms: i64) -> String {
    let rows = inventory
        .datasets
        .iter()
        .map(|(dataset, usage)| UsageRow::new(dataset, usage, now_ms))
        .chain(std::iter::once(UsageRow::new("TOTAL", &inventory.total, now_ms)));

    Table::new(rows).with(Style::rounded()).to_string()
}
