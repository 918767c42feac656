use std::fs;
use std::path::{Path, PathBuf};

use menulens::AnalysisConfig;
use menulens::pipeline::AnalysisRunOptions;
use tempfile::{Builder, TempDir};

pub const POS_HEADER: &str =
    "Order No.,Created,Order Type,Sub Order Type,Items,My Amount (₹),Payment Type,Status";
pub const POS_BANNER: &str = "Table view report,,,,,,,\nOutlet: Beach Shack,,,,,,,";

/// One exported POS order.
#[derive(Debug, Clone)]
pub struct PosRow {
    pub order_no: String,
    pub created: String,
    pub sub_order_type: String,
    pub items: Vec<String>,
    pub total: String,
}

impl PosRow {
    pub fn new(order_no: &str, created: &str, items: &[&str], total: &str) -> Self {
        Self {
            order_no: order_no.to_string(),
            created: created.to_string(),
            sub_order_type: "Dine In (4)".to_string(),
            items: items.iter().map(ToString::to_string).collect(),
            total: total.to_string(),
        }
    }

    fn to_csv_line(&self) -> String {
        [
            quote(&self.order_no),
            quote(&self.created),
            quote("Dine In"),
            quote(&self.sub_order_type),
            quote(&self.items.join(", ")),
            quote(&self.total),
            quote("Cash"),
            quote("Success"),
        ]
        .join(",")
    }
}

pub fn temp_workspace(prefix: &str) -> std::io::Result<TempDir> {
    Builder::new().prefix(prefix).tempdir()
}

pub fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    write_bytes(dir, name, body.as_bytes())
}

pub fn write_bytes(dir: &Path, name: &str, body: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        assert!(fs::create_dir_all(parent).is_ok());
    }
    let result = fs::write(&path, body);
    assert!(result.is_ok());
    path
}

pub fn catalog_csv(entries: &[(&str, &str)]) -> String {
    let mut body = String::from("Name,Price\n");
    for (name, price) in entries {
        body.push_str(&format!("{},{}\n", quote(name), quote(price)));
    }
    body
}

/// A POS export, optionally with the banner lines real exports start with.
pub fn pos_export(rows: &[PosRow], with_banner: bool) -> String {
    let mut body = String::new();
    if with_banner {
        body.push_str(POS_BANNER);
        body.push('\n');
    }
    body.push_str(POS_HEADER);
    body.push('\n');
    for row in rows {
        body.push_str(&row.to_csv_line());
        body.push('\n');
    }
    body
}

pub fn thali_catalog() -> String {
    catalog_csv(&[
        ("Veg Thali", "110"),
        ("Chapati", "20"),
        ("Soda", "70"),
        ("Fish Curry Rice", "180"),
        ("Kingfisher Beer", "160"),
        ("Masala Chai", "30"),
        ("Paneer Tikka", "200"),
    ])
}

/// Options that never read `MENULENS_CONFIG` and never persist.
pub fn options(catalog_path: &Path, sources: &[PathBuf]) -> AnalysisRunOptions {
    AnalysisRunOptions {
        catalog_path: catalog_path.to_path_buf(),
        sources: sources.to_vec(),
        config: Some(AnalysisConfig::default()),
        ..AnalysisRunOptions::default()
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
