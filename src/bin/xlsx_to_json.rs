//! Usage: xlsx_to_json <workbook.xlsx> [out_dir]

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clinops_dashboard::state::Config;
use clinops_dashboard::workbook::read_workbook;

fn write_dataset<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<()> {
    let path = dir.join(name);
    let text = serde_json::to_string_pretty(rows)?;
    fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {} ({} rows)", path.display(), rows.len());
    Ok(())
}

fn main() -> Result<()> {
    let cfg = Config::from_env();
    let mut args = env::args().skip(1);
    let Some(workbook) = args.next() else {
        bail!("usage: xlsx_to_json <workbook.xlsx> [out_dir]");
    };
    let out_dir = args.next().map(PathBuf::from).unwrap_or_else(|| cfg.data_dir.clone());
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let data = read_workbook(Path::new(&workbook))?;
    write_dataset(&out_dir, &cfg.metrics_file, &data.metrics)?;
    write_dataset(&out_dir, &cfg.programs_file, &data.programs)?;
    write_dataset(&out_dir, &cfg.log_file, &data.log)?;
    Ok(())
}
