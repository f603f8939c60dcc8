use crate::error::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// `create_dir_all`, tolerant of a concurrent creator winning the race.
pub fn ensure_directory(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(_) if dir.is_dir() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn save_json(data: &impl serde::Serialize, path: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        ensure_directory(parent)?;
    }

    let json_string = serde_json::to_string_pretty(data)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

pub fn save_text(content: &str, path: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        ensure_directory(parent)?;
    }

    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Writes a header row followed by `rows` as CSV.
pub fn save_csv<R, S>(path: impl AsRef<Path>, headers: &[&str], rows: R) -> Result<()>
where
    R: IntoIterator<Item = Vec<S>>,
    S: AsRef<[u8]>,
{
    if let Some(parent) = path.as_ref().parent() {
        ensure_directory(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
