use std::{
    fs::File,
    io::{Cursor, Read},
    path::Path,
};
use tokio::fs::create_dir_all;
use zip::read::ZipArchive;

/// Extracts every entry of a ZIP archive into `output_dir`.
///
/// Used for unpacking native library jars into the per-version natives
/// directory. Entry names are mangled to stay below `output_dir`.
pub async fn extract_archive<P: AsRef<Path>>(zip_path: &P, output_dir: &P) -> crate::Result<()> {
    let file = File::open(zip_path)?;

    create_dir_all(output_dir).await?;

    let mut archive = ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let entry_path = entry.mangled_name();

        if entry.is_dir() {
            std::fs::create_dir_all(output_dir.as_ref().join(entry_path))?;
        } else {
            let target = output_dir.as_ref().join(entry_path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(target)?;
            std::io::copy(&mut entry, &mut out)?;
        }
    }

    Ok(())
}

/// Reads a single named entry out of a jar/ZIP held in memory.
///
/// Loader installer jars carry their merged version profile as an
/// embedded `version.json`; this pulls it out without unpacking the rest.
pub fn read_entry_from_jar(jar_bytes: &[u8], entry_name: &str) -> crate::Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(jar_bytes))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.name() == entry_name {
            let mut buffer = String::new();
            entry.read_to_string(&mut buffer)?;
            return Ok(buffer);
        }
    }

    Err(crate::error::Error::NotFound(format!(
        "File '{entry_name}' in the archive"
    )))
}
