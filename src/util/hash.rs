use md5::Md5;
use sha1::{Digest, Sha1};
use std::{fs::File, io::Read, path::Path};

/// Calculates the SHA-1 hash of a file at the specified path.
///
/// # Parameters
/// - `path`: The path to the file for which to calculate the SHA-1 hash.
///
/// # Returns
/// A result containing the SHA-1 hash as a hexadecimal string or an error if the file could not be read.
pub fn calculate_sha1<P: AsRef<Path>>(path: P) -> crate::Result<String> {
    digest_file::<Sha1, _>(path)
}

/// Calculates the MD5 hash of a file at the specified path.
///
/// MD5 is used for change detection against remote data manifests, not
/// for trust.
pub fn calculate_md5<P: AsRef<Path>>(path: P) -> crate::Result<String> {
    digest_file::<Md5, _>(path)
}

// Streams the file through the hasher so large mod jars never have to fit
// in memory whole.
fn digest_file<D: Digest, P: AsRef<Path>>(path: P) -> crate::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn md5_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        File::create(&path)
            .unwrap()
            .write_all(b"hello world")
            .unwrap();
        assert_eq!(
            calculate_md5(&path).unwrap(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[test]
    fn sha1_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        File::create(&path)
            .unwrap()
            .write_all(b"hello world")
            .unwrap();
        assert_eq!(
            calculate_sha1(&path).unwrap(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
    }
}
