use crate::error::Result;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Whether the path names a gzip-compressed file.
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Open a file for buffered line reading, decompressing transparently when
/// the path carries a `.gz` suffix.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzip_path(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Create a file for buffered writing, gzip-compressing when requested.
pub fn create_output(path: &Path, gzip: bool) -> Result<Box<dyn Write>> {
    let file = File::create(path)?;
    if gzip {
        Ok(Box::new(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_is_gzip_path() {
        assert!(is_gzip_path(Path::new("genes.json.gz")));
        assert!(!is_gzip_path(Path::new("genes.json")));
        assert!(!is_gzip_path(Path::new("genes")));
    }

    #[test]
    fn test_gzip_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("lines.txt.gz");

        {
            let mut writer = create_output(&path, true)?;
            writeln!(writer, "first line")?;
            writeln!(writer, "second line")?;
        }

        let mut reader = open_input(&path)?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        assert_eq!(content, "first line\nsecond line\n");

        Ok(())
    }
}
