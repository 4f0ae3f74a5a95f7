use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use bstr::ByteSlice;
use memmap2::Mmap;

use crate::error::SiftError;

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

/// Raw file bytes, either mapped read-only or read into memory.
pub enum FileBytes
{
    Mapped(Mmap),
    Buffered(Vec<u8>),
    /// Zero-length files cannot be mapped on every platform
    Empty,
}

impl AsRef<[u8]> for FileBytes
{
    fn as_ref(&self) -> &[u8]
    {
        match self
        {
            FileBytes::Mapped(mmap) => mmap,
            FileBytes::Buffered(buf) => buf,
            FileBytes::Empty => &[],
        }
    }
}

impl FileBytes
{
    pub fn is_mapped(&self) -> bool
    {
        matches!(self, FileBytes::Mapped(_))
    }

    /// Iterate lines (LF or CRLF) decoded lossily as UTF-8.
    pub fn lines_lossy(&self) -> impl Iterator<Item = Cow<'_, str>>
    {
        self.as_ref()
            .lines()
            .map(|l| l.to_str_lossy())
    }
}

/// Map `path` read-only regardless of size.
pub fn map_file<P: AsRef<Path>>(path: P) -> Result<FileBytes, SiftError>
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SiftError::load(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| SiftError::load(path, e))?
        .len();

    if len == 0
    {
        return Ok(FileBytes::Empty);
    }

    // Safety: the mapping is read-only and dropped before the run ends
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SiftError::load(path, e))?;

    Ok(FileBytes::Mapped(mmap))
}

/// Map large files, read small ones into memory.
pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileBytes, SiftError>
{
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|e| SiftError::load(path, e))?;

    if metadata.len() > MMAP_THRESHOLD
    {
        map_file(path)
    }
    else if metadata.len() == 0
    {
        Ok(FileBytes::Empty)
    }
    else
    {
        let buf = std::fs::read(path).map_err(|e| SiftError::load(path, e))?;
        Ok(FileBytes::Buffered(buf))
    }
}

#[cfg(test)]
mod tests
{
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn small_files_are_buffered()
    {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "a|b\r\nc|d\n").unwrap();

        let bytes = read_file_smart(f.path()).unwrap();
        assert!(!bytes.is_mapped());

        let lines: Vec<_> = bytes
            .lines_lossy()
            .collect();
        assert_eq!(lines, vec!["a|b", "c|d"]);
    }

    #[test]
    fn large_files_are_mapped()
    {
        let mut f = NamedTempFile::new().unwrap();
        let line = "x".repeat(1023) + "\n";
        for _ in 0..1100
        {
            f.write_all(line.as_bytes()).unwrap();
        }
        f.flush().unwrap();

        let bytes = read_file_smart(f.path()).unwrap();
        assert!(bytes.is_mapped());
        assert_eq!(bytes.lines_lossy().count(), 1100);
    }

    #[test]
    fn empty_files_do_not_map()
    {
        let f = NamedTempFile::new().unwrap();
        let bytes = map_file(f.path()).unwrap();
        assert!(bytes.as_ref().is_empty());
    }

    #[test]
    fn invalid_utf8_is_replaced()
    {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"caf\xff shop\n").unwrap();

        let bytes = read_file_smart(f.path()).unwrap();
        let first = bytes
            .lines_lossy()
            .next()
            .unwrap();
        assert!(first.ends_with(" shop"));
    }

    #[test]
    fn missing_file_is_a_load_error()
    {
        let err = map_file("/definitely/not/here.dat")
            .err()
            .unwrap();
        assert!(matches!(err, SiftError::Load { .. }));
    }
}
