use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Output path for a translated document
    // @params: input_file, output_dir (input's directory when None), prefix
    pub fn derive_output_path<P: AsRef<Path>>(
        input_file: P,
        output_dir: Option<&Path>,
        prefix: &str,
    ) -> Result<PathBuf> {
        let input_file = input_file.as_ref();
        let file_name = input_file
            .file_name()
            .ok_or_else(|| anyhow!("Input path has no file name: {:?}", input_file))?;

        let mut output_name = prefix.to_string();
        output_name.push_str(&file_name.to_string_lossy());

        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => input_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };

        Ok(dir.join(output_name))
    }

    /// Read a UTF-8 text file
    pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        if !Self::file_exists(path) {
            return Err(anyhow!("File does not exist: {:?}", path));
        }

        let bytes = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        String::from_utf8(bytes).map_err(|e| {
            anyhow!(
                "File is not valid UTF-8 text (invalid byte at offset {})",
                e.utf8_error().valid_up_to()
            )
        })
    }

    /// Write `content` to `path` through a temporary file in the same
    /// directory, then rename it into place.
    ///
    /// `tag` is added to the temporary file name so concurrent writers never
    /// share a temporary file.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str, tag: &str, overwrite: bool) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&dir)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".doctrans-")
            .suffix(&format!(".{}.tmp", tag))
            .tempfile_in(&dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;

        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temporary file {:?}", temp.path()))?;
        temp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to flush temporary file {:?}", temp.path()))?;

        if overwrite {
            temp.persist(path)
                .map_err(|e| anyhow!("Failed to move result into place at {:?}: {}", path, e.error))?;
        } else {
            temp.persist_noclobber(path)
                .map_err(|e| anyhow!("Refusing to replace {:?}: {}", path, e.error))?;
        }

        Ok(())
    }
}
