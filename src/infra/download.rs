// ============================================================
// Layer 6 — Download Cache
// ============================================================
// Fetches corpus archives and checkpoints over HTTP(S) into a
// cache directory, and unpacks archives next to the download.
//
//   - Lazy: a file already in the cache is never fetched again
//   - No retries: a failed request aborts the run
//   - Writes go to a `.partial` path first and are renamed on
//     success, so an interrupted download is not mistaken for
//     a cached one
//
// Cache location: $HUEVAL_CACHE, else <platform cache dir>/hueval

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use crate::error::{HuevalError, Result};

/// Environment variable that overrides the cache root.
pub const CACHE_ENV: &str = "HUEVAL_CACHE";

#[derive(Debug, Clone)]
pub struct Fetcher {
    cache_dir: PathBuf,
}

impl Fetcher {
    /// Fetcher rooted at `$HUEVAL_CACHE` or the platform cache directory.
    pub fn new() -> Result<Self> {
        let cache_dir = match std::env::var_os(CACHE_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("hueval"),
        };
        Self::with_cache_dir(cache_dir)
    }

    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path a relative cache entry lives at.
    pub fn cache_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.cache_dir.join(relative)
    }

    /// GET `url` into `<cache>/<relative>` unless it is already there.
    pub fn fetch(&self, url: &str, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let dest = self.cache_path(relative);
        if dest.exists() {
            tracing::debug!("Cache hit: {}", dest.display());
            return Ok(dest);
        }

        tracing::info!("Downloading {}", url);
        let response = ureq::get(url)
            .call()
            .map_err(|e| HuevalError::download(url, e))?;
        write_response(url, response, &dest)?;
        Ok(dest)
    }

    /// POST `form` to `url` and store the response body, unless cached.
    pub fn fetch_form(
        &self,
        url:      &str,
        form:     &[(&str, &str)],
        relative: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let dest = self.cache_path(relative);
        if dest.exists() {
            tracing::debug!("Cache hit: {}", dest.display());
            return Ok(dest);
        }

        tracing::info!("Downloading {} (form submission)", url);
        let response = ureq::post(url)
            .send_form(form)
            .map_err(|e| HuevalError::download(url, e))?;
        write_response(url, response, &dest)?;
        Ok(dest)
    }

    /// Unpack a zip archive into a sibling directory named after it.
    pub fn extract_zip(&self, archive: &Path) -> Result<PathBuf> {
        extract_once(archive, |staging| {
            let file = File::open(archive)?;
            let mut zip = zip::ZipArchive::new(file)
                .map_err(|e| HuevalError::archive(archive, e))?;
            zip.extract(staging).map_err(|e| HuevalError::archive(archive, e))
        })
    }

    /// Unpack a .tar.gz archive into a sibling directory named after it.
    pub fn extract_tar_gz(&self, archive: &Path) -> Result<PathBuf> {
        extract_once(archive, |staging| {
            let file = File::open(archive)?;
            let gz   = flate2::read::GzDecoder::new(file);
            tar::Archive::new(gz)
                .unpack(staging)
                .map_err(|e| HuevalError::archive(archive, e))
        })
    }
}

/// GitHub archives unpack into one top-level directory named after the
/// commit. Descend into it when it is the only entry.
pub fn archive_root(dir: &Path) -> Result<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<_>>()?;

    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(dir.to_path_buf()),
    }
}

/// Directory an archive is extracted to: the archive path minus its extensions.
pub fn extraction_dir(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("archive");
    let stem = name
        .strip_suffix(".tar.gz")
        .or_else(|| name.strip_suffix(".tgz"))
        .or_else(|| name.strip_suffix(".zip"))
        .unwrap_or(name);
    archive.with_file_name(format!("{stem}.extracted"))
}

fn extract_once(archive: &Path, unpack: impl FnOnce(&Path) -> Result<()>) -> Result<PathBuf> {
    let dest = extraction_dir(archive);
    if dest.exists() {
        return Ok(dest);
    }

    let staging = dest.with_extension("partial");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    tracing::info!("Extracting {}", archive.display());
    unpack(&staging)?;
    fs::rename(&staging, &dest)?;
    Ok(dest)
}

fn write_response(url: &str, response: ureq::Response, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let partial = dest.with_extension("partial");
    {
        let mut file   = File::create(&partial)?;
        let mut reader = response.into_reader();
        io::copy(&mut reader, &mut file).map_err(|e| HuevalError::download(url, e))?;
    }
    fs::rename(&partial, dest)?;

    tracing::debug!("Saved {}", dest.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_dir_strips_archive_extensions() {
        let zip = Path::new("/cache/hulu/cola.zip");
        assert_eq!(extraction_dir(zip), PathBuf::from("/cache/hulu/cola.extracted"));

        let tgz = Path::new("/cache/models/hubert-wiki-cased.tar.gz");
        assert_eq!(
            extraction_dir(tgz),
            PathBuf::from("/cache/models/hubert-wiki-cased.extracted")
        );
    }

    #[test]
    fn test_cached_file_is_not_fetched() {
        let dir     = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::with_cache_dir(dir.path()).unwrap();
        fs::write(dir.path().join("present.json"), "[]").unwrap();

        // The URL is unreachable; a cache hit must not touch it.
        let path = fetcher.fetch("http://127.0.0.1:9/none.json", "present.json").unwrap();
        assert_eq!(path, dir.path().join("present.json"));
    }

    #[test]
    fn test_archive_root_descends_into_single_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("HuCOLA-abc123/data")).unwrap();
        assert_eq!(archive_root(dir.path()).unwrap(), dir.path().join("HuCOLA-abc123"));

        fs::write(dir.path().join("README"), "").unwrap();
        assert_eq!(archive_root(dir.path()).unwrap(), dir.path());
    }
}
