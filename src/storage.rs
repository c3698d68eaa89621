use std::path::PathBuf;

use anyhow::Context as _;
use axum::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;

/// Where uploaded and generated CV files live. Paths handed back and
/// accepted are the relative form stored in the database
/// (`uploads/cv/<name>`), never absolute filesystem paths.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `body` under a name derived from `filename`, avoiding
    /// collisions. Returns the relative path actually used.
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<String>;
    async fn read(&self, rel_path: &str) -> anyhow::Result<Bytes>;
    async fn delete(&self, rel_path: &str) -> anyhow::Result<()>;
}

const PUBLIC_PREFIX: &str = "uploads/cv";

#[derive(Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn ensure_dir(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("create upload directory")?;
        Ok(())
    }

    fn resolve(&self, rel_path: &str) -> anyhow::Result<PathBuf> {
        let name = rel_path
            .strip_prefix(&format!("{PUBLIC_PREFIX}/"))
            .unwrap_or(rel_path);
        if name.contains('/') || name.contains("..") {
            anyhow::bail!("invalid stored file path: {rel_path}");
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl FileStore for DiskStore {
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<String> {
        let safe = sanitize_filename(filename);
        let mut candidate = safe.clone();
        let mut counter = 1;
        while tokio::fs::try_exists(self.root.join(&candidate))
            .await
            .context("probe upload path")?
        {
            candidate = numbered_variant(&safe, counter);
            counter += 1;
        }
        tokio::fs::write(self.root.join(&candidate), &body)
            .await
            .context("write uploaded file")?;
        Ok(format!("{PUBLIC_PREFIX}/{candidate}"))
    }

    async fn read(&self, rel_path: &str) -> anyhow::Result<Bytes> {
        let path = self.resolve(rel_path)?;
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("read stored file {rel_path}"))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, rel_path: &str) -> anyhow::Result<()> {
        let path = self.resolve(rel_path)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("delete stored file {rel_path}"))?;
        Ok(())
    }
}

/// Strip everything but a conservative character set from a client-supplied
/// filename, dropping any directory components first.
pub fn sanitize_filename(filename: &str) -> String {
    lazy_static! {
        static ref UNSAFE: Regex = Regex::new(r"[^A-Za-z0-9._-]").unwrap();
    }
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let safe = UNSAFE.replace_all(base, "_").into_owned();
    if safe.is_empty() {
        "file".to_string()
    } else {
        safe
    }
}

/// `cv.pdf` -> `cv_1.pdf`, `cv_2.pdf`, ... (suffix goes before the
/// extension).
fn numbered_variant(name: &str, counter: u32) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{}{}", &name[..dot], counter, &name[dot..]),
        _ => format!("{name}_{counter}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_names() {
        assert_eq!(sanitize_filename("cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_filename("Mario Rossi CV (2024).pdf"), "Mario_Rossi_CV__2024_.pdf");
    }

    #[test]
    fn sanitize_drops_directory_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\Users\x\cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_filename("///"), "file");
    }

    #[test]
    fn numbered_variant_goes_before_extension() {
        assert_eq!(numbered_variant("cv.pdf", 1), "cv_1.pdf");
        assert_eq!(numbered_variant("cv.pdf", 12), "cv_12.pdf");
        assert_eq!(numbered_variant("noext", 2), "noext_2");
        assert_eq!(numbered_variant(".hidden", 1), ".hidden_1");
    }

    #[tokio::test]
    async fn save_twice_picks_first_free_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());

        let first = store.save("cv.pdf", Bytes::from_static(b"one")).await.unwrap();
        let second = store.save("cv.pdf", Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(first, "uploads/cv/cv.pdf");
        assert_eq!(second, "uploads/cv/cv_1.pdf");

        assert_eq!(&store.read(&first).await.unwrap()[..], b"one");
        assert_eq!(&store.read(&second).await.unwrap()[..], b"two");
    }

    #[tokio::test]
    async fn delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());

        let path = store.save("x.pdf", Bytes::from_static(b"data")).await.unwrap();
        store.delete(&path).await.unwrap();
        assert!(store.read(&path).await.is_err());
    }

    #[tokio::test]
    async fn traversal_paths_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());
        assert!(store.read("uploads/cv/../secret").await.is_err());
    }
}
