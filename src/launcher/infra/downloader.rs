use anyhow::{Context, Result};
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

pub type ProgressCallback = Arc<dyn Fn(f32, String) + Send + Sync>;

/// Parallel downloads per batch
pub const DOWNLOAD_CONCURRENCY: usize = 8;

const USER_AGENT: &str = concat!("quarry-launcher/", env!("CARGO_PKG_VERSION"));

pub fn report(on_progress: &Option<ProgressCallback>, progress: f32, status: impl Into<String>) {
    if let Some(cb) = on_progress {
        let clamped = progress.clamp(0.0, 1.0);
        cb(clamped, status.into());
    }
}

/// Maps a sub-step's local 0..1 progress into `[start, end]` of the whole task
#[derive(Debug, Clone, Copy)]
pub struct ProgressSpan {
    pub start: f32,
    pub end: f32,
}

impl ProgressSpan {
    pub fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    pub fn at(&self, fraction: f32) -> f32 {
        self.start + (self.end - self.start) * fraction.clamp(0.0, 1.0)
    }
}

/// Callback that reports a nested step's 0..1 progress inside `span` of `on_progress`
pub fn scale_progress(
    on_progress: &Option<ProgressCallback>,
    span: ProgressSpan,
) -> Option<ProgressCallback> {
    on_progress.clone().map(|cb| -> ProgressCallback {
        Arc::new(move |p: f32, s: String| cb(span.at(p), s))
    })
}

#[derive(Debug, Clone)]
pub struct DownloadItem {
    pub url: String,
    pub dest: PathBuf,
    pub size: Option<u64>,
    pub sha1: Option<String>,
}

impl DownloadItem {
    pub fn new(url: impl Into<String>, dest: PathBuf) -> Self {
        Self {
            url: url.into(),
            dest,
            size: None,
            sha1: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = (size > 0).then_some(size);
        self
    }

    pub fn with_sha1(mut self, sha1: impl Into<String>) -> Self {
        let sha1 = sha1.into();
        self.sha1 = (!sha1.is_empty()).then_some(sha1);
        self
    }

    /// Existing file is kept when its size matches; without a size the sha1 is checked
    pub fn is_present(&self) -> bool {
        let Ok(meta) = std::fs::metadata(&self.dest) else {
            return false;
        };
        if !meta.is_file() {
            return false;
        }
        match (self.size, &self.sha1) {
            (Some(size), _) => size == meta.len(),
            (None, Some(expected)) => sha1_file(&self.dest)
                .map(|actual| actual.eq_ignore_ascii_case(expected))
                .unwrap_or(false),
            (None, None) => true,
        }
    }
}

struct ByteTracker {
    total_bytes: u64,
    downloaded_bytes: u64,
    finished: usize,
}

#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?
            .error_for_status()
            .with_context(|| format!("Request failed: {}", url))?;

        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read response from {}", url))?;
        Ok(bytes.to_vec())
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let bytes = self.fetch_bytes(url).await?;
        serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse JSON from {}", url))
    }

    /// Streams `item` into a `.tmp` sibling, verifies it and moves it into place.
    /// `on_chunk` receives the byte count of every chunk written.
    pub async fn download(
        &self,
        item: &DownloadItem,
        on_chunk: &mut (dyn FnMut(u64) + Send),
    ) -> Result<()> {
        if let Some(parent) = item.dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let resp = self
            .client
            .get(&item.url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", item.url))?
            .error_for_status()
            .with_context(|| format!("Download request failed: {}", item.url))?;

        let tmp_path = tmp_path_for(&item.dest);
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;

        let written: Result<Sha1> = async {
            let mut hasher = Sha1::new();
            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.context("Failed to read download chunk")?;
                file.write_all(&chunk).await?;
                hasher.update(&chunk);
                on_chunk(chunk.len() as u64);
            }
            file.flush().await?;
            Ok::<_, anyhow::Error>(hasher)
        }
        .await;
        drop(file);

        let hasher = match written {
            Ok(hasher) => hasher,
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(e.context(format!("Failed to download {}", item.url)));
            }
        };

        if let Some(expected) = &item.sha1 {
            let actual = hex(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                anyhow::bail!(
                    "Checksum mismatch for {} (expected {}, got {})",
                    item.url,
                    expected,
                    actual
                );
            }
        }

        tokio::fs::rename(&tmp_path, &item.dest)
            .await
            .with_context(|| format!("Failed to move {}", item.dest.display()))?;

        Ok(())
    }

    /// Downloads every missing item, `DOWNLOAD_CONCURRENCY` at a time.
    /// Progress is reported by bytes when sizes are known, by file count otherwise.
    pub async fn download_all(
        &self,
        items: Vec<DownloadItem>,
        on_progress: &Option<ProgressCallback>,
        span: ProgressSpan,
        status: &str,
    ) -> Result<()> {
        let missing: Vec<DownloadItem> = items.into_iter().filter(|i| !i.is_present()).collect();
        if missing.is_empty() {
            report(on_progress, span.end, status);
            return Ok(());
        }

        let total_count = missing.len();
        let tracker = Arc::new(Mutex::new(ByteTracker {
            total_bytes: missing.iter().filter_map(|i| i.size).sum(),
            downloaded_bytes: 0,
            finished: 0,
        }));

        log::info!("{}: {} files", status, total_count);
        report(on_progress, span.start, format!("{} (0/{})", status, total_count));

        let results: Vec<Result<()>> = futures::stream::iter(missing.into_iter().map(|item| {
            let tracker = Arc::clone(&tracker);
            let on_progress = on_progress.clone();
            let status = status.to_string();
            async move {
                let chunk_tracker = Arc::clone(&tracker);
                let chunk_progress = on_progress.clone();
                let chunk_status = status.clone();
                let mut on_chunk = move |n: u64| {
                    let fraction = {
                        let mut t = chunk_tracker.lock();
                        t.downloaded_bytes += n;
                        fraction_done(&t, total_count)
                    };
                    report(
                        &chunk_progress,
                        span.at(fraction),
                        format!("{} ({:.0}%)", chunk_status, fraction * 100.0),
                    );
                };
                self.download(&item, &mut on_chunk).await?;

                let (fraction, finished) = {
                    let mut t = tracker.lock();
                    t.finished += 1;
                    (fraction_done(&t, total_count), t.finished)
                };
                report(
                    &on_progress,
                    span.at(fraction),
                    format!("{} ({}/{})", status, finished, total_count),
                );
                Ok(())
            }
        }))
        .buffer_unordered(DOWNLOAD_CONCURRENCY)
        .collect()
        .await;

        for result in results {
            result?;
        }

        report(on_progress, span.end, status);
        Ok(())
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

fn fraction_done(tracker: &ByteTracker, total_count: usize) -> f32 {
    if tracker.total_bytes > 0 {
        (tracker.downloaded_bytes as f32 / tracker.total_bytes as f32).min(1.0)
    } else if total_count > 0 {
        tracker.finished as f32 / total_count as f32
    } else {
        1.0
    }
}

fn tmp_path_for(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    dest.with_file_name(name)
}

fn hex(bytes: impl IntoIterator<Item = u8>) -> String {
    let mut s = String::with_capacity(40);
    for byte in bytes {
        let _ = write!(s, "{byte:02x}");
    }
    s
}

/// SHA-1 of a file on disk, lowercase hex
pub fn sha1_file(path: &Path) -> Result<String> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_span_clamps() {
        let span = ProgressSpan::new(0.3, 0.7);
        assert!((span.at(0.0) - 0.3).abs() < f32::EPSILON);
        assert!((span.at(0.5) - 0.5).abs() < 1e-6);
        assert!((span.at(2.0) - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_report_clamps_into_unit_range() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: Option<ProgressCallback> = Some(Arc::new(move |p, s| sink.lock().push((p, s))));

        report(&cb, 1.5, "done");
        report(&cb, -1.0, "start");

        let seen = seen.lock();
        assert_eq!(seen[0], (1.0, "done".to_string()));
        assert_eq!(seen[1], (0.0, "start".to_string()));
    }

    #[test]
    fn test_sha1_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(
            sha1_file(&path).unwrap(),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    #[test]
    fn test_presence_respects_known_size() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("lib.jar");
        std::fs::write(&dest, b"12345").unwrap();

        let item = DownloadItem::new("http://localhost/lib.jar", dest.clone());
        assert!(item.is_present());
        assert!(item.clone().with_size(5).is_present());
        assert!(!item.with_size(6).is_present());
        assert!(!DownloadItem::new("x", dir.path().join("missing.jar")).is_present());
    }

    #[test]
    fn test_presence_checks_sha1_without_size() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("hello.txt");
        std::fs::write(&dest, b"hello").unwrap();

        let item = DownloadItem::new("http://localhost/hello.txt", dest);
        assert!(item.clone().with_sha1("AAF4C61DDCC5E8A2DABEDE0F3B482CD9AEA9434D").is_present());
        assert!(!item.with_sha1("0000000000000000000000000000000000000000").is_present());
    }

    #[test]
    fn test_scaled_progress_stays_in_span() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: Option<ProgressCallback> = Some(Arc::new(move |p, _| sink.lock().push(p)));

        let inner = scale_progress(&cb, ProgressSpan::new(0.5, 1.0));
        report(&inner, 0.0, "start");
        report(&inner, 1.0, "end");

        assert_eq!(*seen.lock(), vec![0.5, 1.0]);
        assert!(scale_progress(&None, ProgressSpan::new(0.0, 1.0)).is_none());
    }

    #[tokio::test]
    async fn test_interrupted_download_leaves_no_tmp_file() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npartial")
                .await
                .unwrap();
            let _ = socket.shutdown().await;
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("client.jar");
        let item = DownloadItem::new(format!("http://{addr}/client.jar"), dest.clone());

        let result = Downloader::new().download(&item, &mut |_| {}).await;
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!tmp_path_for(&dest).exists());
    }

    #[test]
    fn test_tmp_path_keeps_extension() {
        assert_eq!(
            tmp_path_for(Path::new("/a/b/client.jar")),
            PathBuf::from("/a/b/client.jar.tmp")
        );
    }
}
