//! Self-update sequencing: check, confirm, download with progress, install, relaunch.
//!
//! The installer itself is supplied through [`UpdateSource`].

use std::path::Path;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::ProvisioningError;
use crate::model::update::{DownloadEvent, UpdateInfo};

#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// `None` when the running version is current.
    async fn check(&self) -> Result<Option<UpdateInfo>, ProvisioningError>;

    async fn download_and_install(
        &self,
        update: &UpdateInfo,
        on_event: &mut (dyn FnMut(DownloadEvent) + Send),
    ) -> Result<(), ProvisioningError>;

    async fn relaunch(&self) -> Result<(), ProvisioningError>;
}

/// Running totals for one download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
    pub finished: bool,
}

impl DownloadProgress {
    pub fn apply(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started { content_length } => {
                *self = Self {
                    total: content_length,
                    ..Self::default()
                };
            }
            DownloadEvent::Progress { chunk_length } => {
                self.downloaded = self.downloaded.saturating_add(chunk_length);
            }
            DownloadEvent::Finished => self.finished = true,
        }
    }

    /// Completed fraction in `0.0..=1.0`, or `None` when the size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.downloaded as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }

    pub fn percent(&self) -> Option<u8> {
        self.fraction().map(|f| (f * 100.0).round() as u8)
    }
}

pub struct UpdateCoordinator<S> {
    source: S,
}

impl<S: UpdateSource> UpdateCoordinator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn check(&self) -> Result<Option<UpdateInfo>, ProvisioningError> {
        let update = self.source.check().await?;
        match &update {
            Some(info) => info!(version = %info.version, current = %info.current_version, "update available"),
            None => debug!("already up to date"),
        }
        Ok(update)
    }

    /// Download and install `update`, which the user has already confirmed.
    ///
    /// `on_progress` sees every event together with the running totals.
    pub async fn install<F>(
        &self,
        update: &UpdateInfo,
        mut on_progress: F,
    ) -> Result<DownloadProgress, ProvisioningError>
    where
        F: FnMut(&DownloadProgress, DownloadEvent) + Send,
    {
        info!(version = %update.version, "installing update");
        let mut progress = DownloadProgress::default();
        let mut on_event = |event: DownloadEvent| {
            progress.apply(event);
            on_progress(&progress, event);
        };
        self.source.download_and_install(update, &mut on_event).await?;

        if !progress.finished {
            return Err(ProvisioningError::Update(
                "download ended without a finished event".into(),
            ));
        }
        info!(version = %update.version, bytes = progress.downloaded, "update installed");
        Ok(progress)
    }

    pub async fn relaunch(&self) -> Result<(), ProvisioningError> {
        info!("relaunching after update");
        self.source.relaunch().await
    }
}

/// Stream `url` into `dest`, reporting the download through `on_event`.
///
/// Returns the number of bytes written. On failure `dest` is removed.
pub async fn download_to_file(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
    on_event: &mut (dyn FnMut(DownloadEvent) + Send),
) -> Result<u64, ProvisioningError> {
    info!(url, dest = %dest.display(), "downloading file");
    let resp = http.get(url).send().await?;

    if !resp.status().is_success() {
        return Err(ProvisioningError::Update(format!(
            "failed to download file: HTTP {}",
            resp.status()
        )));
    }

    let content_length = resp.content_length();
    let chunks = futures::stream::try_unfold(resp, |mut resp| async move {
        let chunk = resp.chunk().await?;
        Ok::<_, ProvisioningError>(chunk.map(|chunk| (chunk, resp)))
    });
    let written = write_chunks(chunks, dest, content_length, on_event).await?;
    info!(bytes = written, "download completed");
    Ok(written)
}

async fn write_chunks<S, B>(
    chunks: S,
    dest: &Path,
    content_length: Option<u64>,
    on_event: &mut (dyn FnMut(DownloadEvent) + Send),
) -> Result<u64, ProvisioningError>
where
    S: Stream<Item = Result<B, ProvisioningError>>,
    B: AsRef<[u8]>,
{
    on_event(DownloadEvent::Started { content_length });

    let mut file = tokio::fs::File::create(dest).await?;
    let result = copy_chunks(chunks, &mut file, on_event).await;
    drop(file);

    match result {
        Ok(written) => {
            on_event(DownloadEvent::Finished);
            Ok(written)
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                warn!(dest = %dest.display(), error = %remove_err, "failed to remove partial download");
            }
            Err(e)
        }
    }
}

async fn copy_chunks<S, B>(
    chunks: S,
    file: &mut tokio::fs::File,
    on_event: &mut (dyn FnMut(DownloadEvent) + Send),
) -> Result<u64, ProvisioningError>
where
    S: Stream<Item = Result<B, ProvisioningError>>,
    B: AsRef<[u8]>,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut written = 0u64;
    while let Some(chunk) = chunks.try_next().await? {
        let chunk = chunk.as_ref();
        file.write_all(chunk).await?;
        written += chunk.len() as u64;
        on_event(DownloadEvent::Progress {
            chunk_length: chunk.len() as u64,
        });
    }
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    struct ScriptedSource {
        update: Option<UpdateInfo>,
        events: Vec<DownloadEvent>,
        relaunched: Mutex<bool>,
    }

    impl ScriptedSource {
        fn new(events: Vec<DownloadEvent>) -> Self {
            Self {
                update: Some(UpdateInfo {
                    version: "1.2.0".into(),
                    current_version: "1.1.0".into(),
                    notes: None,
                    download_url: None,
                }),
                events,
                relaunched: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn check(&self) -> Result<Option<UpdateInfo>, ProvisioningError> {
            Ok(self.update.clone())
        }

        async fn download_and_install(
            &self,
            _update: &UpdateInfo,
            on_event: &mut (dyn FnMut(DownloadEvent) + Send),
        ) -> Result<(), ProvisioningError> {
            for event in &self.events {
                on_event(*event);
            }
            Ok(())
        }

        async fn relaunch(&self) -> Result<(), ProvisioningError> {
            *self.relaunched.lock() = true;
            Ok(())
        }
    }

    #[test]
    fn test_progress_with_known_length() {
        let mut progress = DownloadProgress::default();
        progress.apply(DownloadEvent::Started {
            content_length: Some(200),
        });
        progress.apply(DownloadEvent::Progress { chunk_length: 50 });
        assert_eq!(progress.fraction(), Some(0.25));
        assert_eq!(progress.percent(), Some(25));

        progress.apply(DownloadEvent::Progress { chunk_length: 500 });
        assert_eq!(progress.fraction(), Some(1.0));
    }

    #[test]
    fn test_progress_with_unknown_or_zero_length() {
        let mut progress = DownloadProgress::default();
        progress.apply(DownloadEvent::Started {
            content_length: None,
        });
        progress.apply(DownloadEvent::Progress { chunk_length: 10 });
        assert_eq!(progress.fraction(), None);
        assert_eq!(progress.downloaded, 10);

        progress.apply(DownloadEvent::Started {
            content_length: Some(0),
        });
        progress.apply(DownloadEvent::Progress { chunk_length: 10 });
        assert_eq!(progress.fraction(), None);
        assert_eq!(progress.percent(), None);
    }

    #[tokio::test]
    async fn test_install_reports_every_event() {
        let coordinator = UpdateCoordinator::new(ScriptedSource::new(vec![
            DownloadEvent::Started {
                content_length: None,
            },
            DownloadEvent::Progress { chunk_length: 3 },
            DownloadEvent::Progress { chunk_length: 4 },
            DownloadEvent::Finished,
        ]));

        let update = coordinator.check().await.unwrap().unwrap();
        let mut seen = Vec::new();
        let progress = coordinator
            .install(&update, |p, e| seen.push((p.downloaded, e)))
            .await
            .unwrap();

        assert_eq!(progress.downloaded, 7);
        assert!(progress.finished);
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[2].0, 7);

        coordinator.relaunch().await.unwrap();
        assert!(*coordinator.source.relaunched.lock());
    }

    #[tokio::test]
    async fn test_install_without_finished_event_fails() {
        let coordinator = UpdateCoordinator::new(ScriptedSource::new(vec![
            DownloadEvent::Started {
                content_length: Some(10),
            },
            DownloadEvent::Progress { chunk_length: 5 },
        ]));
        let update = coordinator.check().await.unwrap().unwrap();

        let err = coordinator.install(&update, |_, _| {}).await.unwrap_err();
        assert!(matches!(err, ProvisioningError::Update(_)));
    }

    #[tokio::test]
    async fn test_download_to_unreachable_host_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("update.bin");
        let mut events = Vec::new();

        let result = download_to_file(
            &reqwest::Client::new(),
            "http://localhost:9/update.bin",
            &dest,
            &mut |e: DownloadEvent| events.push(e),
        )
        .await;

        assert!(matches!(result, Err(ProvisioningError::Http(_))));
        assert!(events.is_empty());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_write_chunks_writes_file_and_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("update.bin");
        let mut events = Vec::new();
        let chunks = futures::stream::iter(vec![
            Ok::<_, ProvisioningError>(b"abc".to_vec()),
            Ok(b"defg".to_vec()),
        ]);

        let written = write_chunks(chunks, &dest, Some(7), &mut |e: DownloadEvent| events.push(e))
            .await
            .unwrap();

        assert_eq!(written, 7);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abcdefg");
        assert_eq!(events.last(), Some(&DownloadEvent::Finished));
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn test_interrupted_download_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("update.bin");
        let mut events = Vec::new();
        let chunks = futures::stream::iter(vec![
            Ok(b"abc".to_vec()),
            Err(ProvisioningError::Update("connection dropped".into())),
        ]);

        let result = write_chunks(chunks, &dest, Some(10), &mut |e: DownloadEvent| events.push(e)).await;

        assert!(matches!(result, Err(ProvisioningError::Update(m)) if m == "connection dropped"));
        assert!(!dest.exists());
        assert_eq!(
            events,
            vec![
                DownloadEvent::Started {
                    content_length: Some(10)
                },
                DownloadEvent::Progress { chunk_length: 3 },
            ]
        );
    }
}
