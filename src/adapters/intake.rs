use crate::config::toml_config::ImportConfig;
use crate::domain::ports::DescriptorHandler;
use crate::utils::error::Result;
use crate::utils::fs::move_into_subdir;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome counts of one intake scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl IntakeSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Polls the intake directory and hands each settled descriptor to a handler.
/// Successful descriptors (and their payloads) go to `success/`, failed
/// descriptors to `error/`. A scan batch is drained before the next scan
/// starts, so a descriptor is never handed out twice.
pub struct DirectoryIntake {
    directory: PathBuf,
    poll_interval: Duration,
    min_file_age: Duration,
    max_concurrent: usize,
    success_dir: String,
    failed_dir: String,
}

impl DirectoryIntake {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            poll_interval: Duration::from_secs(5),
            min_file_age: Duration::from_secs(6),
            max_concurrent: 4,
            success_dir: "success".to_string(),
            failed_dir: "error".to_string(),
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.intake_dir())
            .with_poll_interval(config.intake_poll_interval())
            .with_min_file_age(config.min_file_age())
            .with_max_concurrent(config.max_concurrent_imports())
            .with_dirs(config.success_dir(), config.failed_dir())
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        // tokio's interval panics on a zero period
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_min_file_age(mut self, min_file_age: Duration) -> Self {
        self.min_file_age = min_file_age;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_dirs(mut self, success_dir: &str, failed_dir: &str) -> Self {
        self.success_dir = success_dir.to_string();
        self.failed_dir = failed_dir.to_string();
        self
    }

    /// `*.xml` files (lowercase extension only) in the intake directory that have not been modified for
    /// at least `min_file_age`, oldest name first.
    pub async fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut descriptors = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        let now = Utc::now();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_xml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == "xml")
                .unwrap_or(false);
            if !is_xml {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let modified: DateTime<Utc> = metadata.modified()?.into();
            let settled = self.min_file_age.is_zero()
                || now
                    .signed_duration_since(modified)
                    .to_std()
                    .map(|age| age >= self.min_file_age)
                    .unwrap_or(false);
            if settled {
                descriptors.push(path);
            } else {
                tracing::debug!("⏳ {} is still settling", path.display());
            }
        }

        descriptors.sort();
        Ok(descriptors)
    }

    /// Processes every settled descriptor currently in the directory.
    pub async fn run_once(&self, handler: Arc<dyn DescriptorHandler>) -> Result<IntakeSummary> {
        let descriptors = self.scan().await?;
        let mut summary = IntakeSummary::default();
        if descriptors.is_empty() {
            return Ok(summary);
        }

        tracing::info!("📂 Found {} descriptor(s) in {}", descriptors.len(), self.directory.display());

        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for descriptor in descriptors {
            let handler = Arc::clone(&handler);
            let permits = Arc::clone(&permits);
            let success_dir = self.success_dir.clone();
            let failed_dir = self.failed_dir.clone();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                match handler.handle(&descriptor).await {
                    Ok(context) => {
                        let mut finished = vec![descriptor.clone()];
                        finished.extend(context.payload_path());
                        for file in finished {
                            settle(&file, &success_dir).await;
                        }
                        true
                    }
                    Err(_) => {
                        // the handler already logged and quarantined
                        settle(&descriptor, &failed_dir).await;
                        false
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    tracing::error!("❌ Import task aborted: {}", e);
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            "📊 Intake scan done: {} descriptor(s), {} succeeded, {} failed",
            summary.total(),
            summary.succeeded,
            summary.failed
        );
        Ok(summary)
    }

    /// Scans every `poll_interval` until `shutdown` resolves. Scan errors are
    /// logged and the loop keeps going.
    pub async fn run<F>(&self, handler: Arc<dyn DescriptorHandler>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            "👀 Watching {} every {:?}",
            self.directory.display(),
            self.poll_interval
        );

        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("🛑 Shutdown requested, stopping intake");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(Arc::clone(&handler)).await {
                        tracing::error!("❌ Intake scan failed: {}", e);
                    }
                }
            }
        }
    }
}

async fn settle(file: &Path, dir_name: &str) {
    if !tokio::fs::try_exists(file).await.unwrap_or(false) {
        return;
    }
    match move_into_subdir(file, dir_name).await {
        Ok(destination) => tracing::debug!("📁 Moved {} to {}", file.display(), destination.display()),
        Err(e) => tracing::error!("❌ Failed to move {} to {}: {}", file.display(), dir_name, e),
    }
}
