//! 미러 폴더 감시 모듈
//!
//! 미러 폴더의 변경 알림과 주기 타이머, 두 가지 트리거로 동일한 정합성 작업을 실행합니다.
//! 알림이 누락되어도 타이머가 다음 주기에 복구합니다.

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Result;
use crate::mirror_engine::MirrorEngine;

/// 알림이 끊임없이 이어져도 debounce의 이 배수 안에는 처리합니다.
const MAX_DEBOUNCE_FACTOR: u32 = 5;

/// 감시자가 호출하는 두 진입점
#[async_trait]
pub trait MirrorTriggers: Send + Sync + 'static {
    /// 폴더 변경 알림 (디바운싱 후)
    async fn on_folder_change(&self);
    /// 주기 타이머
    async fn on_tick(&self);
}

#[async_trait]
impl MirrorTriggers for MirrorEngine {
    async fn on_folder_change(&self) {
        self.handle_folder_change().await;
    }

    async fn on_tick(&self) {
        if let Err(e) = self.reconcile().await {
            debug!("Periodic reconcile failed, retrying next tick: {}", e);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ObserverOptions {
    pub interval: Duration,
    pub debounce: Duration,
}

/// 미러 폴더 하나에 대한 감시자
///
/// `stop()` 또는 drop 시 타이머와 watch 핸들이 모두 해제됩니다.
pub struct MirrorObserver {
    mirror_dir: PathBuf,
    _watcher: RecommendedWatcher,
    cancellation_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MirrorObserver {
    /// 감시를 시작합니다. tokio 런타임 안에서 호출해야 합니다.
    pub fn start<T: MirrorTriggers>(
        mirror_dir: &Path,
        triggers: Arc<T>,
        options: ObserverOptions,
    ) -> Result<Self> {
        std::fs::create_dir_all(mirror_dir)
            .map_err(|e| crate::error::MirrorError::io("create directory", mirror_dir, e))?;

        let cancellation_token = CancellationToken::new();
        let token = cancellation_token.clone();

        // 버퍼 100: 이벤트 종류를 구분하지 않으므로 가득 차면 버려도 됩니다.
        let (tx, mut rx) = mpsc::channel::<()>(100);

        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                match res {
                    // 읽기 접근은 무시 (가시성 계산의 read_dir 자체가 이벤트를 만들기 때문)
                    Ok(event) if matches!(event.kind, EventKind::Access(_)) => {}
                    Ok(_) => {
                        let _ = tx.try_send(());
                    }
                    Err(e) => warn!("Mirror folder watch error: {}", e),
                }
            })?;
        watcher.watch(mirror_dir, RecursiveMode::NonRecursive)?;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(options.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let max_wait = options.debounce.saturating_mul(MAX_DEBOUNCE_FACTOR);
            // (첫 알림 시각, 처리 예정 시각)
            let mut burst: Option<(Instant, Instant)> = None;

            loop {
                let flush_at = burst.map(|(_, at)| at);
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => triggers.on_tick().await,
                    _ = tokio::time::sleep_until(flush_at.unwrap_or_else(Instant::now)), if flush_at.is_some() => {
                        burst = None;
                        triggers.on_folder_change().await;
                    }
                    event = rx.recv() => {
                        if event.is_none() {
                            break;
                        }
                        // 디바운싱: 알림마다 처리 시각을 미루되, 첫 알림 후 max_wait를 넘기지 않습니다.
                        let now = Instant::now();
                        let started = burst.map_or(now, |(first, _)| first);
                        burst = Some((started, (now + options.debounce).min(started + max_wait)));
                    }
                }
            }
            debug!("Mirror observer loop stopped");
        });

        Ok(Self {
            mirror_dir: mirror_dir.to_path_buf(),
            _watcher: watcher,
            cancellation_token,
            task: Some(task),
        })
    }

    pub fn mirror_dir(&self) -> &Path {
        &self.mirror_dir
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// 감시를 중지하고 백그라운드 작업이 끝날 때까지 기다립니다.
    pub async fn stop(mut self) {
        self.cancellation_token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MirrorObserver {
    fn drop(&mut self) {
        // Drop에서는 기다리지 않고 취소만 합니다.
        self.cancellation_token.cancel();
    }
}
