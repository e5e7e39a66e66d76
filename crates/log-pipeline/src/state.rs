//! 컷오프 상태 저장소
//!
//! 마지막으로 보고한 이벤트의 타임스탬프 키(`YYYYMMDDHHMMSS`) 하나를 파일에 보관합니다.
//!
//! - 로드는 실패하지 않습니다. 파일이 없거나 읽을 수 없거나 형식이 잘못되었으면
//!   경고를 남기고 epoch 하한값을 사용합니다.
//! - 첫 줄만 컷오프로 해석하며 그 뒤의 내용은 무시합니다.
//! - 저장은 같은 디렉토리의 임시 파일에 쓴 뒤 rename 합니다.

use std::path::{Path, PathBuf};

use shieldpost_core::types::TimestampKey;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::LogPipelineError;

/// 파일 기반 컷오프 저장소
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 저장된 컷오프를 읽습니다.
    pub async fn load(&self) -> TimestampKey {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "state file not found, starting from epoch floor");
                return TimestampKey::epoch_floor();
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to read state file, starting from epoch floor"
                );
                return TimestampKey::epoch_floor();
            }
        };

        let content = String::from_utf8_lossy(&raw);
        let first_line = content.lines().next().unwrap_or_default();

        match first_line.parse::<TimestampKey>() {
            Ok(key) => {
                debug!(path = %self.path.display(), cutoff = %key, "loaded cutoff");
                key
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "malformed state file, starting from epoch floor"
                );
                TimestampKey::epoch_floor()
            }
        }
    }

    /// 컷오프를 저장합니다. 파일이 없으면 새로 만듭니다.
    pub async fn save(&self, key: &TimestampKey) -> Result<(), LogPipelineError> {
        let temp_path = self.temp_path()?;

        let result = async {
            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(format!("{key}\n").as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&temp_path, &self.path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.state_error(e.to_string()));
        }

        debug!(path = %self.path.display(), cutoff = %key, "cutoff saved");
        Ok(())
    }

    /// 상태 파일을 삭제합니다. 없는 파일은 성공으로 봅니다.
    pub async fn reset(&self) -> Result<(), LogPipelineError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.state_error(e.to_string())),
        }
    }

    fn temp_path(&self) -> Result<PathBuf, LogPipelineError> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| self.state_error("state path has no file name".to_owned()))?;
        let temp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(match self.path.parent() {
            Some(parent) => parent.join(temp_name),
            None => PathBuf::from(temp_name),
        })
    }

    fn state_error(&self, reason: String) -> LogPipelineError {
        LogPipelineError::State {
            path: self.path.display().to_string(),
            reason,
        }
    }
}
