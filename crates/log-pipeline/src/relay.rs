//! 리포트 전송 -- 로컬 MTA 릴레이로 DShield 리포트를 보냅니다.
//!
//! [`ReportSender`] trait으로 전송 방식을 추상화합니다.
//!
//! - [`SmtpRelaySender`]: 평문 SMTP로 릴레이에 전달 (재시도 없음)
//! - [`StdoutSender`]: 테스트 모드, 메일 형태 그대로 표준 출력에 기록
//! - [`RelayTransport`]: 설정에 따라 둘 중 하나를 선택하는 런타임 디스패치

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::report::DShieldReport;

/// 리포트 전송 추상화
///
/// 실제 구현은 [`SmtpRelaySender`], 테스트 모드는 [`StdoutSender`]입니다.
pub trait ReportSender: Send + Sync {
    /// 전송 방식 이름 (로그용)
    fn name(&self) -> &str;

    /// 리포트를 전송합니다.
    ///
    /// # Errors
    ///
    /// 릴레이 연결, SMTP 대화, 메시지 구성이 실패하면 `LogPipelineError::Relay`를 반환합니다.
    fn send(
        &self,
        report: &DShieldReport,
    ) -> impl Future<Output = Result<(), LogPipelineError>> + Send;
}

/// 릴레이 호스트 이름을 해석합니다.
///
/// 해석되지 않는 릴레이는 설정 에러입니다.
pub async fn resolve_relay(host: &str, port: u16) -> Result<Vec<SocketAddr>, LogPipelineError> {
    let unresolvable = |reason: String| LogPipelineError::Config {
        field: "relay.host".to_owned(),
        reason,
    };

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| unresolvable(format!("cannot resolve '{host}': {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(unresolvable(format!("'{host}' resolved to no addresses")));
    }

    debug!(host, port, addrs = ?addrs, "relay resolved");
    Ok(addrs)
}

/// SMTP 릴레이 전송기
pub struct SmtpRelaySender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpRelaySender {
    /// 평문 SMTP 전송기를 생성합니다. 인증과 TLS는 사용하지 않습니다.
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        let host = host.into();
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host.as_str())
            .port(port)
            .timeout(Some(timeout))
            .build();
        Self { transport, host }
    }

    fn build_message(report: &DShieldReport) -> Result<Message, LogPipelineError> {
        let from: Mailbox = report
            .from()
            .parse()
            .map_err(|e| LogPipelineError::Relay(format!("invalid from address: {e}")))?;
        let to: Mailbox = report
            .to()
            .parse()
            .map_err(|e| LogPipelineError::Relay(format!("invalid to address: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(report.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(report.body().to_owned())
            .map_err(|e| LogPipelineError::Relay(format!("failed to build message: {e}")))
    }
}

impl ReportSender for SmtpRelaySender {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, report: &DShieldReport) -> Result<(), LogPipelineError> {
        let message = Self::build_message(report)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| LogPipelineError::Relay(format!("relay {}: {e}", self.host)))?;

        info!(
            relay = %self.host,
            code = %response.code(),
            records = report.len(),
            "report accepted by relay"
        );
        Ok(())
    }
}

/// 테스트 모드 전송기 -- 표준 출력에 메일 형태로 기록합니다.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSender;

impl ReportSender for StdoutSender {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, report: &DShieldReport) -> Result<(), LogPipelineError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(report.envelope().as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// 설정으로 선택되는 전송기
pub enum RelayTransport {
    Smtp(SmtpRelaySender),
    Stdout(StdoutSender),
}

impl RelayTransport {
    /// 테스트 모드면 [`StdoutSender`], 아니면 릴레이를 해석한 뒤 [`SmtpRelaySender`]를 만듭니다.
    ///
    /// 테스트 모드에서는 DNS 조회를 하지 않습니다.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self, LogPipelineError> {
        if config.dry_run {
            return Ok(Self::Stdout(StdoutSender));
        }
        resolve_relay(&config.relay_host, config.relay_port).await?;
        Ok(Self::Smtp(SmtpRelaySender::new(
            config.relay_host.clone(),
            config.relay_port,
            config.relay_timeout,
        )))
    }
}

impl ReportSender for RelayTransport {
    fn name(&self) -> &str {
        match self {
            Self::Smtp(s) => s.name(),
            Self::Stdout(s) => s.name(),
        }
    }

    async fn send(&self, report: &DShieldReport) -> Result<(), LogPipelineError> {
        match self {
            Self::Smtp(s) => s.send(report).await,
            Self::Stdout(s) => s.send(report).await,
        }
    }
}

/// 테스트용 Mock 전송기
///
/// 전송된 리포트를 기록하고, 설정에 따라 실패를 시뮬레이션합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockReportSender {
    /// 전송된 리포트 목록
    pub sent: std::sync::Mutex<Vec<DShieldReport>>,
    /// 전송 실패를 시뮬레이션할지 여부
    pub fail: bool,
}

#[cfg(test)]
impl MockReportSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 전송이 항상 실패하도록 설정합니다.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl ReportSender for MockReportSender {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, report: &DShieldReport) -> Result<(), LogPipelineError> {
        if self.fail {
            return Err(LogPipelineError::Relay("mock failure".to_owned()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(report.clone());
        }
        Ok(())
    }
}
