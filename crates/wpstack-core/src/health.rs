//! Read-only aggregation of service status, database reachability, the
//! application version, host port connectivity, and recent error counts.

use crate::engine::{db_ping, wp_request, Engine, PING_LIMIT};
use crate::CoreError;
use serde::Serialize;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use wpstack_runtime::{ProjectSpec, ServiceStatus};
use wpstack_schema::{services, EnvConfig};
use wpstack_store::EnvRecord;

const ERROR_SCAN_LINES: usize = 100;
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl HealthCheck {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_owned(),
            status,
            message: message.into(),
        }
    }

    pub fn pass(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Pass, message)
    }

    pub fn warn(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warn, message)
    }

    pub fn fail(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Fail, message)
    }

    pub fn info(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Info, message)
    }
}

/// `healthy` is false when any check failed. Warnings do not affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    pub fn from_checks(checks: Vec<HealthCheck>) -> Self {
        Self {
            healthy: !checks.iter().any(|c| c.status == CheckStatus::Fail),
            checks,
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &HealthCheck> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Fail)
    }
}

impl Engine {
    /// Never changes lifecycle state.
    pub fn health(&self) -> Result<HealthReport, CoreError> {
        let config = self.config()?;
        let project = self.project_spec(&config);
        let record = self.state_store().get()?;
        Ok(self.health_sweep(&config, &project, &record))
    }

    pub(crate) fn health_sweep(
        &self,
        config: &EnvConfig,
        project: &ProjectSpec,
        record: &EnvRecord,
    ) -> HealthReport {
        let mut checks = Vec::new();

        let statuses = match self.runtime().status(project) {
            Ok(s) => s,
            Err(e) => {
                checks.push(HealthCheck::fail(
                    "runtime",
                    format!("cannot query service status: {e}"),
                ));
                Vec::new()
            }
        };
        for service in &project.services {
            checks.push(service_check(service, &statuses));
        }
        let running = |name: &str| statuses.iter().any(|s| s.service == name && s.running);

        checks.push(self.database_check(project, record, running(services::DB)));
        checks.push(self.application_check(project, running(services::WPCLI)));

        for (name, port) in [
            ("web", config.ports.web),
            ("admin-ui", config.ports.admin_ui),
            ("mail-ui", config.ports.mail_ui),
        ] {
            checks.push(port_check(name, port));
        }

        checks.push(self.error_scan(project));
        HealthReport::from_checks(checks)
    }

    fn database_check(&self, project: &ProjectSpec, record: &EnvRecord, running: bool) -> HealthCheck {
        const NAME: &str = "database";
        if !running {
            return HealthCheck::fail(NAME, "database service is not running");
        }
        if record.db_ready_at.is_none() {
            return HealthCheck::fail(
                NAME,
                "database has not answered a readiness query since the last `up`",
            );
        }
        match self.runtime().exec(project, &db_ping(PING_LIMIT)) {
            Ok(out) if out.success() => HealthCheck::pass(NAME, "database answers queries"),
            Ok(out) => HealthCheck::fail(
                NAME,
                format!("database query failed (exit {}): {}", out.code, out.stderr.trim()),
            ),
            Err(e) => HealthCheck::fail(NAME, format!("database query failed: {e}")),
        }
    }

    fn application_check(&self, project: &ProjectSpec, cli_running: bool) -> HealthCheck {
        const NAME: &str = "application";
        if !cli_running {
            return HealthCheck::info(NAME, "CLI runner is not running; version probe skipped");
        }
        match self.runtime().exec(project, &wp_request(&["core", "version"])) {
            Ok(out) if out.success() => {
                HealthCheck::pass(NAME, format!("WordPress {}", out.stdout.trim()))
            }
            Ok(out) => HealthCheck::fail(
                NAME,
                format!("version probe failed (exit {}): {}", out.code, out.stderr.trim()),
            ),
            Err(e) => HealthCheck::fail(NAME, format!("version probe failed: {e}")),
        }
    }

    fn error_scan(&self, project: &ProjectSpec) -> HealthCheck {
        const NAME: &str = "recent-errors";
        match self
            .runtime()
            .logs(project, Some(services::WORDPRESS), ERROR_SCAN_LINES)
        {
            Ok(text) => match count_error_lines(&text) {
                0 => HealthCheck::pass(
                    NAME,
                    format!("no errors in the last {ERROR_SCAN_LINES} application log lines"),
                ),
                n => HealthCheck::warn(
                    NAME,
                    format!("{n} error line(s) in the last {ERROR_SCAN_LINES} application log lines"),
                ),
            },
            Err(e) => HealthCheck::warn(NAME, format!("cannot read application logs: {e}")),
        }
    }
}

fn service_check(service: &str, statuses: &[ServiceStatus]) -> HealthCheck {
    let name = format!("service:{service}");
    match statuses.iter().find(|s| s.service == service) {
        Some(s) if s.running => {
            let suffix = s
                .health
                .as_deref()
                .map(|h| format!(" ({h})"))
                .unwrap_or_default();
            HealthCheck::pass(&name, format!("{service} is running{suffix}"))
        }
        Some(s) => HealthCheck::fail(&name, format!("{service} is {}", s.state)),
        None => HealthCheck::fail(&name, format!("{service} has no container")),
    }
}

fn port_check(name: &str, port: u16) -> HealthCheck {
    let check_name = format!("port:{name}");
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    if TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok() {
        HealthCheck::pass(&check_name, format!("localhost:{port} accepts connections"))
    } else {
        HealthCheck::warn(&check_name, format!("localhost:{port} is not reachable"))
    }
}

/// Lines mentioning an error or a fatal condition, case-insensitively.
pub fn count_error_lines(text: &str) -> usize {
    text.lines()
        .filter(|line| {
            let lower = line.to_ascii_lowercase();
            lower.contains("error") || lower.contains("fatal")
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_unhealthy_only_on_failures() {
        let ok = HealthReport::from_checks(vec![
            HealthCheck::pass("a", "fine"),
            HealthCheck::warn("b", "meh"),
            HealthCheck::info("c", "fyi"),
        ]);
        assert!(ok.healthy);

        let bad = HealthReport::from_checks(vec![
            HealthCheck::pass("a", "fine"),
            HealthCheck::fail("b", "broken"),
        ]);
        assert!(!bad.healthy);
        assert_eq!(bad.failed().count(), 1);
    }

    #[test]
    fn counts_error_lines() {
        let log = "AH00558: apache2: notice\n\
                   PHP Fatal error:  Uncaught Exception\n\
                   [core:error] something\n\
                   GET /wp-admin 200\n";
        assert_eq!(count_error_lines(log), 2);
        assert_eq!(count_error_lines(""), 0);
    }

    #[test]
    fn missing_service_fails() {
        let statuses = vec![ServiceStatus {
            service: "db".to_owned(),
            running: false,
            state: "exited".to_owned(),
            health: None,
        }];
        assert_eq!(service_check("db", &statuses).status, CheckStatus::Fail);
        assert_eq!(service_check("wpcli", &statuses).status, CheckStatus::Fail);
    }

    #[test]
    fn running_service_reports_health() {
        let statuses = vec![ServiceStatus {
            service: "db".to_owned(),
            running: true,
            state: "running".to_owned(),
            health: Some("healthy".to_owned()),
        }];
        let check = service_check("db", &statuses);
        assert_eq!(check.status, CheckStatus::Pass);
        assert!(check.message.contains("healthy"));
    }

    #[test]
    fn check_status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthCheck::warn("x", "y")).unwrap();
        assert!(json.contains("\"status\":\"warn\""));
    }
}
