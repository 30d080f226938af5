use crate::backend::{ContainerRuntime, ExecOutput, ExecRequest, ProjectSpec, ServiceStatus};
use crate::RuntimeError;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&ExecRequest, &[u8]) -> Option<ExecOutput> + Send + Sync>;

#[derive(Default)]
struct MockState {
    running: BTreeSet<String>,
    calls: Vec<String>,
    inputs: Vec<Vec<u8>>,
}

/// In-memory runtime used by tests and by `--runtime mock`.
///
/// `up` marks every declared service running and `down` clears them. Exec
/// calls against a stopped service fail the way compose does. A responder
/// can override the output of individual exec calls.
#[derive(Default)]
pub struct MockRuntime {
    state: Mutex<MockState>,
    responder: Option<Responder>,
    logs: BTreeMap<String, String>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer exec calls for which `f` returns `Some`. Others get the default reply.
    #[must_use]
    pub fn with_responder<F>(mut self, f: F) -> Self
    where
        F: Fn(&ExecRequest, &[u8]) -> Option<ExecOutput> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_logs(mut self, service: &str, text: &str) -> Self {
        self.logs.insert(service.to_owned(), text.to_owned());
        self
    }

    /// Every operation seen so far, e.g. `up`, `down -v`, `exec db mariadb ...`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    /// Bytes streamed through `exec_with_input`, one entry per call.
    pub fn inputs(&self) -> Vec<Vec<u8>> {
        self.lock().map(|s| s.inputs.clone()).unwrap_or_default()
    }

    /// Simulate a container that exited on its own.
    pub fn stop_service(&self, service: &str) {
        if let Ok(mut state) = self.lock() {
            state.running.remove(service);
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::Parse(format!("mutex poisoned: {e}")))
    }

    fn respond(&self, request: &ExecRequest, input: &[u8]) -> Result<ExecOutput, RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("exec {}", request.display()));
        if !state.running.contains(&request.service) {
            return Ok(ExecOutput::failed(
                1,
                format!("service \"{}\" is not running", request.service),
            ));
        }
        drop(state);

        if let Some(out) = self.responder.as_ref().and_then(|f| f(request, input)) {
            return Ok(out);
        }
        let is_version_query = request.argv.iter().any(|a| a == "core")
            && request.argv.iter().any(|a| a == "version");
        if is_version_query {
            return Ok(ExecOutput::ok("6.5.0\n"));
        }
        Ok(ExecOutput::ok(""))
    }
}

impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn up(&self, project: &ProjectSpec) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push("up".to_owned());
        state.running.extend(project.services.iter().cloned());
        Ok(())
    }

    fn down(&self, _project: &ProjectSpec, remove_volumes: bool) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.calls.push(if remove_volumes { "down -v" } else { "down" }.to_owned());
        state.running.clear();
        Ok(())
    }

    fn status(&self, project: &ProjectSpec) -> Result<Vec<ServiceStatus>, RuntimeError> {
        let state = self.lock()?;
        if state.running.is_empty() {
            return Ok(Vec::new());
        }
        Ok(project
            .services
            .iter()
            .map(|svc| {
                let running = state.running.contains(svc);
                ServiceStatus {
                    service: svc.clone(),
                    running,
                    state: if running { "running" } else { "exited" }.to_owned(),
                    health: None,
                }
            })
            .collect())
    }

    fn exec(
        &self,
        _project: &ProjectSpec,
        request: &ExecRequest,
    ) -> Result<ExecOutput, RuntimeError> {
        self.respond(request, &[])
    }

    fn exec_with_input(
        &self,
        _project: &ProjectSpec,
        request: &ExecRequest,
        input: &mut dyn Read,
    ) -> Result<ExecOutput, RuntimeError> {
        let mut buf = Vec::new();
        input.read_to_end(&mut buf)?;
        self.lock()?.inputs.push(buf.clone());
        self.respond(request, &buf)
    }

    fn exec_interactive(
        &self,
        _project: &ProjectSpec,
        request: &ExecRequest,
    ) -> Result<i32, RuntimeError> {
        Ok(self.respond(request, &[])?.code)
    }

    fn logs(
        &self,
        _project: &ProjectSpec,
        service: Option<&str>,
        tail: usize,
    ) -> Result<String, RuntimeError> {
        let text = match service {
            Some(s) => self.logs.get(s).cloned().unwrap_or_default(),
            None => self.logs.values().cloned().collect::<Vec<_>>().join(""),
        };
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(tail);
        let mut out = lines[start..].join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(out)
    }

    fn follow_logs(
        &self,
        project: &ProjectSpec,
        service: Option<&str>,
        tail: usize,
    ) -> Result<i32, RuntimeError> {
        print!("{}", self.logs(project, service, tail)?);
        Ok(0)
    }
}
