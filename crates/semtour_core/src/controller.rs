//! Host-facing side of the runner: turns user actions into requests and
//! runner responses into state the UI can read.

use std::{sync::Arc, time::Duration};

use crate::{
    Error, Result,
    protocol::{Request, Response, RunId},
    runner::RunnerHandle,
    view::ViewState,
};

const MIN_ITEMS: usize = 2;

/// One item per non-blank line. Lines are kept as written.
pub fn parse_items(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControllerEvent {
    Ready,
    Status { run_id: RunId, message: String },
    Sorted { run_id: RunId },
    Failed { run_id: Option<RunId>, message: String },
}

pub struct Controller {
    runner: RunnerHandle,
    init_sent: bool,
    ready: bool,
    last_run: RunId,
    active_run: Option<RunId>,
    status: Option<String>,
    last_error: Option<String>,
    view: Option<ViewState>,
}

impl Controller {
    pub fn new(runner: RunnerHandle) -> Self {
        Self {
            runner,
            init_sent: false,
            ready: false,
            last_run: RunId::default(),
            active_run: None,
            status: None,
            last_error: None,
            view: None,
        }
    }

    /// Asks the runner to load its collaborators. Only the first call sends.
    pub fn init(&mut self) -> Result<()> {
        if self.init_sent {
            return Ok(());
        }
        self.runner.send(Request::Init)?;
        self.init_sent = true;
        self.status = Some("Loading models...".to_string());
        Ok(())
    }

    pub fn sort_text(&mut self, text: &str) -> Result<RunId> {
        self.request_sort(parse_items(text))
    }

    /// Dispatches a sort. Nothing is sent when validation fails or another
    /// run is still in flight.
    pub fn request_sort(&mut self, items: Vec<String>) -> Result<RunId> {
        if items.len() < MIN_ITEMS {
            let err = Error::validation(format!("Please enter at least {MIN_ITEMS} items"));
            self.last_error = Some(err.to_string());
            return Err(err);
        }
        if let Some(active) = self.active_run {
            return Err(Error::Busy(active));
        }

        let run_id = self.last_run.next();
        log::info!("controller: sort run={run_id} n={}", items.len());
        self.runner.send(Request::Sort { run_id, items })?;

        self.last_run = run_id;
        self.active_run = Some(run_id);
        self.last_error = None;
        self.status = Some("Queued".to_string());
        Ok(run_id)
    }

    /// Stops waiting for the active run. Its late messages are ignored.
    pub fn abandon_run(&mut self) -> Option<RunId> {
        let abandoned = self.active_run.take();
        if let Some(run_id) = abandoned {
            log::debug!("controller: abandoned run={run_id}");
            self.status = None;
        }
        abandoned
    }

    /// Applies every response already queued. Never blocks.
    pub fn poll(&mut self) -> Result<Vec<ControllerEvent>> {
        let mut events = Vec::new();
        while let Some(response) = self.runner.try_recv()? {
            events.extend(self.apply(response));
        }
        Ok(events)
    }

    /// Like [`poll`](Self::poll) but waits up to `timeout` for the first response.
    pub fn poll_timeout(&mut self, timeout: Duration) -> Result<Vec<ControllerEvent>> {
        let mut events = Vec::new();
        if let Some(response) = self.runner.recv_timeout(timeout)? {
            events.extend(self.apply(response));
        }
        events.extend(self.poll()?);
        Ok(events)
    }

    fn apply(&mut self, response: Response) -> Option<ControllerEvent> {
        if let Some(run_id) = response.run_id()
            && self.active_run != Some(run_id)
        {
            log::debug!("controller: ignoring stale response run={run_id}");
            return None;
        }

        match response {
            Response::Ready => {
                self.ready = true;
                self.status = None;
                Some(ControllerEvent::Ready)
            }
            Response::Status { run_id, message } => {
                self.status = Some(message.clone());
                Some(ControllerEvent::Status { run_id, message })
            }
            Response::Sorted { run_id, result } => {
                self.active_run = None;
                self.ready = true;
                self.status = Some(format!("Sorted {} items", result.len()));
                let result = Arc::new(result);
                match &mut self.view {
                    Some(view) => {
                        view.install(result);
                    }
                    None => self.view = Some(ViewState::new(result)),
                }
                Some(ControllerEvent::Sorted { run_id })
            }
            Response::Error { run_id, message } => {
                if run_id.is_some() {
                    self.active_run = None;
                } else {
                    self.ready = false;
                }
                log::warn!("controller: error run={run_id:?} message={message}");
                self.status = None;
                self.last_error = Some(message.clone());
                Some(ControllerEvent::Failed { run_id, message })
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_busy(&self) -> bool {
        self.active_run.is_some()
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.active_run
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn view(&self) -> Option<&ViewState> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut ViewState> {
        self.view.as_mut()
    }

    /// Stops the runner thread and waits for it.
    pub fn shutdown(self) -> Result<()> {
        self.runner.shutdown()
    }
}
