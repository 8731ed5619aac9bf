//! Worker thread that owns the collaborators and runs pipelines on request.

use std::{
    panic::{self, AssertUnwindSafe},
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};

use crate::{
    Error, Result,
    collab::{Collaborators, LazyCollaborators},
    error::panic_message,
    options::PipelineOptions,
    pipeline::{Pipeline, Stage},
    protocol::{Request, Response, RunId},
};

const RUNNER_THREAD_NAME: &str = "semtour-runner";

pub struct PipelineRunner {
    options: PipelineOptions,
    collaborators: LazyCollaborators,
    responses: Sender<Response>,
}

impl PipelineRunner {
    /// Starts the runner thread. Collaborators are loaded by `loader` on the
    /// runner thread, on the first `Init` or `Sort`.
    pub fn spawn<F>(options: PipelineOptions, loader: F) -> Result<RunnerHandle>
    where
        F: FnOnce() -> Result<Collaborators> + Send + 'static,
    {
        options.validate()?;

        let (request_tx, request_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();
        let runner = Self {
            options,
            collaborators: LazyCollaborators::new(loader),
            responses: response_tx,
        };

        let thread = thread::Builder::new()
            .name(RUNNER_THREAD_NAME.to_string())
            .spawn(move || runner.serve(request_rx))?;

        Ok(RunnerHandle {
            requests: request_tx,
            responses: response_rx,
            thread: Some(thread),
        })
    }

    fn serve(mut self, requests: Receiver<Request>) {
        log::info!("runner: start");
        log::info!("options: {}", self.options);

        for request in requests.iter() {
            match request {
                Request::Init => self.handle_init(),
                Request::Sort { run_id, items } => self.handle_sort(run_id, items),
                Request::Shutdown => {
                    log::debug!("runner: shutdown requested");
                    break;
                }
            }
        }

        log::info!("runner: stop");
    }

    fn handle_init(&mut self) {
        let response = match self.collaborators.get() {
            Ok(_) => Response::Ready,
            Err(err) => Response::Error {
                run_id: None,
                message: err.to_string(),
            },
        };
        send(&self.responses, response);
    }

    fn handle_sort(&mut self, run_id: RunId, items: Vec<String>) {
        log::info!("runner: sort run={run_id} n={}", items.len());

        let collaborators = match self.collaborators.get() {
            Ok(collaborators) => collaborators,
            Err(err) => {
                send(
                    &self.responses,
                    Response::Error {
                        run_id: Some(run_id),
                        message: err.to_string(),
                    },
                );
                return;
            }
        };

        let status_tx = self.responses.clone();
        let mut progress = move |_stage: Stage, message: &str| {
            send(
                &status_tx,
                Response::Status {
                    run_id,
                    message: message.to_string(),
                },
            );
        };

        let mut pipeline = Pipeline::new(self.options.clone());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pipeline.run(items, collaborators, &mut progress)
        }));

        let response = match outcome {
            Ok(Ok(result)) => Response::Sorted { run_id, result },
            Ok(Err(err)) => Response::Error {
                run_id: Some(run_id),
                message: err.to_string(),
            },
            Err(payload) => {
                let message = format!("pipeline panicked: {}", panic_message(payload.as_ref()));
                log::error!("runner: run={run_id} {message}");
                Response::Error {
                    run_id: Some(run_id),
                    message,
                }
            }
        };
        send(&self.responses, response);
    }
}

fn send(responses: &Sender<Response>, response: Response) {
    if responses.send(response).is_err() {
        log::debug!("runner: controller gone, dropping response");
    }
}


/// Controller side of a running [`PipelineRunner`].
pub struct RunnerHandle {
    requests: Sender<Request>,
    responses: Receiver<Response>,
    thread: Option<JoinHandle<()>>,
}

impl RunnerHandle {
    pub fn send(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| Error::other("runner thread has stopped"))
    }

    /// Next queued response, without waiting.
    pub fn try_recv(&self) -> Result<Option<Response>> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::other("runner thread has stopped")),
        }
    }

    /// Waits up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Response>> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::other("runner thread has stopped")),
        }
    }

    /// Stops the runner after its current request and waits for the thread.
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        let _ = self.requests.send(Request::Shutdown);
        thread
            .join()
            .map_err(|_| Error::other("runner thread panicked"))
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        // Detach; the runner exits once it drains the request channel.
        if self.thread.take().is_some() {
            let _ = self.requests.send(Request::Shutdown);
        }
    }
}
