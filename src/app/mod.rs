mod results;
mod state;
mod ui;

use eframe::{egui, App};
use ignore::Walk;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self as std_mpsc, Receiver, TryRecvError};

use crate::client::{AnalysisClient, DEFAULT_SERVER_URL};
use crate::pipeline::{BatchProcessor, CandidateFile, ProgressEvent};
pub use results::ResultsView;
pub use state::{AnalysisPhase, AnalysisState};

enum WhitelistState {
    Pending,
    Ready(Vec<String>),
}

pub struct ExifAnalyzer {
    server_url: String,
    selected: Vec<CandidateFile>,
    whitelist: WhitelistState,
    whitelist_rx: Option<Receiver<Vec<String>>>,
    events_rx: Option<Receiver<ProgressEvent>>,
    state: AnalysisState,
}

impl ExifAnalyzer {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        // The whitelist is fetched once per session, at startup; a failed
        // fetch degrades to no extracted fields rather than blocking use.
        let client = AnalysisClient::new(DEFAULT_SERVER_URL);
        let (tx, rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(client.fetch_whitelist());
        });

        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            selected: Vec::new(),
            whitelist: WhitelistState::Pending,
            whitelist_rx: Some(rx),
            events_rx: None,
            state: AnalysisState::default(),
        }
    }

    pub fn add_files(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            if !self.selected.iter().any(|c| c.path == path) {
                self.selected.push(CandidateFile::from_path(path));
            }
        }
    }

    pub fn add_folder(&mut self, dir: &Path) {
        for entry in Walk::new(dir) {
            match entry {
                Ok(entry) => {
                    if entry.path().is_file() {
                        let path = entry.path().to_path_buf();
                        if !self.selected.iter().any(|c| c.path == path) {
                            self.selected.push(CandidateFile::from_path(path));
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("Error walking directory: {err}");
                }
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn selection_summary(&self) -> Option<String> {
        if self.selected.is_empty() {
            return None;
        }
        let valid = self.selected.iter().filter(|c| c.is_accepted()).count();
        let total_size: u64 = self.selected.iter().map(|c| c.size).sum();
        Some(format!(
            "{} files selected, {} valid JPEGs ({})",
            self.selected.len(),
            valid,
            crate::utils::file_size::format_size(total_size)
        ))
    }

    fn whitelist_ready(&self) -> bool {
        matches!(self.whitelist, WhitelistState::Ready(_))
    }

    fn can_start(&self) -> bool {
        self.whitelist_ready() && !self.selected.is_empty() && !self.state.phase.is_running()
    }

    pub fn reset(&mut self) {
        // The server URL survives a reset.
        self.selected.clear();
        self.state.clear();
        self.events_rx = None;
    }

    pub fn start_analysis(&mut self) {
        let whitelist = match &self.whitelist {
            WhitelistState::Ready(fields) => fields.clone(),
            WhitelistState::Pending => return,
        };
        self.state.error_message = None;

        let processor = BatchProcessor::new(whitelist);
        let accepted = match processor.accept(self.selected.clone()) {
            Ok(accepted) => accepted,
            Err(err) => {
                // Nothing to do: no progress UI, no network call.
                tracing::warn!("{err}");
                self.state.error_message = Some(err.to_string());
                return;
            }
        };

        let total = accepted.len();
        tracing::info!(total, "starting analysis batch");
        self.state.begin_reading(total);

        let (events_tx, events_rx) = std_mpsc::channel();
        self.events_rx = Some(events_rx);

        let client = AnalysisClient::new(self.server_url.clone());
        std::thread::spawn(move || {
            run_batch(processor, client, accepted, events_tx);
        });
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        if let Some(rx) = &self.whitelist_rx {
            if let Ok(fields) = rx.try_recv() {
                self.whitelist = WhitelistState::Ready(fields);
                self.whitelist_rx = None;
                ctx.request_repaint();
            }
        }

        let mut events = Vec::new();
        let mut disconnected = false;
        if let Some(rx) = &self.events_rx {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }

        let had_updates = !events.is_empty();
        for event in events {
            self.apply_event(event);
        }
        if disconnected {
            self.events_rx = None;
        }

        if had_updates || self.state.phase.is_running() {
            ctx.request_repaint();
        }
    }

    fn apply_event(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::FileDone(status) => {
                self.state.file_done(status);
            }
            ProgressEvent::Submitting => {
                self.state.begin_submitting();
            }
            ProgressEvent::Finished(response) => {
                let view = ResultsView::from_response(*response, &self.server_url);
                self.state.finish(view);
            }
            ProgressEvent::Recommendations(fragment) => {
                if let Some(results) = &mut self.state.results {
                    results.set_recommendations(&fragment);
                }
            }
            ProgressEvent::Failed(message) => {
                tracing::error!("analysis failed: {message}");
                self.state.fail(message);
            }
        }
    }
}

/// Worker-thread entry: the whole batch runs on a current-thread runtime, so
/// per-file completions interleave cooperatively and never preempt the
/// aggregation step. Every exit path sends a terminal event.
fn run_batch(
    processor: BatchProcessor,
    client: AnalysisClient,
    files: Vec<CandidateFile>,
    events: std_mpsc::Sender<ProgressEvent>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = events.send(ProgressEvent::Failed(format!(
                "Could not start worker runtime: {err}"
            )));
            return;
        }
    };

    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, async move {
        let batch = match processor.process_files(files, &events).await {
            Ok(batch) => batch,
            Err(err) => {
                let _ = events.send(ProgressEvent::Failed(err.to_string()));
                return;
            }
        };

        let _ = events.send(ProgressEvent::Submitting);
        let response = match client.analyze(&batch).await {
            Ok(response) => response,
            Err(err) => {
                let _ = events.send(ProgressEvent::Failed(err.to_string()));
                return;
            }
        };

        let recommendations_id = response.additional_data.recommendations_id.clone();
        let _ = events.send(ProgressEvent::Finished(Box::new(response)));

        if let Some(id) = recommendations_id {
            match client.fetch_recommendations(&id).await {
                Ok(fragment) => {
                    let _ = events.send(ProgressEvent::Recommendations(fragment));
                }
                Err(err) => {
                    tracing::warn!("LLM recommendations error: {err}");
                }
            }
        }
    });
}

impl App for ExifAnalyzer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
