//! Control layer — drives the live graph from application commands.
//!
//! The control loop owns the graph, the recording controller and the
//! cleanup scheduler. Each iteration it drains pending commands, pumps
//! bus messages into the controller, and runs any deferred cleanup tasks,
//! reporting outcomes back to the application as events.

pub mod recorder;
pub mod scheduler;

pub use recorder::{BranchController, RecordState};
pub use scheduler::{CleanupScheduler, CleanupTask};

use crate::config::SectionMap;
use crate::graph::container::{Graph, GraphMessage};
use crate::graph::factory::NodeFactory;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::time::Duration;

/// Commands sent into the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    StartRecording,
    StopRecording,
    Shutdown,
}

/// Events reported back to the application.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    RecordingStarted(PathBuf),
    RecordingStopped(PathBuf),
    RecordingFailed(String),
    StreamError { source: String, message: String },
}

/// Single-threaded command/message pump around the live graph.
pub struct ControlLoop {
    graph: Graph,
    controller: BranchController,
    scheduler: CleanupScheduler,
    factory: NodeFactory,
    props: SectionMap,
    bus_rx: Receiver<GraphMessage>,
    cmd_rx: Receiver<ControlCommand>,
    event_tx: Sender<ControlEvent>,
    running: bool,
}

impl ControlLoop {
    pub fn new(
        graph: Graph,
        bus_rx: Receiver<GraphMessage>,
        controller: BranchController,
        factory: NodeFactory,
        props: SectionMap,
    ) -> (Self, Sender<ControlCommand>, Receiver<ControlEvent>) {
        let (cmd_tx, cmd_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let control = Self {
            graph,
            controller,
            scheduler: CleanupScheduler::new(),
            factory,
            props,
            bus_rx,
            cmd_rx,
            event_tx,
            running: true,
        };
        (control, cmd_tx, event_rx)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn controller(&self) -> &BranchController {
        &self.controller
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// One loop iteration: commands, then bus messages, then deferred
    /// cleanup tasks.
    pub fn pump(&mut self) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            self.handle_command(cmd);
        }
        while let Ok(msg) = self.bus_rx.try_recv() {
            self.handle_message(msg);
        }
        while let Some(task) = self.scheduler.try_next() {
            self.run_task(task);
        }
    }

    /// Block until shutdown, pumping continuously.
    pub fn run(&mut self) {
        tracing::info!("control loop running");
        while self.running {
            self.pump();
            std::thread::sleep(Duration::from_millis(5));
        }
        tracing::info!("control loop stopped");
    }

    fn handle_command(&mut self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::StartRecording => {
                match self.controller.start(
                    &mut self.graph,
                    &self.factory,
                    &self.props,
                    &self.scheduler,
                ) {
                    Ok(path) => self.emit(ControlEvent::RecordingStarted(path)),
                    Err(err) => self.emit(ControlEvent::RecordingFailed(err.to_string())),
                }
            }
            ControlCommand::StopRecording => {
                self.controller.stop(&mut self.graph);
            }
            ControlCommand::Shutdown => {
                self.controller.stop(&mut self.graph);
                self.running = false;
            }
        }
    }

    fn handle_message(&mut self, msg: GraphMessage) {
        self.controller.on_message(&msg, &self.scheduler);
        if let GraphMessage::Error { source, message } = msg {
            self.emit(ControlEvent::StreamError { source, message });
        }
    }

    fn run_task(&mut self, task: CleanupTask) {
        match task {
            CleanupTask::TeardownRecording => {
                if let Some(path) = self.controller.run_teardown(&mut self.graph) {
                    self.emit(ControlEvent::RecordingStopped(path));
                }
            }
        }
    }

    fn emit(&self, event: ControlEvent) {
        let _ = self.event_tx.send(event);
    }
}
