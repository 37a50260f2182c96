//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout (captured stderr goes to stderr) in
//! a human-readable format.
//!
//! ## Output format
//! ```text
//! [added] task=backup stage=prepare
//! [launched] task=backup stage=prepare pid=4242
//! [waiting] task=backup stage=prepare
//! [finished] task=backup
//! [failed] task=backup code=1
//! [terminated] task=backup stage=post-process
//! [removed] task=backup stage=post-process
//! [run-aborted] task=guard code=1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Not intended for production use;
/// implement a custom [`Subscribe`] for structured logging.
pub struct LogWriter;

impl LogWriter {
    fn field(opt: &Option<std::sync::Arc<str>>) -> &str {
        opt.as_deref().unwrap_or("?")
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = Self::field(&e.task);
        match e.kind {
            EventKind::OptionIgnored => {
                println!(
                    "[option-ignored] task={task} key={}",
                    Self::field(&e.reason)
                );
            }
            EventKind::TaskAdded => {
                if let Some(stage) = e.stage {
                    println!("[added] task={task} stage={stage}");
                }
            }
            EventKind::TaskLaunched => {
                if let (Some(stage), Some(pid)) = (e.stage, e.pid) {
                    println!("[launched] task={task} stage={stage} pid={pid}");
                } else if let Some(stage) = e.stage {
                    println!("[launched] task={task} stage={stage}");
                }
            }
            EventKind::BlockingWait => {
                if let Some(stage) = e.stage {
                    println!("[waiting] task={task} stage={stage}");
                }
            }
            EventKind::TaskFinished => {
                println!("[finished] task={task}");
            }
            EventKind::TaskFailed => {
                println!("[failed] task={task} code={:?}", e.code);
            }
            EventKind::TaskTerminated => {
                if let Some(stage) = e.stage {
                    println!("[terminated] task={task} stage={stage}");
                }
            }
            EventKind::TaskRemoved => {
                if let Some(stage) = e.stage {
                    println!("[removed] task={task} stage={stage}");
                }
            }
            EventKind::StdoutCaptured => {
                println!("[stdout] task={task}:\n{}", Self::field(&e.reason));
            }
            EventKind::StderrCaptured => {
                eprintln!("[stderr] task={task}:\n{}", Self::field(&e.reason));
            }
            EventKind::RunAborted => {
                eprintln!("[run-aborted] task={task} code={:?}", e.code);
            }
            EventKind::TasksLeftOver => {
                eprintln!(
                    "[tasks-left-over] some tasks were not stopped properly: {}",
                    Self::field(&e.reason)
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
