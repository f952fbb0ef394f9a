//! Line dispatcher: feeds every line to every loaded VM.

use crate::vm::Vm;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Owns the loaded VMs and runs them, one line at a time, in load order.
pub struct Dispatcher {
    vms: Vec<Vm>,
}

impl Dispatcher {
    pub fn new(vms: Vec<Vm>) -> Self {
        Self { vms }
    }

    /// Number of loaded VMs.
    pub fn len(&self) -> usize {
        self.vms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
    }

    /// Run every VM on `line`. A VM that panics is logged and the remaining
    /// VMs still see the line.
    pub fn dispatch(&mut self, line: &str) {
        for vm in &mut self.vms {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| vm.run(line)));
            if let Err(payload) = outcome {
                error!(
                    program = vm.label(),
                    panic = panic_message(payload.as_ref()),
                    "VM panicked, line skipped for this program"
                );
            }
        }
    }

    /// Consume lines until the channel closes. Returns the number of lines
    /// processed.
    pub async fn run(mut self, mut lines: mpsc::Receiver<String>) -> u64 {
        info!(programs = self.vms.len(), "Dispatcher started");

        let mut processed: u64 = 0;
        while let Some(line) = lines.recv().await {
            self.dispatch(&line);
            processed += 1;
            debug!(lines = processed, "Line dispatched");
        }

        info!(lines = processed, "Line source closed, dispatcher stopped");
        processed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        return text;
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text;
    }
    "unknown panic"
}
