use std::thread;
use std::time::Instant;

use crossbeam_channel::Sender;

use crate::cancel::CancellationToken;
use crate::parsing::{BlockTree, parse};
use crate::text::TextSnapshot;

/// A finished scan on its way back to the tagger's owner.
pub(crate) struct ScanCompleted {
    pub generation: u64,
    pub tree: BlockTree,
}

/// One scan running on its own thread.
///
/// The thread only reads its snapshot and sends the finished tree back; it
/// never touches tagger state. Cancelling makes it stop at the next
/// character and send nothing.
pub(crate) struct BackgroundScan {
    generation: u64,
    token: CancellationToken,
}

impl BackgroundScan {
    pub fn spawn(
        generation: u64,
        snapshot: TextSnapshot,
        done: Sender<ScanCompleted>,
    ) -> std::io::Result<Self> {
        let token = CancellationToken::new();
        let worker = token.clone();

        thread::Builder::new()
            .name(format!("brace-scan-{generation}"))
            .spawn(move || {
                let started = Instant::now();
                match parse(&snapshot, &worker) {
                    Some(tree) if !worker.is_cancelled() => {
                        tracing::debug!(
                            generation,
                            version = snapshot.version().number(),
                            blocks = tree.block_count(),
                            elapsed_us = started.elapsed().as_micros() as u64,
                            "scan finished"
                        );
                        // The tagger may already be gone; nothing to do then.
                        let _ = done.send(ScanCompleted { generation, tree });
                    }
                    _ => tracing::debug!(generation, "scan abandoned"),
                }
            })?;

        Ok(Self { generation, token })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
