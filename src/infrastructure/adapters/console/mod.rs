//! Console adapter - operator input as a bounded queue
//!
//! A dedicated reader task owns stdin and feeds lines into a bounded
//! channel, so blocking on operator input never blocks command or update
//! processing. Plugins receive a clone of the sender to inject commands as
//! if they were typed.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

pub struct ConsoleInput {
    receiver: mpsc::Receiver<String>,
}

impl ConsoleInput {
    /// Spawn the stdin reader. The returned sender feeds the same queue.
    pub fn spawn(capacity: usize) -> (Self, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let reader_tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if reader_tx.send(line).await.is_err() {
                    break;
                }
            }
        });
        (Self { receiver: rx }, tx)
    }

    /// Next queued line; `None` once stdin is closed and drained.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}
