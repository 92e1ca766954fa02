// Writer Serializer (spec.md §4.4): one submitter writes the length prefix
// and its payload as an indivisible pair. The permit is held only across the
// two sequential writes for a single frame, never across an await that
// reads — the Design Notes (§9) call out the teacher's source as protecting
// its write half with a busy compare-and-swap spin, and call that a
// misimplementation artifact rather than a requirement; a plain
// `tokio::sync::Mutex` (a fair mutex) satisfies the "whole-frame atomicity"
// contract directly.

use crate::error::Result;
use crate::transport;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

pub struct WriterSerializer<W> {
    write_half: Mutex<W>,
}

impl<W: AsyncWrite + Unpin> WriterSerializer<W> {
    pub fn new(write_half: W) -> Self {
        WriterSerializer { write_half: Mutex::new(write_half) }
    }

    /// Acquires the write permit, writes the length prefix and payload as
    /// an atomic pair, then releases. No suspension occurs while the permit
    /// is held other than these two writes.
    pub async fn write_frame(&self, payload: &[u8]) -> Result<()> {
        let mut write_half = self.write_half.lock().await;
        transport::write_frame(&mut *write_half, payload).await
    }
}
