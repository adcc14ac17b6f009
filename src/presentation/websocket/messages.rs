//! Session Commands
//!
//! Instructions delivered to a session's writer task. The writer is the
//! only place that touches the socket sink, so ordering of management
//! pushes is the ordering of commands on the channel.

/// One instruction for a session's writer task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Write a text frame to the client
    Text(String),
    /// Write a close frame and stop the writer
    Close { code: u16, reason: String },
}
