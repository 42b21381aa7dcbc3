//! Input sources.
//!
//! - [`replay`]: recorded JSON-lines traffic
//! - [`tcp_receiver`]: live length-prefixed frames, with notifications sent back

pub mod frame;
pub mod replay;
pub mod tcp_receiver;

pub use frame::{FrameReader, Inbound, MAX_FRAME_LEN, write_frame};
pub use replay::{ReplaySource, ReplayStats, play};
pub use tcp_receiver::TcpServer;
