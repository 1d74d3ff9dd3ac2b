//! Bounded command queue between the transport and the control loop.
//!
//! ```text
//! ┌──────────────┐  InboundCommand  ┌──────────────┐
//! │  Transport   │─────────────────▶│ Control Loop │
//! │  (reader)    │    try_send      │  drain()     │
//! └──────────────┘                  └──────────────┘
//! ```
//!
//! Producers never block: a full queue drops the command.  The loop
//! drains at the start of each tick, so every command is applied between
//! two ticks and never in the middle of one.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use super::commands::InboundCommand;

/// Queue depth.
pub const COMMAND_QUEUE_DEPTH: usize = 16;

pub struct CommandQueue {
    channel: Channel<CriticalSectionRawMutex, InboundCommand, COMMAND_QUEUE_DEPTH>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue without blocking.  Returns `false` if the command was
    /// dropped because the queue is full.
    pub fn submit(&self, cmd: InboundCommand) -> bool {
        match self.channel.try_send(cmd) {
            Ok(()) => true,
            Err(_) => {
                warn!("Command queue full ({} pending), command dropped", COMMAND_QUEUE_DEPTH);
                false
            }
        }
    }

    /// Take everything queued right now, oldest first.  Commands
    /// submitted while draining wait for the next call.
    pub fn drain(&self) -> Vec<InboundCommand> {
        let pending = self.channel.len();
        let mut out = Vec::with_capacity(pending);
        for _ in 0..pending {
            match self.channel.try_receive() {
                Ok(cmd) => out.push(cmd),
                Err(_) => break,
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}
