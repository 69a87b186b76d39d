
use std::io::BufRead;
use std::thread;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::mpsc;
use tracing::debug;

/// Lines buffered between the reader thread and the chat loop
const LINE_BUFFER: usize = 16;

/// Source of user input lines for the chat loop
#[async_trait]
pub trait LineSource: Send {
    /// The next line without its terminator, or `None` at end of input
    async fn next_line(&mut self) -> Result<Option<String>>;
}

#[async_trait]
impl<R> LineSource for Lines<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(Lines::next_line(self).await?)
    }
}

/// Lines read by a dedicated OS thread and handed over through a channel.
///
/// The reader thread is never joined: a read blocked on a terminal cannot be
/// cancelled, and the process may exit while it is still waiting.
pub struct ChannelLines {
    receiver: mpsc::Receiver<std::io::Result<String>>,
}

impl ChannelLines {
    /// Read the process's standard input
    #[inline]
    pub fn stdin() -> Result<Self> {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    /// Read `reader` line by line on a new thread
    #[inline]
    pub fn from_reader<R>(reader: R) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(LINE_BUFFER);

        thread::Builder::new()
            .name("input-reader".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if sender.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
                debug!("Input reader finished");
            })
            .context("Failed to start input reader thread")?;

        Ok(Self { receiver })
    }
}

#[async_trait]
impl LineSource for ChannelLines {
    async fn next_line(&mut self) -> Result<Option<String>> {
        match self.receiver.recv().await {
            Some(line) => Ok(Some(line.context("Failed to read input")?)),
            None => Ok(None),
        }
    }
}
