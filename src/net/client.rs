use std::net::TcpStream;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::frame::RawFrame;
use crate::protocol::{Command, FragmentReader, FrameRequest};

/// Connection to a frame server
pub struct Client {
    stream: TcpStream,
    reader: FragmentReader,
}

impl Client {
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;
        info!("connected to {}", stream.peer_addr()?);
        Ok(Client {
            stream,
            reader: FragmentReader::default(),
        })
    }

    /// Sets how long the stream may stay quiet before a frame counts as complete
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.reader = FragmentReader::new(timeout);
        self
    }

    /// Requests one frame and waits for all of its fragments
    ///
    /// The returned frame is empty if the server failed to capture.
    pub fn capture(&mut self, request: FrameRequest) -> Result<RawFrame> {
        Command::Capture(request).write_to(&mut self.stream)?;
        debug!("requested {}", request);

        let mut bytes = Vec::new();
        self.reader.read(&mut self.stream, &mut bytes)?;
        Ok(RawFrame::new(
            bytes,
            request.width,
            request.height,
            request.fourcc,
        ))
    }

    /// Asks the server to keep streaming at `request`
    pub fn stream_start(&mut self, request: FrameRequest) -> Result<()> {
        Command::StreamStart(request).write_to(&mut self.stream)?;
        Ok(())
    }

    pub fn stream_stop(&mut self) -> Result<()> {
        Command::StreamStop.write_to(&mut self.stream)?;
        Ok(())
    }
}
