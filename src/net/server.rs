use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::unix::io::AsRawFd;

use tracing::{debug, error, info, warn};

use crate::device::Device;
use crate::error::{Error, Result};
use crate::format::{Direction, FormatSpec};
use crate::poll::{self, Interest};
use crate::protocol::{Command, FragmentWriter, FrameRequest};
use crate::session::{Session, State};

/// Serves one client at a time from a capture session
///
/// Requests are handled in order, one at a time. Any I/O or protocol error drops the client and
/// the next [`Server::poll`] waits for a new one. Device errors are logged and the client stays
/// connected.
pub struct Server<D: Device> {
    listener: TcpListener,
    client: Option<TcpStream>,
    session: Session<D>,
    writer: FragmentWriter,
}

impl<D: Device> Server<D> {
    /// Listens on `addr` for clients of an opened capture `session`
    pub fn bind<A: ToSocketAddrs>(addr: A, session: Session<D>) -> Result<Self> {
        if session.direction() != Direction::Capture {
            return Err(Error::invalid("frame server needs a capture session"));
        }
        let listener = TcpListener::bind(addr)?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Server {
            listener,
            client: None,
            session,
            writer: FragmentWriter::default(),
        })
    }

    pub fn with_writer(mut self, writer: FragmentWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn session(&self) -> &Session<D> {
        &self.session
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Serves clients until accepting a new one fails
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.client.is_none() {
                self.accept()?;
            }
            if let Err(e) = self.serve() {
                warn!("request failed: {}", e);
            }
        }
    }

    /// Accepts a client if none is connected, then handles one request from it
    pub fn poll(&mut self) -> Result<()> {
        if self.client.is_none() {
            self.accept()?;
        }
        self.serve()
    }

    fn accept(&mut self) -> Result<()> {
        let (stream, peer) = self.listener.accept()?;
        stream.set_nodelay(true)?;
        info!("client {} connected", peer);
        self.client = Some(stream);
        Ok(())
    }

    fn serve(&mut self) -> Result<()> {
        let stream = match self.client.as_mut() {
            Some(stream) => stream,
            None => return Ok(()),
        };

        let command = poll::wait(stream.as_raw_fd(), Interest::READABLE, None)
            .map_err(Error::from)
            .and_then(|_| Command::read_from(stream));
        let command = match command {
            Ok(Some(command)) => command,
            Ok(None) => {
                info!("client disconnected");
                self.client = None;
                return Ok(());
            }
            Err(e) => {
                self.drop_client();
                return Err(e);
            }
        };

        match self.dispatch(command) {
            Err(e) if e.is_fatal_for_connection() => {
                self.drop_client();
                Err(e)
            }
            result => result,
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Capture(request) => self.capture(request),
            Command::StreamStart(request) => {
                self.ensure_streaming(request)?;
                info!("streaming {}", request);
                Ok(())
            }
            Command::StreamStop => {
                if self.session.state() == State::Started {
                    self.session.stop()?;
                }
                info!("stream stopped");
                Ok(())
            }
        }
    }

    fn capture(&mut self, request: FrameRequest) -> Result<()> {
        debug!("capture request {}", request);
        let was_streaming = self.session.state() == State::Started;

        let captured = self
            .ensure_streaming(request)
            .and_then(|_| self.session.capture());

        if !was_streaming && self.session.state() == State::Started {
            if let Err(e) = self.session.stop() {
                error!("could not stop after capture: {}", e);
                if captured.is_ok() {
                    return Err(e);
                }
            }
        }

        let frame = captured?;
        match self.client.as_mut() {
            Some(stream) => {
                self.writer.write(stream, &frame.bytes)?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Brings the session to `Started` at the requested geometry
    ///
    /// An allocated session is only torn down when the request differs from what it was set
    /// up with.
    fn ensure_streaming(&mut self, request: FrameRequest) -> Result<()> {
        let spec = FormatSpec::capture(request.width, request.height, request.fourcc);
        let up = matches!(self.session.state(), State::Up | State::Started);

        if up && self.session.spec() != Some(&spec) {
            debug!("reconfiguring for {}", spec);
            if self.session.state() == State::Started {
                self.session.stop()?;
            }
            self.session.teardown()?;
        }
        if !matches!(self.session.state(), State::Up | State::Started) {
            self.session.configure(spec)?;
            self.session.setup()?;
        }
        if self.session.state() != State::Started {
            self.session.start()?;
        }
        Ok(())
    }

    fn drop_client(&mut self) {
        if let Some(stream) = self.client.take() {
            match stream.peer_addr() {
                Ok(peer) => warn!("dropping client {}", peer),
                Err(_) => warn!("dropping client"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::FakeDevice;
    use crate::device::Selector;
    use crate::error::ErrorKind;
    use crate::format::FourCC;
    use crate::net::Client;
    use crate::protocol::FragmentReader;
    use std::io::Write;
    use std::time::Duration;

    fn server(device: &FakeDevice) -> Server<FakeDevice> {
        let session =
            Session::open(vec![device.clone()], &Selector::any(), Direction::Capture).unwrap();
        Server::bind("127.0.0.1:0", session).unwrap()
    }

    fn request(
        server: &mut Server<FakeDevice>,
        client: &mut TcpStream,
        command: Command,
    ) -> Vec<u8> {
        command.write_to(client).unwrap();
        server.poll().unwrap();
        let mut frame = Vec::new();
        FragmentReader::new(Duration::from_millis(50))
            .read(client, &mut frame)
            .unwrap();
        frame
    }

    #[test]
    fn test_same_geometry_reuses_buffers() {
        let device = FakeDevice::camera();
        let mut server = server(&device);
        let mut client = TcpStream::connect(server.local_addr().unwrap()).unwrap();

        let capture = Command::Capture(FrameRequest::new(4, 2, FourCC::SBGGR8));
        assert_eq!(request(&mut server, &mut client, capture).len(), 16);
        assert_eq!(server.session().state(), State::Up);
        assert_eq!(request(&mut server, &mut client, capture).len(), 16);
        assert_eq!(device.counters(|c| c.request_buffers.clone()), vec![3]);
        assert_eq!(device.counters(|c| (c.stream_on, c.stream_off)), (2, 2));
    }

    #[test]
    fn test_new_geometry_reallocates() {
        let device = FakeDevice::camera();
        let mut server = server(&device);
        let mut client = TcpStream::connect(server.local_addr().unwrap()).unwrap();

        let small = Command::Capture(FrameRequest::new(4, 2, FourCC::SBGGR8));
        let large = Command::Capture(FrameRequest::new(8, 4, FourCC::SBGGR8));
        request(&mut server, &mut client, small);
        assert_eq!(request(&mut server, &mut client, large).len(), 64);
        assert_eq!(device.counters(|c| c.request_buffers.clone()), vec![3, 0, 3]);
        assert_eq!(device.counters(|c| c.set_format), 2);
    }

    #[test]
    fn test_streaming_survives_capture() {
        let device = FakeDevice::camera();
        let mut server = server(&device);
        let mut client = TcpStream::connect(server.local_addr().unwrap()).unwrap();

        let geometry = FrameRequest::new(4, 2, FourCC::SBGGR8);
        Command::StreamStart(geometry).write_to(&mut client).unwrap();
        server.poll().unwrap();
        assert_eq!(server.session().state(), State::Started);

        request(&mut server, &mut client, Command::Capture(geometry));
        assert_eq!(server.session().state(), State::Started);
        assert_eq!(device.counters(|c| c.stream_on), 1);

        Command::StreamStop.write_to(&mut client).unwrap();
        server.poll().unwrap();
        assert_eq!(server.session().state(), State::Up);

        // stopping twice is harmless
        Command::StreamStop.write_to(&mut client).unwrap();
        server.poll().unwrap();
        assert_eq!(device.counters(|c| c.stream_off), 1);
    }

    #[test]
    fn test_failed_capture_still_stops_streaming() {
        let device = FakeDevice::camera();
        let mut server = server(&device);
        let mut client = TcpStream::connect(server.local_addr().unwrap()).unwrap();

        device.fail_next_dequeue();
        Command::Capture(FrameRequest::new(4, 2, FourCC::SBGGR8))
            .write_to(&mut client)
            .unwrap();
        let err = server.poll().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Device);
        assert_eq!(server.session().state(), State::Up);
        assert_eq!(device.counters(|c| (c.stream_on, c.stream_off)), (1, 1));
        assert!(!device.streaming());
        assert!(server.is_connected());
    }

    #[test]
    fn test_protocol_error_drops_only_the_client() {
        let device = FakeDevice::camera();
        let mut server = server(&device);

        let mut bad = TcpStream::connect(server.local_addr().unwrap()).unwrap();
        bad.write_all(&[0x42, 0x42, 0, 0, 0, 0, 0, 0]).unwrap();
        let err = server.poll().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!server.is_connected());

        let mut good = TcpStream::connect(server.local_addr().unwrap()).unwrap();
        let capture = Command::Capture(FrameRequest::new(4, 2, FourCC::SBGGR8));
        assert_eq!(request(&mut server, &mut good, capture).len(), 16);
    }

    #[test]
    fn test_client_round_trip() {
        let device = FakeDevice::camera();
        let mut server = server(&device);
        let port = server.local_addr().unwrap().port();

        let handle = std::thread::spawn(move || {
            server.poll().unwrap();
            server
        });

        let mut client = Client::connect("127.0.0.1", port)
            .unwrap()
            .with_idle_timeout(Duration::from_millis(100));
        let frame = client
            .capture(FrameRequest::new(4, 2, FourCC::SBGGR8))
            .unwrap();
        assert_eq!(frame.len(), 16);
        assert_eq!(frame.fourcc, FourCC::SBGGR8);

        let server = handle.join().unwrap();
        assert_eq!(server.session().state(), State::Up);
    }
}
