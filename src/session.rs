//! Device session shared by the capture and parameter directions
//!
//! A session owns one device and walks it through
//! `Probed -> Configured -> Up -> Started`, stepping back down on `stop` and `teardown`.
//! Dropping a session stops and tears it down in that order before the device is closed.

use std::{fmt, time::Duration};

use tracing::{debug, error, info, trace, warn};

use crate::buffer::{self, Type};
use crate::capability::{Capabilities, Flags};
use crate::device::{Device, Selector};
use crate::error::{Error, Result};
use crate::format::{Direction, Format, FormatSpec, FourCC};
use crate::io::{Arena, Ring, Slot};
use crate::memory::Memory;
use crate::poll::Interest;

/// Upper bound on buffers per queue
pub const MAX_BUFFERS: u32 = 32;

const DEFAULT_BUFFERS: u32 = 3;
const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Device bound, nothing requested yet
    Probed,
    /// Format stored, applied at setup
    Configured,
    /// Buffers allocated and bound
    Up,
    /// Streaming
    Started,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Probed => "probed",
            State::Configured => "configured",
            State::Up => "up",
            State::Started => "started",
        }
    }

    fn is_up(self) -> bool {
        matches!(self, State::Up | State::Started)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fields drop in declaration order, so the buffers go before the device is closed
pub struct Session<D: Device> {
    arena: Arena<D::Region>,
    ring: Option<Ring>,

    caps: Capabilities,
    direction: Direction,
    buf_type: Type,
    memory: Memory,
    state: State,

    buffer_count: u32,
    lead: u32,
    dequeue_timeout: Duration,

    spec: Option<FormatSpec>,
    format: Option<Format>,

    device: D,
}

impl<D: Device> Session<D> {
    /// Binds the first candidate that matches `selector` and can serve `direction`
    ///
    /// Candidates whose names do not match, or that lack the capabilities the direction needs,
    /// are skipped, as are candidates that cannot report their names. Fails with `NotFound` if
    /// nothing fits, or with the buffer probe error of the last matching candidate that failed
    /// one.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rawcap::device::{Selector, V4l2Device};
    /// use rawcap::format::Direction;
    /// use rawcap::session::Session;
    ///
    /// let session = Session::open(V4l2Device::enumerate(), &Selector::any(), Direction::Capture);
    /// ```
    pub fn open<I>(candidates: I, selector: &Selector, direction: Direction) -> Result<Self>
    where
        I: IntoIterator<Item = D>,
    {
        let mut last_err = None;

        for device in candidates {
            let caps = match device.capabilities() {
                Ok(caps) => caps,
                Err(e) => {
                    // nothing to match the selector against
                    debug!("skipping device: capability query failed: {}", e);
                    continue;
                }
            };
            if !selector.matches(&caps) {
                trace!("skipping {} ({}): selector mismatch", caps.card, caps.driver);
                continue;
            }

            let buf_type = match buffer_type_for(&caps, direction) {
                Some(buf_type) => buf_type,
                None => {
                    debug!("skipping {}: cannot serve {}", caps.card, direction);
                    continue;
                }
            };

            let memory = match direction {
                Direction::Capture => Memory::Mmap,
                Direction::ParamsOutput => Memory::UserPtr,
            };
            match probe_memory(&device, buf_type, memory) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("skipping {}: no {} support", caps.card, memory);
                    continue;
                }
                Err(e) => {
                    warn!("probing {} failed: {}", caps.card, e);
                    last_err = Some(e);
                    continue;
                }
            }

            info!(
                "opened {} ({}) for {} with {} {} buffers",
                caps.card, caps.driver, direction, memory, buf_type
            );
            return Ok(Session {
                arena: Arena::new(buf_type, memory),
                ring: None,
                caps,
                direction,
                buf_type,
                memory,
                state: State::Probed,
                buffer_count: DEFAULT_BUFFERS,
                lead: direction.lead(),
                dequeue_timeout: DEFAULT_DEQUEUE_TIMEOUT,
                spec: None,
                format: None,
                device,
            });
        }

        Err(last_err.unwrap_or_else(|| Error::NotFound(selector.to_string())))
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn buffer_type(&self) -> Type {
        self.buf_type
    }

    pub fn memory(&self) -> Memory {
        self.memory
    }

    /// Format requested through `configure`
    pub fn spec(&self) -> Option<&FormatSpec> {
        self.spec.as_ref()
    }

    /// Format the driver settled on, known once the session is up
    pub fn format(&self) -> Option<&Format> {
        self.format.as_ref()
    }

    pub fn buffer_count(&self) -> u32 {
        self.ring.as_ref().map_or(self.buffer_count, Ring::count)
    }

    pub fn cursor(&self) -> Option<u32> {
        self.ring.as_ref().map(Ring::cursor)
    }

    pub fn ready_index(&self) -> Option<u32> {
        self.ring.as_ref().and_then(Ring::ready)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Sets how many buffers `setup` requests and how many of them run ahead of the consumer
    ///
    /// Capture sessions need at least one buffer in flight and one more to read from.
    pub fn set_buffering(&mut self, count: u32, lead: u32) -> Result<()> {
        if self.state.is_up() {
            return Err(Error::Busy("change buffering"));
        }
        if self.direction == Direction::Capture && lead == 0 {
            return Err(Error::invalid("capture sessions need at least one buffer in flight"));
        }
        if count <= lead || count > MAX_BUFFERS {
            return Err(Error::invalid(format!(
                "buffer count {} must exceed the lead of {} and be at most {}",
                count, lead, MAX_BUFFERS
            )));
        }
        self.buffer_count = count;
        self.lead = lead;
        Ok(())
    }

    pub fn set_buffer_count(&mut self, count: u32) -> Result<()> {
        self.set_buffering(count, self.lead)
    }

    /// Bound on each readiness wait of `cycle`
    pub fn set_dequeue_timeout(&mut self, timeout: Duration) {
        self.dequeue_timeout = timeout;
    }

    /// Stores the format to apply at the next `setup`
    pub fn configure(&mut self, spec: FormatSpec) -> Result<()> {
        match self.state {
            State::Up | State::Started => return Err(Error::Busy("configure")),
            State::Probed | State::Configured => {}
        }
        if spec.direction != self.direction {
            return Err(Error::invalid(format!(
                "{} format given to a {} session",
                spec.direction, self.direction
            )));
        }
        if spec.direction == Direction::Capture && (spec.width == 0 || spec.height == 0) {
            return Err(Error::invalid(format!(
                "frame size {}x{} is empty",
                spec.width, spec.height
            )));
        }

        debug!("configured {}", spec);
        self.spec = Some(spec);
        self.state = State::Configured;
        Ok(())
    }

    /// Configures 1280x720 NV12 capture, or the ISP parameter block format for output sessions
    pub fn configure_defaults(&mut self) -> Result<()> {
        let spec = match self.direction {
            Direction::Capture => FormatSpec::capture(1280, 720, FourCC::NV12),
            Direction::ParamsOutput => FormatSpec::params(FourCC::S6IP),
        };
        self.configure(spec)
    }

    /// Negotiates the stored format and allocates the buffer pool
    ///
    /// Nothing stays allocated if any step fails.
    pub fn setup(&mut self) -> Result<()> {
        self.expect(State::Configured, "set up")?;
        let spec = match self.spec {
            Some(spec) => spec,
            None => return Err(self.invalid_state("set up")),
        };

        let format = match self.direction {
            Direction::Capture => {
                let requested = Format::new(spec.width, spec.height, spec.fourcc);
                self.device
                    .set_format(self.buf_type, &requested)
                    .map_err(|e| Error::device("set format", e))?
            }
            Direction::ParamsOutput => {
                let current = self
                    .device
                    .format(self.buf_type)
                    .map_err(|e| Error::device("get format", e))?;
                if current.fourcc != spec.fourcc {
                    return Err(Error::invalid(format!(
                        "device carries {} parameter blocks, expected {}",
                        current.fourcc, spec.fourcc
                    )));
                }
                current
            }
        };

        let granted = self
            .arena
            .allocate(&self.device, &format, self.buffer_count)
            .map_err(|e| Error::device("allocate buffers", e))?;
        let ring = match Ring::new(granted, self.lead) {
            Some(ring) => ring,
            None => {
                if let Err(e) = self.arena.release(&self.device) {
                    warn!("releasing short buffer pool: {}", e);
                }
                return Err(Error::device(
                    "allocate buffers",
                    std::io::Error::other(format!(
                        "driver granted {} buffers, need more than {}",
                        granted, self.lead
                    )),
                ));
            }
        };

        info!(
            "{} session up: {}x{} {} with {} buffers",
            self.direction, format.width, format.height, format.fourcc, granted
        );
        self.format = Some(format);
        self.ring = Some(ring);
        self.state = State::Up;
        Ok(())
    }

    /// Primes the pipeline and turns streaming on
    pub fn start(&mut self) -> Result<()> {
        self.expect(State::Up, "start")?;
        let ring = self.ring.as_mut().ok_or(Error::InvalidState {
            op: "start",
            state: "up without buffers",
        })?;

        for index in ring.prime() {
            if let Err(e) = self.arena.queue(&self.device, index) {
                self.abandon_start();
                return Err(Error::device("queue buffer", e));
            }
        }

        if let Err(e) = self.device.stream_on(self.buf_type) {
            self.abandon_start();
            return Err(Error::device("stream on", e));
        }

        debug!("{} streaming", self.direction);
        self.state = State::Started;
        Ok(())
    }

    /// Queues the buffer under the cursor and waits for the one that completes in its place
    ///
    /// Timed out waits and "try again" dequeues are retried; only driver faults are returned.
    /// The cursor is left where it is until `advance`.
    pub fn cycle(&mut self) -> Result<u32> {
        self.expect(State::Started, "cycle")?;
        let next = self.ring_ref()?.enqueue_next();
        self.arena
            .queue(&self.device, next)
            .map_err(|e| Error::device("queue buffer", e))?;

        let interest = if self.buf_type.is_output() {
            Interest::WRITABLE
        } else {
            Interest::READABLE
        };

        let dequeued = loop {
            let ready = self
                .device
                .poll(interest, Some(self.dequeue_timeout))
                .map_err(|e| Error::device("poll", e))?;
            if !ready {
                debug!("no buffer after {:?}, waiting again", self.dequeue_timeout);
            }

            match self.arena.dequeue(&self.device) {
                Ok(Some(dequeued)) => break dequeued,
                Ok(None) => continue,
                Err(e) => return Err(Error::device("dequeue buffer", e)),
            }
        };

        let expected = self.ring_mut()?.dequeue_ready();
        if dequeued.index != expected {
            warn!(
                "dequeued buffer {} while expecting {}",
                dequeued.index, expected
            );
        }
        trace!("buffer {} ready: {}", expected, dequeued.meta);
        Ok(expected)
    }

    /// Releases the consumed slot back into the rotation
    pub fn advance(&mut self) -> Result<()> {
        self.expect(State::Started, "advance")?;
        self.ring_mut()?.rotate();
        Ok(())
    }

    /// Turns streaming off and drains every buffer still held by the driver
    pub fn stop(&mut self) -> Result<()> {
        self.expect(State::Started, "stop")?;
        self.device
            .stream_off(self.buf_type)
            .map_err(|e| Error::device("stream off", e))?;

        for _ in 0..self.buffer_count() {
            match self.arena.dequeue(&self.device) {
                Ok(Some(dequeued)) => trace!("drained buffer {}", dequeued.index),
                Ok(None) => break,
                Err(e) => {
                    trace!("drain ended: {}", e);
                    break;
                }
            }
        }

        debug!("{} stopped", self.direction);
        self.reset_ring();
        self.state = State::Up;
        Ok(())
    }

    /// Unmaps and frees every buffer
    pub fn teardown(&mut self) -> Result<()> {
        self.expect(State::Up, "tear down")?;
        let released = self.arena.release(&self.device);

        self.ring = None;
        self.format = None;
        self.state = State::Configured;
        released.map_err(|e| Error::device("release buffers", e))?;
        debug!("{} session down", self.direction);
        Ok(())
    }

    /// Slot holding the most recently dequeued buffer
    ///
    /// The borrow keeps the session from queueing the slot while it is read.
    pub fn ready_slot(&self) -> Result<&Slot<D::Region>> {
        let index = self
            .ready_index()
            .ok_or_else(|| self.invalid_state("read ready buffer"))?;
        self.arena
            .get(index)
            .ok_or_else(|| self.invalid_state("read ready buffer"))
    }

    /// Writable first plane of the slot queued by the next `cycle`, output sessions only
    pub fn pending_mut(&mut self) -> Result<&mut [u8]> {
        if !self.buf_type.is_output() {
            return Err(Error::InvalidState {
                op: "write a capture buffer",
                state: self.state.name(),
            });
        }
        let index = match &self.ring {
            Some(ring) => ring.enqueue_next(),
            None => return Err(self.invalid_state("write pending buffer")),
        };
        let state = self.state.name();
        self.arena
            .get_mut(index)
            .and_then(|slot| slot.first_plane_mut())
            .ok_or(Error::InvalidState {
                op: "write pending buffer",
                state,
            })
    }

    /// Stops and tears down, then closes the device
    pub fn close(mut self) -> Result<()> {
        self.shut_down()
    }

    fn shut_down(&mut self) -> Result<()> {
        if self.state == State::Started {
            self.stop()?;
        }
        if self.state == State::Up {
            self.teardown()?;
        }
        Ok(())
    }

    /// Hands back whatever `start` queued before failing
    fn abandon_start(&mut self) {
        if let Err(e) = self.device.stream_off(self.buf_type) {
            warn!("stream off after failed start: {}", e);
        }
        self.reset_ring();
    }

    fn reset_ring(&mut self) {
        if let Some(ring) = self.ring.as_mut() {
            ring.reset();
        }
    }

    fn ring_ref(&self) -> Result<&Ring> {
        let state = self.state.name();
        self.ring.as_ref().ok_or(Error::InvalidState {
            op: "use buffer ring",
            state,
        })
    }

    fn ring_mut(&mut self) -> Result<&mut Ring> {
        let state = self.state.name();
        self.ring.as_mut().ok_or(Error::InvalidState {
            op: "use buffer ring",
            state,
        })
    }

    fn expect(&self, state: State, op: &'static str) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.invalid_state(op))
        }
    }

    fn invalid_state(&self, op: &'static str) -> Error {
        Error::InvalidState {
            op,
            state: self.state.name(),
        }
    }
}

impl<D: Device> Drop for Session<D> {
    fn drop(&mut self) {
        if let Err(e) = self.shut_down() {
            match e {
                // the device vanished, nothing left to release
                Error::Device { ref source, .. }
                    if source.raw_os_error() == Some(libc::ENODEV) => {}
                e => error!("{} session did not shut down cleanly: {}", self.direction, e),
            }
        }
    }
}

fn buffer_type_for(caps: &Capabilities, direction: Direction) -> Option<Type> {
    if !caps.can_stream() {
        return None;
    }
    match direction {
        Direction::Capture if caps.flags.contains(Flags::VIDEO_CAPTURE_MPLANE) => {
            Some(Type::VideoCaptureMplane)
        }
        Direction::Capture if caps.flags.contains(Flags::VIDEO_CAPTURE) => {
            Some(Type::VideoCapture)
        }
        Direction::ParamsOutput if caps.flags.contains(Flags::META_OUTPUT) => {
            Some(Type::MetaOutput)
        }
        _ => None,
    }
}

/// Whether the queue accepts `memory`; drivers that predate capability reporting are trusted
fn probe_memory<D: Device>(device: &D, buf_type: Type, memory: Memory) -> Result<bool> {
    let caps = device
        .buffer_capabilities(buf_type, memory)
        .map_err(|e| Error::device("probe buffer memory", e))?;
    if caps.is_empty() {
        return Ok(true);
    }
    Ok(match memory {
        Memory::Mmap => caps.contains(buffer::Capabilities::SUPPORTS_MMAP),
        Memory::UserPtr => caps.contains(buffer::Capabilities::SUPPORTS_USERPTR),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::{FakeDevice, Release};
    use crate::error::ErrorKind;

    fn capture_session() -> (Session<FakeDevice>, FakeDevice) {
        let dev = FakeDevice::camera();
        let handle = dev.clone();
        let session = Session::open(vec![dev], &Selector::any(), Direction::Capture).unwrap();
        (session, handle)
    }

    fn up_session() -> (Session<FakeDevice>, FakeDevice) {
        let (mut session, handle) = capture_session();
        session
            .configure(FormatSpec::capture(8, 4, FourCC::SBGGR8))
            .unwrap();
        session.setup().unwrap();
        (session, handle)
    }

    #[test]
    fn test_open_skips_devices_that_cannot_serve_the_direction() {
        let devices = vec![FakeDevice::params(), FakeDevice::camera()];
        let session = Session::open(devices, &Selector::any(), Direction::Capture).unwrap();
        assert_eq!(session.capabilities().card, "fake-camera");
        assert_eq!(session.memory(), Memory::Mmap);

        let devices = vec![FakeDevice::camera(), FakeDevice::params()];
        let session = Session::open(devices, &Selector::any(), Direction::ParamsOutput).unwrap();
        assert_eq!(session.buffer_type(), Type::MetaOutput);
        assert_eq!(session.memory(), Memory::UserPtr);
    }

    #[test]
    fn test_open_without_match_is_not_found() {
        let err = Session::open(
            vec![FakeDevice::camera()],
            &Selector::driver("sun6i-isp"),
            Direction::Capture,
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_unreadable_devices_are_skipped_not_reported() {
        let broken = FakeDevice::camera();
        broken.fail_capabilities();
        let err = Session::open(vec![broken.clone()], &Selector::any(), Direction::Capture)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let devices = vec![broken, FakeDevice::camera()];
        let session = Session::open(devices, &Selector::any(), Direction::Capture).unwrap();
        assert_eq!(session.capabilities().card, "fake-camera");
    }

    #[test]
    fn test_start_before_setup_is_invalid_state() {
        let (mut session, _) = capture_session();
        assert_eq!(session.start().unwrap_err().kind(), ErrorKind::InvalidState);
        session.configure_defaults().unwrap();
        assert_eq!(session.start().unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_setup_twice_is_invalid_state() {
        let (mut session, handle) = up_session();
        assert_eq!(session.setup().unwrap_err().kind(), ErrorKind::InvalidState);
        handle.counters(|c| assert_eq!(c.request_buffers, vec![3]));
    }

    #[test]
    fn test_configure_while_up_is_busy() {
        let (mut session, _) = up_session();
        let err = session
            .configure(FormatSpec::capture(16, 16, FourCC::NV12))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
        assert_eq!(session.set_buffer_count(4).unwrap_err().kind(), ErrorKind::Busy);
    }

    #[test]
    fn test_configure_rejects_empty_frames() {
        let (mut session, _) = capture_session();
        let err = session
            .configure(FormatSpec::capture(0, 4, FourCC::NV12))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(session.state(), State::Probed);
    }

    #[test]
    fn test_capture_needs_three_buffers() {
        let (mut session, _) = capture_session();
        assert_eq!(
            session.set_buffer_count(2).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        session.set_buffer_count(5).unwrap();
        assert_eq!(session.buffer_count(), 5);
    }

    #[test]
    fn test_failed_setup_leaves_nothing_allocated() {
        let (mut session, handle) = capture_session();
        handle.fail_map_at(1);
        session
            .configure(FormatSpec::capture(8, 4, FourCC::SBGGR8))
            .unwrap();

        let err = session.setup().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Device);
        assert_eq!(session.state(), State::Configured);
        assert_eq!(handle.allocated(), 0);
        handle.counters(|c| assert_eq!(c.request_buffers, vec![3, 0]));
    }

    #[test]
    fn test_start_primes_two_buffers() {
        let (mut session, handle) = up_session();
        session.start().unwrap();
        assert_eq!(session.state(), State::Started);
        assert!(handle.streaming());
        handle.counters(|c| assert_eq!(c.queued, vec![0, 1]));
        assert_eq!(session.cursor(), Some(2));
    }

    #[test]
    fn test_ready_index_visits_every_slot_in_order() {
        let (mut session, _) = up_session();
        session.set_dequeue_timeout(Duration::from_millis(1));
        session.start().unwrap();

        let mut visited = Vec::new();
        for _ in 0..session.buffer_count() {
            let ready = session.cycle().unwrap();
            assert_eq!(session.ready_index(), Some(ready));
            visited.push(ready);
            session.advance().unwrap();
        }
        assert_eq!(visited, vec![0, 1, 2]);
    }

    #[test]
    fn test_advance_needs_streaming() {
        let (mut session, handle) = up_session();
        let cursor = session.cursor();
        assert_eq!(session.advance().unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(session.cursor(), cursor);

        session.start().unwrap();
        handle.counters(|c| assert_eq!(c.queued, vec![0, 1]));
    }

    #[test]
    fn test_out_of_order_dequeue_keeps_computed_index() {
        let (mut session, handle) = up_session();
        session.start().unwrap();
        handle.complete_newest_first();

        assert_eq!(session.cycle().unwrap(), 0);
        assert_eq!(session.state(), State::Started);
        assert_eq!(session.ready_index(), Some(0));
        handle.counters(|c| assert_eq!(c.dequeued, vec![2]));
    }

    #[test]
    fn test_ready_slot_exposes_dequeued_payload() {
        let (mut session, _) = up_session();
        session.start().unwrap();
        session.cycle().unwrap();

        let slot = session.ready_slot().unwrap();
        assert_eq!(slot.index(), 0);
        assert_eq!(slot.meta().sequence, 1);
        assert!(slot.planes()[0].payload().iter().all(|&b| b == 1));
        assert_eq!(slot.payload_len(), 8 * 4 * 2);
    }

    #[test]
    fn test_stop_then_start_resumes_streaming() {
        let (mut session, handle) = up_session();
        session.start().unwrap();
        session.cycle().unwrap();
        session.advance().unwrap();

        session.stop().unwrap();
        assert_eq!(session.state(), State::Up);
        assert!(!handle.streaming());
        assert_eq!(session.stop().unwrap_err().kind(), ErrorKind::InvalidState);

        session.start().unwrap();
        assert_eq!(session.cycle().unwrap(), 0);
        handle.counters(|c| assert_eq!(c.stream_on, 2));
    }

    #[test]
    fn test_teardown_requires_stop() {
        let (mut session, handle) = up_session();
        session.start().unwrap();
        assert_eq!(session.teardown().unwrap_err().kind(), ErrorKind::InvalidState);

        session.stop().unwrap();
        session.teardown().unwrap();
        assert_eq!(session.state(), State::Configured);
        assert_eq!(handle.allocated(), 0);
        assert!(session.format().is_none());
    }

    #[test]
    fn test_drop_stops_and_releases() {
        let (mut session, handle) = up_session();
        session.start().unwrap();
        drop(session);

        assert!(!handle.streaming());
        assert_eq!(handle.allocated(), 0);
        handle.counters(|c| assert_eq!(c.request_buffers, vec![3, 0]));
    }

    #[test]
    fn test_failed_drop_unmaps_before_closing() {
        let (mut session, handle) = up_session();
        session.start().unwrap();
        handle.fail_stream_off();
        drop(session);

        assert_eq!(
            handle.releases(),
            vec![Release::Unmap, Release::Unmap, Release::Unmap, Release::Close]
        );
    }

    #[test]
    fn test_params_session_consumes_what_it_queued() {
        let dev = FakeDevice::params();
        let handle = dev.clone();
        let mut session =
            Session::open(vec![dev], &Selector::any(), Direction::ParamsOutput).unwrap();
        session.configure_defaults().unwrap();
        session.setup().unwrap();
        session.start().unwrap();
        handle.counters(|c| assert!(c.queued.is_empty()));

        session.pending_mut().unwrap()[0] = 0xff;
        assert_eq!(session.cycle().unwrap(), 0);
        session.advance().unwrap();
        assert_eq!(session.cursor(), Some(1));
    }

    #[test]
    fn test_params_setup_checks_dataformat() {
        let mut session =
            Session::open(vec![FakeDevice::params()], &Selector::any(), Direction::ParamsOutput)
                .unwrap();
        session
            .configure(FormatSpec::params(FourCC::new(b"XXXX")))
            .unwrap();
        assert_eq!(session.setup().unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_capture_buffers_are_read_only() {
        let (mut session, _) = up_session();
        assert_eq!(
            session.pending_mut().unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }
}
