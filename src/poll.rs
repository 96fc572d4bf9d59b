//! Readiness waits on raw descriptors

use std::os::unix::io::RawFd;
use std::{io, time::Duration};

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interest: i16 {
        const READABLE = libc::POLLIN;
        const WRITABLE = libc::POLLOUT;
    }
}

fn timeout_ms(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
    }
}

/// Waits until `fd` is ready for `interest` or `timeout` passes.
///
/// Returns `Ok(false)` on timeout. A hangup or error condition counts as ready, so the
/// following read or write reports it. Interrupted waits are restarted.
///
/// # Arguments
///
/// * `fd` - Descriptor to watch
/// * `interest` - Readiness to wait for
/// * `timeout` - Upper bound, `None` blocks indefinitely
pub fn wait(fd: RawFd, interest: Interest, timeout: Option<Duration>) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: interest.bits(),
        revents: 0,
    };

    loop {
        match unsafe { libc::poll(&mut pollfd, 1, timeout_ms(timeout)) } {
            -1 => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            0 => return Ok(false),
            _ => return Ok(pollfd.revents != 0),
        }
    }
}
