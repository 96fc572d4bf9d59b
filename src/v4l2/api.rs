use std::ffi::CString;
use std::os::raw::{c_int, c_void};
use std::os::unix::ffi::OsStrExt;
use std::{io, path::Path};

use crate::v4l2::vidioc;

/// A convenience wrapper around open(2).
///
/// Returns the file descriptor on success.
/// In case of errors, the last OS error will be reported, aka errno on Linux.
///
/// # Arguments
///
/// * `path` - Path to the device node
/// * `flags` - Open flags
///
/// # Example
///
/// ```no_run
/// use rawcap::v4l2;
///
/// let fd = v4l2::open("/dev/video0", libc::O_RDWR | libc::O_NONBLOCK);
/// ```
pub fn open<P: AsRef<Path>>(path: P, flags: i32) -> io::Result<c_int> {
    let c_path = CString::new(path.as_ref().as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let fd = unsafe { libc::open(c_path.as_ptr(), flags) };
    if fd == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(fd)
    }
}

/// A convenience wrapper around close(2).
///
/// # Arguments
///
/// * `fd` - File descriptor of a previously opened device
pub fn close(fd: c_int) -> io::Result<()> {
    let ret = unsafe { libc::close(fd) };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// A convenience wrapper around ioctl(2).
///
/// In case of errors, the last OS error will be reported, aka errno on Linux.
///
/// # Arguments
///
/// * `fd` - File descriptor
/// * `request` - IO control code (see [`vidioc`])
/// * `argp` - Pointer to memory region holding the argument type
///
/// # Safety
///
/// `argp` must point to a live value whose layout matches the one encoded in `request`.
pub unsafe fn ioctl(fd: c_int, request: vidioc::_IOC_TYPE, argp: *mut c_void) -> io::Result<()> {
    // libc declares ioctl() with a different request type per platform, the raw syscall does not
    let ret = libc::syscall(libc::SYS_ioctl, fd, request, argp) as c_int;
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Maps `length` bytes of a device buffer at `offset` into the address space, read-write and
/// shared with the driver.
///
/// # Safety
///
/// The returned pointer is only valid until it is passed to [`munmap`] or the buffers backing it
/// are released by the driver.
pub unsafe fn mmap(fd: c_int, length: usize, offset: u32) -> io::Result<*mut c_void> {
    let ret = libc::mmap(
        std::ptr::null_mut(),
        length,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_SHARED,
        fd,
        offset as libc::off_t,
    );
    if ret == libc::MAP_FAILED {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// A convenience wrapper around munmap(2).
///
/// # Safety
///
/// `start` and `length` must describe a region previously returned by [`mmap`].
pub unsafe fn munmap(start: *mut c_void, length: usize) -> io::Result<()> {
    if libc::munmap(start, length) == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
