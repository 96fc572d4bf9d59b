use std::{
    fmt,
    ops::{Deref, DerefMut},
    os::raw::c_void,
    ptr::NonNull,
    slice,
};

use crate::v4l2;

/// Memory used for buffer exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Memory {
    Mmap = 1,
    UserPtr = 2,
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Memory::Mmap => write!(f, "memory-mapped"),
            Memory::UserPtr => write!(f, "user pointer"),
        }
    }
}

/// Memory-mapped region
///
/// The backing memory belongs to the driver. It is mapped into the address space so frame data
/// can be read (capture) or written (output) without copying through the kernel.
///
/// The destructor automatically unmaps the memory.
pub struct Mmap {
    ptr: NonNull<u8>,
    len: usize,
}

impl Mmap {
    /// Maps `len` bytes at `offset` of the buffer pool behind `fd`.
    pub fn map(fd: std::os::raw::c_int, offset: u32, len: usize) -> std::io::Result<Self> {
        let ptr = unsafe { v4l2::mmap(fd, len, offset)? };
        let ptr = NonNull::new(ptr as *mut u8).ok_or_else(|| {
            std::io::Error::other("mmap returned a null mapping")
        })?;
        Ok(Mmap { ptr, len })
    }
}

impl Drop for Mmap {
    fn drop(&mut self) {
        let res = unsafe { v4l2::munmap(self.ptr.as_ptr() as *mut c_void, self.len) };
        if let Err(e) = res {
            tracing::error!("failed to unmap {} bytes: {}", self.len, e);
        }
    }
}

impl Deref for Mmap {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for Mmap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

/// Userspace memory
///
/// This memory type is handed to the driver by address, which then reads from (or writes into)
/// the user-provided buffer directly.
pub struct UserPtr(pub Vec<u8>);

impl UserPtr {
    pub fn zeroed(len: usize) -> Self {
        UserPtr(vec![0; len])
    }

    pub fn addr(&self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl Deref for UserPtr {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for UserPtr {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
