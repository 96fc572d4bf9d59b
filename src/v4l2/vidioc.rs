//! IO control codes for the requests this crate issues

use std::mem::size_of;

use crate::v4l_sys::*;

#[cfg(not(target_env = "musl"))]
#[allow(non_camel_case_types)]
pub type _IOC_TYPE = std::os::raw::c_ulong;
#[cfg(target_env = "musl")]
#[allow(non_camel_case_types)]
pub type _IOC_TYPE = std::os::raw::c_int;

// linux ioctl.h
const NR_SHIFT: u32 = 0;
const TYPE_SHIFT: u32 = NR_SHIFT + 8;
const SIZE_SHIFT: u32 = TYPE_SHIFT + 8;
const DIR_SHIFT: u32 = SIZE_SHIFT + 14;

const DIR_WRITE: u32 = 1;
const DIR_READ: u32 = 2;

const fn ioc(dir: u32, nr: u32, size: usize) -> _IOC_TYPE {
    let code = (dir << DIR_SHIFT)
        | ((b'V' as u32) << TYPE_SHIFT)
        | (nr << NR_SHIFT)
        | ((size as u32) << SIZE_SHIFT);
    code as _IOC_TYPE
}

const fn ior<T>(nr: u32) -> _IOC_TYPE {
    ioc(DIR_READ, nr, size_of::<T>())
}

const fn iow<T>(nr: u32) -> _IOC_TYPE {
    ioc(DIR_WRITE, nr, size_of::<T>())
}

const fn iowr<T>(nr: u32) -> _IOC_TYPE {
    ioc(DIR_READ | DIR_WRITE, nr, size_of::<T>())
}

pub const VIDIOC_QUERYCAP: _IOC_TYPE = ior::<v4l2_capability>(0);
pub const VIDIOC_G_FMT: _IOC_TYPE = iowr::<v4l2_format>(4);
pub const VIDIOC_S_FMT: _IOC_TYPE = iowr::<v4l2_format>(5);
pub const VIDIOC_REQBUFS: _IOC_TYPE = iowr::<v4l2_requestbuffers>(8);
pub const VIDIOC_QUERYBUF: _IOC_TYPE = iowr::<v4l2_buffer>(9);
pub const VIDIOC_QBUF: _IOC_TYPE = iowr::<v4l2_buffer>(15);
pub const VIDIOC_DQBUF: _IOC_TYPE = iowr::<v4l2_buffer>(17);
pub const VIDIOC_STREAMON: _IOC_TYPE = iow::<std::os::raw::c_int>(18);
pub const VIDIOC_STREAMOFF: _IOC_TYPE = iow::<std::os::raw::c_int>(19);
pub const VIDIOC_TRY_FMT: _IOC_TYPE = iowr::<v4l2_format>(64);
