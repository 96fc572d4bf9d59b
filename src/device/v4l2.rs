use std::os::raw::{c_int, c_ulong, c_void};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::{fs, io, mem, time::Duration};

use tracing::{debug, trace, warn};

use crate::buffer::{self, Metadata, Type};
use crate::capability::Capabilities;
use crate::device::{Dequeued, Device, PlaneLayout, QueueRequest};
use crate::format::Format;
use crate::memory::{Memory, Mmap};
use crate::poll::{self, Interest};
use crate::v4l2;
use crate::v4l2::vidioc::*;
use crate::v4l_sys::*;

const MAX_PLANES: usize = VIDEO_MAX_PLANES as usize;

/// Open video device node
///
/// The node is opened read-write and non-blocking, so dequeues report "nothing ready" instead of
/// sleeping. The descriptor is closed on drop.
pub struct V4l2Device {
    fd: c_int,
    path: PathBuf,
}

impl V4l2Device {
    /// Opens the node at `path`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rawcap::device::V4l2Device;
    /// let dev = V4l2Device::open("/dev/video0");
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let fd = v4l2::open(path, libc::O_RDWR | libc::O_NONBLOCK)?;
        Ok(V4l2Device {
            fd,
            path: PathBuf::from(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens every `/dev/video*` node in name order, skipping the ones that cannot be opened
    pub fn enumerate() -> impl Iterator<Item = V4l2Device> {
        let mut paths: Vec<PathBuf> = match fs::read_dir("/dev") {
            Ok(nodes) => nodes
                .filter_map(|node| node.ok())
                .filter(|node| node.file_name().to_string_lossy().starts_with("video"))
                .map(|node| node.path())
                .collect(),
            Err(e) => {
                warn!("cannot list /dev: {}", e);
                Vec::new()
            }
        };
        paths.sort();

        paths.into_iter().filter_map(|path| match V4l2Device::open(&path) {
            Ok(dev) => Some(dev),
            Err(e) => {
                debug!("skipping {}: {}", path.display(), e);
                None
            }
        })
    }

    fn ioctl<T>(&self, request: _IOC_TYPE, arg: &mut T) -> io::Result<()> {
        unsafe { v4l2::ioctl(self.fd, request, arg as *mut T as *mut c_void) }
    }
}

impl Drop for V4l2Device {
    fn drop(&mut self) {
        if let Err(e) = v4l2::close(self.fd) {
            warn!("failed to close {}: {}", self.path.display(), e);
        }
    }
}

impl AsRawFd for V4l2Device {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Device for V4l2Device {
    type Region = Mmap;

    fn capabilities(&self) -> io::Result<Capabilities> {
        let mut v4l2_caps: v4l2_capability = unsafe { mem::zeroed() };
        self.ioctl(VIDIOC_QUERYCAP, &mut v4l2_caps)?;
        Ok(Capabilities::from(v4l2_caps))
    }

    fn buffer_capabilities(&self, typ: Type, memory: Memory) -> io::Result<buffer::Capabilities> {
        let mut v4l2_reqbufs = v4l2_requestbuffers {
            count: 0,
            type_: typ as u32,
            memory: memory as u32,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(VIDIOC_REQBUFS, &mut v4l2_reqbufs)?;
        Ok(buffer::Capabilities::from_bits_retain(
            v4l2_reqbufs.capabilities,
        ))
    }

    fn format(&self, typ: Type) -> io::Result<Format> {
        let mut v4l2_fmt = v4l2_format {
            type_: typ as u32,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(VIDIOC_G_FMT, &mut v4l2_fmt)?;
        Ok(from_raw_format(typ, &v4l2_fmt))
    }

    fn set_format(&self, typ: Type, fmt: &Format) -> io::Result<Format> {
        let mut v4l2_fmt = v4l2_format {
            type_: typ as u32,
            ..unsafe { mem::zeroed() }
        };
        if typ.is_mplane() {
            v4l2_fmt.fmt.pix_mp = fmt.into();
        } else {
            v4l2_fmt.fmt.pix = fmt.into();
        }

        self.ioctl(VIDIOC_TRY_FMT, &mut v4l2_fmt)?;
        self.ioctl(VIDIOC_S_FMT, &mut v4l2_fmt)?;

        let negotiated = from_raw_format(typ, &v4l2_fmt);
        if negotiated.width != fmt.width
            || negotiated.height != fmt.height
            || negotiated.fourcc != fmt.fourcc
        {
            debug!(
                "driver adjusted {}x{} {} to {}x{} {}",
                fmt.width,
                fmt.height,
                fmt.fourcc,
                negotiated.width,
                negotiated.height,
                negotiated.fourcc
            );
        }
        Ok(negotiated)
    }

    fn request_buffers(&self, typ: Type, memory: Memory, count: u32) -> io::Result<u32> {
        let mut v4l2_reqbufs = v4l2_requestbuffers {
            count,
            type_: typ as u32,
            memory: memory as u32,
            ..unsafe { mem::zeroed() }
        };
        self.ioctl(VIDIOC_REQBUFS, &mut v4l2_reqbufs)?;
        Ok(v4l2_reqbufs.count)
    }

    fn query_buffer(&self, typ: Type, index: u32) -> io::Result<Vec<PlaneLayout>> {
        let mut v4l2_planes: [v4l2_plane; MAX_PLANES] = unsafe { mem::zeroed() };
        let mut v4l2_buf = v4l2_buffer {
            index,
            type_: typ as u32,
            memory: Memory::Mmap as u32,
            ..unsafe { mem::zeroed() }
        };
        if typ.is_mplane() {
            v4l2_buf.length = VIDEO_MAX_PLANES;
            v4l2_buf.m.planes = v4l2_planes.as_mut_ptr();
        }
        self.ioctl(VIDIOC_QUERYBUF, &mut v4l2_buf)?;

        let layouts = if typ.is_mplane() {
            let count = (v4l2_buf.length as usize).min(MAX_PLANES);
            v4l2_planes[..count]
                .iter()
                .map(|p| PlaneLayout {
                    offset: unsafe { p.m.mem_offset },
                    length: p.length,
                })
                .collect()
        } else {
            vec![PlaneLayout {
                offset: unsafe { v4l2_buf.m.offset },
                length: v4l2_buf.length,
            }]
        };
        Ok(layouts)
    }

    fn map(&self, plane: &PlaneLayout) -> io::Result<Mmap> {
        Mmap::map(self.fd, plane.offset, plane.length as usize)
    }

    fn queue(&self, request: &QueueRequest) -> io::Result<()> {
        let mut v4l2_planes: [v4l2_plane; MAX_PLANES] = unsafe { mem::zeroed() };
        let mut v4l2_buf = v4l2_buffer {
            index: request.index,
            type_: request.typ as u32,
            memory: request.memory as u32,
            field: v4l2_field_V4L2_FIELD_NONE,
            ..unsafe { mem::zeroed() }
        };

        if request.typ.is_mplane() {
            for (raw, plane) in v4l2_planes.iter_mut().zip(request.planes.iter()) {
                raw.length = plane.length;
                raw.bytesused = plane.bytesused;
                if request.memory == Memory::UserPtr {
                    raw.m.userptr = plane.userptr as c_ulong;
                }
            }
            v4l2_buf.length = request.planes.len().min(MAX_PLANES) as u32;
            v4l2_buf.m.planes = v4l2_planes.as_mut_ptr();
        } else if let Some(plane) = request.planes.first() {
            v4l2_buf.length = plane.length;
            v4l2_buf.bytesused = plane.bytesused;
            if request.memory == Memory::UserPtr {
                v4l2_buf.m.userptr = plane.userptr as c_ulong;
            }
        }

        trace!("queue {} buffer {}", request.typ, request.index);
        self.ioctl(VIDIOC_QBUF, &mut v4l2_buf)
    }

    fn dequeue(&self, typ: Type, memory: Memory, planes: usize) -> io::Result<Option<Dequeued>> {
        let mut v4l2_planes: [v4l2_plane; MAX_PLANES] = unsafe { mem::zeroed() };
        let mut v4l2_buf = v4l2_buffer {
            type_: typ as u32,
            memory: memory as u32,
            ..unsafe { mem::zeroed() }
        };
        if typ.is_mplane() {
            v4l2_buf.length = planes.min(MAX_PLANES) as u32;
            v4l2_buf.m.planes = v4l2_planes.as_mut_ptr();
        }

        match self.ioctl(VIDIOC_DQBUF, &mut v4l2_buf) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(libc::EAGAIN) => return Ok(None),
            Err(e) => return Err(e),
        }

        let bytesused = if typ.is_mplane() {
            let count = (v4l2_buf.length as usize).min(MAX_PLANES);
            v4l2_planes[..count].iter().map(|p| p.bytesused).collect()
        } else {
            vec![v4l2_buf.bytesused]
        };

        trace!("dequeued {} buffer {}", typ, v4l2_buf.index);
        Ok(Some(Dequeued {
            index: v4l2_buf.index,
            bytesused,
            meta: Metadata::from(&v4l2_buf),
        }))
    }

    fn stream_on(&self, typ: Type) -> io::Result<()> {
        let mut typ = typ as c_int;
        self.ioctl(VIDIOC_STREAMON, &mut typ)
    }

    fn stream_off(&self, typ: Type) -> io::Result<()> {
        let mut typ = typ as c_int;
        self.ioctl(VIDIOC_STREAMOFF, &mut typ)
    }

    fn poll(&self, interest: Interest, timeout: Option<Duration>) -> io::Result<bool> {
        poll::wait(self.fd, interest, timeout)
    }
}

fn from_raw_format(typ: Type, v4l2_fmt: &v4l2_format) -> Format {
    unsafe {
        if typ.is_mplane() {
            Format::from(v4l2_fmt.fmt.pix_mp)
        } else if typ.is_meta() {
            Format::from(v4l2_fmt.fmt.meta)
        } else {
            Format::from(v4l2_fmt.fmt.pix)
        }
    }
}
