use std::ops::{Deref, DerefMut};
use std::{io, mem};

use tracing::{debug, warn};

use crate::buffer::{Metadata, Type};
use crate::device::{Dequeued, Device, PlaneBinding, QueueRequest};
use crate::format::Format;
use crate::memory::{Memory, UserPtr};

/// Upper bound on planes per buffer
pub const MAX_PLANES: usize = 4;

/// Memory behind one plane
pub enum Backing<R> {
    /// Driver memory mapped into the process
    Mapped(R),
    /// Process memory lent to the driver
    User(UserPtr),
}

impl<R: Deref<Target = [u8]>> Deref for Backing<R> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Mapped(region) => region,
            Backing::User(mem) => mem,
        }
    }
}

impl<R: Deref<Target = [u8]> + DerefMut> DerefMut for Backing<R> {
    fn deref_mut(&mut self) -> &mut [u8] {
        match self {
            Backing::Mapped(region) => region,
            Backing::User(mem) => mem,
        }
    }
}

pub struct Plane<R> {
    backing: Backing<R>,
    bytesused: u32,
}

impl<R: Deref<Target = [u8]>> Plane<R> {
    /// The whole plane region
    pub fn data(&self) -> &[u8] {
        &self.backing
    }

    /// Bytes the driver reported as valid, the whole region if it reported none
    pub fn payload(&self) -> &[u8] {
        let len = match self.bytesused as usize {
            0 => self.backing.len(),
            n => n.min(self.backing.len()),
        };
        &self.backing[..len]
    }

    pub fn bytesused(&self) -> u32 {
        self.bytesused
    }
}

/// One buffer of the pool
pub struct Slot<R> {
    index: u32,
    planes: Vec<Plane<R>>,
    meta: Metadata,
}

impl<R: Deref<Target = [u8]>> Slot<R> {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn planes(&self) -> &[Plane<R>] {
        &self.planes
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Valid bytes across all planes
    pub fn payload_len(&self) -> usize {
        self.planes.iter().map(|p| p.payload().len()).sum()
    }
}

impl<R: Deref<Target = [u8]> + DerefMut> Slot<R> {
    /// Writable view of plane 0, used to fill output buffers before they are queued
    pub fn first_plane_mut(&mut self) -> Option<&mut [u8]> {
        self.planes.first_mut().map(|p| &mut *p.backing)
    }
}

/// Owns the buffer pool of one queue
///
/// Mapped regions are unmapped before the driver allocation is released; user memory outlives it.
pub struct Arena<R> {
    buf_type: Type,
    memory: Memory,
    slots: Vec<Slot<R>>,
}

impl<R: Deref<Target = [u8]> + DerefMut> Arena<R> {
    pub fn new(buf_type: Type, memory: Memory) -> Self {
        Arena {
            buf_type,
            memory,
            slots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&Slot<R>> {
        self.slots.get(index as usize)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut Slot<R>> {
        self.slots.get_mut(index as usize)
    }

    /// Allocates up to `count` buffers laid out for `format` and binds their planes
    ///
    /// Returns the number of buffers granted by the driver. On failure every buffer allocated so
    /// far is released again.
    pub fn allocate<D>(&mut self, dev: &D, format: &Format, count: u32) -> io::Result<u32>
    where
        D: Device<Region = R>,
    {
        let granted = dev.request_buffers(self.buf_type, self.memory, count)?;
        debug!("driver granted {} of {} {} buffers", granted, count, self.memory);

        let populated = (0..granted).try_for_each(|index| {
            let slot = self.populate(dev, format, index)?;
            self.slots.push(slot);
            Ok::<(), io::Error>(())
        });

        if let Err(e) = populated {
            if let Err(release) = self.release(dev) {
                warn!("rollback after failed allocation: {}", release);
            }
            return Err(e);
        }
        Ok(granted)
    }

    fn populate<D>(&self, dev: &D, format: &Format, index: u32) -> io::Result<Slot<R>>
    where
        D: Device<Region = R>,
    {
        let planes = match self.memory {
            Memory::Mmap => dev
                .query_buffer(self.buf_type, index)?
                .iter()
                .map(|layout| -> io::Result<Plane<R>> {
                    Ok(Plane {
                        backing: Backing::Mapped(dev.map(layout)?),
                        bytesused: 0,
                    })
                })
                .collect::<io::Result<Vec<_>>>()?,
            Memory::UserPtr => format
                .planes
                .iter()
                .map(|plane| Plane {
                    backing: Backing::User(UserPtr::zeroed(plane.size as usize)),
                    bytesused: plane.size,
                })
                .collect(),
        };

        if planes.is_empty() || planes.len() > MAX_PLANES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("buffer {} has {} planes", index, planes.len()),
            ));
        }

        Ok(Slot {
            index,
            planes,
            meta: Metadata::default(),
        })
    }

    /// Drops every buffer and frees the driver allocation
    pub fn release<D>(&mut self, dev: &D) -> io::Result<()>
    where
        D: Device<Region = R>,
    {
        match self.memory {
            Memory::Mmap => {
                // the driver refuses to free buffers that are still mapped
                self.slots.clear();
                dev.request_buffers(self.buf_type, self.memory, 0)?;
            }
            Memory::UserPtr => {
                if let Err(e) = dev.request_buffers(self.buf_type, self.memory, 0) {
                    // the driver may still reference the user memory
                    mem::forget(mem::take(&mut self.slots));
                    return Err(e);
                }
                self.slots.clear();
            }
        }
        Ok(())
    }

    /// Hands buffer `index` to the driver
    pub fn queue<D>(&self, dev: &D, index: u32) -> io::Result<()>
    where
        D: Device<Region = R>,
    {
        let slot = self.get(index).ok_or_else(|| no_such_buffer(index))?;
        let planes = slot
            .planes
            .iter()
            .map(|plane| PlaneBinding {
                length: plane.backing.len() as u32,
                bytesused: if self.buf_type.is_output() {
                    plane.bytesused
                } else {
                    0
                },
                userptr: match &plane.backing {
                    Backing::User(mem) => mem.addr(),
                    Backing::Mapped(_) => 0,
                },
            })
            .collect();

        dev.queue(&QueueRequest {
            typ: self.buf_type,
            memory: self.memory,
            index,
            planes,
        })
    }

    /// Takes a finished buffer back from the driver and records what it reported
    pub fn dequeue<D>(&mut self, dev: &D) -> io::Result<Option<Dequeued>>
    where
        D: Device<Region = R>,
    {
        let plane_count = self.slots.first().map_or(1, |s| s.planes.len());
        let dequeued = match dev.dequeue(self.buf_type, self.memory, plane_count)? {
            Some(dequeued) => dequeued,
            None => return Ok(None),
        };

        // output payload sizes are set by the caller, not the driver
        let keep_bytesused = self.buf_type.is_output();
        let slot = self
            .get_mut(dequeued.index)
            .ok_or_else(|| no_such_buffer(dequeued.index))?;
        slot.meta = dequeued.meta;
        if !keep_bytesused {
            for (plane, used) in slot.planes.iter_mut().zip(dequeued.bytesused.iter()) {
                plane.bytesused = *used;
            }
        }
        Ok(Some(dequeued))
    }
}

fn no_such_buffer(index: u32) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("no buffer with index {}", index),
    )
}
