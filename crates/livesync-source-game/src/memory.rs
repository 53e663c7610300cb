//! Reading another process's memory.
//!
//! On Linux this goes through `/proc/<pid>/mem` and `/proc/<pid>/maps`,
//! which needs ptrace access to the target (same user and a permissive
//! `kernel.yama.ptrace_scope`, or `CAP_SYS_PTRACE`). Elsewhere opening
//! fails as unsupported.

use livesync_core::FetchError;

/// Read access to one attached process.
pub trait ProcessMemory: Send {
    /// Fill `buf` from `address`. A short read is a [`FetchError::PartialRead`].
    fn read_at(&self, address: u64, buf: &mut [u8]) -> Result<(), FetchError>;

    /// Load address of the named module (executable or shared library).
    fn module_base(&self, module: &str) -> Result<u64, FetchError>;

    fn read_u64(&self, address: u64) -> Result<u64, FetchError> {
        let mut buf = [0u8; 8];
        self.read_at(address, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// Opens [`ProcessMemory`] for a pid.
pub trait MemoryOpener: Send {
    type Memory: ProcessMemory;

    fn open(&mut self, pid: u32) -> Result<Self::Memory, FetchError>;
}

/// Opener for the platform's native memory access.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOpener;

#[cfg(target_os = "linux")]
pub use linux::ProcMemory;

#[cfg(target_os = "linux")]
impl MemoryOpener for NativeOpener {
    type Memory = ProcMemory;

    fn open(&mut self, pid: u32) -> Result<ProcMemory, FetchError> {
        ProcMemory::open(pid)
    }
}

#[cfg(not(target_os = "linux"))]
impl MemoryOpener for NativeOpener {
    type Memory = Unsupported;

    fn open(&mut self, _pid: u32) -> Result<Unsupported, FetchError> {
        Err(FetchError::Unsupported(
            "process memory access is only implemented on linux".into(),
        ))
    }
}

/// Placeholder memory type on platforms without an implementation.
#[cfg(not(target_os = "linux"))]
pub enum Unsupported {}

#[cfg(not(target_os = "linux"))]
impl ProcessMemory for Unsupported {
    fn read_at(&self, _address: u64, _buf: &mut [u8]) -> Result<(), FetchError> {
        match *self {}
    }

    fn module_base(&self, _module: &str) -> Result<u64, FetchError> {
        match *self {}
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::fs::{self, File};
    use std::io;
    use std::os::unix::fs::FileExt;
    use std::path::Path;

    use livesync_core::FetchError;

    use super::ProcessMemory;

    /// `/proc/<pid>/mem` reader.
    #[derive(Debug)]
    pub struct ProcMemory {
        pid: u32,
        mem: File,
    }

    impl ProcMemory {
        pub fn open(pid: u32) -> Result<Self, FetchError> {
            let mem = File::open(format!("/proc/{pid}/mem")).map_err(|e| open_error(pid, e))?;
            Ok(Self { pid, mem })
        }

        pub fn pid(&self) -> u32 {
            self.pid
        }
    }

    fn open_error(pid: u32, e: io::Error) -> FetchError {
        match e.kind() {
            io::ErrorKind::PermissionDenied => {
                FetchError::PermissionDenied(format!("/proc/{pid}/mem: {e}"))
            }
            io::ErrorKind::NotFound => FetchError::SourceGone(format!("pid {pid} exited")),
            _ => FetchError::Io(e),
        }
    }

    impl ProcessMemory for ProcMemory {
        fn read_at(&self, address: u64, buf: &mut [u8]) -> Result<(), FetchError> {
            let mut filled = 0;
            while filled < buf.len() {
                match self.mem.read_at(&mut buf[filled..], address + filled as u64) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) if filled > 0 => {
                        tracing::trace!(pid = self.pid, address, "read stopped early: {e}");
                        break;
                    }
                    Err(e) => return Err(FetchError::Io(e)),
                }
            }
            if filled < buf.len() {
                return Err(FetchError::PartialRead(format!(
                    "read {filled} of {} bytes at {address:#x}",
                    buf.len()
                )));
            }
            Ok(())
        }

        fn module_base(&self, module: &str) -> Result<u64, FetchError> {
            let maps = fs::read_to_string(format!("/proc/{}/maps", self.pid))
                .map_err(|e| open_error(self.pid, e))?;
            find_module_base(&maps, module).ok_or_else(|| {
                FetchError::PartialRead(format!("module {module} not mapped in pid {}", self.pid))
            })
        }
    }

    /// Lowest mapping start of `module` in a `/proc/<pid>/maps` listing.
    /// Module names compare case-insensitively on the file name.
    pub(crate) fn find_module_base(maps: &str, module: &str) -> Option<u64> {
        maps.lines()
            .filter_map(|line| {
                let mut cols = line.split_whitespace();
                let range = cols.next()?;
                let path = cols.nth(4)?;
                let name = Path::new(path).file_name()?.to_str()?;
                if !name.eq_ignore_ascii_case(module) {
                    return None;
                }
                let start = range.split('-').next()?;
                u64::from_str_radix(start, 16).ok()
            })
            .min()
    }

}
