//! The game process as an [`ExternalSource`].
//!
//! Attach opens the process memory and resolves every field's pointer
//! chain. Chains are re-resolved on the slow resolution cadence because the
//! game reallocates its structures (area loads, deaths); between
//! resolutions each poll only reads the cached addresses.

use livesync_core::{FailureClass, FetchError, PolledSnapshot, SourceHandle, SourceTarget};
use livesync_engine::ExternalSource;
use livesync_process::{ProcessLister, ProcessMatcher};
use serde::Serialize;

use crate::memory::{MemoryOpener, ProcessMemory};
use crate::pointer::{FieldSpec, FieldValue};

/// One poll's worth of field values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameReading {
    pub process: String,
    /// Incremented on every pointer resolution.
    pub epoch: u64,
    /// `None` for fields whose chain does not currently resolve.
    pub values: Vec<(String, Option<FieldValue>)>,
}

struct Attachment<M> {
    generation: u64,
    process: String,
    memory: M,
    addresses: Vec<Option<u64>>,
    epoch: u64,
}

pub struct GameSource<L, O: MemoryOpener> {
    lister: L,
    matcher: ProcessMatcher,
    opener: O,
    fields: Vec<FieldSpec>,
    attachment: Option<Attachment<O::Memory>>,
}

impl<L: ProcessLister, O: MemoryOpener> GameSource<L, O> {
    pub fn new(lister: L, matcher: ProcessMatcher, opener: O, fields: Vec<FieldSpec>) -> Self {
        Self {
            lister,
            matcher,
            opener,
            fields,
            attachment: None,
        }
    }

    fn attachment_for(
        &mut self,
        handle: &SourceHandle,
    ) -> Result<&mut Attachment<O::Memory>, FetchError> {
        self.attachment
            .as_mut()
            .filter(|a| a.generation == handle.generation())
            .ok_or_else(|| FetchError::SourceGone(format!("{handle} is not attached")))
    }
}

/// Resolve every chain. Transient failures leave the field unresolved;
/// anything else aborts.
fn resolve_all<M: ProcessMemory>(
    attachment: &mut Attachment<M>,
    fields: &[FieldSpec],
) -> Result<(), FetchError> {
    let mut addresses = Vec::with_capacity(fields.len());
    for field in fields {
        match field.chain.resolve(&attachment.memory) {
            Ok(address) => addresses.push(Some(address)),
            Err(e) if e.class() == FailureClass::Transient => {
                tracing::debug!(field = %field.name, chain = %field.chain, "unresolved: {e}");
                addresses.push(None);
            }
            Err(e) => return Err(e),
        }
    }
    attachment.addresses = addresses;
    attachment.epoch += 1;
    Ok(())
}

impl<L: ProcessLister, O: MemoryOpener> ExternalSource for GameSource<L, O> {
    type Payload = GameReading;

    fn name(&self) -> &str {
        "game"
    }

    fn discover(&mut self) -> Option<SourceTarget> {
        self.matcher.find(&mut self.lister).map(|p| p.to_target())
    }

    fn attach(&mut self, handle: &SourceHandle) -> Result<(), FetchError> {
        let SourceTarget::Process {
            pid, image_name, ..
        } = handle.target()
        else {
            return Err(FetchError::Unsupported(format!("{handle} is not a process")));
        };
        let memory = self.opener.open(*pid)?;
        let mut attachment = Attachment {
            generation: handle.generation(),
            process: image_name.clone().unwrap_or_else(|| format!("pid {pid}")),
            memory,
            addresses: Vec::new(),
            epoch: 0,
        };
        resolve_all(&mut attachment, &self.fields)?;
        let resolved = attachment.addresses.iter().flatten().count();
        tracing::info!(
            handle = %handle,
            resolved,
            fields = self.fields.len(),
            "game memory attached"
        );
        self.attachment = Some(attachment);
        Ok(())
    }

    async fn refresh_resolution(&mut self, handle: &SourceHandle) -> Result<(), FetchError> {
        let fields = std::mem::take(&mut self.fields);
        let result = self
            .attachment_for(handle)
            .and_then(|attachment| resolve_all(attachment, &fields));
        self.fields = fields;
        result
    }

    async fn fetch_snapshot(
        &mut self,
        handle: &SourceHandle,
    ) -> Result<PolledSnapshot<GameReading>, FetchError> {
        let fields = std::mem::take(&mut self.fields);
        let reading = self.attachment_for(handle).and_then(|attachment| {
            let mut values = Vec::with_capacity(fields.len());
            for (field, address) in fields.iter().zip(&attachment.addresses) {
                let value = match address {
                    Some(address) => Some(field.read(&attachment.memory, *address)?),
                    None => None,
                };
                values.push((field.name.clone(), value));
            }
            Ok(GameReading {
                process: attachment.process.clone(),
                epoch: attachment.epoch,
                values,
            })
        });
        self.fields = fields;

        let reading = reading?;
        let identity = format!("{}#{}", reading.process, reading.epoch);
        Ok(PolledSnapshot::new(handle, reading).with_identity(identity))
    }

    fn release(&mut self, handle: &SourceHandle) {
        if self
            .attachment
            .as_ref()
            .is_some_and(|a| a.generation == handle.generation())
        {
            self.attachment = None;
            tracing::debug!(handle = %handle, "game memory released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::tests::{FakeMemory, health_field, health_memory};
    use livesync_core::HandleAllocator;
    use livesync_process::ProcessInfo;
    use std::sync::{Arc, Mutex};

    struct Fixed(Vec<ProcessInfo>);

    impl ProcessLister for Fixed {
        fn list(&mut self) -> Vec<ProcessInfo> {
            self.0.clone()
        }
    }

    /// Hands out clones of a shared fake address space.
    #[derive(Clone)]
    struct SharedOpener {
        memory: Arc<Mutex<FakeMemory>>,
        deny: bool,
    }

    struct SharedMemory(Arc<Mutex<FakeMemory>>);

    impl ProcessMemory for SharedMemory {
        fn read_at(&self, address: u64, buf: &mut [u8]) -> Result<(), FetchError> {
            self.0.lock().unwrap().read_at(address, buf)
        }

        fn module_base(&self, module: &str) -> Result<u64, FetchError> {
            self.0.lock().unwrap().module_base(module)
        }
    }

    impl MemoryOpener for SharedOpener {
        type Memory = SharedMemory;

        fn open(&mut self, _pid: u32) -> Result<SharedMemory, FetchError> {
            if self.deny {
                return Err(FetchError::PermissionDenied("ptrace_scope".into()));
            }
            Ok(SharedMemory(Arc::clone(&self.memory)))
        }
    }

    fn game(memory: FakeMemory, deny: bool) -> (GameSource<Fixed, SharedOpener>, Arc<Mutex<FakeMemory>>) {
        let shared = Arc::new(Mutex::new(memory));
        let source = GameSource::new(
            Fixed(vec![ProcessInfo {
                pid: 77,
                name: "re8.exe".into(),
                started_at: 5,
            }]),
            ProcessMatcher::new(["re8"]),
            SharedOpener {
                memory: Arc::clone(&shared),
                deny,
            },
            vec![health_field()],
        );
        (source, shared)
    }

    fn attach(source: &mut GameSource<Fixed, SharedOpener>) -> SourceHandle {
        let target = source.discover().expect("running");
        let handle = HandleAllocator::new().allocate(target, Default::default());
        source.attach(&handle).expect("attach");
        handle
    }

    #[tokio::test]
    async fn attach_resolves_and_reads() {
        let (mut source, _) = game(health_memory(), false);
        let handle = attach(&mut source);
        let snap = source.fetch_snapshot(&handle).await.expect("read");
        let reading = snap.payload();
        assert_eq!(reading.epoch, 1);
        assert_eq!(
            reading.values,
            vec![("player_health".to_string(), Some(FieldValue::Float(1200.5)))]
        );
        assert_eq!(snap.identity(), Some("re8.exe#1"));
    }

    #[tokio::test]
    async fn denied_attach_is_fatal() {
        let (mut source, _) = game(health_memory(), true);
        let handle = HandleAllocator::new().allocate(source.discover().expect("running"), Default::default());
        let err = source.attach(&handle).expect_err("denied");
        assert_eq!(err.class(), FailureClass::Fatal);
    }

    #[tokio::test]
    async fn unresolved_field_reads_none_until_resolution() {
        let mut memory = health_memory();
        memory.write_u64(0x2008, 0);
        let (mut source, shared) = game(memory, false);
        let handle = attach(&mut source);

        let snap = source.fetch_snapshot(&handle).await.expect("read");
        assert_eq!(snap.payload().values[0].1, None);

        shared.lock().unwrap().write_u64(0x2008, 0x3000);
        source.refresh_resolution(&handle).await.expect("resolve");
        let snap = source.fetch_snapshot(&handle).await.expect("read");
        assert_eq!(snap.payload().values[0].1, Some(FieldValue::Float(1200.5)));
        assert_eq!(snap.payload().epoch, 2);
    }

    #[tokio::test]
    async fn stale_address_is_a_partial_read() {
        let (mut source, shared) = game(health_memory(), false);
        let handle = attach(&mut source);
        shared.lock().unwrap().bytes.remove(&0x3004);
        let err = source.fetch_snapshot(&handle).await.expect_err("partial");
        assert_eq!(err.class(), FailureClass::Transient);
    }

    #[tokio::test]
    async fn released_handle_reads_as_gone() {
        let (mut source, _) = game(health_memory(), false);
        let handle = attach(&mut source);
        source.release(&handle);
        source.release(&handle);
        let err = source.fetch_snapshot(&handle).await.expect_err("gone");
        assert_eq!(err.class(), FailureClass::SourceGone);
    }
}
