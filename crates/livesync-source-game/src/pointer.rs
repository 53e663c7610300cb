//! Pointer chains and typed field reads.

use std::fmt;

use livesync_core::FetchError;
use serde::{Deserialize, Serialize};

use crate::memory::ProcessMemory;

/// `module + base_offset`, then for each offset: dereference and add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerChain {
    pub module: String,
    pub base_offset: u64,
    #[serde(default)]
    pub offsets: Vec<u64>,
}

impl PointerChain {
    /// Walk the chain to the field's current address. A null link means the
    /// structure is not allocated yet (loading screens) and reads as partial.
    pub fn resolve<M: ProcessMemory + ?Sized>(&self, memory: &M) -> Result<u64, FetchError> {
        let mut address = memory
            .module_base(&self.module)?
            .wrapping_add(self.base_offset);
        for &offset in &self.offsets {
            let link = memory.read_u64(address)?;
            if link == 0 {
                return Err(FetchError::PartialRead(format!("null pointer in {self}")));
            }
            address = link.wrapping_add(offset);
        }
        Ok(address)
    }
}

impl fmt::Display for PointerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:#x}", self.module, self.base_offset)?;
        for offset in &self.offsets {
            write!(f, "->{offset:#x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    I32,
    U32,
    I64,
    F32,
    F64,
}

impl FieldKind {
    pub fn size(self) -> usize {
        match self {
            Self::Bool => 1,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Option<FieldValue> {
        let value = match self {
            Self::Bool => FieldValue::Bool(*bytes.first()? != 0),
            Self::I32 => FieldValue::Int(i64::from(i32::from_le_bytes(bytes.try_into().ok()?))),
            Self::U32 => FieldValue::Int(i64::from(u32::from_le_bytes(bytes.try_into().ok()?))),
            Self::I64 => FieldValue::Int(i64::from_le_bytes(bytes.try_into().ok()?)),
            Self::F32 => FieldValue::Float(f64::from(f32::from_le_bytes(bytes.try_into().ok()?))),
            Self::F64 => FieldValue::Float(f64::from_le_bytes(bytes.try_into().ok()?)),
        };
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// A named game value reached through a pointer chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub chain: PointerChain,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn read<M: ProcessMemory + ?Sized>(
        &self,
        memory: &M,
        address: u64,
    ) -> Result<FieldValue, FetchError> {
        let mut buf = [0u8; 8];
        let bytes = &mut buf[..self.kind.size()];
        memory.read_at(address, bytes)?;
        self.kind
            .decode(bytes)
            .ok_or_else(|| FetchError::Protocol(format!("cannot decode {}", self.name)))
    }
}
