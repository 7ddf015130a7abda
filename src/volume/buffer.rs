use std::sync::{
    Arc,
    atomic::{
        AtomicU64,
        Ordering,
    },
};

use bevy::prelude::*;


static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);


#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Reflect,
)]
pub struct VdbBufferId(pub u64);

impl VdbBufferId {
    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}


#[derive(Debug)]
pub struct VdbBufferData {
    id: VdbBufferId,
    bytes: Vec<u8>,
}


/// Shared handle to gpu-ready voxel bytes.
///
/// The sequence cache and every in-flight render command hold their own clone,
/// so evicting a frame on the asset side never frees bytes a render command
/// still references.
#[derive(Clone, Debug)]
pub struct VdbRenderBuffer(Arc<VdbBufferData>);

impl VdbRenderBuffer {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Arc::new(VdbBufferData {
            id: VdbBufferId::next(),
            bytes,
        }))
    }

    pub fn from_voxels<T: bytemuck::Pod>(voxels: &[T]) -> Self {
        Self::from_bytes(bytemuck::cast_slice(voxels).to_vec())
    }

    pub fn id(&self) -> VdbBufferId {
        self.0.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0.bytes
    }

    pub fn len(&self) -> usize {
        self.0.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.bytes.is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl PartialEq for VdbRenderBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for VdbRenderBuffer {}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = VdbRenderBuffer::from_voxels(&[1.0f32, 2.0]);
        let b = VdbRenderBuffer::from_voxels(&[1.0f32, 2.0]);

        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn clones_share_bytes() {
        let a = VdbRenderBuffer::from_bytes(vec![0, 1, 2, 3]);
        let b = a.clone();

        assert!(a.ptr_eq(&b));
        assert_eq!(a.id(), b.id());
        assert_eq!(a.strong_count(), 2);

        drop(b);
        assert_eq!(a.strong_count(), 1);
    }
}
