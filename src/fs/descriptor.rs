use crate::fs::{
    config::MAX_OPEN_FILES,
    error::{FileSystemError, Result},
};

/// 读写位置：所在块、块内偏移（可以等于块大小，表示停在块尾），
/// 以及文件内的逻辑字节位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub block: u32,
    pub offset: usize,
    pub pos: u64,
}

impl Cursor {
    pub fn at_head(head: u32) -> Self {
        Self {
            block: head,
            offset: 0,
            pos: 0,
        }
    }
}

/// 打开的文件。只存在于内存中，不写回磁盘。
/// 通过首块号关联目录项。
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub handle: usize,
    pub head: u32,
    pub cursor: Cursor,
}

/// 描述符表：下标即句柄，关闭后槽位可被重新分配
#[derive(Debug)]
pub struct DescriptorTable {
    slots: Vec<Option<Descriptor>>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self {
            slots: vec![None; MAX_OPEN_FILES],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// 占用编号最小的空槽位
    pub fn open(&mut self, head: u32) -> Result<usize> {
        let handle = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FileSystemError::TooManyOpenFiles)?;
        self.slots[handle] = Some(Descriptor {
            handle,
            head,
            cursor: Cursor::at_head(head),
        });
        Ok(handle)
    }

    pub fn close(&mut self, handle: usize) -> Result<Descriptor> {
        self.slots
            .get_mut(handle)
            .and_then(Option::take)
            .ok_or(FileSystemError::BadDescriptor(handle))
    }

    pub fn get(&self, handle: usize) -> Result<&Descriptor> {
        self.slots
            .get(handle)
            .and_then(Option::as_ref)
            .ok_or(FileSystemError::BadDescriptor(handle))
    }

    pub fn get_mut(&mut self, handle: usize) -> Result<&mut Descriptor> {
        self.slots
            .get_mut(handle)
            .and_then(Option::as_mut)
            .ok_or(FileSystemError::BadDescriptor(handle))
    }

    /// 是否有描述符指向该文件
    pub fn is_open(&self, head: u32) -> bool {
        self.iter().any(|desc| desc.head == head)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Descriptor> {
        self.slots.iter_mut().flatten()
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}
