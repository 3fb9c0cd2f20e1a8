use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::fs::{
    config::{MAX_FILENAME, MAX_FILES},
    error::{FileSystemError, Result},
};

/// 文件名在磁盘上固定占 `MAX_FILENAME` 字节，不足部分补 0
mod fixed_name {
    use super::MAX_FILENAME;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(name: &str, serializer: S) -> Result<S::Ok, S::Error> {
        let mut raw = [0u8; MAX_FILENAME];
        let len = name.len().min(MAX_FILENAME - 1);
        raw[..len].copy_from_slice(&name.as_bytes()[..len]);
        serde::Serialize::serialize(&raw, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let raw = <[u8; MAX_FILENAME]>::deserialize(deserializer)?;
        let len = raw.iter().position(|&b| b == 0).unwrap_or(MAX_FILENAME);
        String::from_utf8(raw[..len].to_vec()).map_err(D::Error::custom)
    }
}

/// 目录项：文件名、字节大小、首块块号
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    #[serde(with = "fixed_name")]
    pub name: String,
    pub size: u32,
    pub offset: u32,
}

/// 根目录（也是唯一的目录）。
/// `attributes` 始终有 `MAX_FILES` 个槽位，前 `size` 个有效，
/// 这样序列化后的大小是固定的。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Directory {
    size: u32,
    attributes: Vec<Attribute>,
    #[serde(skip)]
    index_map: HashMap<String, usize>, // name -> attributes 索引
}

/// 检查文件名是否可以写进目录项
pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(FileSystemError::InvalidArgument(format!(
            "invalid file name {:?}",
            name
        )));
    }
    if name.len() >= MAX_FILENAME {
        return Err(FileSystemError::NameTooLong(name.to_string()));
    }
    Ok(())
}

impl Directory {
    pub fn new() -> Self {
        Self {
            size: 0,
            attributes: vec![Attribute::default(); MAX_FILES],
            index_map: HashMap::new(),
        }
    }

    /// 反序列化之后调用：校验槽位并重建 index_map
    pub fn validate(&mut self) -> Result<()> {
        if self.attributes.len() != MAX_FILES || self.size as usize > MAX_FILES {
            return Err(FileSystemError::Corrupted(format!(
                "directory holds {} of {} slots",
                self.size,
                self.attributes.len()
            )));
        }
        self.rebuild_index_map();
        if self.index_map.len() != self.size as usize {
            return Err(FileSystemError::Corrupted(
                "duplicate names in directory".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rebuild_index_map(&mut self) {
        self.index_map.clear();
        let len = self.len();
        for (i, attr) in self.attributes[..len].iter().enumerate() {
            self.index_map.insert(attr.name.clone(), i);
        }
    }

    pub fn len(&self) -> usize {
        self.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == MAX_FILES
    }

    /// 有效的目录项，按目录顺序
    pub fn entries(&self) -> &[Attribute] {
        &self.attributes[..self.len()]
    }

    // 添加目录项，返回其索引
    pub fn add(&mut self, name: &str, head: u32) -> Result<usize> {
        if self.is_full() {
            return Err(FileSystemError::DirectoryFull);
        }
        check_name(name)?;
        if self.index_map.contains_key(name) {
            return Err(FileSystemError::AlreadyExists(name.to_string()));
        }

        let idx = self.len();
        self.attributes[idx] = Attribute {
            name: name.to_string(),
            size: 0,
            offset: head,
        };
        self.size += 1;
        self.index_map.insert(name.to_string(), idx);
        Ok(idx)
    }

    // 删除目录项，后面的项依次前移，保持原有顺序
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let idx = *self.index_map.get(name)?;
        let len = self.len();
        let attr = std::mem::take(&mut self.attributes[idx]);
        self.attributes[idx..len].rotate_left(1);
        self.size -= 1;
        self.rebuild_index_map();
        Some(attr)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.index_map.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.find(name).map(|idx| &self.attributes[idx])
    }

    /// 按首块查找文件；首块在文件存续期间不会改变
    pub fn find_by_head(&self, head: u32) -> Option<usize> {
        self.entries().iter().position(|attr| attr.offset == head)
    }

    pub fn attribute(&self, idx: usize) -> Option<&Attribute> {
        self.entries().get(idx)
    }

    pub fn attribute_mut(&mut self, idx: usize) -> Option<&mut Attribute> {
        let len = self.len();
        self.attributes[..len].get_mut(idx)
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}
