use serde::{Deserialize, Serialize};

use crate::fs::{
    config::{FAT_EOF, FAT_RESERVED, FAT_UNUSED},
    error::{FileSystemError, Result},
};

/// FAT 表项。磁盘上以有符号 32 位整数存放：
/// 0 空闲，-1 链尾，-2 保留，非负数为下一块的块号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum FatEntry {
    Unused,
    Eof,
    Reserved,
    Next(u32),
}

impl TryFrom<i32> for FatEntry {
    type Error = String;

    fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
        match value {
            FAT_UNUSED => Ok(FatEntry::Unused),
            FAT_EOF => Ok(FatEntry::Eof),
            FAT_RESERVED => Ok(FatEntry::Reserved),
            n if n > 0 => Ok(FatEntry::Next(n as u32)),
            n => Err(format!("invalid FAT entry {}", n)),
        }
    }
}

impl From<FatEntry> for i32 {
    fn from(entry: FatEntry) -> Self {
        match entry {
            FatEntry::Unused => FAT_UNUSED,
            FatEntry::Eof => FAT_EOF,
            FatEntry::Reserved => FAT_RESERVED,
            FatEntry::Next(n) => n as i32,
        }
    }
}

/// 文件分配表，每个磁盘块对应一项
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Fat {
    table: Vec<FatEntry>,
}

impl Fat {
    pub fn new(total_blocks: u64) -> Self {
        Self {
            table: vec![FatEntry::Unused; total_blocks as usize],
        }
    }

    /// 把 [0, upto) 标记为保留区（超级块、FAT、目录）
    pub fn reserve(&mut self, upto: u32) {
        for entry in self.table.iter_mut().take(upto as usize) {
            *entry = FatEntry::Reserved;
        }
    }

    pub fn len(&self) -> u64 {
        self.table.len() as u64
    }

    pub fn get(&self, block: u32) -> Result<FatEntry> {
        self.table.get(block as usize).copied().ok_or_else(|| {
            FileSystemError::Corrupted(format!("block {} outside the FAT", block))
        })
    }

    pub fn set(&mut self, block: u32, entry: FatEntry) -> Result<()> {
        match self.table.get_mut(block as usize) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(FileSystemError::Corrupted(format!(
                "block {} outside the FAT",
                block
            ))),
        }
    }

    /// 从 `from` 开始向后找第一个空闲块
    pub fn first_unused(&self, from: u32) -> Option<u32> {
        self.table
            .iter()
            .enumerate()
            .skip(from as usize)
            .find(|(_, entry)| **entry == FatEntry::Unused)
            .map(|(block, _)| block as u32)
    }

    pub fn count_unused(&self, from: u32) -> u64 {
        self.table
            .iter()
            .skip(from as usize)
            .filter(|entry| **entry == FatEntry::Unused)
            .count() as u64
    }

    /// 挂载时校验：长度与磁盘一致，元数据区全部为保留项
    pub fn validate(&self, total_blocks: u64, data_block_offset: u32) -> Result<()> {
        if self.len() != total_blocks {
            return Err(FileSystemError::Corrupted(format!(
                "FAT has {} entries, disk has {} blocks",
                self.len(),
                total_blocks
            )));
        }
        if let Some(block) = self
            .table
            .iter()
            .take(data_block_offset as usize)
            .position(|entry| *entry != FatEntry::Reserved)
        {
            return Err(FileSystemError::Corrupted(format!(
                "metadata block {} is not reserved",
                block
            )));
        }
        if let Some(block) = self.table.iter().position(|entry| match entry {
            FatEntry::Next(next) => *next < data_block_offset || *next as u64 >= total_blocks,
            _ => false,
        }) {
            return Err(FileSystemError::Corrupted(format!(
                "block {} links outside the data region",
                block
            )));
        }
        Ok(())
    }
}
