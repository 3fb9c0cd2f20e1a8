//! MiniFAT：一个运行在定长块设备上的迷你 FAT 文件系统。
//!
//! 磁盘布局依次为超级块、FAT、根目录和数据区。挂载时整盘读入内存，
//! 所有文件操作都直接作用在内存镜像上，卸载时整盘写回。

pub mod disk;
pub mod fs;

pub use disk::{BlockDevice, FileDisk, MemDisk, BLOCK_SIZE, DISK_BLOCKS};
pub use fs::{
    error::{ErrorKind, FileSystemError, Result},
    FileInfo, FileSystem, VolumeInfo,
};
