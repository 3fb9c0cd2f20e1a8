// 目录最多容纳的文件数
pub const MAX_FILES: usize = 64;

// 文件名缓冲区长度（含结尾的 NUL），可用名字最长 15 字节
pub const MAX_FILENAME: usize = 16;

// 同时打开的文件描述符上限
pub const MAX_OPEN_FILES: usize = 32;

// FAT 表项的磁盘取值
pub const FAT_UNUSED: i32 = 0;
pub const FAT_EOF: i32 = -1;
pub const FAT_RESERVED: i32 = -2;

// 超级块固定位于 0 号块
pub const SUPER_BLOCK_BLOCK_ID: u32 = 0;
