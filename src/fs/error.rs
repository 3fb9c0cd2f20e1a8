use std::fmt;

/// 错误的大类，调用方据此决定如何处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    CapacityExceeded,
    InvalidArgument,
    Busy,
    DeviceError,
}

/// 文件系统错误类型
#[derive(Debug)]
pub enum FileSystemError {
    Io(std::io::Error),       // 底层 I/O 错误
    DiskFull,                 // 没有空闲数据块
    DirectoryFull,            // 目录已满
    NameTooLong(String),      // 文件名超长
    TooManyOpenFiles,         // 描述符表已满
    NotFound(String),         // 文件不存在
    BadDescriptor(usize),     // 描述符无效
    AlreadyExists(String),    // 文件已存在
    InvalidArgument(String),  // 参数非法（偏移越界等）
    Busy(String),             // 文件仍被打开
    Corrupted(String),        // 磁盘镜像损坏
}

impl FileSystemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Corrupted(_) => ErrorKind::DeviceError,
            Self::DiskFull | Self::DirectoryFull | Self::NameTooLong(_) | Self::TooManyOpenFiles => {
                ErrorKind::CapacityExceeded
            }
            Self::NotFound(_) | Self::BadDescriptor(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Busy(_) => ErrorKind::Busy,
        }
    }
}

impl From<std::io::Error> for FileSystemError {
    fn from(e: std::io::Error) -> Self {
        FileSystemError::Io(e)
    }
}

impl From<bincode::Error> for FileSystemError {
    fn from(e: bincode::Error) -> Self {
        FileSystemError::Corrupted(format!("metadata encoding: {}", e))
    }
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Disk I/O error: {}", e),
            Self::DiskFull => write!(f, "Disk space is full"),
            Self::DirectoryFull => write!(f, "Directory is full"),
            Self::NameTooLong(name) => write!(f, "File name too long: {}", name),
            Self::TooManyOpenFiles => write!(f, "Too many open files"),
            Self::NotFound(name) => write!(f, "File not found: {}", name),
            Self::BadDescriptor(fd) => write!(f, "Bad file descriptor: {}", fd),
            Self::AlreadyExists(name) => write!(f, "File already exists: {}", name),
            Self::InvalidArgument(desc) => write!(f, "Invalid argument: {}", desc),
            Self::Busy(name) => write!(f, "File is open: {}", name),
            Self::Corrupted(desc) => write!(f, "File system corrupted: {}", desc),
        }
    }
}

// 支持链式错误，方便追踪底层原因
impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FileSystemError>;
