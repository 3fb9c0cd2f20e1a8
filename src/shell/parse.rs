use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];
    let name = || args.first().map(|name| name.to_string());
    let fd = || args.first().and_then(|fd| fd.parse::<usize>().ok());
    let num = |i: usize| args.get(i).and_then(|n| n.parse::<i64>().ok());

    match cmd {
        "help" => Some(Command::Help),
        "disks" => Some(Command::Disks),
        "make" => name().map(Command::Make),
        "mount" => name().map(Command::Mount),
        "unmount" | "umount" => Some(Command::Unmount),
        "info" => Some(Command::Info),
        "ls" => Some(Command::Ls),
        "create" => name().map(Command::Create),
        "rm" => name().map(Command::Rm),
        "open" => name().map(Command::Open),
        "close" => fd().map(Command::Close),
        "read" => {
            let n = args.get(1).and_then(|n| n.parse::<usize>().ok())?;
            fd().map(|fd| Command::Read(fd, n))
        }
        "write" => {
            if args.len() >= 2 {
                // 跳过命令和 fd 两个词，文本保留原样的内部空格
                let (_, rest) = input.trim().split_once(char::is_whitespace)?;
                let (_, text) = rest.trim_start().split_once(char::is_whitespace)?;
                fd().map(|fd| Command::Write(fd, text.trim_start().to_string()))
            } else {
                None
            }
        }
        "seek" => fd().zip(num(1)).map(|(fd, off)| Command::Seek(fd, off)),
        "truncate" => fd().zip(num(1)).map(|(fd, len)| Command::Truncate(fd, len)),
        "size" => fd().map(Command::Size),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}
