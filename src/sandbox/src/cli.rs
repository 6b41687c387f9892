use std::str::FromStr;

use anyhow::Context;
use capsicum::{builder::fcntls_from_names, CapsicumRights, EnforcementMode};
use clap::{Arg, ArgMatches, Command};
use fs::{dev::NullDeviceFileOperations, tmpfs, FdFlags, FileFlags};

use crate::{config::SandboxConfig, context, kernel::task::Task, syscalls};

pub fn cli_main() -> anyhow::Result<()> {
    let matches = Command::new("capsicum-sandbox")
        .about("Opens a file behind a capability and tries operations on it")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("enforcement")
                .long("enforcement")
                .takes_value(true)
                .possible_values(["enforcing", "pass-through"])
                .help("Overrides the configured enforcement mode"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .takes_value(true)
                .help("Overrides the configured log level"),
        )
        .arg(
            Arg::new("file")
                .takes_value(true)
                .help("Host file whose contents back the descriptor, /dev/null if omitted"),
        )
        .arg(
            Arg::new("rights")
                .long("rights")
                .short('r')
                .takes_value(true)
                .help("Comma separated rights to keep, e.g. read,seek"),
        )
        .arg(
            Arg::new("fcntls")
                .long("fcntls")
                .takes_value(true)
                .help("Comma separated fcntl commands to keep, e.g. getfl,setown"),
        )
        .arg(
            Arg::new("ioctls")
                .long("ioctls")
                .takes_value(true)
                .help("Comma separated ioctl commands to keep, or \"all\""),
        )
        .arg(
            Arg::new("try")
                .long("try")
                .short('t')
                .takes_value(true)
                .multiple_occurrences(true)
                .use_value_delimiter(true)
                .help("Operations to attempt: read, write, seek, tell, fstat, fcntl-getfl, fcntl-setfl, ioctl:<cmd>, dup"),
        )
        .get_matches();

    let config = load_config(&matches)?;
    logger::init(config.log_level()?)
        .map_err(|e| anyhow::anyhow!("failed to initialize logger: {}", e))?;
    context::init_context(config)?;

    let task = Task::from_context();
    let flags = FileFlags::from_linux_flags(libc::O_RDWR);
    let file = match matches.value_of("file") {
        Some(path) => {
            let contents =
                std::fs::read(path).with_context(|| format!("failed to read {:?}", path))?;
            tmpfs::new_regular_file(path.to_string(), flags, contents)
        }
        None => NullDeviceFileOperations::open(flags),
    };
    let fd = task
        .install_file(file, FdFlags::default())
        .context("failed to install descriptor")?;

    if let Some(rights) = requested_rights(&matches)? {
        let ioctls = rights.ioctls();
        syscalls::cap_rights_limit(
            &task,
            fd,
            rights.primary().raw(),
            rights.fcntls(),
            ioctls.nioctls(),
            ioctls.cmds().unwrap_or(&[]),
        )
        .context("cap_rights_limit failed")?;
    }

    if let Some(ops) = matches.values_of("try") {
        for op in ops {
            match attempt(&task, fd, op)? {
                Ok(ret) => println!("{}: allowed ({})", op, ret),
                Err(err) if err.is_not_capable() => println!("{}: denied", op),
                Err(err) => println!("{}: failed ({})", op, err),
            }
        }
    }

    let info = syscalls::fdinfo(&task, fd).context("failed to read fdinfo")?;
    print!("{}", info);
    Ok(())
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<SandboxConfig> {
    let mut config = match matches.value_of("config") {
        Some(path) => SandboxConfig::load(path)?,
        None => SandboxConfig::default(),
    };
    if let Some(mode) = matches.value_of("enforcement") {
        config.enforcement = EnforcementMode::from_str(mode).map_err(anyhow::Error::msg)?;
    }
    if let Some(level) = matches.value_of("log-level") {
        config.log_level = level.to_string();
    }
    Ok(config)
}

fn requested_rights(matches: &ArgMatches) -> anyhow::Result<Option<CapsicumRights>> {
    if !matches.is_present("rights") && !matches.is_present("fcntls") && !matches.is_present("ioctls")
    {
        return Ok(None);
    }
    let mut rights = match matches.value_of("rights") {
        Some(names) => CapsicumRights::from_names(names.split(',').filter(|n| !n.is_empty()))
            .context("invalid --rights")?,
        None => CapsicumRights::none(),
    };
    if let Some(names) = matches.value_of("fcntls") {
        let fcntls = fcntls_from_names(names.split(',')).context("invalid --fcntls")?;
        rights = rights.with_fcntls(fcntls);
    }
    if let Some(cmds) = matches.value_of("ioctls") {
        rights = if cmds == "all" {
            rights.with_all_ioctls()
        } else {
            let cmds = cmds
                .split(',')
                .map(parse_number)
                .collect::<anyhow::Result<Vec<u32>>>()
                .context("invalid --ioctls")?;
            rights.with_ioctls(cmds)?
        };
    }
    Ok(Some(rights))
}

fn parse_number(s: &str) -> anyhow::Result<u32> {
    let s = s.trim();
    let n = match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    n.with_context(|| format!("not a number: {:?}", s))
}

// attempt runs one --try operation. The outer error is for malformed
// operations, the inner one is what the syscall returned.
fn attempt(task: &Task, fd: i32, op: &str) -> anyhow::Result<syscalls::Result> {
    let mut buf = [0u8; 64];
    let ret = match op {
        "read" => syscalls::read(task, fd, &mut buf),
        "write" => syscalls::write(task, fd, b"capsicum\n"),
        "seek" => syscalls::lseek(task, fd, 0, libc::SEEK_SET),
        "tell" => syscalls::lseek(task, fd, 0, libc::SEEK_CUR),
        "fstat" => syscalls::fstat(task, fd).map(|stat| stat.st_size as usize),
        "fcntl-getfl" => syscalls::fcntl(task, fd, libc::F_GETFL, 0),
        "fcntl-setfl" => syscalls::fcntl(task, fd, libc::F_SETFL, libc::O_NONBLOCK as u64),
        "dup" => syscalls::dup(task, fd),
        _ => match op.strip_prefix("ioctl:") {
            Some(cmd) => syscalls::ioctl(task, fd, parse_number(cmd)? as u64, 0),
            None => anyhow::bail!("unknown operation {:?}", op),
        },
    };
    Ok(ret)
}
