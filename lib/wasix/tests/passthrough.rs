use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wasmbox_wasix::fs::Backend;
use wasmbox_wasix::syscalls::*;
use wasmbox_wasix::types::{Errno, Fdflags, Oflags, Rights, DIRENT_SIZE};
use wasmbox_wasix::{GuestMemory, WasiEnv};

const PATH: u32 = 0;
const IOVS: u32 = 256;
const OUT: u32 = 300;
const DATA: u32 = 512;

fn session(dir: &TempDir) -> WasiEnv {
    WasiEnv::builder()
        .passthrough_mount("/data", dir.path())
        .build()
        .unwrap()
}

fn open(
    env: &mut WasiEnv,
    mem: &mut Vec<u8>,
    dirfd: u32,
    path: &str,
    oflags: Oflags,
    rights: Rights,
) -> Result<u32, Errno> {
    mem.write(PATH as u64, path.as_bytes()).unwrap();
    match path_open(
        env,
        mem,
        dirfd,
        0,
        PATH,
        path.len() as u32,
        oflags.bits(),
        rights.bits(),
        0,
        Fdflags::empty().bits(),
        OUT,
    ) {
        Errno::Success => Ok(mem.read_u32(OUT as u64).unwrap()),
        err => Err(err),
    }
}

fn single_iovec(mem: &mut Vec<u8>, len: u32) {
    mem.write_u32(IOVS as u64, DATA).unwrap();
    mem.write_u32(IOVS as u64 + 4, len).unwrap();
}

#[test]
fn mount_gets_the_next_handle() {
    let dir = TempDir::new().unwrap();
    let mut env = session(&dir);
    let mut mem = vec![0u8; 4096];

    assert_eq!(env.fs.backend(4), Ok(Backend::Passthrough));
    assert_eq!(fd_prestat_get(&mut env, &mut mem, 4, OUT), Errno::Success);
    assert_eq!(fd_prestat_dir_name(&mut env, &mut mem, 4, DATA, 5), Errno::Success);
    assert_eq!(mem.read_vec(DATA as u64, 5).unwrap(), b"/data");
}

#[test]
fn host_files_are_read_and_written() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hello host").unwrap();
    let mut env = session(&dir);
    let mut mem = vec![0u8; 4096];

    let fd = open(&mut env, &mut mem, 4, "hello.txt", Oflags::empty(), Rights::FD_READ).unwrap();
    assert_eq!(env.fs.backend(fd), Ok(Backend::Passthrough));
    single_iovec(&mut mem, 5);
    assert_eq!(fd_read(&mut env, &mut mem, fd, IOVS, 1, OUT), Errno::Success);
    assert_eq!(mem.read_vec(DATA as u64, 5).unwrap(), b"hello");
    assert_eq!(fd_tell(&mut env, &mut mem, fd, OUT), Errno::Success);
    assert_eq!(mem.read_u32(OUT as u64).unwrap(), 5);
    assert_eq!(fd_filestat_get(&mut env, &mut mem, fd, OUT), Errno::Success);
    assert_eq!(mem.read_u32(OUT as u64 + 32).unwrap(), 10);
    assert_eq!(fd_close(&mut env, fd), Errno::Success);

    // Absolute guest paths below the mount point reach the host too.
    let out = open(
        &mut env,
        &mut mem,
        3,
        "/data/out.txt",
        Oflags::CREATE,
        Rights::FD_WRITE,
    )
    .unwrap();
    mem.write(DATA as u64, b"written").unwrap();
    single_iovec(&mut mem, 7);
    assert_eq!(fd_write(&mut env, &mut mem, out, IOVS, 1, OUT), Errno::Success);
    assert_eq!(fd_close(&mut env, out), Errno::Success);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
        "written"
    );
    assert!(!env.fs.exists("/data/out.txt"));
}

#[test]
fn host_directories_are_listed() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let mut env = session(&dir);
    let mut mem = vec![0u8; 4096];

    assert_eq!(fd_readdir(&mut env, &mut mem, 4, DATA, 1024, 0, OUT), Errno::Success);
    let used = mem.read_u32(OUT as u64).unwrap() as usize;
    assert_eq!(used, 4 * DIRENT_SIZE + 1 + 2 + 5 + 3);

    mem.write(PATH as u64, b"sub").unwrap();
    assert_eq!(
        path_filestat_get(&mut env, &mut mem, 4, 0, PATH, 3, OUT),
        Errno::Success
    );
    assert_eq!(mem[OUT as usize + 16], 3);

    mem.write(PATH as u64, b"new").unwrap();
    assert_eq!(path_create_directory(&mut env, &mut mem, 4, PATH, 3), Errno::Success);
    assert!(dir.path().join("new").is_dir());
    assert_eq!(path_remove_directory(&mut env, &mut mem, 4, PATH, 3), Errno::Success);
    assert!(!dir.path().join("new").exists());
}

#[test]
fn paths_can_not_leave_the_mount() {
    let dir = TempDir::new().unwrap();
    let mut env = session(&dir);
    let mut mem = vec![0u8; 4096];

    let escaped = open(
        &mut env,
        &mut mem,
        4,
        "../../etc/passwd",
        Oflags::empty(),
        Rights::FD_READ,
    );
    assert!(escaped.is_err());
}

#[test]
fn host_mount_below_the_prefix_wins_over_the_tree() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hello host").unwrap();
    let mut env = WasiEnv::builder()
        .passthrough_mount("/lib/host", dir.path())
        .build()
        .unwrap();
    let mut mem = vec![0u8; 4096];
    assert_eq!(env.fs.backend(4), Ok(Backend::Passthrough));

    let abs = open(&mut env, &mut mem, 3, "/lib/host/hello.txt", Oflags::empty(), Rights::FD_READ)
        .unwrap();
    assert_eq!(env.fs.backend(abs), Ok(Backend::Passthrough));
    let rel = open(&mut env, &mut mem, 3, "lib/host/hello.txt", Oflags::empty(), Rights::FD_READ)
        .unwrap();
    single_iovec(&mut mem, 10);
    assert_eq!(fd_read(&mut env, &mut mem, rel, IOVS, 1, OUT), Errno::Success);
    assert_eq!(mem.read_vec(DATA as u64, 10).unwrap(), b"hello host");

    mem.write(PATH as u64, b"/lib/host/newdir").unwrap();
    assert_eq!(path_create_directory(&mut env, &mut mem, 3, PATH, 16), Errno::Success);
    assert!(dir.path().join("newdir").is_dir());
    assert!(!env.fs.exists("/lib/host/newdir"));

    // Siblings of the host mount stay in the tree.
    mem.write(PATH as u64, b"/lib/pkg").unwrap();
    assert_eq!(path_create_directory(&mut env, &mut mem, 3, PATH, 8), Errno::Success);
    assert!(env.fs.exists("/lib/pkg"));
    assert!(!dir.path().join("pkg").exists());
}
