use super::*;
use crate::syscalls::*;
use wasmbox_wasi_types::net::write_wire_addr;
use wasmbox_wasi_types::WIRE_ADDR_SIZE;

/// ### `sock_resolve()`
/// Resolves a hostname and a port to one or more IP addresses.
///
/// Note: This is similar to `getaddrinfo` in POSIX
///
/// The lookup blocks the calling guest.
///
/// ## Parameters
///
/// * `host` - Host to resolve
/// * `port` - Port hint (zero if no hint is supplied)
/// * `addrs` - The buffer where addresses will be stored
/// * `naddrs` - Capacity of `addrs`, in 19-byte wire addresses
///
/// ## Return
///
/// The number of IP addresses returned during the DNS resolution.
#[allow(clippy::too_many_arguments)]
#[instrument(level = "debug", skip_all, fields(host = field::Empty, %port, naddrs = field::Empty), ret)]
pub fn sock_resolve<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    host: WasmPtr,
    host_len: u32,
    port: u32,
    addrs: WasmPtr,
    naddrs: u32,
    ret_naddrs: WasmPtr,
) -> Errno {
    let host_str = wasi_try!(read_path(memory, host, host_len));
    Span::current().record("host", host_str.as_str());
    let Ok(port) = u16::try_from(port) else {
        return Errno::Inval;
    };

    let found = wasi_try_net!(env.sockets.resolve(&host_str, port, naddrs as usize));
    let mut offset = addrs as u64;
    for addr in &found {
        wasi_try_mem!(memory.write(offset, &write_wire_addr(addr)));
        offset += WIRE_ADDR_SIZE as u64;
    }

    Span::current().record("naddrs", found.len());
    wasi_try_mem!(memory.write_u32(ret_naddrs as u64, found.len() as u32));
    Errno::Success
}
