use std::{
    fs, io,
    net::{IpAddr, UdpSocket},
    path::Path,
};

use crate::error::Error;

const SYS_CLASS_NET: &str = "/sys/class/net";

pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// True when a wireless interface is up.  Where the kernel does not expose
/// interface types, any route to a private address counts.
pub fn is_connected_to_wifi() -> Result<bool, Error> {
    let root = Path::new(SYS_CLASS_NET);
    if root.is_dir() {
        return wireless_interface_up(root);
    }
    Ok(local_address()?.is_some_and(is_private))
}

fn wireless_interface_up(root: &Path) -> Result<bool, Error> {
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if !path.join("wireless").exists() {
            continue;
        }
        let state = fs::read_to_string(path.join("operstate")).unwrap_or_default();
        if state.trim() == "up" {
            log::debug!("wireless interface {:?} is up", path.file_name());
            return Ok(true);
        }
    }
    Ok(false)
}

/// Address the OS would use for outbound traffic.  No packet is sent.
fn local_address() -> Result<Option<IpAddr>, Error> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    if socket.connect(("192.168.0.1", 9)).is_err() {
        return Ok(None);
    }
    Ok(Some(socket.local_addr()?.ip()))
}

fn is_private(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
        IpAddr::V6(_) => false,
    }
}
