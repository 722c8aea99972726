use crate::config::LiveLinkConfig;
use crate::error::{Error, Result};
use log::{info, warn};
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Client side of the Live-Link: one TCP connection per script.
#[derive(Debug, Clone)]
pub struct LiveLink {
    addr: String,
    timeout: Duration,
}

impl LiveLink {
    pub fn new(config: &LiveLinkConfig) -> Self {
        Self {
            addr: config.addr.clone(),
            timeout: Duration::from_millis(config.connect_timeout_ms),
        }
    }

    fn resolve(&self) -> Result<SocketAddr> {
        self.addr
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| Error::BadAddress(self.addr.clone()))
    }

    /// Sends a generated Python script to the Blender listener.
    pub fn send(&self, script: &str) -> Result<()> {
        let target = self.resolve()?;
        info!("sending {} bytes to Blender at {}", script.len(), target);

        let mut stream = TcpStream::connect_timeout(&target, self.timeout).map_err(|source| {
            warn!("is the Live-Link listener running in Blender? (see `listener-script`)");
            Error::Connect {
                addr: self.addr.clone(),
                source,
            }
        })?;
        stream
            .write_all(script.as_bytes())
            .and_then(|_| stream.shutdown(Shutdown::Write))
            .map_err(Error::Transfer)?;

        info!("Live-Link transfer complete");
        Ok(())
    }
}

/// Python listener to paste into Blender's text editor and run once.
///
/// Each connection carries one script, terminated by EOF. Scripts are queued
/// by a socket thread and executed on Blender's main thread from a timer.
pub fn listener_script(config: &LiveLinkConfig) -> String {
    let (host, port) = config
        .addr
        .rsplit_once(':')
        .unwrap_or((config.addr.as_str(), "8080"));
    format!(
        r#"import bpy
import queue
import socket
import threading
import traceback

HOST = "{host}"
PORT = {port}
_pending = queue.Queue()


def _serve():
    srv = socket.socket(socket.AF_INET, socket.SOCK_STREAM)
    srv.setsockopt(socket.SOL_SOCKET, socket.SO_REUSEADDR, 1)
    srv.bind((HOST, PORT))
    srv.listen()
    while True:
        conn, _ = srv.accept()
        with conn:
            chunks = []
            while True:
                data = conn.recv(65536)
                if not data:
                    break
                chunks.append(data)
        _pending.put(b"".join(chunks).decode("utf-8"))


def _drain():
    while not _pending.empty():
        script = _pending.get()
        try:
            exec(compile(script, "<live-link>", "exec"), {{"__name__": "__live_link__"}})
        except Exception:
            traceback.print_exc()
    return 0.2


threading.Thread(target=_serve, daemon=True).start()
bpy.app.timers.register(_drain, persistent=True)
print(f"Live-Link listening on {{HOST}}:{{PORT}}")
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_send_delivers_whole_script() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut received = String::new();
            conn.read_to_string(&mut received).unwrap();
            received
        });

        let link = LiveLink::new(&LiveLinkConfig {
            addr,
            connect_timeout_ms: 2000,
        });
        link.send("import bpy\nprint('hi')\n").unwrap();

        assert_eq!(server.join().unwrap(), "import bpy\nprint('hi')\n");
    }

    #[test]
    fn test_unresolvable_address() {
        let link = LiveLink::new(&LiveLinkConfig {
            addr: "not an address".to_string(),
            connect_timeout_ms: 10,
        });
        assert!(matches!(link.send(""), Err(Error::BadAddress(_))));
    }

    #[test]
    fn test_listener_uses_configured_port() {
        let script = listener_script(&LiveLinkConfig {
            addr: "127.0.0.1:9123".to_string(),
            connect_timeout_ms: 2000,
        });
        assert!(script.contains("HOST = \"127.0.0.1\"\nPORT = 9123\n"));
        assert!(script.contains("bpy.app.timers.register(_drain, persistent=True)"));
        assert!(crate::core::session::test_utils::nested_fstring_quotes(&script).is_empty());
    }
}
