//! Bidirectional TCP relay for established CONNECT sessions.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Inactive relays are torn down after 15 minutes to free resources.
/// Programs usually send keep-alive traffic, so this only fires when a
/// connection is really unused.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

const COPY_BUF: usize = 1024;

/// Copies bytes between `client` and `upstream` in both directions until
/// either side reaches EOF, an I/O error occurs, or [`IDLE_TIMEOUT`] passes
/// without traffic.
///
/// Per-direction byte order is preserved. Nothing is written at timeout;
/// the caller drops both streams, which closes them.
pub async fn splice(client: &mut TcpStream, upstream: &mut TcpStream) -> io::Result<()> {
    let (mut client_rd, mut client_wr) = client.split();
    let (mut upstream_rd, mut upstream_wr) = upstream.split();
    let mut to_upstream = [0u8; COPY_BUF];
    let mut to_client = [0u8; COPY_BUF];

    loop {
        // The sleep is recreated every pass, so any completed read resets
        // the idle clock.
        tokio::select! {
            res = client_rd.read(&mut to_upstream) => {
                let n = res?;
                if n == 0 {
                    return Ok(());
                }
                upstream_wr.write_all(&to_upstream[..n]).await?;
            }
            res = upstream_rd.read(&mut to_client) => {
                let n = res?;
                if n == 0 {
                    return Ok(());
                }
                client_wr.write_all(&to_client[..n]).await?;
            }
            _ = tokio::time::sleep(IDLE_TIMEOUT) => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn splices_both_directions_until_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // a <-> b spliced; c is the far end.
        let (mut a, mut c) = tokio::join!(
            async { TcpStream::connect(addr).await.unwrap() },
            async { listener.accept().await.unwrap().0 },
        );
        let far_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let far_addr = far_listener.local_addr().unwrap();
        let (mut b, mut far) = tokio::join!(
            async { TcpStream::connect(far_addr).await.unwrap() },
            async { far_listener.accept().await.unwrap().0 },
        );

        let relay = tokio::spawn(async move { splice(&mut a, &mut b).await });

        c.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        far.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        far.write_all(b"pong").await.unwrap();
        c.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        // Closing one side ends the relay.
        drop(c);
        relay.await.unwrap().unwrap();
    }
}
