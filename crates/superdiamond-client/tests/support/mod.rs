//! Fake authority used by the TCP integration suites.
//!
//! Accepts one connection, records the handshake, answers with the initial
//! snapshot and then forwards whatever the test pushes. Dropping the push
//! side hangs up.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

pub struct FakeAuthority {
    port: u16,
    pushes: Option<Sender<String>>,
    handshakes: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeAuthority {
    /// Spawns an authority on an ephemeral port answering with `initial`.
    pub fn spawn(initial: &str) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake authority")?;
        listener
            .set_nonblocking(true)
            .context("fake authority nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let (pushes, frames) = mpsc::channel();
        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&handshakes);
        let initial = initial.to_owned();
        let handle = thread::spawn(move || serve(&listener, &initial, &frames, &recorded));
        Ok(Self {
            port,
            pushes: Some(pushes),
            handshakes,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Pushes a snapshot to the connected client.
    pub fn push(&self, raw: &str) -> Result<()> {
        self.pushes
            .as_ref()
            .ok_or_else(|| anyhow!("authority already hung up"))?
            .send(raw.to_owned())
            .map_err(|_| anyhow!("authority thread stopped"))
    }

    /// Hangs up and returns the handshake lines received.
    pub fn hang_up(&mut self) -> Result<Vec<String>> {
        drop(self.pushes.take());
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake authority thread panicked"))??;
        }
        let handshakes = self
            .handshakes
            .lock()
            .map_err(|error| anyhow!("lock handshakes: {error}"))?;
        Ok(handshakes.clone())
    }
}

impl Drop for FakeAuthority {
    fn drop(&mut self) {
        drop(self.pushes.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    listener: &TcpListener,
    initial: &str,
    frames: &Receiver<String>,
    handshakes: &Arc<Mutex<Vec<String>>>,
) -> Result<()> {
    let Some(mut stream) = accept(listener)? else {
        return Ok(());
    };
    stream
        .set_nonblocking(false)
        .context("blocking authority stream")?;

    let mut line = String::new();
    BufReader::new(stream.try_clone().context("clone stream")?)
        .read_line(&mut line)
        .context("read handshake")?;
    handshakes
        .lock()
        .map_err(|error| anyhow!("lock handshakes: {error}"))?
        .push(line);

    write_frame(&mut stream, initial)?;
    while let Ok(raw) = frames.recv() {
        write_frame(&mut stream, &raw)?;
    }
    Ok(())
}

fn accept(listener: &TcpListener) -> Result<Option<TcpStream>> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match listener.accept() {
            Ok((stream, _)) => return Ok(Some(stream)),
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(error) => return Err(error).context("accept connection"),
        }
    }
}

/// Writes one length-prefixed frame.
pub fn write_frame(stream: &mut TcpStream, raw: &str) -> Result<()> {
    let length = u32::try_from(raw.len()).context("frame length")?;
    stream
        .write_all(&length.to_be_bytes())
        .and_then(|()| stream.write_all(raw.as_bytes()))
        .and_then(|()| stream.flush())
        .context("write frame")
}
