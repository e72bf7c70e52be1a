//! In-memory serial port for integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use printcal_communication::{PortOpener, SerialPort};
use printcal_core::{ConnectionError, Result};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Default)]
struct DeviceState {
    inbound: Mutex<VecDeque<io::Result<Vec<u8>>>>,
    written: Mutex<Vec<String>>,
    writes_before_failure: Mutex<Option<usize>>,
    opens: AtomicUsize,
}

/// Shared handle to the fake printer behind a [`MockPort`]
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<DeviceState>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the reader
    pub fn push(&self, text: &str) {
        self.state
            .inbound
            .lock()
            .push_back(Ok(text.as_bytes().to_vec()));
    }

    /// Queue a read error for the reader
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.state
            .inbound
            .lock()
            .push_back(Err(io::Error::new(kind, "device glitch")));
    }

    /// Everything written so far, one entry per write call
    pub fn written(&self) -> Vec<String> {
        self.state.written.lock().clone()
    }

    /// Let `count` more writes succeed, then fail every write
    pub fn fail_writes_after(&self, count: usize) {
        *self.state.writes_before_failure.lock() = Some(count);
    }

    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn opener(&self) -> Arc<MockOpener> {
        Arc::new(MockOpener {
            device: self.clone(),
            fail: false,
        })
    }
}

pub struct MockPort {
    device: MockDevice,
    read_timeout: Duration,
}

impl SerialPort for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let next = self.device.state.inbound.lock().pop_front();
        match next {
            Some(Ok(mut data)) => {
                if data.len() > buf.len() {
                    let rest = data.split_off(buf.len());
                    self.device.state.inbound.lock().push_front(Ok(rest));
                }
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Some(Err(e)) => Err(e),
            None => {
                thread::sleep(self.read_timeout);
                Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut budget = self.device.state.writes_before_failure.lock();
        if let Some(remaining) = budget.as_mut() {
            if *remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
            }
            *remaining -= 1;
        }
        self.device
            .state
            .written
            .lock()
            .push(String::from_utf8_lossy(data).into_owned());
        Ok(())
    }

    fn try_clone(&self) -> io::Result<Box<dyn SerialPort>> {
        Ok(Box::new(MockPort {
            device: self.device.clone(),
            read_timeout: self.read_timeout,
        }))
    }

    fn name(&self) -> String {
        "mock".to_string()
    }
}

pub struct MockOpener {
    device: MockDevice,
    fail: bool,
}

impl MockOpener {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            device: MockDevice::new(),
            fail: true,
        })
    }
}

impl PortOpener for MockOpener {
    fn open(
        &self,
        port: &str,
        _baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SerialPort>> {
        if self.fail {
            return Err(ConnectionError::OpenFailure {
                port: port.to_string(),
                reason: "No such file or directory".to_string(),
            }
            .into());
        }
        self.device.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPort {
            device: self.device.clone(),
            read_timeout,
        }))
    }
}

/// Poll `condition` until it holds or two seconds pass
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
