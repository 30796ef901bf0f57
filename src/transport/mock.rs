//! Scripted in-memory line port for tests.
//!
//! The fake plays the adapter's role: every completed write (terminated by
//! `\r\n`) is handed to a responder closure which queues the lines the
//! adapter would produce, echo included. Reads pop queued lines; an empty
//! queue reads as a timed-out (empty) line.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::transport::LinePort;

type Responder = Box<dyn FnMut(&[u8]) -> Vec<String> + Send>;

pub(crate) struct ScriptedPort {
    rx: VecDeque<String>,
    pending: Vec<u8>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    responder: Responder,
}

impl ScriptedPort {
    pub(crate) fn new(responder: impl FnMut(&[u8]) -> Vec<String> + Send + 'static) -> Self {
        Self {
            rx: VecDeque::new(),
            pending: Vec::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            responder: Box::new(responder),
        }
    }

    /// Shared log of every completed write, CRLF stripped.
    pub(crate) fn sent_log(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.sent)
    }

    /// Queues an unsolicited line, as the adapter does for async events.
    #[allow(dead_code)]
    pub(crate) fn push_line(&mut self, line: &str) {
        self.rx.push_back(line.to_owned());
    }
}

impl LinePort for ScriptedPort {
    fn read_line(&mut self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move { Ok(self.rx.pop_front().unwrap_or_default()) })
    }

    fn write_all(&mut self, data: &[u8]) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let data = data.to_vec();
        Box::pin(async move {
            self.pending.extend_from_slice(&data);
            if self.pending.ends_with(b"\r\n") {
                let written = self.pending[..self.pending.len() - 2].to_vec();
                self.pending.clear();
                self.sent.lock().unwrap().push(written.clone());
                self.rx.extend((self.responder)(&written));
            }
            Ok(())
        })
    }

    fn clear_input(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.rx.clear();
            Ok(())
        })
    }

    fn clear_output(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.pending.clear();
            Ok(())
        })
    }
}

/// Commands sent so far, rendered as lossy UTF-8 for assertions.
pub(crate) fn sent_commands(log: &Arc<Mutex<Vec<Vec<u8>>>>) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .map(|raw| String::from_utf8_lossy(raw).into_owned())
        .collect()
}
