//! A probe transport driven by the test.

use std::io;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Instant;

use bytes::Bytes;
use snmp_poller::correlator::{
    CorrelationKey, Correlator, ProbeTransport, RawReply, reply_queue,
};
use tokio::sync::mpsc;

/// Records every probe; answers from `answer_from` when set.
pub struct ScriptedProbe {
    pub sent: Mutex<Vec<(IpAddr, CorrelationKey)>>,
    pub answer_from: Option<IpAddr>,
    queue: mpsc::Sender<RawReply>,
}

impl ScriptedProbe {
    pub fn sends(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl ProbeTransport for ScriptedProbe {
    async fn send_probe(&self, target: IpAddr, key: CorrelationKey) -> io::Result<()> {
        self.sent.lock().unwrap().push((target, key));
        if let Some(source) = self.answer_from {
            let _ = self
                .queue
                .send(RawReply {
                    source,
                    payload: Bytes::copy_from_slice(&key.0.to_be_bytes()),
                    received_at: Instant::now(),
                })
                .await;
        }
        Ok(())
    }

    fn reply_key(&self, payload: &[u8]) -> Option<CorrelationKey> {
        let bytes: [u8; 8] = payload.try_into().ok()?;
        Some(CorrelationKey(u64::from_be_bytes(bytes)))
    }
}

/// A correlator over a [`ScriptedProbe`], plus a handle for injecting
/// replies directly.
pub fn scripted_correlator(
    answer_from: Option<IpAddr>,
) -> (Correlator<ScriptedProbe>, mpsc::Sender<RawReply>) {
    let (tx, rx) = reply_queue(64);
    let probe = ScriptedProbe {
        sent: Mutex::new(Vec::new()),
        answer_from,
        queue: tx.clone(),
    };
    (Correlator::start(probe, rx), tx)
}
