use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tracing::{debug, error};

use crate::phy::{DecoderStats, EdgeEvent, PhyDecoder};
use crate::utils::consts::EDGE_QUEUE_CAPACITY;

/// Decoder thread fed by one ordered edge queue.
///
/// Edge producers (interrupt handlers, line adapters) only enqueue; the
/// worker is the single consumer, so the decoder sees edges in queue order.
pub struct EdgeWorker {
    events: Option<Sender<EdgeEvent>>,
    frames: Receiver<Vec<u8>>,
    handle: Option<JoinHandle<DecoderStats>>,
}

impl EdgeWorker {
    pub fn spawn(mut decoder: PhyDecoder) -> Self {
        let (event_tx, event_rx) = bounded::<EdgeEvent>(EDGE_QUEUE_CAPACITY);
        let (frame_tx, frame_rx) = unbounded();

        let handle = std::thread::spawn(move || {
            for event in event_rx.iter() {
                if let Some(payload) = decoder.process_edge(event.edge, event.timestamp_ns) {
                    if frame_tx.send(payload).is_err() {
                        debug!("Frame consumer gone, stopping edge worker");
                        break;
                    }
                }
            }
            decoder.stats()
        });

        Self {
            events: Some(event_tx),
            frames: frame_rx,
            handle: Some(handle),
        }
    }

    /// Producer handle for the edge queue
    pub fn sender(&self) -> Option<Sender<EdgeEvent>> {
        self.events.clone()
    }

    /// Completed, checksum-valid payloads
    pub fn frames(&self) -> &Receiver<Vec<u8>> {
        &self.frames
    }

    /// Close the queue and wait for the worker to drain it. Every handle
    /// returned by `sender` must be dropped first.
    pub fn finish(mut self) -> DecoderStats {
        self.events.take();
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                error!("Edge worker panicked");
                DecoderStats::default()
            }
            None => DecoderStats::default(),
        }
    }
}
