use crate::trace::SimulationReport;
use rand::Rng;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use sr_lab_abstract::{Message, PAYLOAD_SIZE, Packet, Rejected, SimConfig};
use sr_lab_abstract::{SystemContext, TransportProtocol};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Sender,
    Receiver,
}

impl NodeId {
    pub fn peer(&self) -> Self {
        match self {
            NodeId::Sender => NodeId::Receiver,
            NodeId::Receiver => NodeId::Sender,
        }
    }
}

#[derive(Debug)]
pub enum EventType {
    PacketArrival {
        to: NodeId,
        packet: Packet,
    },
    TimerExpiry {
        node: NodeId,
        timer_id: u32,
        generation: u64,
    },
    AppSend {
        message: Message,
    },
}

#[derive(Debug)]
struct Event {
    time: u64,
    event_type: EventType,
    id: u64, // Unique ID to differentiate events at same time
}

// Custom Ord for Min-Heap (smallest time pops first)
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse comparison for time: smallest time is Greater in BinaryHeap
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// A compact textual summary of important link-layer events.
#[derive(Debug, Clone, Serialize)]
pub struct LinkEventSummary {
    pub time: u64,
    pub description: String,
}

/// Application-side bookkeeping of what was handed to the sender.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppStats {
    /// Distinct messages the application produced.
    pub offered: u32,
    /// Messages the sender took, in the order it took them.
    pub accepted: Vec<Message>,
    /// Times the sender answered "window full".
    pub rejections: u32,
    /// Messages discarded after a rejection (`retry_rejected = false`).
    pub dropped: u32,
}

/// Actions buffered during a peer's function call
#[derive(Default)]
struct ActionBuffer {
    outgoing_packets: Vec<Packet>,
    // Starts and cancels in call order, so a cancel-then-restart is honoured.
    timer_ops: Vec<TimerOp>,
    logs: Vec<String>,
    delivered_data: Vec<Vec<u8>>,
    metrics: Vec<(String, f64)>,
}

enum TimerOp {
    Start { delay: u64, id: u32 },
    Cancel { id: u32 },
}

/// Context implementation passed to a peer
struct ScopedContext<'a> {
    buffer: &'a mut ActionBuffer,
    now: u64,
}

impl SystemContext for ScopedContext<'_> {
    fn send_packet(&mut self, packet: Packet) {
        self.buffer.outgoing_packets.push(packet);
    }

    fn start_timer(&mut self, delay_ms: u64, timer_id: u32) {
        self.buffer.timer_ops.push(TimerOp::Start {
            delay: delay_ms,
            id: timer_id,
        });
    }

    fn cancel_timer(&mut self, timer_id: u32) {
        self.buffer.timer_ops.push(TimerOp::Cancel { id: timer_id });
    }

    fn deliver_data(&mut self, data: &[u8]) {
        self.buffer.delivered_data.push(data.to_vec());
    }

    fn log(&mut self, message: &str) {
        self.buffer.logs.push(message.to_string());
    }

    fn now(&self) -> u64 {
        self.now
    }

    fn record_metric(&mut self, name: &str, value: f64) {
        self.buffer.metrics.push((name.to_string(), value));
    }
}

pub struct Simulator {
    time: u64,
    event_queue: BinaryHeap<Event>,
    event_id_counter: u64,

    config: SimConfig,
    rng: rand::rngs::StdRng,

    pub sender: Box<dyn TransportProtocol>,
    pub receiver: Box<dyn TransportProtocol>,

    pub delivered_data: Vec<Vec<u8>>,
    pub sender_packet_count: u32,
    pub app: AppStats,

    /// Messages refused with "window full", waiting to be offered again in order.
    backlog: VecDeque<Message>,

    /// Arbitrary time-series metrics recorded via `SystemContext::record_metric`
    /// Key: metric name (e.g., "packets_resent"), Value: Vec<(time_ms, value)>
    pub metrics: HashMap<String, Vec<(u64, f64)>>,

    // Deterministic fault injection: drop first packet from Sender with given seq numbers
    drop_sender_seq_once: Vec<u32>,
    // Deterministic fault injection: drop first ACK from Receiver with given ack numbers
    drop_receiver_ack_once: Vec<u32>,
    // Deterministic fault injection: corrupt first packet from Sender with given seq numbers
    corrupt_sender_seq_once: Vec<u32>,

    /// Timeline of link events (drops, corruptions, sends, deliveries).
    pub link_events: Vec<LinkEventSummary>,

    /// Pending timers. Key: (node, timer_id), Value: generation of the one
    /// expiry event still allowed to fire.
    timer_generations: HashMap<(NodeId, u32), u64>,

    /// Latest scheduled arrival per destination; keeps the channel FIFO.
    last_arrival: HashMap<NodeId, u64>,
}

impl Simulator {
    pub fn new(
        config: SimConfig,
        sender: Box<dyn TransportProtocol>,
        receiver: Box<dyn TransportProtocol>,
    ) -> Self {
        use rand::SeedableRng;
        let rng = rand::rngs::StdRng::seed_from_u64(config.seed);

        Self {
            time: 0,
            event_queue: BinaryHeap::new(),
            event_id_counter: 0,
            config,
            rng,
            sender,
            receiver,
            delivered_data: Vec::new(),
            sender_packet_count: 0,
            app: AppStats::default(),
            backlog: VecDeque::new(),
            metrics: HashMap::new(),
            drop_sender_seq_once: Vec::new(),
            drop_receiver_ack_once: Vec::new(),
            corrupt_sender_seq_once: Vec::new(),
            link_events: Vec::new(),
            timer_generations: HashMap::new(),
            last_arrival: HashMap::new(),
        }
    }

    /// Register a deterministic fault: drop the first packet sent by Sender whose seq equals `seq`.
    pub fn add_drop_sender_seq_once(&mut self, seq: u32) {
        self.drop_sender_seq_once.push(seq);
    }

    /// Register a deterministic fault: drop the first ACK sent by Receiver whose ack equals `ack`.
    pub fn add_drop_receiver_ack_once(&mut self, ack: u32) {
        self.drop_receiver_ack_once.push(ack);
    }

    /// Register a deterministic fault: flip the checksum of the first packet
    /// sent by Sender whose seq equals `seq`.
    pub fn add_corrupt_sender_seq_once(&mut self, seq: u32) {
        self.corrupt_sender_seq_once.push(seq);
    }

    fn push_event(&mut self, time: u64, event_type: EventType) {
        self.event_queue.push(Event {
            time,
            event_type,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    pub fn schedule_app_send(&mut self, time: u64, message: Message) {
        self.push_event(time, EventType::AppSend { message });
    }

    /// Schedule `count` lettered messages, one every `interval` ms from `start`.
    pub fn schedule_lettered(&mut self, start: u64, interval: u64, count: usize) {
        for i in 0..count {
            self.schedule_app_send(start + i as u64 * interval, Message::lettered(i));
        }
    }

    pub fn init(&mut self) {
        for node in [NodeId::Sender, NodeId::Receiver] {
            let mut buffer = ActionBuffer::default();
            let mut ctx = ScopedContext {
                buffer: &mut buffer,
                now: self.time,
            };
            match node {
                NodeId::Sender => self.sender.init(&mut ctx),
                NodeId::Receiver => self.receiver.init(&mut ctx),
            }
            self.process_actions(node, buffer);
        }
    }

    /// Process the next event. Returns true if an event was processed, false if queue is empty.
    pub fn step(&mut self) -> bool {
        let event = match self.event_queue.pop() {
            Some(e) => e,
            None => return false,
        };

        if let EventType::TimerExpiry {
            node,
            timer_id,
            generation,
        } = &event.event_type
            && self.timer_generations.get(&(*node, *timer_id)) != Some(generation)
        {
            // Cancelled or replaced; does not advance the clock.
            debug!("Skipping stale timer event for timer_id={}", timer_id);
            return true;
        }

        self.time = event.time;
        debug!("Processing event at {}: {:?}", self.time, event.event_type);

        match event.event_type {
            EventType::PacketArrival { to, packet } => {
                let mut buffer = ActionBuffer::default();
                {
                    let mut ctx = ScopedContext {
                        buffer: &mut buffer,
                        now: self.time,
                    };
                    match to {
                        NodeId::Sender => self.sender.on_packet(&mut ctx, packet),
                        NodeId::Receiver => self.receiver.on_packet(&mut ctx, packet),
                    }
                }
                self.process_actions(to, buffer);
                if to == NodeId::Sender {
                    self.drain_backlog();
                }
            }
            EventType::TimerExpiry { node, timer_id, .. } => {
                // Fired timers are spent until started again.
                self.timer_generations.remove(&(node, timer_id));

                let mut buffer = ActionBuffer::default();
                {
                    let mut ctx = ScopedContext {
                        buffer: &mut buffer,
                        now: self.time,
                    };
                    match node {
                        NodeId::Sender => self.sender.on_timer(&mut ctx, timer_id),
                        NodeId::Receiver => self.receiver.on_timer(&mut ctx, timer_id),
                    }
                }
                self.process_actions(node, buffer);
                if node == NodeId::Sender {
                    self.drain_backlog();
                }
            }
            EventType::AppSend { message } => {
                self.app.offered += 1;
                if self.config.retry_rejected && !self.backlog.is_empty() {
                    self.backlog.push_back(message);
                } else {
                    match self.offer(&message) {
                        Ok(_) => {}
                        Err(Rejected::WindowFull) if self.config.retry_rejected => {
                            self.backlog.push_back(message);
                        }
                        Err(reason) => {
                            warn!("Application message dropped: {reason}");
                            self.app.dropped += 1;
                        }
                    }
                }
            }
        }
        true
    }

    /// Hand one message to the sender and apply whatever it did.
    fn offer(&mut self, message: &Message) -> Result<u32, Rejected> {
        let mut buffer = ActionBuffer::default();
        let result = {
            let mut ctx = ScopedContext {
                buffer: &mut buffer,
                now: self.time,
            };
            self.sender.on_app_data(&mut ctx, message)
        };
        self.process_actions(NodeId::Sender, buffer);
        match result {
            Ok(_) => self.app.accepted.push(*message),
            Err(_) => self.app.rejections += 1,
        }
        result
    }

    /// Offer queued messages, oldest first, until the sender refuses one.
    fn drain_backlog(&mut self) {
        while let Some(message) = self.backlog.front().copied() {
            match self.offer(&message) {
                Ok(_) => {
                    self.backlog.pop_front();
                }
                Err(Rejected::WindowFull) => break,
                Err(reason) => {
                    warn!("Application message dropped: {reason}");
                    self.backlog.pop_front();
                    self.app.dropped += 1;
                }
            }
        }
    }

    /// Produce a serializable snapshot of the current simulation state.
    pub fn export_report(&self) -> SimulationReport {
        SimulationReport {
            config: self.config.clone(),
            duration_ms: self.time,
            delivered_data: self.delivered_data.clone(),
            sender_packet_count: self.sender_packet_count,
            app: self.app.clone(),
            backlog_remaining: self.backlog.len(),
            metrics: self.metrics.clone(),
            link_events: self.link_events.clone(),
        }
    }

    pub fn run_until_complete(&mut self) {
        self.init();
        while self.step() {}
    }

    fn process_actions(&mut self, source_node: NodeId, buffer: ActionBuffer) {
        for (name, value) in buffer.metrics {
            self.metrics
                .entry(name)
                .or_default()
                .push((self.time, value));
        }

        for log in buffer.logs {
            info!("[{:?}] {}", source_node, log);
        }

        for data in buffer.delivered_data {
            info!("[{:?}] DELIVERED DATA: {} bytes", source_node, data.len());
            self.link_events.push(LinkEventSummary {
                time: self.time,
                description: format!(
                    "[{:?}] DELIVERED {} bytes to application",
                    source_node,
                    data.len()
                ),
            });
            self.delivered_data.push(data);
        }

        // Starting an id replaces any pending expiry; cancelling forgets it.
        for op in buffer.timer_ops {
            match op {
                TimerOp::Cancel { id } => {
                    self.timer_generations.remove(&(source_node, id));
                }
                TimerOp::Start { delay, id } => {
                    let generation = self.event_id_counter;
                    self.timer_generations.insert((source_node, id), generation);
                    self.push_event(
                        self.time + delay,
                        EventType::TimerExpiry {
                            node: source_node,
                            timer_id: id,
                            generation,
                        },
                    );
                }
            }
        }

        // Packet transmission logic (Channel)
        for mut packet in buffer.outgoing_packets {
            if source_node == NodeId::Sender {
                self.sender_packet_count += 1;

                // Deterministic SR tests: optionally drop first packet with given seq
                if let Some(pos) = self
                    .drop_sender_seq_once
                    .iter()
                    .position(|s| *s == packet.seqnum())
                {
                    self.link_events.push(LinkEventSummary {
                        time: self.time,
                        description: format!(
                            "[Sender->Receiver] DROP (deterministic seq) seq={}",
                            packet.seqnum()
                        ),
                    });
                    debug!(
                        "Deterministically dropping sender packet with seq={}",
                        packet.seqnum()
                    );
                    self.drop_sender_seq_once.remove(pos);
                    continue;
                }

                if let Some(pos) = self
                    .corrupt_sender_seq_once
                    .iter()
                    .position(|s| *s == packet.seqnum())
                {
                    self.link_events.push(LinkEventSummary {
                        time: self.time,
                        description: format!(
                            "[Sender->Receiver] CORRUPT (deterministic seq) seq={}",
                            packet.seqnum()
                        ),
                    });
                    self.corrupt_sender_seq_once.remove(pos);
                    packet = Packet::from_raw_parts(
                        packet.seqnum(),
                        packet.acknum(),
                        *packet.payload(),
                        !packet.checksum(),
                    );
                }
            }

            if source_node == NodeId::Receiver {
                // Deterministic tests: optionally drop first ACK with given ack number
                if let Some(ack) = packet.acknum()
                    && let Some(pos) = self.drop_receiver_ack_once.iter().position(|a| *a == ack)
                {
                    self.link_events.push(LinkEventSummary {
                        time: self.time,
                        description: format!(
                            "[Receiver->Sender] DROP (deterministic ack) ack={}",
                            ack
                        ),
                    });
                    debug!("Deterministically dropping receiver ACK with ack={}", ack);
                    self.drop_receiver_ack_once.remove(pos);
                    continue;
                }
            }

            // 1. Check Loss
            if self.rng.random::<f64>() < self.config.loss_rate {
                self.link_events.push(LinkEventSummary {
                    time: self.time,
                    description: format!(
                        "[{:?}->{:?}] DROP (random loss) seq={} ack={:?}",
                        source_node,
                        source_node.peer(),
                        packet.seqnum(),
                        packet.acknum()
                    ),
                });
                debug!("Packet lost in channel");
                continue;
            }

            // 2. Check Corruption
            if self.rng.random::<f64>() < self.config.corrupt_rate {
                self.link_events.push(LinkEventSummary {
                    time: self.time,
                    description: format!(
                        "[{:?}->{:?}] CORRUPT seq={} ack={:?}",
                        source_node,
                        source_node.peer(),
                        packet.seqnum(),
                        packet.acknum()
                    ),
                });
                debug!("Packet corrupted in channel");
                packet = self.flip_random_bit(&packet);
            }

            // 3. Calculate Latency, never overtaking an earlier packet on the same link
            let latency = self
                .rng
                .random_range(self.config.min_latency..=self.config.max_latency);
            let target_node = source_node.peer();
            let earliest = self.last_arrival.get(&target_node).copied().unwrap_or(0);
            let arrival_time = (self.time + latency).max(earliest);
            self.last_arrival.insert(target_node, arrival_time);

            self.link_events.push(LinkEventSummary {
                time: self.time,
                description: format!(
                    "[{:?}->{:?}] SEND seq={} ack={:?} (arrives at {}ms)",
                    source_node,
                    target_node,
                    packet.seqnum(),
                    packet.acknum(),
                    arrival_time
                ),
            });

            self.push_event(
                arrival_time,
                EventType::PacketArrival {
                    to: target_node,
                    packet,
                },
            );
        }
    }

    /// Flip one bit of the sequence field, the acknowledgment field (when in
    /// use), a payload byte or the checksum.
    fn flip_random_bit(&mut self, packet: &Packet) -> Packet {
        let mut seqnum = packet.seqnum();
        let mut acknum = packet.acknum();
        let mut payload = *packet.payload();
        let mut checksum = packet.checksum();
        let bit = self.rng.random_range(0..8u32);
        match self.rng.random_range(0..4u8) {
            0 => seqnum ^= 1 << bit,
            1 => match acknum.as_mut() {
                Some(ack) => *ack ^= 1 << bit,
                None => checksum ^= 1 << bit,
            },
            2 => {
                let idx = self.rng.random_range(0..PAYLOAD_SIZE);
                payload[idx] ^= 1 << bit;
            }
            _ => checksum ^= 1 << bit,
        }
        Packet::from_raw_parts(seqnum, acknum, payload, checksum)
    }
}
