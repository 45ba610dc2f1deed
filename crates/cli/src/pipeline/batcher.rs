//! Per-kind batching of incoming records.

use std::mem;

use contracts::{Datapoint, Event, RecordKind, Span, TelemetryRecord};

/// A full batch of one kind, ready to broadcast
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Points(Vec<Datapoint>),
    Events(Vec<Event>),
    Spans(Vec<Span>),
}

impl Batch {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Points(_) => RecordKind::Points,
            Self::Events(_) => RecordKind::Events,
            Self::Spans(_) => RecordKind::Spans,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Points(b) => b.len(),
            Self::Events(b) => b.len(),
            Self::Spans(b) => b.len(),
        }
    }
}

/// Accumulates records per kind and hands out batches of `batch_size`
#[derive(Debug)]
pub struct Batcher {
    batch_size: usize,
    points: Vec<Datapoint>,
    events: Vec<Event>,
    spans: Vec<Span>,
}

impl Batcher {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            points: Vec::with_capacity(batch_size),
            events: Vec::with_capacity(batch_size),
            spans: Vec::with_capacity(batch_size),
        }
    }

    /// Add a record; returns its kind's batch once it is full
    pub fn push(&mut self, record: TelemetryRecord) -> Option<Batch> {
        let size = self.batch_size;
        match record {
            TelemetryRecord::Point(p) => take_full(&mut self.points, p, size).map(Batch::Points),
            TelemetryRecord::Event(e) => take_full(&mut self.events, e, size).map(Batch::Events),
            TelemetryRecord::Span(s) => take_full(&mut self.spans, s, size).map(Batch::Spans),
        }
    }

    /// Records held but not yet handed out
    pub fn pending(&self) -> usize {
        self.points.len() + self.events.len() + self.spans.len()
    }

    /// Hand out every partial batch, in points/events/spans order
    pub fn drain(&mut self) -> Vec<Batch> {
        let mut batches = Vec::with_capacity(3);
        if !self.points.is_empty() {
            batches.push(Batch::Points(mem::take(&mut self.points)));
        }
        if !self.events.is_empty() {
            batches.push(Batch::Events(mem::take(&mut self.events)));
        }
        if !self.spans.is_empty() {
            batches.push(Batch::Spans(mem::take(&mut self.spans)));
        }
        batches
    }
}

fn take_full<R>(buf: &mut Vec<R>, record: R, size: usize) -> Option<Vec<R>> {
    buf.push(record);
    (buf.len() >= size).then(|| mem::replace(buf, Vec::with_capacity(size)))
}
