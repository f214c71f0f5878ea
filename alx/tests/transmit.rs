//! Transmit path: admission, backpressure, the collapse retry, and
//! completion reclamation.

mod common;

use alx::regs::{ALX_TPD_PRI0_CIDX, ALX_TPD_PRI0_PIDX};
use alx::TxError;
use common::*;
use nic_buffers::{DmaSegment, TransmitBuffer};

fn single_seg_buffer() -> TransmitBuffer {
    TransmitBuffer::new(vec![DmaSegment {
        addr: 0x40_0000,
        len: 1514,
    }])
}

#[test]
fn three_packets_fill_a_four_slot_ring() {
    let mut h = build(small_config(), 3);
    start_with_link(&mut h);
    h.mmio.clear_writes();

    for _ in 0..3 {
        h.nic.transmit(single_seg_buffer()).unwrap();
    }

    // Producer doorbell advanced 0 -> 1 -> 2 -> 3; hardware consumer
    // untouched at 0.
    assert_eq!(h.mmio.writes_to(ALX_TPD_PRI0_PIDX), vec![1, 2, 3]);
    assert_eq!(h.mmio.reg16(ALX_TPD_PRI0_CIDX), 0);
    assert_eq!(h.nic.counters().queued, 3);
}

#[test]
fn fourth_packet_hits_backpressure() {
    let mut h = build(small_config(), 3);
    start_with_link(&mut h);

    for _ in 0..3 {
        h.nic.transmit(single_seg_buffer()).unwrap();
    }
    h.mmio.clear_writes();

    match h.nic.transmit(single_seg_buffer()) {
        Err(TxError::InsufficientDescriptors(buf)) => {
            assert_eq!(buf.segment_count(), 1);
        }
        other => panic!("expected backpressure, got {:?}", other),
    }
    assert!(h.mmio.writes_to(ALX_TPD_PRI0_PIDX).is_empty());
    assert_eq!(h.nic.counters().backpressure, 1);
}

#[test]
fn multi_segment_packet_rejected_when_slots_short() {
    let mut h = build(small_config(), 3);
    start_with_link(&mut h);
    h.mmio.clear_writes();

    // Four slots minus the reserved margin leaves two usable; a
    // three-segment frame cannot be admitted even into an empty ring.
    match h.nic.transmit(scattered_buffer(3)) {
        Err(TxError::InsufficientDescriptors(buf)) => {
            assert_eq!(buf.segment_count(), 3);
        }
        other => panic!("expected backpressure, got {:?}", other),
    }
    // Indices unchanged: no doorbell write happened.
    assert!(h.mmio.writes_to(ALX_TPD_PRI0_PIDX).is_empty());
    assert_eq!(h.nic.counters().backpressure, 1);
    assert_eq!(h.nic.counters().queued, 0);
}

#[test]
fn rejected_while_link_down() {
    let mut h = build(small_config(), 3);
    // Never started: policy reject, buffer handed back.
    match h.nic.transmit(single_seg_buffer()) {
        Err(TxError::LinkDown(buf)) => assert_eq!(buf.length(), 1514),
        other => panic!("expected link-down reject, got {:?}", other),
    }
    assert_eq!(h.nic.counters().queued, 0);
}

#[test]
fn collapse_merges_contiguous_fragments() {
    let mut cfg = small_config();
    cfg.tx_ring_size = 8;
    let mut h = build(cfg, 3);
    start_with_link(&mut h);
    h.mmio.clear_writes();

    // 40 contiguous fragments exceed the scatter limit; one collapse folds
    // them into a single segment and the frame goes out.
    h.nic.transmit(contiguous_buffer(40)).unwrap();
    assert_eq!(h.mmio.writes_to(ALX_TPD_PRI0_PIDX), vec![1]);
    assert_eq!(h.nic.counters().queued, 1);
    assert_eq!(h.nic.counters().overflow_drops, 0);
}

#[test]
fn scattered_overflow_is_dropped_after_one_retry() {
    let mut cfg = small_config();
    cfg.tx_ring_size = 8;
    let mut h = build(cfg, 3);
    start_with_link(&mut h);
    h.mmio.clear_writes();

    // 40 scattered fragments cannot be merged; the single retry fails and
    // the frame is dropped, not retried again.
    match h.nic.transmit(scattered_buffer(40)) {
        Err(TxError::SegmentOverflow) => {}
        other => panic!("expected overflow drop, got {:?}", other),
    }
    assert!(h.mmio.writes_to(ALX_TPD_PRI0_PIDX).is_empty());
    assert_eq!(h.nic.counters().overflow_drops, 1);
}

#[test]
fn empty_buffer_is_a_mapping_failure() {
    let mut h = build(small_config(), 3);
    start_with_link(&mut h);

    match h.nic.transmit(TransmitBuffer::new(Vec::new())) {
        Err(TxError::MappingFailure) => {}
        other => panic!("expected mapping failure, got {:?}", other),
    }
    assert_eq!(h.nic.counters().mapping_failures, 1);
}

#[test]
fn reclamation_frees_slots_for_reuse() {
    let mut h = build(small_config(), 3);
    start_with_link(&mut h);

    for _ in 0..3 {
        h.nic.transmit(single_seg_buffer()).unwrap();
    }
    // Ring exhausted.
    assert!(matches!(
        h.nic.transmit(single_seg_buffer()),
        Err(TxError::InsufficientDescriptors(_))
    ));

    // Device finishes the first two frames.
    h.mmio.set_reg16(ALX_TPD_PRI0_CIDX, 2);
    h.nic.reclaim_tx();
    assert_eq!(h.nic.counters().reclaimed, 2);

    // Freed slots admit new frames again.
    h.mmio.clear_writes();
    h.nic.transmit(single_seg_buffer()).unwrap();
    assert_eq!(h.mmio.writes_to(ALX_TPD_PRI0_PIDX), vec![0]);
}

#[test]
fn completed_slots_are_reused_only_after_reclamation() {
    let mut h = build(small_config(), 3);
    start_with_link(&mut h);

    // First frame takes slots 0 and 1; the device finishes it but no
    // reclaim pass has run yet.
    h.nic.transmit(scattered_buffer(2)).unwrap();
    h.mmio.set_reg16(ALX_TPD_PRI0_CIDX, 2);

    // Admission of the second frame (slots 2 and 3) releases the finished
    // frame first.
    h.nic.transmit(scattered_buffer(2)).unwrap();
    assert_eq!(h.nic.counters().reclaimed, 1);

    // The wrap into slot 0 is safe: a reclaim pass now must not touch the
    // two frames the device still owns.
    h.nic.transmit(scattered_buffer(1)).unwrap();
    h.nic.reclaim_tx();
    assert_eq!(h.nic.counters().reclaimed, 1);

    // Each frame is released exactly once as its completion arrives.
    h.mmio.set_reg16(ALX_TPD_PRI0_CIDX, 0);
    h.nic.reclaim_tx();
    assert_eq!(h.nic.counters().reclaimed, 2);
    h.mmio.set_reg16(ALX_TPD_PRI0_CIDX, 1);
    h.nic.reclaim_tx();
    assert_eq!(h.nic.counters().reclaimed, 3);
}

#[test]
fn reclaiming_twice_does_not_double_count() {
    let mut h = build(small_config(), 3);
    start_with_link(&mut h);

    h.nic.transmit(single_seg_buffer()).unwrap();
    h.mmio.set_reg16(ALX_TPD_PRI0_CIDX, 1);
    h.nic.reclaim_tx();
    h.nic.reclaim_tx();
    assert_eq!(h.nic.counters().reclaimed, 1);
}
