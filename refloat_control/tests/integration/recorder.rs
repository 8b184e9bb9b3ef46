//! Integration test: data recorder driven by ride events and app requests.

use refloat_control::controller::TickEvents;
use refloat_control::host::VescHost;
use refloat_control::record::rt_data::RtItem;

use super::{config, ready_rig, rig_with, run, step_on};

const HEADER_REQUEST: [u8; 4] = [101, 41, 2, 1];

fn data_request(offset: u32) -> Vec<u8> {
    let mut raw = vec![101, 41, 2, 2];
    raw.extend_from_slice(&offset.to_be_bytes());
    raw
}

#[test]
fn engage_records_and_app_reads_back() {
    let (mut c, mut host) = ready_rig();
    step_on(&mut host);
    let r = c.tick(&mut host);
    assert!(r.events.contains(TickEvents::ENGAGED));
    let engaged_at = host.system_time_ticks();
    run(&mut c, &mut host, 99);
    assert_eq!(c.recorder().len(), 100);

    // Header: count, item count and NUL-terminated names. Pauses recording.
    c.inbox().submit(&HEADER_REQUEST).unwrap();
    c.tick(&mut host);
    assert!(!c.recorder().is_recording());
    assert_eq!(c.recorder().len(), 100);

    let sent = host.take_sent();
    assert_eq!(sent.len(), 1);
    let header = &sent[0];
    assert_eq!(&header[..7], &[101, 42, 0, 0, 0, 100, 8]);
    let names: Vec<&str> = header[7..]
        .split(|&b| b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| std::str::from_utf8(s).unwrap())
        .collect();
    let expected: Vec<&str> = RtItem::RECORDED.iter().map(|i| i.name()).collect();
    assert_eq!(names, expected);

    // First page holds as many 21-byte samples as fit in 511 bytes.
    c.inbox().submit(&data_request(0)).unwrap();
    c.tick(&mut host);
    let page = host.take_sent().remove(0);
    assert_eq!(page.len(), 6 + 24 * 21);
    assert_eq!(&page[..6], &[101, 43, 0, 0, 0, 0]);
    assert_eq!(&page[6..10], &engaged_at.to_be_bytes());
    // Engage tick: centering, both pads, running.
    assert_eq!(page[10], 1 << 4 | 3 << 2 | 1);

    // Tail page and past the end.
    c.inbox().submit(&data_request(96)).unwrap();
    c.inbox().submit(&data_request(100)).unwrap();
    c.tick(&mut host);
    let pages = host.take_sent();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].len(), 6 + 4 * 21);
    assert_eq!(pages[1].len(), 6);
}

#[test]
fn manual_start_and_autostart_toggle() {
    let (mut c, mut host) = ready_rig();

    // Disable autostart: engaging no longer records.
    c.inbox().submit(&[101, 41, 1, 2, 0]).unwrap();
    c.tick(&mut host);
    assert!(!c.recorder().autostart());
    step_on(&mut host);
    run(&mut c, &mut host, 20);
    assert!(c.recorder().is_empty());

    // Manual start records the ready board too.
    c.inbox().submit(&[101, 41, 1, 1, 1]).unwrap();
    run(&mut c, &mut host, 10);
    assert!(c.recorder().is_recording());
    assert_eq!(c.recorder().len(), 10);

    c.inbox().submit(&[101, 41, 1, 1, 0]).unwrap();
    run(&mut c, &mut host, 10);
    assert!(!c.recorder().is_recording());
    assert_eq!(c.recorder().len(), 10);
}

#[test]
fn empty_recorder_sends_no_data_page() {
    let (mut c, mut host) = ready_rig();
    c.inbox().submit(&data_request(0)).unwrap();
    c.tick(&mut host);
    assert!(host.sent().is_empty());
}

#[test]
fn zero_capacity_recorder_ignores_requests() {
    let mut cfg = config();
    cfg.recorder.capacity = 0;
    let (mut c, mut host) = rig_with(cfg);
    step_on(&mut host);
    run(&mut c, &mut host, 10);
    c.inbox().submit(&HEADER_REQUEST).unwrap();
    c.tick(&mut host);
    assert!(host.sent().is_empty());
    assert!(!c.recorder().has_capability());
}
