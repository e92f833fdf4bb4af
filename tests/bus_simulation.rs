use ledtone::device::tone::DEFAULT_TICK_US;
use ledtone::device::{FrameDevice, LogicalBus, MidiDevice, RxState, SimHal};
use ledtone::midi::ChannelAllocator;
use ledtone::video::{FrameBuffer, Topology, VideoStreamer, FRAME_SYNC};
use ledtone::{CancelToken, ManualClock, NoteEvent, TimedDispatcher};

fn buzzer_bus() -> LogicalBus<MidiDevice<SimHal>> {
    let mut bus = LogicalBus::new();
    bus.attach(MidiDevice::boot(SimHal::new(0, 2), 2, DEFAULT_TICK_US).unwrap());
    bus.attach(MidiDevice::boot(SimHal::new(2, 2), 2, DEFAULT_TICK_US).unwrap());
    bus
}

#[test]
fn midi_pass_reaches_buzzers() {
    let events = vec![
        NoteEvent::on(0, 0, 60),
        NoteEvent::on(0, 1, 64),
        NoteEvent::on(0, 2, 67),
        NoteEvent::on(10, 3, 72),
        NoteEvent::off(20, 1, 64),
    ];
    let commands = ChannelAllocator::new(4).unwrap().allocate_all(&events);

    let mut dispatcher = TimedDispatcher::new(ManualClock::new(), buzzer_bus());
    let report = dispatcher.run(&commands, &CancelToken::new()).unwrap();
    assert_eq!(report.sent, 5);

    let nodes = dispatcher.into_sink().into_nodes();
    assert_eq!(nodes[0].active_note(0), 60);
    assert_eq!(nodes[0].active_note(1), 0);
    assert_eq!(nodes[1].active_note(0), 67);
    assert_eq!(nodes[1].active_note(1), 72);
}

#[test]
fn cancelled_pass_silences_every_buzzer() {
    let events = vec![
        NoteEvent::on(0, 0, 60),
        NoteEvent::on(0, 1, 62),
        NoteEvent::on(0, 2, 64),
        NoteEvent::off(5_000, 0, 60),
    ];
    let commands = ChannelAllocator::new(4).unwrap().allocate_all(&events);

    let mut dispatcher = TimedDispatcher::new(ManualClock::new(), buzzer_bus());
    dispatcher.run(&commands[..3], &CancelToken::new()).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let report = dispatcher.run(&commands[3..], &cancel).unwrap();
    assert!(report.cancelled);

    for node in dispatcher.into_sink().into_nodes() {
        assert_eq!(node.active_note(0), 0);
        assert_eq!(node.active_note(1), 0);
    }
}

#[test]
fn buzzer_plays_after_packets() {
    let mut bus = buzzer_bus();
    bus.transmit(&[0x93, 69]);
    let node = bus.node_mut(1).unwrap();
    for _ in 0..56 * 6 {
        node.on_timer_interrupt();
    }
    assert_eq!(node.hal().toggles(), &[0, 6]);
}

fn panel_bus(topology: &Topology, link: usize) -> LogicalBus<FrameDevice<SimHal>> {
    let mut bus = LogicalBus::new();
    for dev in topology.devices_on(link) {
        bus.attach(FrameDevice::boot(SimHal::new(dev.id, 0), topology.panel_size()));
    }
    bus
}

#[test]
fn video_frame_lands_on_every_panel() {
    let topology = Topology::grid(4, 4, 2, 2).unwrap();
    let mut frame = FrameBuffer::new(4, 4);
    for y in 0..4 {
        for x in 0..4 {
            frame.set_pixel(x, y, [(x * 60) as u8, (y * 60) as u8, 200]);
        }
    }

    let mut buses = [panel_bus(&topology, 0), panel_bus(&topology, 1)];
    let mut streamer = VideoStreamer::new(topology.clone(), 30.0).unwrap();
    let report = streamer
        .run(
            vec![Ok(frame.clone())],
            &mut buses,
            &ManualClock::new(),
            &CancelToken::new(),
        )
        .unwrap();
    assert_eq!(report.frames, 1);

    for (link, bus) in buses.iter().enumerate() {
        for (device, node) in topology.devices_on(link).zip(bus.nodes()) {
            assert_eq!(node.frames_shown(), 1);
            assert_eq!(node.hal().unmasked_led_writes(), 0);
            let shown = node.displayed();
            for y in 0..2 {
                for x in 0..2 {
                    let want = frame.pixel(device.origin_x + x, device.origin_y + y);
                    let at = (y * 2 + x) * 3;
                    for c in 0..3 {
                        assert_eq!(shown[at + c], want[c] & 0xF0);
                    }
                }
            }
        }
    }
}

#[test]
fn sync_byte_inside_payload_can_false_trigger() {
    // Device 0 skips device 1's packet, then sees FRAME_SYNC followed by its
    // own ID inside that payload and starts a bogus frame
    let mut bus = LogicalBus::new();
    bus.attach(FrameDevice::boot(SimHal::new(0, 0), 2));
    bus.attach(FrameDevice::boot(SimHal::new(1, 0), 2));

    let accepted = bus.transmit(&[FRAME_SYNC, 1, 0x12, FRAME_SYNC, 0, 0x34, 0x56, 0x78]);
    assert_eq!(accepted, vec![1]);
    assert_eq!(bus.nodes()[0].rx_state(), RxState::ReceiveData);
}
