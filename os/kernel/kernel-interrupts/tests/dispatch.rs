use kernel_interrupts::{ChainedPics, Dispatch, InterruptRegistry, TrapFrame, dispatch};
use kernel_ports::{PortAccess, PortIo};
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Port(PortAccess),
    Handler { vector: u32, eax: u32, err: u32 },
}

thread_local! {
    static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
}

fn events() -> Vec<Event> {
    EVENTS.with(|e| e.borrow().clone())
}

/// Port bus that logs into the same timeline as the handlers.
struct TimelinePorts;

impl PortIo for TimelinePorts {
    fn read_port8(&mut self, port: u16) -> u8 {
        EVENTS.with(|e| e.borrow_mut().push(Event::Port(PortAccess::Read8(port))));
        0
    }

    fn read_port16(&mut self, port: u16) -> u16 {
        EVENTS.with(|e| e.borrow_mut().push(Event::Port(PortAccess::Read16(port))));
        0
    }

    fn write_port8(&mut self, port: u16, value: u8) {
        EVENTS.with(|e| e.borrow_mut().push(Event::Port(PortAccess::Write8(port, value))));
    }

    fn write_port16(&mut self, port: u16, value: u16) {
        EVENTS.with(|e| e.borrow_mut().push(Event::Port(PortAccess::Write16(port, value))));
    }
}

fn record(frame: &mut TrapFrame) {
    EVENTS.with(|e| {
        e.borrow_mut().push(Event::Handler {
            vector: frame.int_no,
            eax: frame.eax,
            err: frame.err_code,
        });
    });
    frame.eax = 0xFEED;
}

fn frame(vector: u8) -> TrapFrame {
    let mut f = TrapFrame::for_vector(vector);
    f.eax = 0x1234;
    f.err_code = 7;
    f.eip = 0xC000_1000;
    f
}

#[test]
fn handler_receives_decoded_registers() {
    let registry = InterruptRegistry::new();
    registry.register(3, &record);
    let mut f = frame(3);

    let outcome = dispatch(&registry, &ChainedPics::default(), &mut TimelinePorts, &mut f);

    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(
        events(),
        vec![Event::Handler {
            vector: 3,
            eax: 0x1234,
            err: 7
        }]
    );
    assert_eq!(f.eax, 0xFEED, "handler edits are visible to the stub");
}

#[test]
fn slave_irq_acknowledges_both_before_handler() {
    let registry = InterruptRegistry::new();
    registry.register(44, &record);

    dispatch(&registry, &ChainedPics::default(), &mut TimelinePorts, &mut frame(44));

    assert_eq!(
        events(),
        vec![
            Event::Port(PortAccess::Write8(0xA0, 0x20)),
            Event::Port(PortAccess::Write8(0x20, 0x20)),
            Event::Handler {
                vector: 44,
                eax: 0x1234,
                err: 7
            },
        ]
    );
}

#[test]
fn master_irq_acknowledges_master_only() {
    let registry = InterruptRegistry::new();
    registry.register(32, &record);

    dispatch(&registry, &ChainedPics::default(), &mut TimelinePorts, &mut frame(32));

    assert_eq!(
        events(),
        vec![
            Event::Port(PortAccess::Write8(0x20, 0x20)),
            Event::Handler {
                vector: 32,
                eax: 0x1234,
                err: 7
            },
        ]
    );
}

#[test]
fn spurious_irq_is_acknowledged_and_dropped() {
    let registry = InterruptRegistry::new();
    let outcome = dispatch(&registry, &ChainedPics::default(), &mut TimelinePorts, &mut frame(39));
    assert_eq!(outcome, Dispatch::Acknowledged);
    assert_eq!(events(), vec![Event::Port(PortAccess::Write8(0x20, 0x20))]);
}

#[test]
fn unhandled_exception_is_reported_by_name() {
    let registry = InterruptRegistry::new();
    let mut f = frame(13);
    let Dispatch::Unhandled(report) =
        dispatch(&registry, &ChainedPics::default(), &mut TimelinePorts, &mut f)
    else {
        panic!("expected an unhandled exception");
    };
    assert_eq!(report.vector, 13);
    assert_eq!(report.message(), "General Protection Fault");
    assert_eq!(
        report.to_string(),
        "Interrupt 13: General Protection Fault (error code 0x7, eip 0xc0001000)"
    );
    assert!(events().is_empty(), "exceptions never touch the PIC");
}

#[test]
fn vectors_above_irq_range() {
    let registry = InterruptRegistry::new();
    assert_eq!(
        dispatch(&registry, &ChainedPics::default(), &mut TimelinePorts, &mut frame(0x80)),
        Dispatch::Ignored
    );
    registry.register(0x80, &record);
    assert_eq!(
        dispatch(&registry, &ChainedPics::default(), &mut TimelinePorts, &mut frame(0x80)),
        Dispatch::Handled
    );
    assert_eq!(events().len(), 1);
}
