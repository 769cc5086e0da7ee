use crate::{ChainedPics, EXCEPTION_VECTORS, InterruptRegistry, TrapFrame, exception_message};
use core::fmt;
use kernel_ports::PortIo;

/// What [`dispatch`] did with a trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A registered handler ran.
    Handled,
    /// A hardware IRQ without a handler; acknowledged and dropped.
    Acknowledged,
    /// A vector above the IRQ range without a handler; ignored.
    Ignored,
    /// A CPU exception nobody handles. Fatal.
    Unhandled(UnhandledException),
}

/// A CPU exception with no registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnhandledException {
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
}

impl UnhandledException {
    #[must_use]
    pub fn message(&self) -> &'static str {
        exception_message(self.vector).unwrap_or("Unknown Interrupt")
    }
}

impl fmt::Display for UnhandledException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Interrupt {}: {} (error code {:#x}, eip {:#010x})",
            self.vector,
            self.message(),
            self.error_code,
            self.eip
        )
    }
}

/// Route one trap.
///
/// * `0..32`: the registered handler, or an [`UnhandledException`] report.
/// * PIC vectors: end-of-interrupt (slave, then master) *before* anything
///   else, then the handler if one is registered.
/// * everything else: the handler if one is registered.
pub fn dispatch<P: PortIo>(
    registry: &InterruptRegistry,
    pics: &ChainedPics,
    ports: &mut P,
    frame: &mut TrapFrame,
) -> Dispatch {
    let vector = frame.int_no;
    let handler = u8::try_from(vector).ok().and_then(|v| registry.get(v));

    if vector < EXCEPTION_VECTORS {
        return match handler {
            Some(h) => {
                h(frame);
                Dispatch::Handled
            }
            None => Dispatch::Unhandled(UnhandledException {
                vector,
                error_code: frame.err_code,
                eip: frame.eip,
            }),
        };
    }

    if pics.handles(vector) {
        pics.end_of_interrupt(ports, vector);
        return match handler {
            Some(h) => {
                h(frame);
                Dispatch::Handled
            }
            None => Dispatch::Acknowledged,
        };
    }

    match handler {
        Some(h) => {
            h(frame);
            Dispatch::Handled
        }
        None => {
            log::warn!("ignoring unexpected vector {vector}");
            Dispatch::Ignored
        }
    }
}
