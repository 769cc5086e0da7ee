use crate::EXCEPTION_VECTORS;

/// Names of the CPU exception vectors, indexed by vector.
pub const EXCEPTION_MESSAGES: [&str; EXCEPTION_VECTORS as usize] = [
    "Division By Zero",
    "Debug",
    "Non Maskable Interrupt",
    "Breakpoint",
    "Into Detected Overflow",
    "Out Of Bounds",
    "Invalid Opcode",
    "No Coprocessor",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Bad TSS",
    "Segment Not Present",
    "Stack Fault",
    "General Protection Fault",
    "Page Fault",
    "Unknown Interrupt",
    "Coprocessor Fault",
    "Alignment Check",
    "Machine Check",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
];

/// The exception name for `vector`, or `None` past the exception range.
#[must_use]
pub fn exception_message(vector: u32) -> Option<&'static str> {
    EXCEPTION_MESSAGES.get(vector as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names() {
        assert_eq!(exception_message(0), Some("Division By Zero"));
        assert_eq!(exception_message(10), Some("Bad TSS"));
        assert_eq!(exception_message(14), Some("Page Fault"));
        assert_eq!(exception_message(18), Some("Machine Check"));
        assert!((19..32).all(|v| exception_message(v) == Some("Reserved")));
        assert_eq!(exception_message(32), None);
    }
}
