//! # Process Table
//!
//! Process control blocks and a cooperative round-robin ready queue.
//!
//! Every process owns a page directory cloned from its parent (init clones
//! the kernel directory), so all of them share the kernel half. Switching is
//! explicit: the kernel captures the registers at a switch point, hands them
//! to [`ProcessTable::context_switch`], and restores whatever comes back in
//! [`Switch::Jump`]. Code resumed that way sees [`ContextState::JustSwitched`]
//! and carries on.
//!
//! ```text
//!  ready queue (front = running)
//!  ┌─────┐   ┌─────┐   ┌─────┐
//!  │ pid1│──►│ pid2│──►│ pid3│──┐
//!  └─────┘   └─────┘   └─────┘  │
//!     ▲                         │
//!     └─────────────────────────┘
//! ```
//!
//! The queue lives on the kernel heap.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod pcb;
mod spaces;
mod table;

pub use pcb::{ContextState, Pcb, Pid, SavedContext};
pub use spaces::AddressSpaces;
pub use table::{ProcessError, ProcessTable, Switch};
