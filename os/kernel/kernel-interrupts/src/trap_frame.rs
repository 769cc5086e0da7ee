/// Register snapshot built by the entry stubs, lowest address first.
///
/// ```text
/// ds                                  pushed by the common stub
/// edi esi ebp esp ebx edx ecx eax     pusha
/// int_no err_code                     pushed by the vector stub (err_code 0 if the CPU pushed none)
/// eip cs eflags useresp ss            pushed by the CPU
/// ```
///
/// `useresp`/`ss` are only meaningful when the interrupt came from ring 3.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub int_no: u32,
    pub err_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub useresp: u32,
    pub ss: u32,
}

const _: () = assert!(size_of::<TrapFrame>() == 16 * 4);

impl TrapFrame {
    /// A zeroed frame for `vector`.
    #[must_use]
    pub const fn for_vector(vector: u8) -> Self {
        Self {
            ds: 0,
            edi: 0,
            esi: 0,
            ebp: 0,
            esp: 0,
            ebx: 0,
            edx: 0,
            ecx: 0,
            eax: 0,
            int_no: vector as u32,
            err_code: 0,
            eip: 0,
            cs: 0,
            eflags: 0,
            useresp: 0,
            ss: 0,
        }
    }

    /// Whether the interrupted code ran in ring 3.
    #[inline]
    #[must_use]
    pub const fn from_user_mode(&self) -> bool {
        self.cs & 0b11 == 3
    }
}
