//! x86-64 encoding table
//!
//! Each constant is the little-endian value of the bytes shown in its
//! comment, so writing the value to memory reproduces the byte sequence.

/// Build a narrow encoding from its byte sequence.
pub const fn narrow_bytes(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Build a wide encoding from its byte sequence.
pub const fn wide_bytes(bytes: [u8; 8]) -> u64 {
    u64::from_le_bytes(bytes)
}

/// 4-byte encodings
pub mod narrow {
    use super::narrow_bytes;

    /// nop
    pub const NOP: u32 = narrow_bytes([0x66, 0x66, 0x66, 0x90]);
    /// pop rdi
    pub const DROP: u32 = narrow_bytes([0x5f, 0x66, 0x66, 0x90]);
    /// push rdi
    pub const DUP: u32 = narrow_bytes([0x57, 0x66, 0x66, 0x90]);
    /// xchg rdi, [rsp]
    pub const SWAP: u32 = narrow_bytes([0x48, 0x87, 0x3c, 0x24]);
    /// neg rdi
    pub const NEG: u32 = narrow_bytes([0x48, 0xf7, 0xdf, 0x90]);
    /// pop rax; add rdi, rax
    pub const ADD: u32 = narrow_bytes([0x58, 0x48, 0x01, 0xc7]);
    /// mov rdi, rax
    pub const QUO: u32 = narrow_bytes([0x48, 0x89, 0xc7, 0x90]);
    /// mov rdi, rdx
    pub const REM: u32 = narrow_bytes([0x48, 0x89, 0xd7, 0x90]);
    /// not rdi
    pub const NOT: u32 = narrow_bytes([0x48, 0xf7, 0xd7, 0x90]);
    /// pop rax; and rdi, rax
    pub const AND: u32 = narrow_bytes([0x58, 0x48, 0x21, 0xc7]);
    /// pop rax; or rdi, rax
    pub const OR: u32 = narrow_bytes([0x58, 0x48, 0x09, 0xc7]);
    /// pop rax; xor rdi, rax
    pub const XOR: u32 = narrow_bytes([0x58, 0x48, 0x31, 0xc7]);
    /// push rdi; mov rdi, imm32 (sign-extended; the immediate is the next
    /// narrow instruction)
    pub const PUSH_IMM32: u32 = narrow_bytes([0x57, 0x48, 0xc7, 0xc7]);
}

/// 8-byte encodings
pub mod wide {
    use super::wide_bytes;

    /// push rbp; mov rbp, rsp; mov rsp, rdi; pop rdi
    pub const PROLOGUE: u64 = wide_bytes([0x55, 0x48, 0x89, 0xe5, 0x48, 0x89, 0xfc, 0x5f]);
    /// push rdi; mov rax, rsp; mov rsp, rbp; pop rbp
    pub const EPILOGUE: u64 = wide_bytes([0x57, 0x48, 0x89, 0xe0, 0x48, 0x89, 0xec, 0x5d]);
    /// ret
    pub const RET: u64 = wide_bytes([0xc3, 0x66, 0x66, 0x66, 0x90, 0x66, 0x66, 0x90]);
    /// xchg rsp, rbp; mov rax, imm64 (the address is the next wide slot)
    pub const CALL_SETUP: u64 = wide_bytes([0x48, 0x87, 0xe5, 0x66, 0x66, 0x90, 0x48, 0xb8]);
    /// call rax; xchg rsp, rbp; pop rdi
    pub const CALL: u64 = wide_bytes([0xff, 0xd0, 0x48, 0x87, 0xe5, 0x5f, 0x66, 0x90]);
    /// push rdi; mov rdi, imm64 (the value is the next wide slot)
    pub const PUSH_IMM64: u64 = wide_bytes([0x57, 0x66, 0x66, 0x66, 0x90, 0x90, 0x48, 0xbf]);
    /// sub [rsp], rdi; pop rdi
    pub const SUB: u64 = wide_bytes([0x48, 0x29, 0x3c, 0x24, 0x5f, 0x66, 0x66, 0x90]);
    /// pop rax; imul rdi, rax
    pub const MUL: u64 = wide_bytes([0x58, 0x48, 0x0f, 0xaf, 0xf8, 0x66, 0x66, 0x90]);
    /// pop rax; cqo; idiv rdi
    pub const DIV: u64 = wide_bytes([0x58, 0x48, 0x99, 0x48, 0xf7, 0xff, 0x66, 0x90]);
    /// mov rcx, rdi; shl qword [rsp], cl; pop rdi
    pub const SHL: u64 = wide_bytes([0x48, 0x89, 0xf9, 0x48, 0xd3, 0x24, 0x24, 0x5f]);
    /// mov rcx, rdi; shr qword [rsp], cl; pop rdi
    pub const SHR: u64 = wide_bytes([0x48, 0x89, 0xf9, 0x48, 0xd3, 0x2c, 0x24, 0x5f]);
}
