/// Number of prologue bytes saved and scanned for a chainable pattern.
/// Large enough to hold the widest pattern this module recognizes
/// (`48 FF 25 xx xx xx xx`, 7 bytes) with headroom.
pub const PROLOGUE_LEN: usize = 16;

/// A chainable JMP pattern recognized in a saved prologue, and the 32-bit
/// displacement it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPattern {
    /// `E9 xx xx xx xx` — relative near JMP.
    NearJmp(i32),
    /// `FF 25 xx xx xx xx` — RIP-indirect JMP (32-bit form).
    RipIndirect(i32),
    /// `48 FF 25 xx xx xx xx` — REX-prefixed RIP-indirect (64-bit form).
    RipIndirectRex(i32),
}

/// Recognizes a chainable pattern at the start of `prologue`, grounded on
/// the same Hell's/Halo's/Tartarus' Gate byte-matching technique used to
/// recover a hooked syscall's clean neighbor.
#[must_use]
pub fn detect_chain_pattern(prologue: &[u8; PROLOGUE_LEN]) -> Option<ChainPattern> {
    if prologue[0] == 0x48 && prologue[1] == 0xFF && prologue[2] == 0x25 {
        return Some(ChainPattern::RipIndirectRex(i32::from_le_bytes([
            prologue[3], prologue[4], prologue[5], prologue[6],
        ])));
    }
    if prologue[0] == 0xFF && prologue[1] == 0x25 {
        return Some(ChainPattern::RipIndirect(i32::from_le_bytes([
            prologue[2], prologue[3], prologue[4], prologue[5],
        ])));
    }
    if prologue[0] == 0xE9 {
        return Some(ChainPattern::NearJmp(i32::from_le_bytes([
            prologue[1], prologue[2], prologue[3], prologue[4],
        ])));
    }
    None
}

/// Resolves `pattern` (found at `site`) to the address it ultimately jumps
/// to. For the two RIP-indirect forms this reads a pointer-sized value out
/// of process memory.
///
/// # Safety
///
/// `site` must point at `PROLOGUE_LEN` readable bytes, and for the
/// RIP-indirect forms the computed indirection address must point at a
/// valid, readable pointer-sized value (true for any prologue this module
/// itself recognized as chainable in live code).
#[must_use]
pub unsafe fn resolve_chain_target(site: *const u8, pattern: ChainPattern) -> *const u8 {
    match pattern {
        ChainPattern::NearJmp(disp) => site.offset(5).offset(disp as isize),
        ChainPattern::RipIndirect(disp) => {
            let indirect = site.offset(6).offset(disp as isize).cast::<*const u8>();
            indirect.read_unaligned()
        },
        ChainPattern::RipIndirectRex(disp) => {
            let indirect = site.offset(7).offset(disp as isize).cast::<*const u8>();
            indirect.read_unaligned()
        },
    }
}

/// Builds the five-byte relative-JMP patch (`0xE9` + a 32-bit signed
/// displacement) that redirects `original` to `replacement`.
///
/// # Errors
///
/// Returns `None` if the displacement does not fit in `i32` (only possible
/// on 64-bit targets more than ~2GiB apart).
#[must_use]
pub fn build_patch(original: *const u8, replacement: *const u8) -> Option<[u8; 5]> {
    let disp = (replacement as isize).checked_sub(original as isize)?.checked_sub(5)?;
    let disp32 = i32::try_from(disp).ok()?;
    let mut patch = [0u8; 5];
    patch[0] = 0xE9;
    patch[1..5].copy_from_slice(&disp32.to_le_bytes());
    Some(patch)
}

/// Reads the first [`PROLOGUE_LEN`] bytes at `addr`.
///
/// # Safety
///
/// `addr` must point at `PROLOGUE_LEN` readable, initialized bytes.
#[must_use]
pub unsafe fn read_prologue(addr: *const u8) -> [u8; PROLOGUE_LEN] {
    let mut buf = [0u8; PROLOGUE_LEN];
    std::ptr::copy_nonoverlapping(addr, buf.as_mut_ptr(), PROLOGUE_LEN);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prologue_from(bytes: &[u8]) -> [u8; PROLOGUE_LEN] {
        let mut buf = [0x90u8; PROLOGUE_LEN]; // NOP padding
        buf[..bytes.len()].copy_from_slice(bytes);
        buf
    }

    #[test]
    fn recognizes_near_jmp() {
        let p = prologue_from(&[0xE9, 0x10, 0x00, 0x00, 0x00]);
        assert_eq!(detect_chain_pattern(&p), Some(ChainPattern::NearJmp(0x10)));
    }

    #[test]
    fn recognizes_rip_indirect() {
        let p = prologue_from(&[0xFF, 0x25, 0x20, 0x00, 0x00, 0x00]);
        assert_eq!(detect_chain_pattern(&p), Some(ChainPattern::RipIndirect(0x20)));
    }

    #[test]
    fn recognizes_rex_rip_indirect() {
        let p = prologue_from(&[0x48, 0xFF, 0x25, 0x30, 0x00, 0x00, 0x00]);
        assert_eq!(detect_chain_pattern(&p), Some(ChainPattern::RipIndirectRex(0x30)));
    }

    #[test]
    fn ordinary_prologue_is_not_chainable() {
        let p = prologue_from(&[0x55, 0x48, 0x89, 0xE5]); // push rbp; mov rbp, rsp
        assert_eq!(detect_chain_pattern(&p), None);
    }

    #[test]
    fn near_jmp_target_is_site_plus_five_plus_disp() {
        let site = 0x1000usize as *const u8;
        let target = unsafe { resolve_chain_target(site, ChainPattern::NearJmp(0x20)) };
        assert_eq!(target as usize, 0x1000 + 5 + 0x20);
    }

    #[test]
    fn build_patch_computes_a_relative_displacement() {
        let original = 0x2000usize as *const u8;
        let replacement = 0x2100usize as *const u8;
        let patch = build_patch(original, replacement).unwrap();
        assert_eq!(patch[0], 0xE9);
        let disp = i32::from_le_bytes([patch[1], patch[2], patch[3], patch[4]]);
        assert_eq!(disp, 0x100 - 5);
    }
}
