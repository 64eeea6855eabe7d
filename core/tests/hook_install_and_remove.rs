//! End-to-end: patch a real function's machine code, observe the call site
//! change behavior, call through the swap lock to reach the original, then
//! restore it exactly. x86/x86_64 only — `gcore_hook` doesn't build its
//! patching module on other architectures.

#![cfg(any(target_arch = "x86", target_arch = "x86_64"))]

use gcore::hook::HookEntry;

#[inline(never)]
fn add(a: i32, b: i32) -> i32 { std::hint::black_box(a) + std::hint::black_box(b) }

#[inline(never)]
fn always_returns_one_hundred(_a: i32, _b: i32) -> i32 { 100 }

#[test]
fn installing_a_hook_redirects_the_call_and_removing_it_restores_the_original() {
    assert_eq!(add(3, 4), 7);

    let original_bytes: Vec<u8> = {
        // SAFETY: `add` is a real function with at least 16 readable bytes.
        let prologue = unsafe { gcore::hook::read_prologue(add as *mut u8) };
        prologue.to_vec()
    };

    // SAFETY: `add` points at live, executable code for the test's duration.
    let entry = unsafe { HookEntry::new(add as *mut u8) };
    // SAFETY: `always_returns_one_hundred` is a real function with a
    // compatible `(i32, i32) -> i32` signature and a non-chainable prologue.
    unsafe { entry.install(always_returns_one_hundred as *mut u8, false).unwrap() };

    assert_eq!(add(3, 4), 100, "the patched call site must now run the replacement");

    {
        let _swap = entry.swap();
        assert_eq!(add(3, 4), 7, "inside the swap scope the original bytes must be live again");
    }

    assert_eq!(add(3, 4), 100, "dropping the swap guard must re-apply the patch");

    entry.remove().unwrap();
    assert_eq!(add(3, 4), 7, "remove must restore the exact original behavior");

    // SAFETY: same as above.
    let restored_bytes = unsafe { gcore::hook::read_prologue(add as *mut u8) };
    assert_eq!(&restored_bytes[..], &original_bytes[..], "remove must restore bit-identical bytes");
}
