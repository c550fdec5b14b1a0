// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fault-injection flags.
//
// Only compiled in with the `ops-test` feature; without it every flag reads
// as clear and `tether_ops_set` refuses. Flags are thread-local so parallel
// tests cannot interfere with each other.

use std::cell::Cell;

use crate::codes::Code;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Flag {
    Int32Overflow1 = 0,
    Int32Overflow2,
    Int32Overflow3,
    FailedAccess1,
    FailedAccess2,
    FailedAccess3,
    FailedAccess4,
    PointerChange,
    NativeError1,
    NativeError2,
    NativeError3,
    NativeError4,
    LenChange1,
    FailedCreate1,
    FailedCreate2,
    FailedInit1,
    FailedSet1,
}

pub const FLAG_COUNT: usize = Flag::FailedSet1 as usize + 1;

thread_local! {
    static FLAGS: Cell<u32> = const { Cell::new(0) };
}

pub(crate) fn is_set(flag: Flag) -> bool {
    cfg!(feature = "ops-test") && FLAGS.with(|f| f.get() & (1 << flag as u32) != 0)
}

/// Whether fault injection is compiled in: 1 or 0.
#[unsafe(no_mangle)]
pub extern "C" fn tether_ops_available() -> i32 {
    i32::from(cfg!(feature = "ops-test"))
}

/// Set (`on != 0`) or clear one flag for the calling thread.
#[unsafe(no_mangle)]
pub extern "C" fn tether_ops_set(flag: i32, on: i32) -> i32 {
    if !cfg!(feature = "ops-test") {
        return Code::Fail.raw();
    }
    if flag < 0 || flag as usize >= FLAG_COUNT {
        return Code::InputOutOfRange.raw();
    }
    let bit = 1u32 << flag;
    FLAGS.with(|f| {
        let v = f.get();
        f.set(if on != 0 { v | bit } else { v & !bit });
    });
    Code::Ok.raw()
}

/// Clear every flag for the calling thread.
#[unsafe(no_mangle)]
pub extern "C" fn tether_ops_reset() {
    FLAGS.with(|f| f.set(0));
}

#[cfg(all(test, feature = "ops-test"))]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear() {
        assert_eq!(tether_ops_set(Flag::PointerChange as i32, 1), 0);
        assert!(is_set(Flag::PointerChange));
        assert!(!is_set(Flag::LenChange1));
        assert_eq!(tether_ops_set(Flag::PointerChange as i32, 0), 0);
        assert!(!is_set(Flag::PointerChange));
    }

    #[test]
    fn out_of_range_flag() {
        assert_eq!(tether_ops_set(FLAG_COUNT as i32, 1), Code::InputOutOfRange.raw());
        assert_eq!(tether_ops_set(-1, 1), Code::InputOutOfRange.raw());
    }
}
