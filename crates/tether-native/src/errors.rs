// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-thread native error queue.
//
// Entry points that fail with `Code::NativeError` (or catch a panic) push a
// description here. The caller drains it on the same thread to build the
// wrapped error message.

use std::cell::RefCell;

thread_local! {
    static QUEUE: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn push(message: impl Into<String>) {
    QUEUE.with(|q| q.borrow_mut().push(message.into()));
}

fn joined() -> String {
    QUEUE.with(|q| q.borrow().join("; "))
}

/// Drain the calling thread's error queue into `out`.
///
/// With a null `out` nothing is drained and the byte length of the pending
/// text is returned. Otherwise up to `capacity` bytes are copied, the queue
/// is cleared and the number of bytes written is returned.
///
/// # Safety
///
/// `out` must be null or valid for writes of `capacity` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_errors_drain(out: *mut u8, capacity: usize) -> i32 {
    let text = joined();
    if out.is_null() {
        return i32::try_from(text.len()).unwrap_or(i32::MAX);
    }

    let n = text.len().min(capacity).min(i32::MAX as usize);
    // SAFETY: caller guarantees `out` is writable for `capacity` bytes and
    // `n <= capacity`.
    unsafe { std::ptr::copy_nonoverlapping(text.as_ptr(), out, n) };
    QUEUE.with(|q| q.borrow_mut().clear());
    n as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_query_does_not_drain() {
        push("first");
        push("second");
        let len = unsafe { tether_errors_drain(std::ptr::null_mut(), 0) };
        assert_eq!(len as usize, "first; second".len());

        let mut buf = vec![0u8; len as usize];
        let written = unsafe { tether_errors_drain(buf.as_mut_ptr(), buf.len()) };
        assert_eq!(written, len);
        assert_eq!(std::str::from_utf8(&buf).unwrap(), "first; second");
        assert_eq!(unsafe { tether_errors_drain(std::ptr::null_mut(), 0) }, 0);
    }

    #[test]
    fn queue_is_per_thread() {
        push("main thread");
        let other = std::thread::spawn(|| unsafe { tether_errors_drain(std::ptr::null_mut(), 0) })
            .join()
            .unwrap();
        assert_eq!(other, 0);
        let mut sink = [0u8; 64];
        unsafe { tether_errors_drain(sink.as_mut_ptr(), sink.len()) };
    }
}
