//! Thread and process identifiers stamped onto storage nodes.

/// Kernel thread id of the caller (`gettid` on Linux, the Mach port on macOS).
#[inline]
pub(crate) fn current_tid() -> u64 {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "linux")] {
            unsafe { libc::syscall(libc::SYS_gettid) as u64 }
        } else if #[cfg(target_os = "macos")] {
            unsafe { libc::pthread_mach_thread_np(libc::pthread_self()) as u64 }
        } else {
            compile_error!("thread ids are only implemented for Linux and macOS");
        }
    }
}

#[inline]
pub(crate) fn current_pid() -> u32 {
    std::process::id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tid_differs_between_threads() {
        let main_tid = current_tid();
        let other = std::thread::spawn(current_tid).join().unwrap();
        assert_ne!(main_tid, other);
        assert_eq!(main_tid, current_tid());
        assert_eq!(current_pid(), std::process::id());
    }
}
