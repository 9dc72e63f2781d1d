//! Execution-core identity and enumeration.
//!
//! The pool is sized from the *possible* core set, not the online set, so a
//! core brought online later still finds its context.

use crate::{Error, Result};
use std::fmt;
use std::io;

const POSSIBLE_CPUS: &str = "/sys/devices/system/cpu/possible";

/// Index of one logical execution core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoreId(pub usize);

impl CoreId {
    /// Core the calling thread is running on right now.
    ///
    /// May be stale by the time it is used; callers that need a stable
    /// answer must pin themselves first (see [`pin_current_thread`]).
    #[must_use]
    pub fn current() -> Self {
        #[cfg(target_os = "linux")]
        {
            // SAFETY: sched_getcpu has no preconditions.
            let cpu = unsafe { libc::sched_getcpu() };
            Self(usize::try_from(cpu).unwrap_or(0))
        }
        #[cfg(not(target_os = "linux"))]
        {
            Self(0)
        }
    }

    /// Raw index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// Number of possible cores on this machine (at least 1).
#[must_use]
pub fn possible_cores() -> usize {
    std::fs::read_to_string(POSSIBLE_CPUS)
        .ok()
        .and_then(|s| parse_cpu_list(&s).ok())
        .or_else(configured_cores)
        .unwrap_or(1)
        .max(1)
}

fn configured_cores() -> Option<usize> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
    usize::try_from(n).ok().filter(|&n| n > 0)
}

/// Parse a kernel cpu list (`"0-3,8,10-11"`) into one past the highest index.
pub fn parse_cpu_list(list: &str) -> Result<usize> {
    let mut highest: Option<usize> = None;
    for part in list.trim().split(',').filter(|p| !p.is_empty()) {
        let last = match part.split_once('-') {
            Some((lo, hi)) => {
                let lo = parse_index(lo)?;
                let hi = parse_index(hi)?;
                if hi < lo {
                    return Err(Error::InvalidInput(format!("descending cpu range: {part}")));
                }
                hi
            }
            None => parse_index(part)?,
        };
        highest = Some(highest.map_or(last, |h| h.max(last)));
    }
    highest
        .map(|h| h + 1)
        .ok_or_else(|| Error::InvalidInput("empty cpu list".to_string()))
}

fn parse_index(s: &str) -> Result<usize> {
    s.trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid cpu index: {s}")))
}

/// Pin the calling thread to a single core.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an index the cpu set cannot hold and
/// [`Error::IoError`] when the kernel refuses the mask.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(core: CoreId) -> Result<()> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let mut cpu_set = CpuSet::new();
    cpu_set
        .set(core.0)
        .map_err(|_| Error::InvalidInput(format!("invalid core id: {}", core.0)))?;

    sched_setaffinity(Pid::from_raw(0), &cpu_set).map_err(|e| {
        Error::IoError(format!(
            "failed to pin to {core}: {}",
            io::Error::from_raw_os_error(e as i32)
        ))
    })
}

/// Pin the calling thread (non-Linux no-op).
#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(_core: CoreId) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_list_range() {
        assert_eq!(parse_cpu_list("0-7\n").unwrap(), 8);
    }

    #[test]
    fn test_parse_cpu_list_single() {
        assert_eq!(parse_cpu_list("0").unwrap(), 1);
    }

    #[test]
    fn test_parse_cpu_list_mixed() {
        assert_eq!(parse_cpu_list("0-3,8,10-11").unwrap(), 12);
        assert_eq!(parse_cpu_list("5,0-1").unwrap(), 6);
    }

    #[test]
    fn test_parse_cpu_list_invalid() {
        assert!(parse_cpu_list("").is_err());
        assert!(parse_cpu_list("a-b").is_err());
        assert!(parse_cpu_list("3-1").is_err());
    }

    #[test]
    fn test_possible_cores_at_least_one() {
        assert!(possible_cores() >= 1);
    }

    #[test]
    fn test_current_core_within_possible() {
        assert!(CoreId::current().index() < possible_cores());
    }

    #[test]
    fn test_core_id_display() {
        assert_eq!(CoreId(3).to_string(), "cpu3");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pin_current_thread() {
        std::thread::spawn(|| {
            // Processes may be restricted to a subset of cores; only check
            // that a successful pin is reflected by sched_getcpu.
            let target = CoreId::current();
            if pin_current_thread(target).is_ok() {
                assert_eq!(CoreId::current(), target);
            }
        })
        .join()
        .unwrap();
    }
}
