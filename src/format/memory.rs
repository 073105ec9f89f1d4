//! Resident memory of the current process

/// Resident set size in bytes, when the platform exposes it
#[cfg(target_os = "linux")]
pub fn resident_memory_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    // SAFETY: sysconf has no preconditions
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    u64::try_from(page_size)
        .ok()
        .map(|size| resident_pages * size)
}

#[cfg(not(target_os = "linux"))]
pub fn resident_memory_bytes() -> Option<u64> {
    None
}

/// Render a byte count the way it appears in text lines, e.g. `(12.34 MB)`
pub fn format_memory(bytes: u64) -> String {
    format!("({:.2} MB)", bytes as f64 / (1024.0 * 1024.0))
}
