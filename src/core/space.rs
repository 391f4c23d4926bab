use std::io;
use std::path::Path;

/// Bytes available to the current user on the volume holding `path`.
#[cfg(unix)]
pub fn free_space_of(path: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    #[allow(clippy::unnecessary_cast)]
    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

/// Bytes available on the disk whose mount point is the longest prefix of `path`.
#[cfg(not(unix))]
pub fn free_space_of(path: &Path) -> io::Result<u64> {
    // Avoid canonicalize: verbatim `\\?\` paths never match mount points.
    let absolute = std::path::absolute(path)?;
    if !absolute.exists() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "path does not exist"));
    }
    let disks = sysinfo::Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|d| absolute.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map(|d| d.available_space())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no mounted volume contains {}", absolute.display()),
            )
        })
}
