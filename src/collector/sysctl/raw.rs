//! Thin wrappers over `sysctl(3)`.
//!
//! Values are read into zeroed buffers, so the helpers only accept [`Pod`]
//! types.

#[cfg(any(target_os = "freebsd", target_os = "macos"))]
use std::ffi::CString;
use std::io;
use std::mem::{self, MaybeUninit};
use std::ptr;

use libc::{c_int, c_uint, c_void};

/// Upper bound on MIB length (`CTL_MAXNAME`).
#[cfg(any(target_os = "freebsd", target_os = "macos"))]
const CTL_MAXNAME: usize = 24;

/// The table may keep growing between the size probe and the read.
const READ_VEC_ATTEMPTS: usize = 4;

/// Types for which every bit pattern, all zeroes included, is a valid value.
///
/// # Safety
/// Implement only for integers and `#[repr(C)]` records built from them
/// (raw pointers allowed), with no `bool`, enum or reference fields.
pub unsafe trait Pod: Copy {}

macro_rules! impl_pod {
    ($($t:ty),*) => {
        $(
            // SAFETY: primitive integer.
            unsafe impl Pod for $t {}
        )*
    };
}

impl_pod!(i8, u8, i16, u16, i32, u32, i64, u64, isize, usize);

// SAFETY: arrays of Pod are Pod.
unsafe impl<T: Pod, const N: usize> Pod for [T; N] {}

/// Calls `sysctl` with an output buffer of `*len` bytes.
///
/// # Safety
/// `buf` must be null or point to at least `*len` writable bytes.
pub unsafe fn sysctl_into(mib: &[c_int], buf: *mut c_void, len: &mut usize) -> io::Result<()> {
    // SAFETY: mib is a live slice, the kernel does not write through it;
    // buf/len validity is the caller's contract.
    let rc = unsafe {
        libc::sysctl(
            mib.as_ptr().cast_mut(),
            mib.len() as c_uint,
            buf,
            len,
            ptr::null_mut(),
            0,
        )
    };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Reads one value.
///
/// The kernel may return fewer bytes than `size_of::<T>()` (older structs, or
/// a deliberately oversized `T`); the rest stays zeroed. Zero bytes returned
/// is reported as [`io::ErrorKind::NotFound`].
pub fn read<T: Pod>(mib: &[c_int]) -> io::Result<T> {
    let mut value = MaybeUninit::<T>::zeroed();
    let mut len = mem::size_of::<T>();
    // SAFETY: value is size_of::<T>() bytes, zero-initialised.
    unsafe { sysctl_into(mib, value.as_mut_ptr().cast(), &mut len)? };
    if len == 0 {
        return Err(io::Error::from(io::ErrorKind::NotFound));
    }
    // SAFETY: T is Pod and the buffer was zeroed.
    Ok(unsafe { value.assume_init() })
}

/// Reads an array whose length is only known to the kernel.
#[cfg_attr(target_os = "openbsd", allow(dead_code))]
pub fn read_vec<T: Pod>(mib: &[c_int]) -> io::Result<Vec<T>> {
    let elem = mem::size_of::<T>().max(1);
    let mut last = io::Error::from_raw_os_error(libc::ENOMEM);
    for _ in 0..READ_VEC_ATTEMPTS {
        let mut len = 0usize;
        // SAFETY: a null buffer only queries the size.
        unsafe { sysctl_into(mib, ptr::null_mut(), &mut len)? };

        // Leave headroom for entries appearing between the two calls.
        let capacity = len / elem + len / elem / 8 + 1;
        let mut buf: Vec<T> = Vec::with_capacity(capacity);
        let mut len = capacity * elem;
        // SAFETY: buf has capacity * elem writable bytes.
        match unsafe { sysctl_into(mib, buf.as_mut_ptr().cast(), &mut len) } {
            Ok(()) => {
                // SAFETY: the kernel initialised len bytes, and T is Pod.
                unsafe { buf.set_len(len / elem) };
                return Ok(buf);
            }
            Err(e) if e.raw_os_error() == Some(libc::ENOMEM) => last = e,
            Err(e) => return Err(e),
        }
    }
    Err(last)
}

/// Resolves a dotted sysctl name into its numeric MIB.
#[cfg(any(target_os = "freebsd", target_os = "macos"))]
pub fn name_to_mib(name: &str) -> io::Result<Vec<c_int>> {
    let cname = CString::new(name).map_err(io::Error::other)?;
    let mut mib = vec![0 as c_int; CTL_MAXNAME];
    let mut len = mib.len();
    // SAFETY: mib has len entries; cname is NUL-terminated.
    let rc = unsafe { libc::sysctlnametomib(cname.as_ptr(), mib.as_mut_ptr(), &mut len) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    mib.truncate(len);
    Ok(mib)
}

/// Reads one value by dotted name.
#[cfg(any(target_os = "freebsd", target_os = "macos"))]
pub fn by_name<T: Pod>(name: &str) -> io::Result<T> {
    read(&name_to_mib(name)?)
}

/// Reads an array by dotted name.
#[cfg(any(target_os = "freebsd", target_os = "macos"))]
pub fn vec_by_name<T: Pod>(name: &str) -> io::Result<Vec<T>> {
    read_vec(&name_to_mib(name)?)
}
